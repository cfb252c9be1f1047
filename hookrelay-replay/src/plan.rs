use http::Uri;
use hookrelay_web::{Header, Request, RequestError};
use tracing::debug;
use url::Url;

use crate::{CapturedRequest, Fields, ReplayError, ReplayMethod};

/// Captured headers that are never forwarded, compared case-insensitively.
pub const EXCLUDED_HEADERS: [&str; 4] = ["host", "content-length", "connection", "accept-encoding"];

/// The outbound request derived from a capture, before it touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequest {
    pub method: ReplayMethod,
    pub target: String,
    pub headers: Vec<Header>,
    pub body: Option<Vec<u8>>,
}

impl PlannedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.is(name))
            .map(|header| header.value.as_str())
    }

    pub fn into_request(self) -> Result<Request, RequestError> {
        let uri = self
            .target
            .parse::<Uri>()
            .map_err(|err| RequestError::InvalidUri(format!("{}: {err}", self.target)))?;
        let mut builder = Request::builder(uri)
            .method(self.method.to_http())
            .headers(self.headers);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        Ok(builder.build())
    }
}

/// Builds the replay of `captured` against `destination` without sending it.
///
/// Only fails when query parameters have to be attached and `destination`
/// does not parse as an absolute URL.
pub fn plan_request(
    destination: &str,
    captured: &CapturedRequest,
) -> Result<PlannedRequest, ReplayError> {
    let method = ReplayMethod::normalize(captured.method.as_deref());
    let mut headers = forwardable_headers(&captured.headers);
    let target = attach_query(destination, &captured.query_params)?;

    let body = match &captured.payload {
        Some(payload) if method.carries_body() => {
            let (bytes, content_type) = payload.encode();
            if !headers.iter().any(|header| header.is("content-type")) {
                headers.push(Header::new("Content-Type", content_type));
            }
            Some(bytes)
        }
        Some(_) => {
            debug!(%method, "payload dropped for bodiless method");
            None
        }
        None => None,
    };

    Ok(PlannedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn forwardable_headers(captured: &Fields) -> Vec<Header> {
    captured
        .iter()
        .filter(|(name, _)| {
            let excluded = EXCLUDED_HEADERS
                .iter()
                .any(|excluded| name.eq_ignore_ascii_case(excluded));
            if excluded {
                debug!(header = name, "not forwarding header");
            }
            !excluded
        })
        .map(|(name, value)| Header::new(name, value))
        .collect()
}

fn attach_query(destination: &str, params: &Fields) -> Result<String, ReplayError> {
    if params.is_empty() {
        return Ok(destination.to_string());
    }

    let mut url = Url::parse(destination).map_err(|source| ReplayError::InvalidDestination {
        url: destination.to_string(),
        source,
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in params.iter() {
            pairs.append_pair(name, value);
        }
    }
    Ok(url.into())
}
