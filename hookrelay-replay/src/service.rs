use std::future::Future;

use http::{Method, Uri};
use hookrelay_web::{Client, ClientConfig, Header, Request, RequestError, Response};
use tracing::{info, warn};

use crate::{
    CapturedRequest, Fields, ProbeResult, RESPONSE_TEXT_LIMIT, ReplayError, ReplayMethod,
    ReplayOutcome, ReplayResult, plan_request,
};

/// Sends one request and returns one response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, RequestError>> + Send;
}

impl Transport for Client {
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, RequestError>> + Send {
        self.request(request)
    }
}

/// Replays captured requests against a destination. Holds no per-call state,
/// so one instance can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ReplayService<T = Client> {
    transport: T,
}

impl ReplayService<Client> {
    pub fn with_client_config(config: ClientConfig) -> Self {
        Self::new(Client::new(config))
    }
}

impl<T: Transport> ReplayService<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Forwards `captured` to `destination` and reports what came back.
    ///
    /// Network failures and error statuses are reported inside the result.
    /// `Err` is reserved for a destination that cannot be parsed when query
    /// parameters have to be attached to it.
    pub async fn replay(
        &self,
        destination: &str,
        captured: &CapturedRequest,
    ) -> Result<ReplayResult, ReplayError> {
        let planned = plan_request(destination, captured)?;
        let method = planned.method;
        let request = match planned.into_request() {
            Ok(request) => request,
            Err(err) => {
                warn!(%method, destination, error = %err, "could not build replay request");
                return Ok(ReplayResult::failed(method, err));
            }
        };

        info!(%method, target = %request.uri, "replaying captured request");
        match self.transport.send(request).await {
            Ok(response) => {
                let result = completed(method, &response);
                info!(
                    %method,
                    status = response.status,
                    success = result.success(),
                    "replay completed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(%method, destination, error = %err, "replay failed");
                Ok(ReplayResult::failed(method, err))
            }
        }
    }

    /// Sends a bare `OPTIONS` request to check that `url` answers at all.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        let uri = match url.parse::<Uri>() {
            Ok(uri) => uri,
            Err(err) => {
                return ProbeResult::unreachable(RequestError::InvalidUri(format!("{url}: {err}")));
            }
        };
        let request = Request::builder(uri).method(Method::OPTIONS).build();
        match self.transport.send(request).await {
            Ok(response) => {
                info!(url, status = response.status, "probe answered");
                ProbeResult::reached(response.status)
            }
            Err(err) => {
                warn!(url, error = %err, "probe failed");
                ProbeResult::unreachable(err)
            }
        }
    }
}

fn completed(method: ReplayMethod, response: &Response) -> ReplayResult {
    ReplayResult {
        method_used: method,
        outcome: ReplayOutcome::Completed {
            status_code: response.status,
            response_text: truncate_chars(&response.text(), RESPONSE_TEXT_LIMIT),
            response_headers: merge_headers(&response.headers),
        },
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

fn merge_headers(headers: &[Header]) -> Fields {
    let mut fields = Fields::new();
    for header in headers {
        fields.push_joined(&header.name, &header.value);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::{merge_headers, truncate_chars};
    use hookrelay_web::Header;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn merges_repeated_response_headers() {
        let merged = merge_headers(&[
            Header::new("Set-Cookie", "a=1"),
            Header::new("Content-Type", "text/plain"),
            Header::new("set-cookie", "b=2"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("set-cookie"), Some("a=1, b=2"));
        assert_eq!(merged.iter().next(), Some(("Set-Cookie", "a=1, b=2")));
    }
}
