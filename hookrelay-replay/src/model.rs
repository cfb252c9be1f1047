use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Upper bound, in characters, on the response body echoed back in a result.
pub const RESPONSE_TEXT_LIMIT: usize = 500;

/// Verbs a captured request can be replayed with. Anything else is sent as `Post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplayMethod {
    Get,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl ReplayMethod {
    /// Case-insensitive match against the supported verbs, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(ReplayMethod::Get),
            "OPTIONS" => Some(ReplayMethod::Options),
            "POST" => Some(ReplayMethod::Post),
            "PUT" => Some(ReplayMethod::Put),
            "PATCH" => Some(ReplayMethod::Patch),
            "DELETE" => Some(ReplayMethod::Delete),
            _ => None,
        }
    }

    /// Resolves the method to send: absent, blank and unsupported verbs all become `Post`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => ReplayMethod::Post,
            Some(raw) => Self::parse(raw).unwrap_or_else(|| {
                tracing::debug!(method = raw, "unsupported method, replaying as POST");
                ReplayMethod::Post
            }),
        }
    }

    pub fn carries_body(self) -> bool {
        !matches!(self, ReplayMethod::Get | ReplayMethod::Options)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplayMethod::Get => "GET",
            ReplayMethod::Options => "OPTIONS",
            ReplayMethod::Post => "POST",
            ReplayMethod::Put => "PUT",
            ReplayMethod::Patch => "PATCH",
            ReplayMethod::Delete => "DELETE",
        }
    }

    pub fn to_http(self) -> http::Method {
        match self {
            ReplayMethod::Get => http::Method::GET,
            ReplayMethod::Options => http::Method::OPTIONS,
            ReplayMethod::Post => http::Method::POST,
            ReplayMethod::Put => http::Method::PUT,
            ReplayMethod::Patch => http::Method::PATCH,
            ReplayMethod::Delete => http::Method::DELETE,
        }
    }
}

impl fmt::Display for ReplayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured request body. Strings stay raw text; any other JSON value is structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Payload {
    Text(String),
    Structured(Value),
}

impl Payload {
    /// Body bytes plus the content type to use when the capture did not carry one.
    pub fn encode(&self) -> (Vec<u8>, &'static str) {
        match self {
            Payload::Text(text) => (text.clone().into_bytes(), "text/plain"),
            Payload::Structured(value) => (value.to_string().into_bytes(), "application/json"),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            other => Payload::Structured(other),
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Value::String(text),
            Payload::Structured(value) => value,
        }
    }
}

/// Ordered name/value pairs carried as a JSON object: headers, query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Adds a value, folding it into an existing entry of the same name (any casing).
    pub fn push_joined(&mut self, name: &str, value: &str) {
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.push(name, value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect()
    }
}

impl From<Fields> for Map<String, Value> {
    fn from(fields: Fields) -> Self {
        fields
            .0
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect()
    }
}

/// One request as recorded by the capture endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Fields,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_params: Fields,
    #[serde(default)]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the session store hands back when asked to forward a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedirectInfo {
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub request_data: Option<CapturedRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The destination answered, whatever the status.
    Completed {
        status_code: u16,
        response_text: String,
        response_headers: Fields,
    },
    /// No response was obtained.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ReplayReport")]
pub struct ReplayResult {
    pub method_used: ReplayMethod,
    pub outcome: ReplayOutcome,
}

impl ReplayResult {
    pub fn failed(method_used: ReplayMethod, error: impl ToString) -> Self {
        Self {
            method_used,
            outcome: ReplayOutcome::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, ReplayOutcome::Completed { status_code, .. } if status_code < 400)
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            ReplayOutcome::Completed { status_code, .. } => Some(*status_code),
            ReplayOutcome::Failed { .. } => None,
        }
    }

    pub fn response_text(&self) -> Option<&str> {
        match &self.outcome {
            ReplayOutcome::Completed { response_text, .. } => Some(response_text),
            ReplayOutcome::Failed { .. } => None,
        }
    }

    pub fn response_headers(&self) -> Option<&Fields> {
        match &self.outcome {
            ReplayOutcome::Completed {
                response_headers, ..
            } => Some(response_headers),
            ReplayOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ReplayOutcome::Completed { .. } => None,
            ReplayOutcome::Failed { error } => Some(error),
        }
    }

    pub fn status_message(&self) -> String {
        match &self.outcome {
            ReplayOutcome::Completed { status_code, .. } if *status_code < 400 => {
                format!("Redirect successful! Status: {status_code}")
            }
            ReplayOutcome::Completed { status_code, .. } => {
                format!("Redirect failed with status: {status_code}")
            }
            ReplayOutcome::Failed { error } => format!("Redirect failed: {error}"),
        }
    }
}

/// Flat wire form of a [`ReplayResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Fields>,
    pub method_used: ReplayMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ReplayResult> for ReplayReport {
    fn from(result: ReplayResult) -> Self {
        let success = result.success();
        match result.outcome {
            ReplayOutcome::Completed {
                status_code,
                response_text,
                response_headers,
            } => ReplayReport {
                success,
                status_code: Some(status_code),
                response_text: Some(response_text),
                response_headers: Some(response_headers),
                method_used: result.method_used,
                error: None,
            },
            ReplayOutcome::Failed { error } => ReplayReport {
                success,
                status_code: None,
                response_text: None,
                response_headers: None,
                method_used: result.method_used,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn reached(status_code: u16) -> Self {
        Self {
            accessible: status_code < 400,
            status_code: Some(status_code),
            error: None,
        }
    }

    pub fn unreachable(error: impl ToString) -> Self {
        Self {
            accessible: false,
            status_code: None,
            error: Some(error.to_string()),
        }
    }

    pub fn status_message(&self) -> String {
        match (self.status_code, &self.error) {
            (Some(status), _) if self.accessible => format!("URL is accessible. Status: {status}"),
            (Some(status), _) => format!("URL responded with status: {status}"),
            (None, Some(error)) => format!("URL is not reachable: {error}"),
            (None, None) => "URL is not reachable".to_string(),
        }
    }
}
