use std::sync::Arc;
use std::time::Duration;

use http::Uri;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::RequestError;
use crate::parser::{Limits, ParseStatus, ResponseParser};
use crate::request::{Header, Request};
use crate::response::Response;

/// Headers the client writes itself to frame the message.
const FRAMING_HEADERS: [&str; 4] = ["host", "content-length", "connection", "transfer-encoding"];

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Upper bound for the whole exchange. `None` lets the peer take as long as it needs.
    pub timeout: Option<Duration>,
    pub limits: Limits,
}

#[derive(Debug, Clone, Default)]
pub struct Client {
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one request over a fresh connection and reads one response.
    pub async fn request(&self, request: Request) -> Result<Response, RequestError> {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute(request))
                .await
                .map_err(|_| RequestError::TimedOut(limit))?,
            None => self.execute(request).await,
        }
    }

    async fn execute(&self, request: Request) -> Result<Response, RequestError> {
        let target = Target::from_uri(&request.uri)?;
        let request_bytes = serialize_request(&request, &target)?;

        debug!(
            method = %request.method,
            host = %target.host,
            port = target.port,
            tls = target.tls,
            "connecting"
        );
        let stream = TcpStream::connect((target.connect_host(), target.port))
            .await
            .map_err(|source| RequestError::Connect {
                target: format!("{}:{}", target.host, target.port),
                source,
            })?;

        if target.tls {
            let connector = native_tls::TlsConnector::new().map_err(|source| RequestError::Tls {
                host: target.host.clone(),
                source,
            })?;
            let connector = tokio_native_tls::TlsConnector::from(connector);
            let stream = connector
                .connect(target.connect_host(), stream)
                .await
                .map_err(|source| RequestError::Tls {
                    host: target.host.clone(),
                    source,
                })?;
            exchange(stream, &request_bytes, self.config.limits).await
        } else {
            exchange(stream, &request_bytes, self.config.limits).await
        }
    }
}

async fn exchange<S>(
    mut stream: S,
    request_bytes: &[u8],
    limits: Limits,
) -> Result<Response, RequestError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request_bytes).await?;
    stream.flush().await?;

    let mut parser = ResponseParser::with_limits(limits);
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            return Ok(parser.finish()?);
        }
        if let ParseStatus::Complete(response) = parser.push(&buffer[..n])? {
            return Ok(response);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    /// Host as written in the URI; IPv6 literals keep their brackets.
    host: String,
    port: u16,
    tls: bool,
    default_port: bool,
}

impl Target {
    fn from_uri(uri: &Uri) -> Result<Self, RequestError> {
        let tls = match uri.scheme_str() {
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => false,
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => true,
            Some(scheme) => return Err(RequestError::UnsupportedScheme(scheme.to_string())),
            None => return Err(RequestError::InvalidUri(format!("{uri}: missing scheme"))),
        };
        let host = match uri.host() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(RequestError::InvalidUri(format!("{uri}: missing host"))),
        };
        let default = if tls { 443 } else { 80 };
        let port = uri.port_u16().unwrap_or(default);
        Ok(Self {
            host,
            port,
            tls,
            default_port: port == default,
        })
    }

    fn connect_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    fn host_header(&self) -> String {
        if self.default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn serialize_request(request: &Request, target: &Target) -> Result<Vec<u8>, RequestError> {
    let path = match request.uri.path_and_query().map(|value| value.as_str()) {
        Some(path) if !path.is_empty() => path,
        _ => "/",
    };

    let mut bytes = Vec::new();
    bytes.extend_from_slice(format!("{} {} HTTP/1.1\r\n", request.method, path).as_bytes());
    bytes.extend_from_slice(format!("Host: {}\r\n", target.host_header()).as_bytes());
    for header in &request.headers {
        if FRAMING_HEADERS.iter().any(|name| header.is(name)) {
            debug!(header = %header.name, "framing header supplied by caller, not written");
            continue;
        }
        validate_header(header)?;
        bytes.extend_from_slice(header.name.as_bytes());
        bytes.extend_from_slice(b": ");
        bytes.extend_from_slice(header.value.as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }
    if let Some(body) = &request.body {
        bytes.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    bytes.extend_from_slice(b"Connection: close\r\n\r\n");
    if let Some(body) = &request.body {
        bytes.extend_from_slice(body);
    }
    Ok(bytes)
}

fn validate_header(header: &Header) -> Result<(), RequestError> {
    if header.name.is_empty() || !header.name.bytes().all(is_token_byte) {
        return Err(RequestError::InvalidHeader {
            name: header.name.clone(),
            reason: "name is not a valid token",
        });
    }
    if header
        .value
        .bytes()
        .any(|byte| byte == b'\r' || byte == b'\n' || byte == 0)
    {
        return Err(RequestError::InvalidHeader {
            name: header.name.clone(),
            reason: "value contains a control character",
        });
    }
    Ok(())
}

fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
}

