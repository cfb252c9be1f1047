use thiserror::Error;

use crate::request::Header;
use crate::response::Response;

const CRLF: &[u8] = b"\r\n";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid status line")]
    InvalidStatusLine,
    #[error("invalid content-length")]
    InvalidContentLength,
    #[error("response head too large")]
    HeaderTooLarge,
    #[error("response body too large")]
    BodyTooLarge,
    #[error("invalid chunk size")]
    InvalidChunkSize,
    #[error("invalid chunk terminator")]
    InvalidChunkTerminator,
    #[error("connection closed before the response was complete")]
    UnexpectedEof,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParseStatus {
    NeedMore,
    Complete(Response),
}

/// Incremental HTTP/1.x response parser. Bytes are pushed as they arrive;
/// `finish` is called once the peer closes so close-delimited bodies can end.
#[derive(Debug, Default)]
pub(crate) struct ResponseParser {
    buffer: Vec<u8>,
    limits: Limits,
    message: Option<Message>,
    chunked: ChunkedBody,
}

impl ResponseParser {
    pub(crate) fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
        self.buffer.extend_from_slice(bytes);
        self.try_parse(false)
    }

    pub(crate) fn finish(&mut self) -> Result<Response, ParseError> {
        match self.try_parse(true)? {
            ParseStatus::Complete(response) => Ok(response),
            ParseStatus::NeedMore => Err(ParseError {
                kind: ParseErrorKind::UnexpectedEof,
                offset: self.buffer.len(),
            }),
        }
    }

    fn try_parse(&mut self, eof: bool) -> Result<ParseStatus, ParseError> {
        let message = match self.message.take() {
            Some(message) => message,
            None => match self.read_head(eof)? {
                Some(message) => message,
                None => return Ok(ParseStatus::NeedMore),
            },
        };

        let body = match message.framing {
            Framing::Empty => Some(Vec::new()),
            Framing::Length(length) => {
                read_length(&self.buffer, message.body_start, length, self.limits, eof)?
            }
            Framing::Chunked => self.chunked.advance(&self.buffer, self.limits, eof)?,
            Framing::UntilClose => {
                read_until_close(&self.buffer, message.body_start, self.limits, eof)?
            }
        };
        let Some(body) = body else {
            self.message = Some(message);
            return Ok(ParseStatus::NeedMore);
        };

        Ok(ParseStatus::Complete(Response {
            status: message.head.status,
            reason: message.head.reason,
            headers: message.head.headers,
            body,
        }))
    }

    fn read_head(&mut self, eof: bool) -> Result<Option<Message>, ParseError> {
        loop {
            let headers_end = match find_headers_end(&self.buffer, self.limits)? {
                Some(index) => index,
                None if eof => {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnexpectedEof,
                        offset: self.buffer.len(),
                    });
                }
                None => return Ok(None),
            };

            let head = parse_head(&self.buffer[..headers_end])?;
            let body_start = headers_end + HEADER_TERMINATOR.len();

            // Interim responses (100 Continue, 103 Early Hints) precede the real one.
            if (100..200).contains(&head.status) && head.status != 101 {
                self.buffer.drain(..body_start);
                continue;
            }

            let framing = Framing::for_head(&head, body_start)?;
            self.chunked = ChunkedBody::starting_at(body_start);
            return Ok(Some(Message {
                head,
                body_start,
                framing,
            }));
        }
    }
}

/// A response head that has been parsed while its body is still arriving.
#[derive(Debug)]
struct Message {
    head: Head,
    body_start: usize,
    framing: Framing,
}

#[derive(Debug)]
struct Head {
    status: u16,
    reason: String,
    headers: Vec<Header>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

impl Framing {
    fn for_head(head: &Head, body_start: usize) -> Result<Self, ParseError> {
        if head.status == 204 || head.status == 304 || head.status == 101 {
            return Ok(Framing::Empty);
        }

        let chunked = head
            .headers
            .iter()
            .filter(|header| header.is("transfer-encoding"))
            .flat_map(|header| header.value.split(','))
            .any(|encoding| encoding.trim().eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(Framing::Chunked);
        }

        match head
            .headers
            .iter()
            .find(|header| header.is("content-length"))
        {
            Some(header) => header
                .value
                .trim()
                .parse::<usize>()
                .map(Framing::Length)
                .map_err(|_| ParseError {
                    kind: ParseErrorKind::InvalidContentLength,
                    offset: body_start,
                }),
            None => Ok(Framing::UntilClose),
        }
    }
}

fn find_headers_end(buffer: &[u8], limits: Limits) -> Result<Option<usize>, ParseError> {
    match find_subsequence(buffer, HEADER_TERMINATOR, 0) {
        Some(index) if index > limits.max_header_bytes => Err(ParseError {
            kind: ParseErrorKind::HeaderTooLarge,
            offset: index,
        }),
        Some(index) => Ok(Some(index)),
        None if buffer.len() > limits.max_header_bytes => Err(ParseError {
            kind: ParseErrorKind::HeaderTooLarge,
            offset: buffer.len(),
        }),
        None => Ok(None),
    }
}

fn parse_head(bytes: &[u8]) -> Result<Head, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or("");
    let (status, reason) = parse_status_line(status_line).ok_or(ParseError {
        kind: ParseErrorKind::InvalidStatusLine,
        offset: 0,
    })?;

    let mut headers: Vec<Header> = Vec::new();
    for line in lines {
        if line.starts_with(' ') || line.starts_with('\t') {
            // obs-fold continues the previous header value
            if let Some(last) = headers.last_mut() {
                last.value.push(' ');
                last.value.push_str(line.trim());
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        headers.push(Header::new(name, value.trim()));
    }

    Ok(Head {
        status,
        reason,
        headers,
    })
}

fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    let status = code.parse::<u16>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((status, reason))
}

fn read_length(
    buffer: &[u8],
    body_start: usize,
    length: usize,
    limits: Limits,
    eof: bool,
) -> Result<Option<Vec<u8>>, ParseError> {
    if length > limits.max_body_bytes {
        return Err(ParseError {
            kind: ParseErrorKind::BodyTooLarge,
            offset: body_start,
        });
    }
    let end = body_start + length;
    if buffer.len() >= end {
        Ok(Some(buffer[body_start..end].to_vec()))
    } else {
        incomplete(buffer, eof)
    }
}

fn read_until_close(
    buffer: &[u8],
    body_start: usize,
    limits: Limits,
    eof: bool,
) -> Result<Option<Vec<u8>>, ParseError> {
    if buffer.len() - body_start > limits.max_body_bytes {
        return Err(ParseError {
            kind: ParseErrorKind::BodyTooLarge,
            offset: body_start,
        });
    }
    if eof {
        Ok(Some(buffer[body_start..].to_vec()))
    } else {
        Ok(None)
    }
}

/// Chunked body decoding state, kept across pushes so each byte is decoded once.
#[derive(Debug, Default)]
struct ChunkedBody {
    cursor: usize,
    body: Vec<u8>,
    in_trailers: bool,
}

impl ChunkedBody {
    fn starting_at(cursor: usize) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    fn advance(
        &mut self,
        buffer: &[u8],
        limits: Limits,
        eof: bool,
    ) -> Result<Option<Vec<u8>>, ParseError> {
        loop {
            let Some(line_end) = find_subsequence(buffer, CRLF, self.cursor) else {
                if self.in_trailers && eof {
                    return Ok(Some(std::mem::take(&mut self.body)));
                }
                return incomplete(buffer, eof);
            };

            if self.in_trailers {
                // Trailer section, terminated by an empty line.
                let empty = line_end == self.cursor;
                self.cursor = line_end + CRLF.len();
                if empty {
                    return Ok(Some(std::mem::take(&mut self.body)));
                }
                continue;
            }

            let size = parse_chunk_size(&buffer[self.cursor..line_end], self.cursor)?;
            let data_start = line_end + CRLF.len();
            if size == 0 {
                self.cursor = data_start;
                self.in_trailers = true;
                continue;
            }

            if size > limits.max_body_bytes.saturating_sub(self.body.len()) {
                return Err(ParseError {
                    kind: ParseErrorKind::BodyTooLarge,
                    offset: self.cursor,
                });
            }
            let Some(frame_end) = data_start
                .checked_add(size)
                .and_then(|end| end.checked_add(CRLF.len()))
            else {
                return Err(ParseError {
                    kind: ParseErrorKind::InvalidChunkSize,
                    offset: self.cursor,
                });
            };
            if frame_end > buffer.len() {
                return incomplete(buffer, eof);
            }

            let data_end = frame_end - CRLF.len();
            if &buffer[data_end..frame_end] != CRLF {
                return Err(ParseError {
                    kind: ParseErrorKind::InvalidChunkTerminator,
                    offset: data_end,
                });
            }
            self.body.extend_from_slice(&buffer[data_start..data_end]);
            self.cursor = frame_end;
        }
    }
}

fn parse_chunk_size(line: &[u8], offset: usize) -> Result<usize, ParseError> {
    let invalid = || ParseError {
        kind: ParseErrorKind::InvalidChunkSize,
        offset,
    };
    let line = std::str::from_utf8(line).map_err(|_| invalid())?;
    let size_text = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size_text, 16).map_err(|_| invalid())
}

fn incomplete<T>(buffer: &[u8], eof: bool) -> Result<Option<T>, ParseError> {
    if eof {
        Err(ParseError {
            kind: ParseErrorKind::UnexpectedEof,
            offset: buffer.len(),
        })
    } else {
        Ok(None)
    }
}

fn find_subsequence(buffer: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= buffer.len() {
        return None;
    }
    buffer[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|index| from + index)
}
