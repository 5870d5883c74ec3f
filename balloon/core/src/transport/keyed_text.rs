//! Keyed-Text Messages
//!
//! The grammar shared by the control channel (`SORAKADO/1.0`) and the session
//! channel (`SSTP/1.1`):
//!
//! ```text
//! <METHOD> <VERSION>\r\n
//! <Key>: <Value>\r\n      (zero or more, order preserved)
//! \r\n
//! ```
//!
//! Responses replace the start line with `<VERSION> <STATUS> <REASON>`.
//! Positional fields are ordinary headers whose names carry an index
//! (`Argument0`, `Reference3`, ...).

use std::fmt;

use thiserror::Error;

/// Keyed-text grammar violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Message had no start line
    #[error("Empty message")]
    Empty,

    /// Start line did not have the expected shape
    #[error("Malformed start line: {0:?}")]
    MalformedStartLine(String),

    /// Header line without a `: ` separator
    #[error("Malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Status code was not a number
    #[error("Invalid status code: {0:?}")]
    InvalidStatus(String),
}

fn header_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .take_while(|line| !line.is_empty())
}

fn parse_header(line: &str) -> Result<(String, String), ProtocolError> {
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
    let value = value.strip_prefix(' ').unwrap_or(value);
    Ok((key.to_string(), value.to_string()))
}

fn find<'a>(headers: &'a [(String, String)], key: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &[(String, String)]) -> fmt::Result {
    for (key, value) in headers {
        write!(f, "{key}: {value}\r\n")?;
    }
    write!(f, "\r\n")
}

/// A keyed-text request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    method: String,
    version: String,
    headers: Vec<(String, String)>,
}

impl RequestMessage {
    /// Create a request with no headers
    pub fn new(method: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            version: version.into(),
            headers: Vec::new(),
        }
    }

    /// Builder-style header append
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(key, value);
        self
    }

    /// Append a header, keeping insertion order
    pub fn push_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.push((key.into(), value.into()));
    }

    /// Append `{prefix}0`, `{prefix}1`, ... for each value
    pub fn push_indexed<S: AsRef<str>>(&mut self, prefix: &str, values: &[S]) {
        for (i, value) in values.iter().enumerate() {
            self.push_header(format!("{prefix}{i}"), value.as_ref());
        }
    }

    /// Request method (`EXECUTE`, `NOTIFY`, ...)
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Protocol version token
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// First value for `key`
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        find(&self.headers, key)
    }

    /// All headers in wire order
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Positional fields `{prefix}0..` up to the first missing index
    #[must_use]
    pub fn indexed(&self, prefix: &str) -> Vec<String> {
        (0..)
            .map_while(|i| self.header(&format!("{prefix}{i}")).map(str::to_string))
            .collect()
    }

    /// Parse a request
    ///
    /// Accepts both `\r\n` and bare `\n` line endings. Everything after the
    /// blank terminator line is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the start line or a header is malformed.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut lines = header_lines(text);
        let start = lines.next().ok_or(ProtocolError::Empty)?;
        let (method, version) = start
            .split_once(' ')
            .filter(|(m, v)| !m.is_empty() && !v.is_empty())
            .ok_or_else(|| ProtocolError::MalformedStartLine(start.to_string()))?;

        let headers = lines.map(parse_header).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            method: method.to_string(),
            version: version.trim().to_string(),
            headers,
        })
    }
}

impl fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\r\n", self.method, self.version)?;
        write_headers(f, &self.headers)
    }
}

/// A keyed-text response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    version: String,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl ResponseMessage {
    /// Create a response with no headers
    pub fn new(version: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            status,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    /// Builder-style header append
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Numeric status code
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Protocol version token
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// First value for `key`
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        find(&self.headers, key)
    }

    /// Parse a response
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the status line or a header is malformed.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut lines = header_lines(text);
        let start = lines.next().ok_or(ProtocolError::Empty)?;

        let mut parts = start.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        let status = parts
            .next()
            .ok_or_else(|| ProtocolError::MalformedStartLine(start.to_string()))?;
        let reason = parts.next().unwrap_or_default();
        if version.is_empty() {
            return Err(ProtocolError::MalformedStartLine(start.to_string()));
        }
        let status = status
            .parse::<u16>()
            .map_err(|_| ProtocolError::InvalidStatus(status.to_string()))?;

        let headers = lines.map(parse_header).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: version.to_string(),
            status,
            reason: reason.to_string(),
            headers,
        })
    }
}

impl fmt::Display for ResponseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}\r\n", self.version, self.status, self.reason)?;
        write_headers(f, &self.headers)
    }
}
