//! HTTP executor contract.
//!
//! The data path never talks to a concrete HTTP stack directly; it goes
//! through [`HttpExecutor`], which performs exactly one blocking call and
//! reports what came back.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// What a single HTTP call produced.
///
/// `status == 0` means no response was received at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpOutcome {
    pub status: u16,
    pub body: Bytes,
    pub headers: Vec<(String, String)>,
}

impl HttpOutcome {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup; the first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Response body as lossy UTF-8, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The call never produced an HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Other(String),
    /// The request could not be built, e.g. a malformed header. Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

/// Performs one blocking HTTP call with a per-call timeout. Implementations
/// must not retry; retry policy lives above this trait.
pub trait HttpExecutor {
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError>;

    fn put(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError>;

    fn post(
        &self,
        url: &str,
        body: Bytes,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError>;

    fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpOutcome, TransportError>;
}

/// Route a call to the executor method matching `method`. The body is
/// dropped for GET and DELETE.
pub fn dispatch<E: HttpExecutor + ?Sized>(
    executor: &E,
    method: HttpMethod,
    url: &str,
    body: Bytes,
    headers: &[(String, String)],
    timeout: Duration,
) -> Result<HttpOutcome, TransportError> {
    match method {
        HttpMethod::Get => executor.get(url, headers, timeout),
        HttpMethod::Put => executor.put(url, body, headers, timeout),
        HttpMethod::Post => executor.post(url, body, headers, timeout),
        HttpMethod::Delete => executor.delete(url, headers, timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_is_terminal() {
        assert!(!TransportError::InvalidRequest("bad header".into()).is_retryable());
        assert!(TransportError::Connect("refused".into()).is_retryable());
        assert!(TransportError::Timeout("deadline".into()).is_retryable());
        assert!(TransportError::Other("reset".into()).is_retryable());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("PUT".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert!("PATCH".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_method_serde() {
        let m: HttpMethod = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(m, HttpMethod::Post);
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), "\"GET\"");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let outcome = HttpOutcome::new(200)
            .with_header("etag", "\"abc\"")
            .with_header("Content-Length", "3");
        assert_eq!(outcome.header("ETag"), Some("\"abc\""));
        assert_eq!(outcome.header("content-length"), Some("3"));
        assert_eq!(outcome.header("x-missing"), None);
    }
}
