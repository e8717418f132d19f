//! Request client abstraction: trait, per-worker config template, factories.

pub mod http;
#[cfg(any(test, feature = "client-mock"))]
pub mod mock;

use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("status {0}")]
    Status(u16),
    #[error("other: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_builder() {
            Self::Other(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Immutable template each worker derives its own client from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    /// When set, every outcome is appended to this file.
    pub record_to: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            headers,
            timeout: Duration::from_secs(30),
            record_to: None,
        }
    }
}

impl ClientConfig {
    pub fn recording(&self, path: PathBuf) -> Self {
        Self {
            record_to: Some(path),
            ..self.clone()
        }
    }
}

/// Completed response. The body is held until `close` or drop.
#[derive(Debug)]
pub struct ResponseHandle {
    status: u16,
    body: Option<Bytes>,
}

impl ResponseHandle {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body: Some(body) }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Release the body. Safe to call more than once.
    pub fn close(&mut self) {
        self.body = None;
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }
}

#[async_trait::async_trait]
pub trait RequestClient: Send {
    async fn get(&mut self, url: &str) -> Result<ResponseHandle, ClientError>;
    async fn post(&mut self, url: &str, body: Bytes) -> Result<ResponseHandle, ClientError>;
    /// Number of outcomes that could not be written to the result sink.
    fn sink_errors(&self) -> u64 {
        0
    }
    /// Flush the result sink, if any.
    async fn finish(&mut self) {}
}

#[async_trait::async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self, config: ClientConfig) -> Result<Box<dyn RequestClient>, ClientError>;
}

pub struct HttpClientFactory;

#[async_trait::async_trait]
impl ClientFactory for HttpClientFactory {
    async fn build(&self, config: ClientConfig) -> Result<Box<dyn RequestClient>, ClientError> {
        Ok(Box::new(http::HttpClient::new(config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let mut r = ResponseHandle::new(200, Bytes::from_static(b"[]"));
        assert!(r.is_success());
        assert!(!r.is_closed());
        r.close();
        r.close();
        assert!(r.is_closed());
        assert!(r.body().is_none());
    }

    #[test]
    fn recording_keeps_template_headers() {
        let base = ClientConfig::default();
        let worker = base.recording(PathBuf::from("./log/col-scan-city-results.txt"));
        assert_eq!(worker.headers, base.headers);
        assert!(base.record_to.is_none());
        assert!(worker.record_to.is_some());
    }

    #[test]
    fn status_range() {
        assert!(!ResponseHandle::new(500, Bytes::new()).is_success());
        assert!(!ResponseHandle::new(199, Bytes::new()).is_success());
        assert!(ResponseHandle::new(204, Bytes::new()).is_success());
    }
}
