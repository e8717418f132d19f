//! In-memory client (feature `client-mock`): scripted responses, request log.

use super::{ClientConfig, ClientError, ClientFactory, RequestClient, ResponseHandle};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct MockRequest {
    /// Global order across all clients sharing the backend.
    pub order: u64,
    pub method: &'static str,
    pub url: String,
    pub body: Option<Bytes>,
    pub sink: Option<PathBuf>,
}

#[derive(Default)]
struct MockState {
    next_order: u64,
    requests: Vec<MockRequest>,
    clients_built: usize,
    fail_on: Vec<String>,
    status_on: Vec<(String, u16)>,
    delay_on: Vec<(String, Duration)>,
}

/// Shared scripted backend. Rules match on URL substrings; the first match wins.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests whose URL contains `pattern` fail with a transport error.
    pub fn fail_on(&self, pattern: &str) -> &Self {
        self.lock().fail_on.push(pattern.to_string());
        self
    }

    pub fn status_on(&self, pattern: &str, status: u16) -> &Self {
        self.lock().status_on.push((pattern.to_string(), status));
        self
    }

    pub fn delay_on(&self, pattern: &str, delay: Duration) -> &Self {
        self.lock().delay_on.push((pattern.to_string(), delay));
        self
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.lock().requests.clone()
    }

    pub fn clients_built(&self) -> usize {
        self.lock().clients_built
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A test that panicked while holding the lock already failed
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn handle(
        &self,
        method: &'static str,
        url: &str,
        body: Option<Bytes>,
        sink: Option<PathBuf>,
    ) -> Result<ResponseHandle, ClientError> {
        let delay = self
            .lock()
            .delay_on
            .iter()
            .find(|(p, _)| url.contains(p.as_str()))
            .map(|(_, d)| *d);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let mut st = self.lock();
        let order = st.next_order;
        st.next_order += 1;
        st.requests.push(MockRequest {
            order,
            method,
            url: url.to_string(),
            body,
            sink,
        });
        if st.fail_on.iter().any(|p| url.contains(p.as_str())) {
            return Err(ClientError::Transport(format!("mock failure for {}", url)));
        }
        let status = st
            .status_on
            .iter()
            .find(|(p, _)| url.contains(p.as_str()))
            .map(|(_, s)| *s)
            .unwrap_or(200);
        Ok(ResponseHandle::new(status, Bytes::from_static(b"[]")))
    }
}

pub struct MockClient {
    backend: MockBackend,
    config: ClientConfig,
}

#[async_trait::async_trait]
impl RequestClient for MockClient {
    async fn get(&mut self, url: &str) -> Result<ResponseHandle, ClientError> {
        self.backend
            .handle("GET", url, None, self.config.record_to.clone())
            .await
    }

    async fn post(&mut self, url: &str, body: Bytes) -> Result<ResponseHandle, ClientError> {
        self.backend
            .handle("POST", url, Some(body), self.config.record_to.clone())
            .await
    }
}

#[async_trait::async_trait]
impl ClientFactory for MockBackend {
    async fn build(&self, config: ClientConfig) -> Result<Box<dyn RequestClient>, ClientError> {
        self.lock().clients_built += 1;
        Ok(Box::new(MockClient { backend: self.clone(), config }))
    }
}
