//! reqwest-backed client with optional per-request outcome recording.

use super::{ClientConfig, ClientError, RequestClient, ResponseHandle};
use crate::output::{ResultRecord, ResultSink};
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Instant;
use tracing::{debug, warn};

pub struct HttpClient {
    inner: reqwest::Client,
    sink: Option<ResultSink>,
    seq: u64,
    sink_errors: u64,
}

impl HttpClient {
    pub async fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        for (k, v) in &config.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ClientError::Other(format!("header '{}': {}", k, e)))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| ClientError::Other(format!("header '{}': {}", k, e)))?;
            headers.insert(name, value);
        }
        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let mut sink_errors = 0;
        let sink = match &config.record_to {
            Some(path) => match ResultSink::create(path).await {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Cannot open result sink {}: {}", path.display(), e);
                    sink_errors += 1;
                    None
                }
            },
            None => None,
        };
        Ok(Self { inner, sink, seq: 0, sink_errors })
    }

    async fn execute(
        &mut self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<ResponseHandle, ClientError> {
        let seq = self.seq;
        self.seq += 1;

        let started = Instant::now();
        let mut req = self.inner.request(method.clone(), url);
        if let Some(b) = body {
            req = req.body(b);
        }
        let outcome = match req.send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                resp.bytes()
                    .await
                    .map(|b| ResponseHandle::new(status, b))
                    .map_err(ClientError::from)
            }
            Err(e) => Err(ClientError::from(e)),
        };
        let latency = started.elapsed();

        if let Some(sink) = self.sink.as_mut() {
            let record = ResultRecord {
                timestamp: chrono::Utc::now().to_rfc3339(),
                seq,
                method: if method == Method::POST { "POST" } else { "GET" },
                url: url.to_string(),
                status: outcome.as_ref().ok().map(|r| r.status()),
                ok: outcome.as_ref().map(|r| r.is_success()).unwrap_or(false),
                latency_us: latency.as_micros() as u64,
                bytes: outcome
                    .as_ref()
                    .ok()
                    .and_then(|r| r.body())
                    .map(|b| b.len() as u64)
                    .unwrap_or(0),
                error: outcome.as_ref().err().map(|e| e.to_string()),
            };
            if let Err(e) = sink.write(&record).await {
                warn!("Result sink {} write failed: {}", sink.path().display(), e);
                self.sink_errors += 1;
            }
        }
        outcome
    }
}

#[async_trait::async_trait]
impl RequestClient for HttpClient {
    async fn get(&mut self, url: &str) -> Result<ResponseHandle, ClientError> {
        self.execute(Method::GET, url, None).await
    }

    async fn post(&mut self, url: &str, body: Bytes) -> Result<ResponseHandle, ClientError> {
        self.execute(Method::POST, url, Some(body)).await
    }

    fn sink_errors(&self) -> u64 {
        self.sink_errors
    }

    async fn finish(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            match sink.finish().await {
                Ok(()) => debug!(
                    "Wrote {} result record(s) to {}",
                    sink.written(),
                    sink.path().display()
                ),
                Err(e) => {
                    warn!("Result sink {} flush failed: {}", sink.path().display(), e);
                    self.sink_errors += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn invalid_header_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let cfg = ClientConfig { headers, ..ClientConfig::default() };
        assert!(matches!(HttpClient::new(cfg).await, Err(ClientError::Other(_))));
    }

    #[tokio::test]
    async fn connection_refused_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        // Free port with nothing listening on it
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        drop(l);

        let mut client = HttpClient::new(ClientConfig::default().recording(path.clone()))
            .await
            .unwrap();
        let err = client
            .get(&format!("http://127.0.0.1:{}/restaurants", port))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        client.finish().await;
        assert_eq!(client.sink_errors(), 0);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][5], "false");
    }
}
