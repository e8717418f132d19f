use crate::client::{ClientError, RequestClient};
use crate::error::BenchError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Payload instructing the backend to (re)load its dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallDirective {
    pub install: String,
    pub load_indexes: bool,
    pub document_count: u64,
}

impl InstallDirective {
    pub fn full(load_indexes: bool, document_count: u64) -> Self {
        Self {
            install: "full".to_string(),
            load_indexes,
            document_count,
        }
    }
}

/// Best-effort connectivity check; never fails the run.
pub async fn health_check(client: &mut dyn RequestClient, url: &str) -> bool {
    match client.get(url).await {
        Ok(mut res) => {
            let ok = res.is_success();
            res.close();
            if ok {
                info!("Successfully connected to benchmarking service...");
            } else {
                warn!("Benchmarking service answered ping with status {}", res.status());
            }
            ok
        }
        Err(e) => {
            warn!("Cannot connect to benchmarking service: {}", e);
            false
        }
    }
}

/// POST the directive; transport errors and non-2xx statuses are fatal.
pub async fn install(
    client: &mut dyn RequestClient,
    url: &str,
    directive: &InstallDirective,
) -> Result<(), BenchError> {
    let fail = |reason: String| BenchError::Install {
        load_indexes: directive.load_indexes,
        reason,
    };
    let body = serde_json::to_vec(directive).map_err(|e| fail(e.to_string()))?;
    info!(
        load_indexes = directive.load_indexes,
        document_count = directive.document_count,
        "Starting data installation..."
    );
    let mut res = client
        .post(url, Bytes::from(body))
        .await
        .map_err(|e| fail(e.to_string()))?;
    let status = res.status();
    res.close();
    if !(200..300).contains(&status) {
        return Err(fail(ClientError::Status(status).to_string()));
    }
    info!("Data installation finished");
    Ok(())
}
