use crate::client::ClientError;
use crate::dimension::Dimension;
use crate::phase::Phase;
use std::path::PathBuf;

/// Fatal conditions that abort a benchmark run.
///
/// Connectivity warnings and sink-write failures never surface here; they are
/// logged where they happen and the run continues.
#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("config: {0}")]
    Config(String),
    #[error("dataset {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },
    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("install (loadIndexes={load_indexes}): {reason}")]
    Install { load_indexes: bool, reason: String },
    #[error("{phase}/{dimension} request {seq} failed: {source}")]
    Request {
        phase: Phase,
        dimension: Dimension,
        seq: u64,
        #[source]
        source: ClientError,
    },
    #[error("gate: {0}")]
    Gate(String),
    #[error("worker {phase}/{dimension}: {reason}")]
    Worker {
        phase: Phase,
        dimension: Dimension,
        reason: String,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Setup failures happen before any benchmark request was issued.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Dataset { .. } | Self::InvalidUrl { .. } | Self::Install { .. }
        )
    }
}
