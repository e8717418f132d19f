//! Blocking confirmation points between benchmark steps.

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Wait for the operator to press Enter.
    Interactive,
    /// Proceed immediately.
    Auto,
}

#[async_trait::async_trait]
pub trait OperatorGate: Send {
    /// Block until the step named `next` may start.
    async fn wait(&mut self, next: &str) -> Result<(), BenchError>;
}

pub fn from_mode(mode: GateMode) -> Box<dyn OperatorGate> {
    match mode {
        GateMode::Interactive => Box::new(InteractiveGate::default()),
        GateMode::Auto => Box::new(AutoGate),
    }
}

pub struct AutoGate;

#[async_trait::async_trait]
impl OperatorGate for AutoGate {
    async fn wait(&mut self, next: &str) -> Result<(), BenchError> {
        info!("Proceeding to {}", next);
        Ok(())
    }
}

pub struct InteractiveGate {
    stdin: BufReader<tokio::io::Stdin>,
}

impl Default for InteractiveGate {
    fn default() -> Self {
        Self { stdin: BufReader::new(tokio::io::stdin()) }
    }
}

#[async_trait::async_trait]
impl OperatorGate for InteractiveGate {
    async fn wait(&mut self, next: &str) -> Result<(), BenchError> {
        info!("Press Enter to continue with {}...", next);
        let mut line = String::new();
        // EOF (closed stdin) counts as proceed
        self.stdin.read_line(&mut line).await?;
        Ok(())
    }
}

/// Released by an external trigger sending `()` on the paired channel.
pub struct ChannelGate {
    rx: flume::Receiver<()>,
}

impl ChannelGate {
    pub fn pair() -> (flume::Sender<()>, Self) {
        let (tx, rx) = flume::unbounded();
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl OperatorGate for ChannelGate {
    async fn wait(&mut self, next: &str) -> Result<(), BenchError> {
        info!("Waiting for external signal before {}", next);
        self.rx
            .recv_async()
            .await
            .map_err(|_| BenchError::Gate(format!("trigger dropped before {}", next)))
    }
}
