use crate::dimension::Dimension;
use crate::phase::Phase;
use std::time::{Duration, Instant};

/// Per-worker counters. Each worker owns its own collector, so no locking.
pub struct Stats {
    phase: Phase,
    dimension: Dimension,
    pub sent_count: u64,
    pub success_count: u64,
    pub http_error_count: u64,
    pub transport_error_count: u64,
    start_time: Instant,
}

impl Stats {
    pub fn new(phase: Phase, dimension: Dimension) -> Self {
        Self {
            phase,
            dimension,
            sent_count: 0,
            success_count: 0,
            http_error_count: 0,
            transport_error_count: 0,
            start_time: Instant::now(),
        }
    }

    /// Record a completed response
    pub fn record_response(&mut self, success: bool) {
        self.sent_count += 1;
        if success {
            self.success_count += 1;
        } else {
            self.http_error_count += 1;
        }
    }

    /// Record a request that never produced a response
    pub fn record_transport_error(&mut self) {
        self.sent_count += 1;
        self.transport_error_count += 1;
    }

    pub fn finish(self, sink_errors: u64) -> WorkerReport {
        WorkerReport {
            phase: self.phase,
            dimension: self.dimension,
            sent: self.sent_count,
            succeeded: self.success_count,
            http_errors: self.http_error_count,
            transport_errors: self.transport_error_count,
            sink_errors,
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub phase: Phase,
    pub dimension: Dimension,
    pub sent: u64,
    pub succeeded: u64,
    pub http_errors: u64,
    pub transport_errors: u64,
    pub sink_errors: u64,
    pub elapsed: Duration,
}

impl WorkerReport {
    /// Requests per second over the worker's lifetime
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.sent as f64 / secs
        } else {
            0.0
        }
    }

    pub fn to_csv_row(&self, run_id: &str) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{:.2}",
            run_id,
            self.phase,
            self.dimension,
            self.sent,
            self.succeeded,
            self.http_errors,
            self.transport_errors,
            self.sink_errors,
            self.elapsed.as_millis(),
            self.throughput()
        )
    }

    pub fn csv_header() -> &'static str {
        "run_id,phase,dimension,sent,succeeded,http_errors,transport_errors,sink_errors,elapsed_ms,throughput"
    }
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl PhaseReport {
    pub fn total_sent(&self) -> u64 {
        self.workers.iter().map(|w| w.sent).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.workers.iter().map(|w| w.transport_errors).sum()
    }

    pub fn worker(&self, dimension: Dimension) -> Option<&WorkerReport> {
        self.workers.iter().find(|w| w.dimension == dimension)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub health_ok: bool,
    pub phases: Vec<PhaseReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn csv_rows(&self) -> Vec<String> {
        self.phases
            .iter()
            .flat_map(|p| p.workers.iter().map(|w| w.to_csv_row(&self.run_id)))
            .collect()
    }
}
