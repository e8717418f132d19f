use crate::client::{ClientConfig, ClientFactory};
use crate::config::BenchConfig;
use crate::dataset::DatasetSet;
use crate::error::BenchError;
use crate::gate::OperatorGate;
use crate::install::{self, InstallDirective};
use crate::metrics::stats::{RunReport, WorkerReport};
use crate::output::write_csv_file;
use crate::phase::Phase;
use crate::roles::worker::{WorkerTask, fan_out};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// A single benchmark execution: health check, installs and phases in order.
pub struct BenchmarkRun {
    config: BenchConfig,
    datasets: DatasetSet,
    gate: Box<dyn OperatorGate>,
    factory: Arc<dyn ClientFactory>,
}

impl BenchmarkRun {
    pub fn new(
        config: BenchConfig,
        datasets: DatasetSet,
        gate: Box<dyn OperatorGate>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self { config, datasets, gate, factory }
    }

    fn client_template(&self) -> ClientConfig {
        ClientConfig {
            headers: self.config.headers.clone(),
            timeout: Duration::from_millis(self.config.request_timeout_ms),
            record_to: None,
        }
    }

    fn tasks_for(&self, phase: Phase) -> Result<Vec<WorkerTask>, BenchError> {
        let base_url = phase.base_url(&self.config.endpoints).to_string();
        self.config
            .dimensions
            .iter()
            .map(|d| {
                let dataset = self.datasets.get(*d).ok_or_else(|| {
                    BenchError::Config(format!("no dataset loaded for {}", d))
                })?;
                Ok(WorkerTask {
                    phase,
                    dimension: *d,
                    dataset,
                    base_url: base_url.clone(),
                })
            })
            .collect()
    }

    /// Execute the run. Any fatal error aborts before the next step starts.
    pub async fn run(mut self) -> Result<RunReport, BenchError> {
        let started = Instant::now();
        let template = self.client_template();
        let endpoints = self.config.endpoints.clone();

        // Worker tasks are resolved up front so a missing dataset fails
        // before the backend is touched.
        let mut plan = Vec::new();
        for phase in Phase::ALL {
            if self.config.phases.contains(&phase) {
                plan.push((phase, self.tasks_for(phase)?));
            }
        }

        let mut control = self
            .factory
            .build(template.clone())
            .await
            .map_err(|e| BenchError::Config(format!("control client: {}", e)))?;
        let health_ok = install::health_check(control.as_mut(), &endpoints.ping_url).await;
        info!(run_id = %self.config.run_id, "Starting benchmark...");

        let mut installed: Option<bool> = None;
        let mut phases = Vec::with_capacity(plan.len());
        for (phase, tasks) in plan {
            // Gate comes before the install: the backend reloads only after confirmation.
            self.gate.wait(&format!("{} benchmark", phase)).await?;

            let load_indexes = phase.requires_indexes();
            if installed != Some(load_indexes) {
                let directive = InstallDirective::full(load_indexes, self.config.document_count);
                install::install(control.as_mut(), &endpoints.install_url, &directive).await?;
                installed = Some(load_indexes);
            }

            info!("Starting {} benchmark...", phase);
            let report = fan_out(
                phase,
                tasks,
                Arc::clone(&self.factory),
                &template,
                &self.config.out_dir,
                self.config.failure_policy,
            )
            .await?;
            info!(
                phase = %phase,
                sent = report.total_sent(),
                failures = report.total_failures(),
                "Finished {} benchmark in {:.2?}",
                phase,
                report.elapsed
            );
            phases.push(report);
        }

        control.finish().await;
        info!("Benchmark finished");
        Ok(RunReport {
            run_id: self.config.run_id.clone(),
            health_ok,
            phases,
            elapsed: started.elapsed(),
        })
    }
}

/// Write the per-worker summary next to the result sinks.
pub async fn write_summary(report: &RunReport, out_dir: &Path) -> Result<PathBuf, BenchError> {
    let path = out_dir.join(format!("run-{}-summary.csv", report.run_id));
    write_csv_file(&path, WorkerReport::csv_header(), &report.csv_rows()).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBackend;
    use crate::config::{Endpoints, FailurePolicy};
    use crate::dataset::Dataset;
    use crate::dimension::Dimension;
    use crate::gate::AutoGate;

    fn config(out_dir: &Path) -> BenchConfig {
        BenchConfig {
            run_id: "t".into(),
            endpoints: Endpoints {
                ping_url: "http://svc/ping".into(),
                install_url: "http://svc/install".into(),
                scan_url: "http://svc/restaurants".into(),
                search_url: "http://svc/search".into(),
            },
            out_dir: out_dir.to_path_buf(),
            ..BenchConfig::default()
        }
    }

    fn datasets(n: usize) -> DatasetSet {
        let mut set = DatasetSet::default();
        for d in Dimension::ALL {
            let rows = (0..n).map(|i| vec![format!("{}{}", d.slug(), i), "x".into()]).collect();
            set.insert(Dataset::from_rows(d, rows).unwrap());
        }
        set
    }

    fn installs(backend: &MockBackend) -> Vec<bool> {
        backend
            .requests()
            .iter()
            .filter(|r| r.method == "POST")
            .map(|r| {
                let d: InstallDirective = serde_json::from_slice(r.body.as_ref().unwrap()).unwrap();
                d.load_indexes
            })
            .collect()
    }

    #[tokio::test]
    async fn index_and_search_share_one_install() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let run = BenchmarkRun::new(
            config(dir.path()),
            datasets(2),
            Box::new(AutoGate),
            Arc::new(backend.clone()),
        );
        let report = run.run().await.unwrap();
        assert!(report.health_ok);
        assert_eq!(report.phases.len(), 3);
        assert_eq!(installs(&backend), vec![false, true]);
        // control client + 5 workers per phase
        assert_eq!(backend.clients_built(), 16);
        let search = report.phase(Phase::Search).unwrap();
        assert_eq!(search.total_sent(), 10);
    }

    #[tokio::test]
    async fn unreachable_ping_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        backend.fail_on("/ping");
        let report = BenchmarkRun::new(
            config(dir.path()),
            datasets(1),
            Box::new(AutoGate),
            Arc::new(backend.clone()),
        )
        .run()
        .await
        .unwrap();
        assert!(!report.health_ok);
        assert_eq!(report.phases.len(), 3);
    }

    #[tokio::test]
    async fn index_only_run_installs_with_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let mut cfg = config(dir.path());
        cfg.phases = vec![Phase::Index];
        BenchmarkRun::new(cfg, datasets(1), Box::new(AutoGate), Arc::new(backend.clone()))
            .run()
            .await
            .unwrap();
        assert_eq!(installs(&backend), vec![true]);
    }

    #[tokio::test]
    async fn missing_dataset_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let mut set = DatasetSet::default();
        set.insert(Dataset::from_rows(Dimension::City, vec![vec!["Paris".into()]]).unwrap());
        let err = BenchmarkRun::new(config(dir.path()), set, Box::new(AutoGate), Arc::new(backend.clone()))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn request_failure_aborts_later_phases() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        backend.fail_on("city=city0");
        let mut cfg = config(dir.path());
        cfg.failure_policy = FailurePolicy::AbortOnFirstError;
        let err = BenchmarkRun::new(cfg, datasets(3), Box::new(AutoGate), Arc::new(backend.clone()))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Request { phase: Phase::Scan, .. }));
        assert_eq!(installs(&backend), vec![false]);
    }

    #[tokio::test]
    async fn summary_lists_every_worker() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let report = BenchmarkRun::new(
            config(dir.path()),
            datasets(1),
            Box::new(AutoGate),
            Arc::new(backend),
        )
        .run()
        .await
        .unwrap();
        let path = write_summary(&report, dir.path()).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 1 + 15);
    }
}
