use crate::client::{ClientConfig, ClientFactory, RequestClient};
use crate::config::FailurePolicy;
use crate::dataset::Dataset;
use crate::dimension::Dimension;
use crate::error::BenchError;
use crate::metrics::stats::{PhaseReport, Stats, WorkerReport};
use crate::phase::Phase;
use crate::query::build_url;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One (phase, dimension) request sequence.
#[derive(Clone, Debug)]
pub struct WorkerTask {
    pub phase: Phase,
    pub dimension: Dimension,
    pub dataset: Arc<Dataset>,
    pub base_url: String,
}

/// Issue one GET per dataset row, strictly in row order.
///
/// The response is closed on every path. Transport failures either abort
/// the worker or are counted, depending on `policy`; non-2xx responses are
/// only counted.
pub async fn run_dimension(
    task: &WorkerTask,
    client: &mut dyn RequestClient,
    policy: FailurePolicy,
) -> Result<WorkerReport, BenchError> {
    let mut stats = Stats::new(task.phase, task.dimension);
    let fixed = task.phase.fixed_params(task.dimension);
    debug!(
        phase = %task.phase,
        dimension = %task.dimension,
        rows = task.dataset.len(),
        "Worker started"
    );

    for (seq, row) in task.dataset.rows().iter().enumerate() {
        let mut params = task
            .dimension
            .params_for(row)
            .ok_or_else(|| BenchError::Dataset {
                path: PathBuf::from(task.dimension.default_file()),
                reason: format!("row {} does not match {} mapping", seq, task.dimension),
            })?;
        params.extend(fixed.iter().cloned());
        let url = build_url(&task.base_url, &params)?;

        match client.get(&url).await {
            Ok(mut res) => {
                stats.record_response(res.is_success());
                res.close();
            }
            Err(source) => {
                stats.record_transport_error();
                match policy {
                    FailurePolicy::AbortOnFirstError => {
                        client.finish().await;
                        return Err(BenchError::Request {
                            phase: task.phase,
                            dimension: task.dimension,
                            seq: seq as u64,
                            source,
                        });
                    }
                    FailurePolicy::CountAndContinue => {
                        warn!(
                            phase = %task.phase,
                            dimension = %task.dimension,
                            seq,
                            "Request failed: {}",
                            source
                        );
                    }
                }
            }
        }
    }

    client.finish().await;
    let report = stats.finish(client.sink_errors());
    if report.sink_errors > 0 {
        warn!(
            phase = %task.phase,
            dimension = %task.dimension,
            "{} result record(s) could not be written",
            report.sink_errors
        );
    }
    Ok(report)
}

/// Run every task of a phase concurrently and join them all.
///
/// Each task gets its own client, derived from `template` and recording to
/// the phase/dimension sink under `out_dir`. Returns only once every spawned
/// task has terminated. With `AbortOnFirstError`, the first failure cancels
/// the remaining tasks and is returned after they have wound down.
pub async fn fan_out(
    phase: Phase,
    tasks: Vec<WorkerTask>,
    factory: Arc<dyn ClientFactory>,
    template: &ClientConfig,
    out_dir: &Path,
    policy: FailurePolicy,
) -> Result<PhaseReport, BenchError> {
    let started = Instant::now();
    let spawned = tasks.len();
    let mut aborts = Vec::with_capacity(spawned);
    let mut pending = FuturesUnordered::new();

    for task in tasks {
        let config = template.recording(phase.sink_path(out_dir, task.dimension));
        let factory = Arc::clone(&factory);
        let dimension = task.dimension;
        let handle = tokio::spawn(async move {
            let mut client = factory.build(config).await.map_err(|e| BenchError::Worker {
                phase: task.phase,
                dimension: task.dimension,
                reason: format!("client setup: {}", e),
            })?;
            run_dimension(&task, client.as_mut(), policy).await
        });
        aborts.push(handle.abort_handle());
        pending.push(async move { (dimension, handle.await) });
    }

    let mut completed = 0usize;
    let mut reports = Vec::with_capacity(spawned);
    let mut first_error: Option<BenchError> = None;
    while let Some((dimension, joined)) = pending.next().await {
        completed += 1;
        let failure = match joined {
            Ok(Ok(report)) => {
                info!(
                    phase = %phase,
                    dimension = %dimension,
                    sent = report.sent,
                    "Worker finished in {:.2?}",
                    report.elapsed
                );
                reports.push(report);
                None
            }
            Ok(Err(e)) => Some(e),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(BenchError::Worker {
                phase,
                dimension,
                reason: e.to_string(),
            }),
        };
        if let Some(e) = failure {
            error!(phase = %phase, dimension = %dimension, "{}", e);
            if first_error.is_none() {
                for a in &aborts {
                    a.abort();
                }
                first_error = Some(e);
            }
        }
    }
    debug_assert_eq!(completed, spawned);

    if let Some(e) = first_error {
        return Err(e);
    }
    reports.sort_by_key(|r| r.dimension);
    Ok(PhaseReport {
        phase,
        workers: reports,
        elapsed: started.elapsed(),
    })
}
