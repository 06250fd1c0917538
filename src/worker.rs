// Background sampling worker: one time-bounded cycle per tick, fixed sleep
// between cycles, never pipelined. Shutdown is honored at cycle boundaries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::{Duration, interval, timeout};

use crate::collector::{RawCounterSnapshot, Sampler};
use crate::error::MetricsError;
use crate::metrics_repo::MetricsRepo;

/// Sampler, store, and shutdown for the worker.
pub struct WorkerDeps {
    pub sampler: Sampler,
    pub repo: Arc<MetricsRepo>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    /// Host identifier stamped on every sample row.
    pub host: String,
    pub sample_interval_ms: u64,
    /// Budget for one cycle; an overrun is abandoned, the next proceeds.
    pub cycle_timeout_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        mut sampler,
        repo,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        host,
        sample_interval_ms,
        cycle_timeout_ms,
        stats_log_interval_secs,
    } = config;

    let cycle_budget = Duration::from_millis(cycle_timeout_ms);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Previous cumulative counter readings, one per host. Passed into
        // each sample() call so the Sampler itself stays stateless.
        let mut baselines: HashMap<String, RawCounterSnapshot> = HashMap::new();
        let mut samples_written_total: u64 = 0;
        let mut cycles_timed_out_total: u64 = 0;

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_ms);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let cycle = run_cycle(&mut sampler, &mut baselines, &repo, &host);
                    match timeout(cycle_budget, cycle).await {
                        Ok(Ok(rows)) => {
                            samples_written_total += u64::from(rows);
                            tracing::debug!(
                                operation = "sampling_cycle",
                                host = %host,
                                rows,
                                "cycle complete"
                            );
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, host = %host, "sampling cycle failed");
                        }
                        Err(_) => {
                            cycles_timed_out_total += 1;
                            tracing::warn!(
                                host = %host,
                                "{}",
                                MetricsError::CycleTimeout(cycle_timeout_ms)
                            );
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        samples_written_total,
                        cycles_timed_out_total,
                        tracked_baselines = baselines.len(),
                        "app stats"
                    );
                }
            }
        }
    })
}

/// One sampling pass for `host`: read counters against the previous baseline,
/// advance the baseline, persist whatever kinds produced values. The insert
/// is one transaction, so a timeout that abandons this future mid-write rolls
/// back whole.
async fn run_cycle(
    sampler: &mut Sampler,
    baselines: &mut HashMap<String, RawCounterSnapshot>,
    repo: &MetricsRepo,
    host: &str,
) -> Result<u32, MetricsError> {
    let (outcome, snapshot) = sampler.sample(baselines.get(host));
    // Advance the baseline before the insert: the counters were consumed
    // either way, and the next delta must span from this reading.
    baselines.insert(host.to_string(), snapshot);

    if outcome.is_empty() {
        tracing::debug!(host = %host, "no kinds produced a value this cycle");
        return Ok(0);
    }
    let timestamp_ms = chrono::Utc::now().timestamp_millis();
    repo.insert_sample(host, timestamp_ms, &outcome).await
}
