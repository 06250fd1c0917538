use anyhow::Result;
use fleetmon::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let repo = Arc::new(
        metrics_repo::MetricsRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;
    // Sample rows are append-only with no retention policy; the store grows
    // without bound until pruned externally.
    tracing::warn!(
        path = %app_config.database.path,
        "no retention policy configured; sample store grows unbounded"
    );

    let sampler = collector::Sampler::new(collector::probe_reader());
    tracing::info!(reader = sampler.reader_name(), "counter reader selected");

    let host = app_config
        .sampling
        .host_label
        .clone()
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| "localhost".into());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            sampler,
            repo: repo.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            host,
            sample_interval_ms: app_config.sampling.interval_ms,
            cycle_timeout_ms: app_config.sampling.cycle_timeout_ms,
            stats_log_interval_secs: app_config.sampling.stats_log_interval_secs,
        },
    );

    let engine = Arc::new(query::QueryEngine::new(repo));
    let app = routes::app(engine);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    // Graceful shutdown: stop accepting, let in-flight queries drain, then
    // stop the worker at its next cycle boundary.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
