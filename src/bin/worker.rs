use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use order_pipeline::cache::OrderCache;
use order_pipeline::config::AppConfig;
use order_pipeline::health::HealthChecker;
use order_pipeline::messaging::WorkQueue;
use order_pipeline::metrics::{self, Metrics};
use order_pipeline::notifier::LogNotifier;
use order_pipeline::store::OrderStore;
use order_pipeline::worker::{OrderWorker, SimulatedFulfillment, WorkerConfig};
use order_pipeline::{bootstrap, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config.log_level);

    tracing::info!("🚀 Starting order worker");

    let metrics = Arc::new(Metrics::new()?);

    let backends = bootstrap::connect(&config).await?;
    let store: Arc<dyn OrderStore> = backends.store;
    let cache: Arc<dyn OrderCache> = backends.cache;
    let queue: Arc<dyn WorkQueue> = backends.queue;

    // Metrics and health on their own port
    let health = HealthChecker::new("order-worker", store.clone(), cache.clone()).with_queue(queue.clone());
    let metrics_server = actix_web::rt::spawn(metrics::start_metrics_server(
        metrics.clone(),
        health,
        config.metrics_port,
    ));

    let worker = OrderWorker::new(
        store,
        cache,
        queue,
        Arc::new(SimulatedFulfillment::new(config.processing_delay())),
        Arc::new(LogNotifier),
        metrics,
        WorkerConfig::from_app_config(&config),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    worker.run(shutdown).await;

    metrics_server.abort();
    tracing::info!("👋 Order worker exited");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM, only Ctrl-C will stop the worker");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown requested, draining current batch");
    shutdown.cancel();
}
