use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;

use order_pipeline::auth::{StaticTokenVerifier, TokenVerifier};
use order_pipeline::cache::OrderCache;
use order_pipeline::config::AppConfig;
use order_pipeline::health::HealthChecker;
use order_pipeline::messaging::WorkQueue;
use order_pipeline::metrics::{self, Metrics};
use order_pipeline::service::{OrderProducer, OrderReader};
use order_pipeline::store::OrderStore;
use order_pipeline::{api, bootstrap, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config.log_level);

    tracing::info!("🚀 Starting order API");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Store, cache, queue ===
    let backends = bootstrap::connect(&config).await?;
    let store: Arc<dyn OrderStore> = backends.store;
    let cache: Arc<dyn OrderCache> = backends.cache;
    let queue: Arc<dyn WorkQueue> = backends.queue;

    // === 3. Identity ===
    let verifier = StaticTokenVerifier::from_pairs(&config.auth_tokens)?;
    if verifier.is_empty() {
        tracing::warn!("No auth tokens configured (ORDERS_AUTH_TOKENS); every request will be rejected");
    }
    let verifier: Arc<dyn TokenVerifier> = Arc::new(verifier);

    // === 4. Services ===
    let producer = web::Data::new(OrderProducer::new(
        store.clone(),
        queue.clone(),
        cache.clone(),
        metrics.clone(),
    ));
    let reader = web::Data::new(OrderReader::new(store.clone(), cache.clone(), metrics.clone()));
    let health = HealthChecker::new("order-api", store, cache).with_queue(queue);

    // === 5. HTTP server ===
    tracing::info!("🌐 Listening on http://{}:{}", config.http_host, config.http_port);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::from(verifier.clone()))
            .app_data(producer.clone())
            .app_data(reader.clone())
            .app_data(web::Data::new(metrics.clone()))
            .app_data(web::Data::new(health.clone()))
            .configure(api::configure)
            .configure(metrics::configure_routes)
    })
    .bind((config.http_host.as_str(), config.http_port))?
    .run()
    .await?;

    tracing::info!("👋 Order API stopped");
    Ok(())
}
