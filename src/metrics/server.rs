use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;
use crate::health::HealthChecker;

/// Register `/metrics` and `/health`. Expects `web::Data<Arc<Metrics>>` and
/// `web::Data<HealthChecker>` in app data.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

/// Serve metrics and health on their own port (used by the worker process).
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    health: HealthChecker,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(metrics.clone()))
            .app_data(web::Data::new(health.clone()))
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .disable_signals()
    .run()
    .await
}

async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(health: web::Data<HealthChecker>) -> impl Responder {
    let report = health.check().await;
    let body = serde_json::json!({
        "service": health.service(),
        "status": report.status,
        "components": report.components,
    });

    if report.status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryOrderCache;
    use crate::store::InMemoryOrderStore;
    use actix_web::test;

    fn app_parts() -> (Arc<Metrics>, HealthChecker, Arc<InMemoryOrderStore>) {
        let store = Arc::new(InMemoryOrderStore::new());
        let health = HealthChecker::new("test", store.clone(), Arc::new(InMemoryOrderCache::default()));
        (Arc::new(Metrics::new().unwrap()), health, store)
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_counters() {
        let (metrics, health, _) = app_parts();
        metrics.orders_created.inc();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(metrics))
                .app_data(web::Data::new(health))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("orders_created_total 1"));
    }

    #[actix_web::test]
    async fn test_health_reports_store_outage() {
        let (metrics, health, store) = app_parts();
        store.set_fail_reads(true);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(metrics))
                .app_data(web::Data::new(health))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
