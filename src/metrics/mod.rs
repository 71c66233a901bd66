// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::{configure_routes, start_metrics_server};

// ============================================================================
// Metrics Module - Prometheus metrics for the order pipeline
// ============================================================================
//
// Covers:
// - Producer: orders created, orders left pending by a failed enqueue
// - Reader: cache hits / misses / errors
// - Worker: jobs by outcome, job duration, queue transport errors
// - Notifier and cache write failures
//
// Scraped via /metrics on the API and on the worker's metrics port.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Producer
    pub orders_created: IntCounter,
    pub orders_orphaned: IntCounter,

    // Cache
    pub cache_lookups: IntCounterVec,
    pub cache_write_failures: IntCounterVec,

    // Worker
    pub jobs_total: IntCounterVec,
    pub job_duration: Histogram,
    pub queue_receive_errors: IntCounter,
    pub notifier_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders persisted by the producer")?;
        registry.register(Box::new(orders_created.clone()))?;

        let orders_orphaned = IntCounter::new(
            "orders_orphaned_total",
            "Orders persisted as pending whose processing job could not be enqueued",
        )?;
        registry.register(Box::new(orders_orphaned.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("order_cache_lookups_total", "Cache lookups on the read path"),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let cache_write_failures = IntCounterVec::new(
            Opts::new("order_cache_write_failures_total", "Cache writes that failed and were ignored"),
            &["operation"],
        )?;
        registry.register(Box::new(cache_write_failures.clone()))?;

        let jobs_total = IntCounterVec::new(
            Opts::new("worker_jobs_total", "Queue messages handled by the worker"),
            &["outcome"],
        )?;
        registry.register(Box::new(jobs_total.clone()))?;

        let job_duration = Histogram::with_opts(
            HistogramOpts::new("worker_job_duration_seconds", "Time from receive to acknowledgment")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let queue_receive_errors =
            IntCounter::new("worker_queue_receive_errors_total", "Failed queue receive calls")?;
        registry.register(Box::new(queue_receive_errors.clone()))?;

        let notifier_failures =
            IntCounter::new("worker_notifier_failures_total", "Confirmation notifications that failed")?;
        registry.register(Box::new(notifier_failures.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            orders_orphaned,
            cache_lookups,
            cache_write_failures,
            jobs_total,
            job_duration,
            queue_receive_errors,
            notifier_failures,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_cache_lookup(&self, result: &str) {
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn record_cache_write_failure(&self, operation: &str) {
        self.cache_write_failures.with_label_values(&[operation]).inc();
    }

    pub fn record_job(&self, outcome: &str, duration_secs: f64) {
        self.jobs_total.with_label_values(&[outcome]).inc();
        self.job_duration.observe(duration_secs);
    }
}
