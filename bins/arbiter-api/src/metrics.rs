// Prometheus metrics for the Arbiter API

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Once;
use tracing::error;

lazy_static! {
    // Global registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Submissions queued (counter with language label)
    pub static ref SUBMISSIONS_QUEUED: CounterVec = CounterVec::new(
        Opts::new("arbiter_submissions_queued_total", "Total number of submissions queued"),
        &["language"]
    )
    .expect("metric can be created");

    // Submissions rejected by validation
    pub static ref SUBMISSIONS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("arbiter_submissions_rejected_total", "Total submissions rejected due to validation"),
        &["reason"]
    )
    .expect("metric can be created");

    // Reports served, by overall status
    pub static ref REPORTS_SERVED: CounterVec = CounterVec::new(
        Opts::new("arbiter_reports_served_total", "Total submission reports returned to callers"),
        &["status"]
    )
    .expect("metric can be created");

    // Current submission queue depth
    pub static ref QUEUE_DEPTH: IntGauge = IntGauge::new(
        "arbiter_queue_depth",
        "Current number of queued submissions"
    )
    .expect("metric can be created");

    // API request counter
    pub static ref API_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("arbiter_api_requests_total", "Total API requests"),
        &["endpoint", "method", "status"]
    )
    .expect("metric can be created");
}

static INIT: Once = Once::new();

/// Register all collectors; safe to call more than once
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(SUBMISSIONS_QUEUED.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(SUBMISSIONS_REJECTED.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(REPORTS_SERVED.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(QUEUE_DEPTH.clone()))
            .expect("collector can be registered");

        REGISTRY
            .register(Box::new(API_REQUESTS.clone()))
            .expect("collector can be registered");
    });
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_submission_queued(language: &str) {
    SUBMISSIONS_QUEUED.with_label_values(&[language]).inc();
}

pub fn record_submission_rejected(reason: &str) {
    SUBMISSIONS_REJECTED.with_label_values(&[reason]).inc();
}

pub fn record_report_served(status: &str) {
    REPORTS_SERVED.with_label_values(&[status]).inc();
}

pub fn record_request(endpoint: &str, method: &str, status: u16) {
    API_REQUESTS
        .with_label_values(&[endpoint, method, &status.to_string()])
        .inc();
}

/// Refresh the queue depth gauge from Redis
pub async fn update_queue_depth(redis_conn: &mut redis::aio::ConnectionManager) {
    match arbiter_common::redis::queue_depth(redis_conn).await {
        Ok(depth) => QUEUE_DEPTH.set(depth),
        Err(e) => error!(error = %e, "Failed to read queue depth"),
    }
}
