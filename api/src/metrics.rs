use once_cell::sync::Lazy;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

macro_rules! counter_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| IntCounterVec::new(opts!($name, $help), $labels).unwrap())
    };
}
macro_rules! histogram_vec {
    ($name:expr, $help:expr, $labels:expr) => {
        Lazy::new(|| {
            HistogramVec::new(HistogramOpts::new($name, $help).buckets(LATENCY_BUCKETS.to_vec()), $labels)
                .unwrap()
        })
    };
}
macro_rules! counter {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntCounter::new($name, $help).unwrap())
    };
}
macro_rules! gauge {
    ($name:expr, $help:expr) => {
        Lazy::new(|| IntGauge::new($name, $help).unwrap())
    };
}

const LATENCY_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// ── HTTP ────────────────────────────────────────────────────────────────────
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> =
    counter_vec!("http_requests_total", "Total HTTP requests", &["method", "path", "status"]);
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> =
    histogram_vec!("http_request_duration_seconds", "HTTP request latency", &["method", "path"]);
pub static HTTP_IN_FLIGHT: Lazy<IntGauge> = gauge!("http_requests_in_flight", "In-flight HTTP requests");

// ── Queries ─────────────────────────────────────────────────────────────────
pub static QUERIES_CREATED: Lazy<IntCounter> = counter!("queries_created_total", "Queries stored");
pub static QUERIES_DELETED: Lazy<IntCounter> =
    counter!("queries_deleted_total", "Delete requests that removed a query");
pub static QUERY_VALIDATION_FAILURES: Lazy<IntCounterVec> = counter_vec!(
    "query_validation_failures_total",
    "Submitted queries rejected by field validation",
    &["field"]
);
pub static STORE_ERRORS: Lazy<IntCounterVec> =
    counter_vec!("store_errors_total", "Store failures by operation", &["operation"]);

// ── Gates ───────────────────────────────────────────────────────────────────
pub static RATE_LIMITED_TOTAL: Lazy<IntCounter> =
    counter!("rate_limited_total", "Requests rejected by the rate limiter");
pub static AUTH_REJECTED_TOTAL: Lazy<IntCounter> =
    counter!("auth_rejected_total", "Requests rejected by the auth gate");

pub fn register_all(r: &Registry) -> prometheus::Result<()> {
    r.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    r.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    r.register(Box::new(HTTP_IN_FLIGHT.clone()))?;
    r.register(Box::new(QUERIES_CREATED.clone()))?;
    r.register(Box::new(QUERIES_DELETED.clone()))?;
    r.register(Box::new(QUERY_VALIDATION_FAILURES.clone()))?;
    r.register(Box::new(STORE_ERRORS.clone()))?;
    r.register(Box::new(RATE_LIMITED_TOTAL.clone()))?;
    r.register(Box::new(AUTH_REJECTED_TOTAL.clone()))?;
    Ok(())
}

pub fn observe_http(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
