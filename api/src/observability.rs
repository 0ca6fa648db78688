use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use prometheus::Registry;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::metrics;

const DEFAULT_LOG_FILTER: &str = "contact_api=info,tower_http=info";

/// Process-wide logging and metrics, set up once at start and flushed at stop.
///
/// Every level goes to the console; ERROR events are additionally written as
/// JSON lines to a durable file.
pub struct Observability {
    pub registry: Registry,
    error_log: Arc<File>,
}

impl Observability {
    pub fn init(error_log_path: &Path) -> Result<Self> {
        let registry = Registry::new_custom(Some("contact".into()), None)?;
        metrics::register_all(&registry)?;

        let error_log = Arc::new(open_error_log(error_log_path)?);

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

        let error_file_layer = fmt::layer()
            .json()
            .with_writer(error_log.clone())
            .with_filter(LevelFilter::ERROR);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .with(error_file_layer)
            .try_init()
            .context("failed to install tracing subscriber")?;

        tracing::info!(
            error_log = %error_log_path.display(),
            "Observability stack initialized (console + error file + Prometheus)"
        );
        Ok(Self {
            registry,
            error_log,
        })
    }

    pub fn shutdown(&self) {
        if let Err(err) = self.error_log.sync_all() {
            tracing::warn!(error = %err, "failed to flush error log");
        }
        tracing::info!("Observability stack shut down");
    }
}

fn open_error_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open error log {}", path.display()))
}

/// Logs one line per request and feeds the HTTP metrics.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    metrics::HTTP_IN_FLIGHT.inc();
    let response = next.run(req).await;
    metrics::HTTP_IN_FLIGHT.dec();

    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    tracing::info!("{method} {uri} {status} {}ms", elapsed.as_millis());
    metrics::observe_http(method.as_str(), &path, status, elapsed.as_secs_f64());

    response
}
