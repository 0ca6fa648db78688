use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;

use contact_api::auth::AuthManager;
use contact_api::config::{AppConfig, StoreBackend};
use contact_api::event_log::TracingEventLog;
use contact_api::observability::Observability;
use contact_api::rate_limit::{RateLimitConfig, RateLimitState};
use contact_api::routes;
use contact_api::service::QueryService;
use contact_api::state::AppState;
use contact_api::store::{InMemoryQueryStore, PgQueryStore, QueryStore};

#[derive(Parser)]
#[command(name = "contact-api")]
#[command(about = "Contact-form backend: stores, lists and deletes submitted queries")]
struct Args {
    /// Address to listen on (overrides API_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Persistence backend (overrides STORE_BACKEND)
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// Postgres connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(store) = args.store {
        config.store_backend = store;
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    let obs = Observability::init(&config.error_log_path)?;
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, falling back to the development secret");
    }

    let store: Arc<dyn QueryStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgQueryStore::connect(
                config.require_database_url()?,
                config.database_max_connections,
            )
            .await
            .context("failed to connect to database")?;
            store.ensure_schema().await?;
            tracing::info!("Database connected");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, queries are lost on restart");
            Arc::new(InMemoryQueryStore::new())
        }
    };

    let queries = QueryService::new(store, Arc::new(TracingEventLog));
    let state = AppState::new(
        queries,
        AuthManager::new(&config.jwt_secret),
        obs.registry.clone(),
    );
    if config.trust_proxy {
        tracing::info!("TRUST_PROXY enabled, rate limiting by forwarded client address");
    }
    let rate_limit_state = RateLimitState::new(
        RateLimitConfig::from_env().with_trust_proxy(config.trust_proxy),
    );
    let cors = routes::cors_layer(&config.allowed_origins);

    let app = contact_api::build_router(state, rate_limit_state, cors);

    tracing::info!("API server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    obs.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
