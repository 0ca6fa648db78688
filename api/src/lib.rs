//! Contact-form backend: accepts email/message submissions, lists them for
//! authorised callers, and deletes them by identifier.

pub mod auth;
pub mod auth_middleware;
pub mod config;
pub mod error;
pub mod event_log;
pub mod handlers;
pub mod metrics;
pub mod metrics_handler;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;

use crate::rate_limit::RateLimitState;
use crate::state::AppState;

/// Assemble the full HTTP surface.
///
/// Per-route gates are attached inside `routes::query_routes`; the request
/// logger and CORS apply to every route.
pub fn build_router(state: AppState, rate_limit: RateLimitState, cors: CorsLayer) -> Router {
    Router::new()
        .nest(
            routes::QUERY_ROUTES_PREFIX,
            routes::query_routes(&state, rate_limit),
        )
        .merge(routes::health_routes())
        .merge(routes::observability_routes())
        .fallback(handlers::route_not_found)
        .layer(middleware::from_fn(observability::request_logger))
        .layer(cors)
        .with_state(state)
}
