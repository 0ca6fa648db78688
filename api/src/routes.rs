use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};

use crate::{
    auth_middleware::auth_middleware,
    error::ApiError,
    event_log::EventLog,
    handlers, metrics_handler,
    rate_limit::{rate_limit_middleware, RateLimitState},
    service::Operation,
    state::AppState,
};

pub const QUERY_ROUTES_PREFIX: &str = "/api/queries";

#[derive(Debug, Error)]
#[error("handler panicked: {0}")]
struct HandlerPanic(String);

/// Query endpoints, each behind its own gates:
/// create is rate limited, list and delete require a bearer token.
pub fn query_routes(state: &AppState, rate_limit: RateLimitState) -> Router<AppState> {
    let rate_limit_layer = middleware::from_fn_with_state(rate_limit, rate_limit_middleware);
    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        .route(
            "/create",
            post(handlers::create_query).route_layer(rate_limit_layer),
        )
        .route(
            "/all",
            get(handlers::list_queries).route_layer(auth_layer.clone()),
        )
        .route(
            "/:id/delete",
            delete(handlers::delete_query)
                .route_layer(delete_panic_layer(state.queries.log().clone()))
                .route_layer(auth_layer),
        )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health_check))
}

pub fn observability_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler::metrics_endpoint))
}

/// Maps a panic inside the delete handler to the delete failure response.
fn delete_panic_layer(
    log: Arc<dyn EventLog>,
) -> CatchPanicLayer<impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone> {
    CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
        let detail = panic
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "unknown panic payload".to_string());

        log.error(Operation::Delete, "Server error", &HandlerPanic(detail));
        ApiError::internal(Operation::Delete.failure_message()).into_response()
    })
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::from(AnyOrigin)
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin `{origin}`");
                        None
                    }
                }),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
