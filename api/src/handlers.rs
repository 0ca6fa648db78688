use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use shared::{CreateQueryRequest, MessageResponse, Query};

use crate::{
    auth_middleware::AuthContext,
    error::ApiError,
    service::{ServiceError, QUERY_DELETED_MESSAGE},
    state::AppState,
    validation::JsonBody,
};

/// POST /create
pub async fn create_query(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateQueryRequest>,
) -> Result<Json<Query>, ServiceError> {
    let query = state.queries.create(req).await?;
    tracing::info!(query_id = %query.id, "query received");
    Ok(Json(query))
}

/// GET /all
pub async fn list_queries(State(state): State<AppState>) -> Result<Json<Vec<Query>>, ServiceError> {
    let queries = state.queries.list().await?;
    Ok(Json(queries))
}

/// DELETE /:id/delete
pub async fn delete_query(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    let outcome = state.queries.delete(&id).await?;
    if let Some(query) = outcome.removed {
        tracing::info!(query_id = %query.id, deleted_by = %caller.subject, "query deleted");
    }
    Ok(Json(MessageResponse::new(QUERY_DELETED_MESSAGE)))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();

    match state.queries.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": now,
                "uptime_secs": uptime
            })),
        ),
        Err(err) => {
            tracing::warn!(uptime_secs = uptime, error = %err, "health check degraded, store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": now,
                    "uptime_secs": uptime
                })),
            )
        }
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::not_found("RouteNotFound", "The requested route does not exist")
}
