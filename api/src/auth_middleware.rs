use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthError, AuthManager};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    message: &'static str,
}

/// Resolve the caller from an `Authorization: Bearer <token>` header.
pub fn authorize(auth: &AuthManager, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = auth.validate_jwt(token)?;
    Ok(AuthContext {
        subject: claims.sub,
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match authorize(&state.auth, request.headers()) {
        Ok(context) => context,
        Err(err) => {
            metrics::AUTH_REJECTED_TOTAL.inc();
            tracing::debug!(reason = err.reason(), path = %request.uri().path(), "request rejected by auth gate");
            return unauthorized(err.reason());
        }
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

fn unauthorized(reason: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthErrorBody {
            error: "Unauthorized",
            message: reason,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{HeaderValue, Request as HttpRequest},
        middleware,
        routing::get,
        Extension, Router,
    };
    use chrono::Duration;
    use prometheus::Registry;
    use tower::ServiceExt;

    use crate::event_log::RecordingEventLog;
    use crate::service::QueryService;
    use crate::store::InMemoryQueryStore;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        let auth = AuthManager::new("test-secret");
        assert_eq!(
            authorize(&auth, &HeaderMap::new()).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let auth = AuthManager::new("test-secret");
        assert_eq!(
            authorize(&auth, &headers_with("Basic YWRtaW46cGFzcw==")).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn valid_bearer_token_yields_subject() {
        let auth = AuthManager::new("test-secret");
        let token = auth.issue_jwt("ops@example.com", Duration::hours(1)).unwrap();
        let context = authorize(&auth, &headers_with(&format!("Bearer {token}"))).unwrap();
        assert_eq!(context.subject, "ops@example.com");
    }

    #[tokio::test]
    async fn gated_handlers_see_the_caller() {
        let state = AppState::new(
            QueryService::new(
                Arc::new(InMemoryQueryStore::new()),
                Arc::new(RecordingEventLog::new()),
            ),
            AuthManager::new("test-secret"),
            Registry::new(),
        );
        let token = state
            .auth
            .issue_jwt("ops@example.com", Duration::hours(1))
            .unwrap();

        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(caller): Extension<AuthContext>| async move { caller.subject }),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ops@example.com");
    }

    #[test]
    fn invalid_bearer_token_is_rejected() {
        let auth = AuthManager::new("test-secret");
        assert_eq!(
            authorize(&auth, &headers_with("Bearer nope")).unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
