//! Validation error types and the JSON body extractor
//!
//! `JsonBody<T>` is a drop-in replacement for `Json<T>` whose rejections are
//! rendered in the same `ValidationError` shape as field-level failures.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// A field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation error response body
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub message: String,
    pub errors: Vec<FieldError>,
    pub code: u16,
    pub timestamp: String,
    pub correlation_id: String,
}

impl ValidationErrorResponse {
    pub fn new(errors: Vec<FieldError>) -> Self {
        let error_summary = if errors.len() == 1 {
            format!("Validation failed for field '{}'", errors[0].field)
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        Self {
            error: "ValidationError".to_string(),
            message: error_summary,
            errors,
            code: StatusCode::BAD_REQUEST.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Validation error that converts to an HTTP response
#[derive(Debug)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl axum::response::IntoResponse for ValidationError {
    fn into_response(self) -> axum::response::Response {
        let response = ValidationErrorResponse::new(self.errors);
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    }
}

/// Types that can be checked against field-level rules.
///
/// Implementations must report every failing field, in a stable order,
/// rather than stopping at the first one.
pub trait Validatable {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// JSON extractor whose rejections are reported as a `body` field error
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ValidationError::single("body", json_rejection_message(err)))?;

        Ok(JsonBody(data))
    }
}

fn json_rejection_message(err: JsonRejection) -> String {
    match err {
        JsonRejection::JsonDataError(e) => format!("Invalid JSON data: {}", e.body_text()),
        JsonRejection::JsonSyntaxError(e) => format!("JSON syntax error: {}", e.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type must be application/json".to_string()
        }
        JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
        _ => "Invalid JSON payload".to_string(),
    }
}

/// Builder for accumulating validation errors
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<FieldError>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Add an error if the result is Err
    pub fn check<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: FnOnce() -> Result<(), String>,
    {
        if let Err(message) = validator() {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Finish building and return Result
    pub fn build(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, response::IntoResponse};

    #[test]
    fn test_validation_builder_keeps_every_failure_in_order() {
        let mut builder = ValidationBuilder::new();

        builder
            .check("email", || Err("bad email".to_string()))
            .check("name", || Ok(()))
            .check("message", || Err("missing".to_string()));

        assert!(builder.has_errors());
        assert_eq!(builder.error_count(), 2);

        let errors = builder.build().unwrap_err();
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[1].field, "message");
    }

    #[test]
    fn test_empty_builder_passes() {
        assert!(ValidationBuilder::new().build().is_ok());
    }

    #[test]
    fn test_validation_error_response_summary() {
        let many = ValidationErrorResponse::new(vec![
            FieldError::new("email", "bad"),
            FieldError::new("message", "missing"),
        ]);
        assert_eq!(many.error, "ValidationError");
        assert_eq!(many.code, 400);
        assert!(many.message.contains("2 fields"));

        let one = ValidationErrorResponse::new(vec![FieldError::new("message", "missing")]);
        assert!(one.message.contains("field 'message'"));
    }

    #[tokio::test]
    async fn test_json_body_rejects_missing_content_type() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"email":"a@b.com"}"#))
            .unwrap();

        let rejection = JsonBody::<serde_json::Value>::from_request(request, &())
            .await
            .err()
            .unwrap();

        assert_eq!(rejection.errors.len(), 1);
        assert_eq!(rejection.errors[0].field, "body");
        assert_eq!(
            rejection.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_json_body_rejects_syntax_errors() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let rejection = JsonBody::<serde_json::Value>::from_request(request, &())
            .await
            .err()
            .unwrap();

        assert!(rejection.errors[0].message.starts_with("JSON syntax error"));
    }
}
