//! Query service: validation, store call, and outcome mapping for the three
//! query operations.
//!
//! Validation and identifier-shape failures are detected before the store is
//! touched. Store failures are logged once through the injected `EventLog`
//! and surfaced to callers only as a fixed per-operation message.

use std::fmt;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use shared::{CreateQueryRequest, Query, QueryId};
use thiserror::Error;

use crate::error::ApiError;
use crate::event_log::EventLog;
use crate::metrics;
use crate::store::{QueryStore, StoreError};
use crate::validation::{FieldError, Validatable, ValidationError};

pub const QUERY_NOT_FOUND_MESSAGE: &str = "No query exists.";
pub const QUERY_DELETED_MESSAGE: &str = "Successfully deleted the query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    List,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Delete => "delete",
        }
    }

    /// Message returned to callers when the store fails during this operation.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Create => "Something went wrong while sending the query. Please try again!",
            Operation::List => "Something went wrong when trying to get all the queries",
            Operation::Delete => "Something went wrong while deleting this query. Try again.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{}", QUERY_NOT_FOUND_MESSAGE)]
    NotFound,
    #[error("{operation} failed: {source}")]
    Store {
        operation: Operation,
        #[source]
        source: StoreError,
    },
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Validation(errors) => ValidationError::new(errors).into_response(),
            ServiceError::NotFound => {
                ApiError::not_found("NotFound", QUERY_NOT_FOUND_MESSAGE).into_response()
            }
            // The store error was already logged; only the fixed message leaves the process.
            ServiceError::Store { operation, .. } => {
                ApiError::internal(operation.failure_message()).into_response()
            }
        }
    }
}

/// Outcome of a delete that reached the store.
///
/// Callers see the same success either way; `removed` records whether a
/// document actually matched.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub removed: Option<Query>,
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn QueryStore>,
    log: Arc<dyn EventLog>,
}

impl QueryService {
    pub fn new(store: Arc<dyn QueryStore>, log: Arc<dyn EventLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &Arc<dyn QueryStore> {
        &self.store
    }

    pub fn log(&self) -> &Arc<dyn EventLog> {
        &self.log
    }

    /// Validate and persist a submitted query.
    pub async fn create(&self, request: CreateQueryRequest) -> Result<Query, ServiceError> {
        if let Err(errors) = request.validate() {
            for error in &errors {
                metrics::QUERY_VALIDATION_FAILURES
                    .with_label_values(&[error.field.as_str()])
                    .inc();
            }
            return Err(ServiceError::Validation(errors));
        }

        let query = self
            .store
            .create(request)
            .await
            .map_err(|err| self.store_failure(Operation::Create, err))?;

        metrics::QUERIES_CREATED.inc();
        Ok(query)
    }

    /// Every stored query in the store's natural order.
    pub async fn list(&self) -> Result<Vec<Query>, ServiceError> {
        self.store
            .find_all()
            .await
            .map_err(|err| self.store_failure(Operation::List, err))
    }

    /// Remove the query addressed by a raw path identifier.
    ///
    /// A malformed identifier is reported as not found without a store call.
    /// A well-formed identifier that matches nothing still succeeds.
    pub async fn delete(&self, raw_id: &str) -> Result<DeleteOutcome, ServiceError> {
        let Some(id) = QueryId::parse(raw_id) else {
            return Err(ServiceError::NotFound);
        };

        let removed = self
            .store
            .find_by_id_and_remove(&id)
            .await
            .map_err(|err| self.store_failure(Operation::Delete, err))?;

        if removed.is_some() {
            metrics::QUERIES_DELETED.inc();
        } else {
            self.log
                .info(Operation::Delete, &format!("delete of {id} matched no query"));
        }

        Ok(DeleteOutcome { removed })
    }

    fn store_failure(&self, operation: Operation, err: StoreError) -> ServiceError {
        self.log.error(operation, "Server error", &err);
        metrics::STORE_ERRORS
            .with_label_values(&[operation.as_str()])
            .inc();
        ServiceError::Store {
            operation,
            source: err,
        }
    }
}
