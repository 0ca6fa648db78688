//! Persistence boundary for contact queries.
//!
//! Every operation maps onto a single-document store call; atomicity beyond
//! one document is not provided and not relied upon.

mod memory;
mod postgres;

use async_trait::async_trait;
use shared::{CreateQueryRequest, Query, QueryId};
use thiserror::Error;

pub use memory::InMemoryQueryStore;
pub use postgres::PgQueryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Persist a new query, assigning its identifier and creation time.
    async fn create(&self, request: CreateQueryRequest) -> Result<Query, StoreError>;

    /// Every stored query in insertion order.
    async fn find_all(&self) -> Result<Vec<Query>, StoreError>;

    /// Remove the query with `id`, returning it when one matched.
    async fn find_by_id_and_remove(&self, id: &QueryId) -> Result<Option<Query>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
