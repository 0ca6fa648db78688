use async_trait::async_trait;
use chrono::Utc;
use shared::{CreateQueryRequest, Query, QueryId};
use tokio::sync::RwLock;

use super::{QueryStore, StoreError};

/// Insertion-ordered store kept in process memory
#[derive(Default)]
pub struct InMemoryQueryStore {
    queries: RwLock<Vec<Query>>,
}

impl InMemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.queries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queries.read().await.is_empty()
    }
}

#[async_trait]
impl QueryStore for InMemoryQueryStore {
    async fn create(&self, request: CreateQueryRequest) -> Result<Query, StoreError> {
        let query = Query {
            id: QueryId::generate(),
            email: request.email,
            message: request.message,
            created_at: Utc::now(),
        };
        self.queries.write().await.push(query.clone());
        Ok(query)
    }

    async fn find_all(&self) -> Result<Vec<Query>, StoreError> {
        Ok(self.queries.read().await.clone())
    }

    async fn find_by_id_and_remove(&self, id: &QueryId) -> Result<Option<Query>, StoreError> {
        let mut queries = self.queries.write().await;
        let removed = queries
            .iter()
            .position(|q| &q.id == id)
            .map(|index| queries.remove(index));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let store = InMemoryQueryStore::new();
        let a = store.create(CreateQueryRequest::new("a@b.com", "one")).await.unwrap();
        let b = store.create(CreateQueryRequest::new("c@d.com", "two")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn find_all_preserves_insertion_order() {
        let store = InMemoryQueryStore::new();
        for message in ["first", "second", "third"] {
            store
                .create(CreateQueryRequest::new("a@b.com", message))
                .await
                .unwrap();
        }

        let messages: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.message)
            .collect();
        assert_eq!(messages, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn remove_returns_match_once() {
        let store = InMemoryQueryStore::new();
        let created = store
            .create(CreateQueryRequest::new("a@b.com", "hello"))
            .await
            .unwrap();

        let removed = store.find_by_id_and_remove(&created.id).await.unwrap();
        assert_eq!(removed, Some(created.clone()));
        assert!(store.find_by_id_and_remove(&created.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
