use async_trait::async_trait;
use shared::{CreateQueryRequest, Query, QueryId};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{QueryStore, StoreError};

const CREATE_QUERIES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS queries (
        seq BIGSERIAL PRIMARY KEY,
        id TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// Postgres-backed query store
#[derive(Clone)]
pub struct PgQueryStore {
    pool: PgPool,
}

impl PgQueryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the `queries` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_QUERIES_TABLE).execute(&self.pool).await?;
        tracing::info!("queries table ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryStore for PgQueryStore {
    async fn create(&self, request: CreateQueryRequest) -> Result<Query, StoreError> {
        let query = sqlx::query_as::<_, Query>(
            r#"
            INSERT INTO queries (id, email, message)
            VALUES ($1, $2, $3)
            RETURNING id, email, message, created_at
            "#,
        )
        .bind(QueryId::generate())
        .bind(&request.email)
        .bind(&request.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(query)
    }

    async fn find_all(&self) -> Result<Vec<Query>, StoreError> {
        let queries = sqlx::query_as::<_, Query>(
            "SELECT id, email, message, created_at FROM queries ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(queries)
    }

    async fn find_by_id_and_remove(&self, id: &QueryId) -> Result<Option<Query>, StoreError> {
        let removed = sqlx::query_as::<_, Query>(
            "DELETE FROM queries WHERE id = $1 RETURNING id, email, message, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_store() -> PgQueryStore {
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/contact_desk_test")
            .expect("lazy pool");
        PgQueryStore::new(pool)
    }

    #[tokio::test]
    async fn lazy_pool_does_not_connect_until_used() {
        let store = lazy_store();
        assert_eq!(store.pool().size(), 0);
    }

    #[test]
    fn schema_keeps_insertion_sequence() {
        assert!(CREATE_QUERIES_TABLE.contains("seq BIGSERIAL PRIMARY KEY"));
        assert!(CREATE_QUERIES_TABLE.contains("id TEXT NOT NULL UNIQUE"));
    }

    /// Needs a reachable Postgres at `DATABASE_URL`.
    #[tokio::test]
    #[ignore]
    async fn postgres_round_trip() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgQueryStore::connect(&url, 1).await.unwrap();
        store.ensure_schema().await.unwrap();

        let created = store
            .create(CreateQueryRequest::new("a@b.com", "hello"))
            .await
            .unwrap();
        let all = store.find_all().await.unwrap();
        assert!(all.iter().any(|q| q.id == created.id));

        let removed = store.find_by_id_and_remove(&created.id).await.unwrap();
        assert_eq!(removed.map(|q| q.id), Some(created.id.clone()));
        assert!(store.find_by_id_and_remove(&created.id).await.unwrap().is_none());
    }
}
