use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthManager;
use crate::service::QueryService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub queries: QueryService,
    pub auth: Arc<AuthManager>,
    pub registry: Registry,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(queries: QueryService, auth: AuthManager, registry: Registry) -> Self {
        Self {
            queries,
            auth: Arc::new(auth),
            registry,
            started_at: Instant::now(),
        }
    }
}
