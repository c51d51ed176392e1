//! Shared handler state

use std::sync::{Arc, Mutex};

use innkeep_core::{AuthPolicy, Database};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
    pub policy: AuthPolicy,
}

impl AppState {
    pub fn new(db: Database, policy: AuthPolicy) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            policy,
        }
    }

    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    /// Run blocking SQLite work off the async runtime
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> innkeep_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db
                .lock()
                .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
            f(&*db).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}
