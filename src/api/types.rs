//! Shared types for the API layer.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::notifier::Notifier;

/// Shared context for all API routes and middleware.
///
/// The single SQLite connection sits behind a mutex: every request-triggered
/// mutation runs serialized against the shared obligation table, which is
/// what makes the idempotent confirm semantics hold under concurrent
/// requests. The evaluator run lock keeps at most one missed-dose run
/// active at a time.
#[derive(Clone)]
pub struct ApiContext {
    db: Arc<Mutex<Connection>>,
    pub notifier: Arc<dyn Notifier>,
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ApiContext {
    pub fn new(conn: Connection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            notifier,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::Internal("db lock poisoned".into()))
    }
}

/// Authenticated caller, injected into request extensions by the identity
/// middleware. Mutating handlers require it; there is no default-account
/// fallback.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}
