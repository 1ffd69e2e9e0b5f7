//! HTTP API for the chat service

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::runtime::ProductionRuntime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    pub db: Database,
    sessions: Arc<SessionLocks>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime, db: Database) -> Self {
        Self {
            runtime: Arc::new(runtime),
            db,
            sessions: Arc::new(SessionLocks::default()),
        }
    }

    /// Hold this for the whole of one action on `session_id`
    pub async fn lock_session(&self, session_id: &str) -> SessionGuard {
        SessionLocks::lock(&self.sessions, session_id).await
    }
}

/// One async mutex per session, so overlapping submissions run one at a time.
///
/// An entry lives only while some request holds or waits on it.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    async fn lock(this: &Arc<Self>, session_id: &str) -> SessionGuard {
        let lock = {
            let mut locks = this.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            owner: Arc::clone(this),
            session_id: session_id.to_string(),
        }
    }

    fn release(&self, session_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one session until dropped
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    owner: Arc<SessionLocks>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Unlock first so the map holds the last reference when nobody waits
        drop(self.guard.take());
        self.owner.release(&self.session_id);
    }
}
