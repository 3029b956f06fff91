//! In-memory sessions with a sliding TTL.
//!
//! Every `update` pushes the expiry forward. Expired entries are hidden from
//! `load` right away, and a background sweeper removes them while the component
//! is running.

use crate::config::SessionConfig;
use crate::framework::{
    Initializer, Service, ServiceTable, SessionData, SessionStore, TypedError, SESSION_SERVICE,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Entry {
    data: SessionData,
    expires_at: Instant,
}

/// A [`SessionStore`] that keeps everything in process memory.
pub struct MemorySessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every expired session and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored sessions, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // The map is never left half-written, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>, TypedError> {
        let mut entries = self.entries();
        let expired = match entries.get(id) {
            Some(entry) if entry.expires_at > Instant::now() => return Ok(Some(entry.data.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(id);
        }
        Ok(None)
    }

    async fn update(&self, id: &str, patch: SessionData) -> Result<SessionData, TypedError> {
        let now = Instant::now();
        let mut entries = self.entries();
        let entry = entries.entry(id.to_string()).or_insert_with(|| Entry {
            data: SessionData::new(),
            expires_at: now,
        });
        if entry.expires_at <= now {
            entry.data.clear();
        }
        entry.data.extend(patch);
        entry.expires_at = expiry(now, self.ttl);
        Ok(entry.data.clone())
    }

    async fn destroy(&self, id: &str) -> Result<(), TypedError> {
        self.entries().remove(id);
        Ok(())
    }
}

/// `now + ttl`, saturating at a far-future instant instead of overflowing.
fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Publishes a [`MemorySessionStore`] and runs its sweeper.
pub struct SessionInitializer {
    store: Arc<MemorySessionStore>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInitializer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            store: Arc::new(MemorySessionStore::new(config.ttl())),
            sweep_interval: config.sweep_interval(),
            sweeper: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<MemorySessionStore> {
        &self.store
    }

    fn sweeper(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Initializer for SessionInitializer {
    fn name(&self) -> &str {
        SESSION_SERVICE
    }

    fn load_priority(&self) -> i32 {
        100
    }

    fn start_priority(&self) -> i32 {
        100
    }

    fn stop_priority(&self) -> i32 {
        900
    }

    async fn initialize(&self, _services: &ServiceTable) -> Result<Option<Service>, TypedError> {
        let store: Arc<dyn SessionStore> = self.store.clone();
        Ok(Some(Arc::new(store)))
    }

    async fn start(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        if self.sweep_interval.is_zero() {
            return Ok(());
        }
        let store = self.store.clone();
        let period = self.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    debug!(removed, "Expired sessions swept");
                }
            }
        });
        if let Some(previous) = self.sweeper().replace(handle) {
            previous.abort();
        }
        info!(interval_secs = period.as_secs(), "Session sweeper started");
        Ok(())
    }

    async fn stop(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        if let Some(handle) = self.sweeper().take() {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: serde_json::Value) -> SessionData {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_update_merges_and_load_returns() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        assert!(store.load("c1").await.unwrap().is_none());

        store.update("c1", patch(json!({"email": "a@b.com"}))).await.unwrap();
        let merged = store.update("c1", patch(json!({"name": "Ada"}))).await.unwrap();
        assert_eq!(merged, patch(json!({"email": "a@b.com", "name": "Ada"})));
        assert_eq!(store.load("c1").await.unwrap(), Some(merged));
        assert!(store.load("c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.update("c1", patch(json!({"x": 1}))).await.unwrap();
        store.destroy("c1").await.unwrap();
        store.destroy("c1").await.unwrap();
        assert!(store.load("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_hidden_and_swept() {
        let store = MemorySessionStore::new(Duration::from_millis(20));
        store.update("c1", patch(json!({"x": 1}))).await.unwrap();
        store.update("c2", patch(json!({"x": 2}))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.load("c1").await.unwrap().is_none());
        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());

        let fresh = store.update("c2", patch(json!({"y": 3}))).await.unwrap();
        assert_eq!(fresh, patch(json!({"y": 3})));
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemorySessionStore::new(Duration::MAX);
        store.update("c1", patch(json!({"x": 1}))).await.unwrap();
        assert_eq!(store.load("c1").await.unwrap(), Some(patch(json!({"x": 1}))));
        assert_eq!(store.sweep(), 0);
    }
}
