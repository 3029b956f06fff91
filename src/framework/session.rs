//! Session persistence boundary.
//!
//! The runtime only needs three operations keyed by a connection id. Where the data
//! actually lives (memory, Redis, a database) is up to the implementation; see
//! [`MemorySessionStore`](crate::initializers::MemorySessionStore) for the built-in one.

use crate::framework::error::TypedError;
use async_trait::async_trait;
use serde_json::Value;

/// Session payload: a flat JSON object.
pub type SessionData = serde_json::Map<String, Value>;

/// Name under which the session component publishes its store.
pub const SESSION_SERVICE: &str = "session";

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for `id`, or `None` if there is none (or it expired).
    async fn load(&self, id: &str) -> Result<Option<SessionData>, TypedError>;

    /// Merges `patch` into the session for `id` (creating it) and returns the result.
    async fn update(&self, id: &str, patch: SessionData) -> Result<SessionData, TypedError>;

    /// Removes the session for `id`. Removing a missing session is not an error.
    async fn destroy(&self, id: &str) -> Result<(), TypedError>;
}
