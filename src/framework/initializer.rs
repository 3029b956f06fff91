//! # Initializers
//!
//! An initializer is a long-lived component with three ordered hooks. The
//! [`Orchestrator`](crate::lifecycle::Orchestrator) drives every registered
//! initializer through the same phases:
//!
//! | Phase | Hook | Ordered by |
//! |---|---|---|
//! | load | [`Initializer::initialize`] | [`Initializer::load_priority`] |
//! | start | [`Initializer::start`] | [`Initializer::start_priority`] |
//! | stop | [`Initializer::stop`] | [`Initializer::stop_priority`] |
//!
//! Lower numbers run earlier in every phase. A component that must be torn down
//! first (such as a front end that should stop taking requests before its
//! dependencies disappear) therefore picks a small stop priority.

use crate::framework::error::TypedError;
use crate::framework::services::{Service, ServiceTable};
use async_trait::async_trait;
use std::sync::Arc;

/// Priority used when a component does not override one.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// A component with ordered lifecycle hooks.
///
/// # Provided Methods (Hooks)
/// Every hook has a no-op default, so a component only implements what it needs.
/// Hooks take `&self`: a component that keeps runtime state (a listener handle, a
/// background task) holds it behind its own lock.
///
/// # Context Injection
/// `initialize` sees the table as it is being built (services published by
/// components with a smaller load priority). `start` and `stop` receive the frozen
/// table.
#[async_trait]
pub trait Initializer: Send + Sync {
    /// Unique component name; also the key of its published service.
    fn name(&self) -> &str;

    fn load_priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn start_priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn stop_priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Builds the component's public service object, if it has one.
    async fn initialize(&self, _services: &ServiceTable) -> Result<Option<Service>, TypedError> {
        Ok(None)
    }

    /// Brings the component live (open listeners, connect pools, spawn tasks).
    async fn start(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        Ok(())
    }

    /// Releases everything `start` acquired. Failures are logged, never fatal.
    async fn stop(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        Ok(())
    }
}
