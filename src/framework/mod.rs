//! Core building blocks of the runtime.
//!
//! This module defines the contracts that components and request handlers
//! implement, plus the per-request dispatch pipeline that ties them together.
//!
//! # Main Components
//!
//! - [`Initializer`] - Trait for long-lived components with ordered lifecycle hooks
//! - [`ServiceTable`] - The write-once table of services published during boot
//! - [`Action`] - Trait for named, schema-validated request handlers
//! - [`ActionRegistry`] - Catalogue of actions with compiled web routes
//! - [`Connection`] - Per-request context running the dispatch pipeline
//! - [`SessionStore`] - Session persistence boundary
//! - [`TypedError`] - The single error type every failure is reported as
//!
//! # Testing
//!
//! See [`mock`] module for recording components and closure-backed actions.

pub mod action;
pub mod connection;
pub mod error;
pub mod initializer;
pub mod mock;
pub mod registry;
pub mod services;
pub mod session;

// Re-export core types for convenience
pub use action::*;
pub use connection::*;
pub use error::*;
pub use initializer::*;
pub use registry::*;
pub use services::*;
pub use session::*;
