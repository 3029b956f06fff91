//! # Lifecycle & Orchestration
//!
//! This module manages the runtime lifecycle: booting every registered component
//! in priority order, and shutting them down again.
//!
//! ## The Orchestration Pattern
//!
//! Individual components are simple, but **ordering them** is where complexity
//! lives. The [`Orchestrator`] is the conductor:
//!
//! 1. **Registration** - Components register once, names are unique
//! 2. **Initialize** - Each component publishes its service into the [`ServiceTable`](crate::framework::ServiceTable)
//! 3. **Start** - Components go live, one at a time, lowest start priority first
//! 4. **Stop** - Components shut down, lowest stop priority first, best effort
//!
//! ```text
//!  register ─▶ initialize (load ↑) ─▶ start (start ↑) ─▶ running ─▶ stop (stop ↑)
//!                    │                      │
//!                    └──── failure ─────────┴─▶ stop started components ─▶ error
//! ```
//!
//! ## Dependency Injection via the Service Table
//!
//! Services are not globals. The table is built while components initialize,
//! frozen, and then passed to every `start`/`stop` hook and every request
//! connection. A component that needs another one's service looks it up by name
//! and gives itself a larger priority than its dependency.
//!
//! ## Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging for the process.
//! See the [`tracing`](self::tracing) module for details.

pub mod orchestrator;
pub mod tracing;

pub use orchestrator::*;
pub use self::tracing::setup_tracing;
