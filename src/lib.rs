//! # Action Runtime
//!
//! > **Ordered components, named actions, one dispatch pipeline.**
//!
//! This crate hosts request handlers ("actions") behind pluggable front ends. The
//! runtime boots a set of components in priority order, gives every request a
//! [`Connection`](framework::Connection) that validates parameters against the
//! action's declared inputs, and shuts the front ends down without dropping
//! in-flight work.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Components, not globals
//! Everything long-lived is an [`Initializer`](framework::Initializer). During
//! boot each one may publish a service object into a
//! [`ServiceTable`](framework::ServiceTable); that table is then frozen and
//! passed explicitly to every hook and every connection.
//!
//! ### Actions declare their inputs
//! An action never parses raw request data. It declares an ordered schema
//! (required flags, defaults, formatters, validators) and receives a clean
//! parameter map, or the caller receives one typed error naming the first bad field.
//!
//! ### One error type
//! Every failure, from a bad config value to a panicking handler, surfaces as a
//! [`TypedError`](framework::TypedError) with a machine-readable
//! [`ErrorType`](framework::ErrorType). Front ends map the category to their own
//! status codes.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Contracts ([`framework`])
//! - **Role**: Traits for components and actions, the registry, the service table,
//!   and the per-request dispatch pipeline.
//! - **Key items**: [`Action`](framework::Action), [`Connection::act`](framework::Connection::act),
//!   [`ActionRegistry`](framework::ActionRegistry).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! - **Role**: Runs the initialize, start and stop phases in priority order and
//!   unwinds a failed boot.
//! - **Key items**: [`Orchestrator`](lifecycle::Orchestrator), [`setup_tracing`](lifecycle::setup_tracing).
//!
//! ### 3. The Front End ([`servers`])
//! - **Role**: An axum server that routes to actions, assets and pages, and drains on stop.
//!
//! ### 4. The Batteries ([`initializers`], [`actions`], [`util`], [`config`])
//! - **Role**: Process info, the action registry loader, in-memory sessions, a few
//!   built-in actions, common formatters/validators, and environment-based configuration.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! WEB_SERVER_PORT=3000 RUST_LOG=info cargo run
//! curl localhost:3000/api/status
//! ```

pub mod actions;
pub mod config;
pub mod framework;
pub mod initializers;
pub mod lifecycle;
pub mod servers;
pub mod util;
