//! Network front ends. Each server is an [`Initializer`](crate::framework::Initializer)
//! that turns incoming requests into [`Connection`](crate::framework::Connection)s.

pub mod web;

pub use web::{ServerState, WebServer, WEB_SERVER};
