//! Built-in components.
//!
//! | Component | Load | Start | Stop | Publishes |
//! |---|---|---|---|---|
//! | [`ProcessInitializer`] | 1 | default | default | [`ProcessInfo`] |
//! | [`ActionsInitializer`] | 10 | default | default | [`ActionRegistry`](crate::framework::ActionRegistry) |
//! | [`SessionInitializer`] | 100 | 100 | 900 | `Arc<dyn SessionStore>` |
//!
//! The web server lives in [`crate::servers`].

mod actions;
mod process;
mod session;

pub use actions::ActionsInitializer;
pub use process::{ProcessInfo, ProcessInitializer, PROCESS_SERVICE};
pub use session::{MemorySessionStore, SessionInitializer};
