//! Built-in actions.

mod session;
mod status;

pub use session::{SessionCreate, SessionDestroy, SessionView};
pub use status::Status;

use crate::framework::Action;
use std::sync::Arc;

/// Every built-in action, in route precedence order.
pub fn default_actions() -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(Status),
        Arc::new(SessionCreate),
        Arc::new(SessionView),
        Arc::new(SessionDestroy),
    ]
}
