use crate::framework::{
    Action, ActionRegistry, Initializer, Service, ServiceTable, TypedError, ACTIONS_SERVICE,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Builds the [`ActionRegistry`] from a fixed list of actions and publishes it.
///
/// Registration order is kept, which makes it the route precedence order.
pub struct ActionsInitializer {
    actions: Vec<Arc<dyn Action>>,
}

impl ActionsInitializer {
    pub fn new(actions: Vec<Arc<dyn Action>>) -> Self {
        Self { actions }
    }
}

#[async_trait]
impl Initializer for ActionsInitializer {
    fn name(&self) -> &str {
        ACTIONS_SERVICE
    }

    fn load_priority(&self) -> i32 {
        10
    }

    async fn initialize(&self, _services: &ServiceTable) -> Result<Option<Service>, TypedError> {
        let mut registry = ActionRegistry::new();
        for action in &self.actions {
            registry.register(action.clone())?;
        }
        info!(actions = registry.len(), "Actions loaded");
        Ok(Some(Arc::new(registry)))
    }
}
