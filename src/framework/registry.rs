//! # Action Registry
//!
//! The static catalogue of actions. It is filled once during boot and then only
//! read, so lookups need no locking.
//!
//! Routes are compiled when an action is registered. Registration order is part of
//! the routing contract: when two actions bound to the same method both match a
//! path, the one registered first wins.

use crate::framework::action::{Action, HttpMethod, Params};
use crate::framework::error::{ErrorType, TypedError};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

struct CompiledRoute {
    method: HttpMethod,
    matcher: Regex,
    action: Arc<dyn Action>,
}

/// Result of [`ActionRegistry::resolve_by_binding`].
pub struct RouteMatch {
    pub action: Arc<dyn Action>,
    /// Values of the route's named capture groups.
    pub path_params: Params,
}

/// Named actions plus their compiled web routes.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn Action>>,
    by_name: HashMap<String, usize>,
    routes: Vec<CompiledRoute>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action.
    ///
    /// # Errors
    /// `ACTION_VALIDATION` when the name is empty or taken, an input key is empty or
    /// declared twice, or the web route is not a valid pattern.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Result<(), TypedError> {
        let name = action.name().to_string();
        if name.is_empty() {
            return Err(TypedError::new("action name cannot be empty", ErrorType::ActionValidation));
        }
        if self.by_name.contains_key(&name) {
            return Err(TypedError::new(
                format!("action `{name}` is already registered"),
                ErrorType::ActionValidation,
            )
            .with_key(name));
        }

        let mut seen = HashSet::new();
        for (key, _) in action.inputs().iter() {
            if key.is_empty() || !seen.insert(key.to_string()) {
                return Err(TypedError::new(
                    format!("action `{name}` declares an empty or duplicate input `{key}`"),
                    ErrorType::ActionValidation,
                )
                .with_key(key));
            }
        }

        if let Some(web) = action.web() {
            let matcher = Regex::new(&format!("^(?:{})$", web.route)).map_err(|e| {
                TypedError::new(
                    format!("action `{name}` has an invalid route `{}`: {e}", web.route),
                    ErrorType::ActionValidation,
                )
                .with_key(name.clone())
            })?;
            self.routes.push(CompiledRoute {
                method: web.method,
                matcher,
                action: action.clone(),
            });
        }

        debug!(action = %name, "Registered action");
        self.by_name.insert(name, self.actions.len());
        self.actions.push(action);
        Ok(())
    }

    /// Looks an action up by name.
    ///
    /// # Errors
    /// `CONNECTION_ACTION_NOT_FOUND` on a miss.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>, TypedError> {
        self.by_name
            .get(name)
            .map(|&index| self.actions[index].clone())
            .ok_or_else(|| {
                TypedError::new(
                    format!("unknown action: {name}"),
                    ErrorType::ConnectionActionNotFound,
                )
                    .with_key("action")
                    .with_value(Value::String(name.to_string()))
            })
    }

    /// Finds the first action bound to `method` whose route matches `path`.
    ///
    /// `path` must already have the front end's API prefix removed.
    pub fn resolve_by_binding(&self, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                let captures = route.matcher.captures(path)?;
                let path_params = route
                    .matcher
                    .capture_names()
                    .flatten()
                    .filter_map(|group| {
                        captures
                            .name(group)
                            .map(|m| (group.to_string(), Value::String(m.as_str().to_string())))
                    })
                    .collect();
                Some(RouteMatch {
                    action: route.action.clone(),
                    path_params,
                })
            })
    }

    /// Action names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|action| action.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
