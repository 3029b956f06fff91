//! # Shared Service Table
//!
//! Components publish one service object each while the orchestrator runs the
//! initialize phase. After that phase the table is frozen behind an `Arc` and
//! handed to every `start`/`stop` hook and every [`Connection`](crate::framework::Connection).
//!
//! There is no global: whoever needs a service receives the table explicitly.

use crate::framework::error::{ErrorType, TypedError};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A published service object.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Component name → published service.
#[derive(Default)]
pub struct ServiceTable {
    services: HashMap<String, Service>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `service` under `name`. Each name can be written once.
    pub fn insert(&mut self, name: impl Into<String>, service: Service) -> Result<(), TypedError> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(TypedError::new(
                format!("service `{name}` is already published"),
                ErrorType::InitializerValidation,
            )
            .with_key(name));
        }
        self.services.insert(name, service);
        Ok(())
    }

    /// Convenience wrapper around [`insert`](Self::insert) for concrete values.
    pub fn provide<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), TypedError> {
        self.insert(name, Arc::new(value))
    }

    /// Typed lookup. `None` when the name is unknown or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.services.get(name).cloned()?.downcast::<T>().ok()
    }

    /// Like [`get`](Self::get), but a miss is a typed error naming the service.
    pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, TypedError> {
        self.get(name).ok_or_else(|| {
            TypedError::new(
                format!("service `{name}` is not available"),
                ErrorType::ConnectionServerError,
            )
            .with_key(name)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.services.keys().collect();
        names.sort();
        f.debug_struct("ServiceTable").field("services", &names).finish()
    }
}
