use crate::framework::{Initializer, Service, ServiceTable, TypedError};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name under which [`ProcessInfo`] is published.
pub const PROCESS_SERVICE: &str = "process";

/// Identity of the running process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub name: String,
    pub pid: u32,
    pub version: String,
    #[serde(skip)]
    booted_at: Instant,
}

impl ProcessInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            booted_at: Instant::now(),
        }
    }

    /// Time since the process component initialized.
    pub fn uptime(&self) -> Duration {
        self.booted_at.elapsed()
    }
}

/// Publishes [`ProcessInfo`]. Loads first so everything else can read it.
pub struct ProcessInitializer {
    name: String,
}

impl ProcessInitializer {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            name: process_name.into(),
        }
    }
}

#[async_trait]
impl Initializer for ProcessInitializer {
    fn name(&self) -> &str {
        PROCESS_SERVICE
    }

    fn load_priority(&self) -> i32 {
        1
    }

    async fn initialize(&self, _services: &ServiceTable) -> Result<Option<Service>, TypedError> {
        Ok(Some(Arc::new(ProcessInfo::new(self.name.clone()))))
    }
}
