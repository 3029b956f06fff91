//! # Mock Framework
//!
//! Test doubles for the two extension points of the runtime.
//!
//! - [`RecordingInitializer`]: a component that writes every hook call into a shared
//!   [`EventLog`] and can be told to fail in a given phase. Use it to assert boot and
//!   shutdown ordering without real resources.
//! - [`FnAction`]: an action built from a closure, with optional inputs, web route
//!   and an artificial delay (handy for drain tests).
//!
//! ```rust,ignore
//! let log = EventLog::new();
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.register(Arc::new(RecordingInitializer::new("db", &log).priorities(10, 10, 90)))?;
//! orchestrator.register(Arc::new(RecordingInitializer::new("web", &log).fail_on(Phase::Start)))?;
//!
//! assert!(orchestrator.boot().await.is_err());
//! assert_eq!(log.calls(Phase::Stop), vec!["db"]);
//! ```

use crate::framework::action::{Action, Inputs, Params, WebRoute};
use crate::framework::connection::Connection;
use crate::framework::error::{BoxError, ErrorType, TypedError};
use crate::framework::initializer::{Initializer, DEFAULT_PRIORITY};
use crate::framework::services::{Service, ServiceTable};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// LIFECYCLE RECORDING
// =============================================================================

/// Lifecycle phase of a hook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    Start,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initialize => f.write_str("initialize"),
            Phase::Start => f.write_str("start"),
            Phase::Stop => f.write_str("stop"),
        }
    }
}

/// Shared, ordered record of hook calls: `(phase, component)`.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(Phase, String)>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phase: Phase, component: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((phase, component.to_string()));
        }
    }

    /// Every recorded call, in order.
    pub fn events(&self) -> Vec<(Phase, String)> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Components that saw `phase`, in call order.
    pub fn calls(&self, phase: Phase) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(p, _)| *p == phase)
            .map(|(_, name)| name)
            .collect()
    }
}

/// A component that records its hook calls and fails on demand.
///
/// The hook call is recorded even when the hook then fails. Its `initialize`
/// publishes the component name as a `String` service.
pub struct RecordingInitializer {
    name: String,
    load_priority: i32,
    start_priority: i32,
    stop_priority: i32,
    fail_on: Option<Phase>,
    log: EventLog,
}

impl RecordingInitializer {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            load_priority: DEFAULT_PRIORITY,
            start_priority: DEFAULT_PRIORITY,
            stop_priority: DEFAULT_PRIORITY,
            fail_on: None,
            log: log.clone(),
        }
    }

    /// Sets the load, start and stop priorities.
    pub fn priorities(mut self, load: i32, start: i32, stop: i32) -> Self {
        self.load_priority = load;
        self.start_priority = start;
        self.stop_priority = stop;
        self
    }

    pub fn fail_on(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    fn hook(&self, phase: Phase) -> Result<(), TypedError> {
        self.log.record(phase, &self.name);
        if self.fail_on == Some(phase) {
            return Err(TypedError::new(
                format!("{} failed to {phase}", self.name),
                ErrorType::ConnectionServerError,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Initializer for RecordingInitializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_priority(&self) -> i32 {
        self.load_priority
    }

    fn start_priority(&self) -> i32 {
        self.start_priority
    }

    fn stop_priority(&self) -> i32 {
        self.stop_priority
    }

    async fn initialize(&self, _services: &ServiceTable) -> Result<Option<Service>, TypedError> {
        self.hook(Phase::Initialize)?;
        Ok(Some(Arc::new(self.name.clone())))
    }

    async fn start(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        self.hook(Phase::Start)
    }

    async fn stop(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        self.hook(Phase::Stop)
    }
}

// =============================================================================
// CLOSURE ACTIONS
// =============================================================================

type Handler = dyn Fn(Params, &mut Connection) -> Result<Value, BoxError> + Send + Sync;

/// An [`Action`] backed by a closure.
pub struct FnAction {
    name: String,
    inputs: Inputs,
    web: Option<WebRoute>,
    delay: Option<Duration>,
    handler: Arc<Handler>,
}

impl FnAction {
    pub fn new(
        name: impl Into<String>,
        handler: impl Fn(Params, &mut Connection) -> Result<Value, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: Inputs::new(),
            web: None,
            delay: None,
            handler: Arc::new(handler),
        }
    }

    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn web(mut self, route: WebRoute) -> Self {
        self.web = Some(route);
        self
    }

    /// Sleeps for `delay` before calling the handler.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Inputs {
        self.inputs.clone()
    }

    fn web(&self) -> Option<WebRoute> {
        self.web.clone()
    }

    async fn run(&self, params: Params, connection: &mut Connection) -> Result<Value, BoxError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(params, connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_initializer_logs_before_failing() {
        let log = EventLog::new();
        let component = RecordingInitializer::new("cache", &log).fail_on(Phase::Start);
        let services = Arc::new(ServiceTable::new());

        assert!(component.initialize(&services).await.unwrap().is_some());
        assert!(component.start(&services).await.is_err());
        component.stop(&services).await.unwrap();

        assert_eq!(
            log.events(),
            vec![
                (Phase::Initialize, "cache".to_string()),
                (Phase::Start, "cache".to_string()),
                (Phase::Stop, "cache".to_string()),
            ]
        );
    }
}
