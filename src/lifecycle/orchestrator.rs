use crate::framework::{ErrorType, Initializer, ServiceTable, TypedError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Where the orchestrator is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Accepting registrations.
    Idle,
    /// Running the initialize/start phases.
    Booting,
    /// Boot completed; serving.
    Running,
    /// Boot aborted; started components were already stopped.
    Failed,
    /// Shutdown completed.
    Stopped,
}

/// Runs registered components through their ordered lifecycle.
///
/// `Orchestrator` is responsible for:
/// - **Registration**: Enforcing unique component names
/// - **Boot**: Initialize phase (load priority), then start phase (start priority)
/// - **Service Table**: Collecting published services and freezing the table
/// - **Shutdown**: Stop phase (stop priority), best-effort for every started component
///
/// # Ordering
///
/// Every phase sorts components by its own priority, ascending, keeping
/// registration order for ties. Hooks run one at a time: component N+1's `start`
/// begins only after component N's `start` completed, so a component may rely on
/// everything with a smaller start priority being live.
///
/// # Failure Handling
///
/// If a hook fails during boot, the components that already completed `start`
/// are stopped (in stop-priority order) and the error comes back wrapped as
/// `SERVER_INITIALIZATION` or `SERVER_START`. A failing `stop` during shutdown is
/// logged and the remaining components are still stopped.
///
/// # Example
///
/// ```ignore
/// let mut orchestrator = Orchestrator::new();
/// orchestrator.register(Arc::new(ActionsInitializer::new(actions)))?;
/// orchestrator.register(Arc::new(WebServer::new(&config)))?;
///
/// orchestrator.boot().await?;
/// // ... serve until a signal arrives ...
/// orchestrator.shutdown().await?;
/// ```
pub struct Orchestrator {
    components: Vec<Arc<dyn Initializer>>,
    names: HashSet<String>,
    /// Indices into `components` that completed `start`, in start order.
    started: Vec<usize>,
    services: Option<Arc<ServiceTable>>,
    state: OrchestratorState,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            names: HashSet::new(),
            started: Vec::new(),
            services: None,
            state: OrchestratorState::Idle,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// The frozen service table, available once the initialize phase completed.
    pub fn services(&self) -> Option<&Arc<ServiceTable>> {
        self.services.as_ref()
    }

    /// Names of registered components, in registration order.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Adds a component.
    ///
    /// # Errors
    /// `INITIALIZER_VALIDATION` when the name is empty or taken, or when boot has
    /// already begun.
    pub fn register(&mut self, component: Arc<dyn Initializer>) -> Result<(), TypedError> {
        let name = component.name().to_string();
        if self.state != OrchestratorState::Idle {
            return Err(TypedError::new(
                format!("cannot register `{name}` after boot has begun"),
                ErrorType::InitializerValidation,
            )
            .with_key(name));
        }
        if name.is_empty() {
            return Err(TypedError::new(
                "initializer name cannot be empty",
                ErrorType::InitializerValidation,
            ));
        }
        if !self.names.insert(name.clone()) {
            return Err(TypedError::new(
                format!("an initializer named `{name}` is already registered"),
                ErrorType::InitializerValidation,
            )
            .with_key(name));
        }

        debug!(
            component = %name,
            load = component.load_priority(),
            start = component.start_priority(),
            stop = component.stop_priority(),
            "Registered component"
        );
        self.components.push(component);
        Ok(())
    }

    /// Runs the initialize phase, then the start phase.
    ///
    /// # Errors
    /// - `SERVER_INITIALIZATION` when an `initialize` hook fails, a service name
    ///   collides, or boot was already attempted
    /// - `SERVER_START` when a `start` hook fails
    #[instrument(name = "boot", skip_all)]
    pub async fn boot(&mut self) -> Result<(), TypedError> {
        if self.state != OrchestratorState::Idle {
            return Err(TypedError::new(
                format!("boot was already attempted (state: {:?})", self.state),
                ErrorType::ServerInitialization,
            ));
        }
        self.state = OrchestratorState::Booting;
        info!(components = self.components.len(), "Booting");

        // =====================================================================
        // Phase 1: initialize (load priority)
        // =====================================================================

        let mut table = ServiceTable::new();
        for index in self.order_by(|c| c.load_priority()) {
            let component = self.components[index].clone();
            let name = component.name();
            debug!(component = %name, "Initializing");

            let published = match component.initialize(&table).await {
                Ok(published) => published,
                Err(e) => {
                    let error = e.wrap(
                        format!("failed to initialize `{name}`"),
                        ErrorType::ServerInitialization,
                    );
                    return Err(self.abort(error).await);
                }
            };
            if let Some(service) = published {
                if let Err(e) = table.insert(name, service) {
                    let error = e.wrap(
                        format!("failed to initialize `{name}`"),
                        ErrorType::ServerInitialization,
                    );
                    return Err(self.abort(error).await);
                }
            }
        }
        let services = Arc::new(table);
        self.services = Some(services.clone());
        info!(services = services.len(), "Initialize phase complete");

        // =====================================================================
        // Phase 2: start (start priority)
        // =====================================================================

        for index in self.order_by(|c| c.start_priority()) {
            let component = self.components[index].clone();
            let name = component.name();
            debug!(component = %name, "Starting");

            if let Err(e) = component.start(&services).await {
                let error = e.wrap(format!("failed to start `{name}`"), ErrorType::ServerStart);
                return Err(self.abort(error).await);
            }
            self.started.push(index);
            info!(component = %name, "Started");
        }

        self.state = OrchestratorState::Running;
        info!("Boot complete");
        Ok(())
    }

    /// Stops every started component, ascending stop priority.
    ///
    /// Calling this again (or after a failed boot) does nothing.
    ///
    /// # Errors
    /// `SERVER_STOP` naming every component whose `stop` failed; all components
    /// were still given the chance to stop.
    #[instrument(name = "shutdown", skip_all)]
    pub async fn shutdown(&mut self) -> Result<(), TypedError> {
        match self.state {
            OrchestratorState::Running => {}
            OrchestratorState::Idle => {
                self.state = OrchestratorState::Stopped;
                return Ok(());
            }
            _ => return Ok(()),
        }

        info!("Shutting down...");
        let failed = self.stop_started().await;
        self.state = OrchestratorState::Stopped;

        if failed.is_empty() {
            info!("Shutdown complete");
            Ok(())
        } else {
            Err(TypedError::new(
                format!("failed to stop: {}", failed.join(", ")),
                ErrorType::ServerStop,
            ))
        }
    }

    /// Stops whatever boot got through, marks the orchestrator failed and hands
    /// the boot error back.
    async fn abort(&mut self, error: TypedError) -> TypedError {
        error!(error = %error, "Boot failed, stopping started components");
        self.stop_started().await;
        self.state = OrchestratorState::Failed;
        error
    }

    /// Runs `stop` on started components only, ascending stop priority. Returns the
    /// names of the components whose `stop` failed.
    async fn stop_started(&mut self) -> Vec<String> {
        let mut started = std::mem::take(&mut self.started);
        // Stable: ties keep registration order, like every other phase.
        started.sort();
        started.sort_by_key(|&index| self.components[index].stop_priority());

        let services = self.services.clone().unwrap_or_default();
        let mut failed = Vec::new();
        for index in started {
            let component = self.components[index].clone();
            let name = component.name();
            match component.stop(&services).await {
                Ok(()) => info!(component = %name, "Stopped"),
                Err(e) => {
                    error!(component = %name, error = %e, "Stop failed");
                    failed.push(name.to_string());
                }
            }
        }
        failed
    }

    /// Component indices sorted by `priority`, ties in registration order.
    fn order_by(&self, priority: impl Fn(&dyn Initializer) -> i32) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.components.len()).collect();
        order.sort_by_key(|&index| priority(self.components[index].as_ref()));
        order
    }
}
