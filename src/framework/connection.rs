//! # Connection & Dispatch Pipeline
//!
//! A [`Connection`] is the per-request execution context. Front ends build one per
//! request, call [`Connection::act`] once, and drop it when the response is sent.
//!
//! ## Pipeline
//!
//! ```text
//! act(name, raw_params)
//!   │
//!   ├─ resolve action ─────────────── CONNECTION_ACTION_NOT_FOUND
//!   ├─ for each declared input, in order:
//!   │    default → required? ───────── CONNECTION_ACTION_PARAM_DEFAULT / _REQUIRED
//!   │    formatter ─────────────────── CONNECTION_ACTION_PARAM_FORMATTING
//!   │    validator ─────────────────── CONNECTION_ACTION_PARAM_VALIDATION
//!   ├─ drop undeclared keys
//!   └─ action.run(params) ─────────── CONNECTION_ACTION_RUN (unless already typed)
//! ```
//!
//! The first failing field stops the pipeline; errors are never aggregated.

use crate::framework::action::{Action, InputDefault, Params};
use crate::framework::error::{BoxError, ErrorType, TypedError};
use crate::framework::registry::ActionRegistry;
use crate::framework::services::ServiceTable;
use crate::framework::session::{SessionData, SessionStore, SESSION_SERVICE};
use futures::FutureExt;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Name under which the action registry is published.
pub const ACTIONS_SERVICE: &str = "actions";

/// Per-request execution context.
pub struct Connection {
    id: String,
    kind: String,
    remote_ip: String,
    raw_params: Params,
    session: Option<SessionData>,
    session_loaded: bool,
    services: Arc<ServiceTable>,
}

impl Connection {
    /// Creates a connection. Without an `id` from the caller a fresh UUID is used.
    pub fn new(
        kind: impl Into<String>,
        remote_ip: impl Into<String>,
        id: Option<String>,
        services: Arc<ServiceTable>,
    ) -> Self {
        Self {
            id: id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            kind: kind.into(),
            remote_ip: remote_ip.into(),
            raw_params: Params::new(),
            session: None,
            session_loaded: false,
            services,
        }
    }

    /// Session-correlation token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the front end that created this connection.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    /// Parameters as received by the most recent [`act`](Self::act) call.
    pub fn raw_params(&self) -> &Params {
        &self.raw_params
    }

    pub fn services(&self) -> &Arc<ServiceTable> {
        &self.services
    }

    /// Runs the dispatch pipeline. Never panics: every failure, including a panic
    /// inside the action, comes back as a [`TypedError`].
    pub async fn act(
        &mut self,
        action_name: Option<&str>,
        raw_params: Params,
        method: &str,
        url: &str,
    ) -> Result<Value, TypedError> {
        let started = Instant::now();
        self.raw_params = raw_params;

        let result = self.dispatch(action_name).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let action = action_name.unwrap_or("-");
        match &result {
            Ok(_) => info!(
                action,
                connection = %self.id,
                kind = %self.kind,
                method,
                url,
                duration_ms,
                "Action ok"
            ),
            Err(e) => warn!(
                action,
                connection = %self.id,
                kind = %self.kind,
                method,
                url,
                duration_ms,
                error = %e,
                "Action failed"
            ),
        }
        result
    }

    async fn dispatch(&mut self, action_name: Option<&str>) -> Result<Value, TypedError> {
        let Some(name) = action_name else {
            return Err(TypedError::new(
                "no action matched the request",
                ErrorType::ConnectionActionNotFound,
            ));
        };

        let registry = self
            .services
            .get::<ActionRegistry>(ACTIONS_SERVICE)
            .ok_or_else(|| {
                TypedError::new(
                    "action registry is not available",
                    ErrorType::ConnectionServerError,
                )
            })?;
        let action = registry.resolve(name)?;

        let params = prepare_params(action.as_ref(), &self.raw_params)?;

        // A panicking handler must not take the serving task down with it.
        let outcome = AssertUnwindSafe(action.run(params, self)).catch_unwind().await;
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(into_run_error(e)),
            Err(_) => Err(TypedError::new(
                format!("action `{name}` panicked"),
                ErrorType::ConnectionActionRun,
            )),
        }
    }

    /// The session for this connection, loaded from the session store on first use.
    pub async fn session(&mut self) -> Result<Option<&SessionData>, TypedError> {
        if !self.session_loaded {
            let store = self.session_store()?;
            self.session = store.load(&self.id).await?;
            self.session_loaded = true;
        }
        Ok(self.session.as_ref())
    }

    /// Merges `patch` into the stored session and returns the updated data.
    pub async fn update_session(&mut self, patch: SessionData) -> Result<&SessionData, TypedError> {
        let store = self.session_store()?;
        let updated = store.update(&self.id, patch).await?;
        self.session_loaded = true;
        Ok(&*self.session.insert(updated))
    }

    /// Removes the stored session.
    pub async fn destroy_session(&mut self) -> Result<(), TypedError> {
        let store = self.session_store()?;
        store.destroy(&self.id).await?;
        self.session = None;
        self.session_loaded = true;
        Ok(())
    }

    fn session_store(&self) -> Result<Arc<dyn SessionStore>, TypedError> {
        self.services
            .get::<Arc<dyn SessionStore>>(SESSION_SERVICE)
            .map(|store| (*store).clone())
            .ok_or_else(|| {
                TypedError::new("session store is not available", ErrorType::ConnectionServerError)
            })
    }
}

/// Steps 2 and 3 of the pipeline: defaults, required check, formatting,
/// validation, and dropping undeclared keys.
fn prepare_params(action: &dyn Action, raw_params: &Params) -> Result<Params, TypedError> {
    let mut params = Params::new();

    for (key, input) in action.inputs().iter() {
        let raw = match raw_params.get(key) {
            Some(value) => value.clone(),
            None => match &input.default {
                Some(InputDefault::Value(value)) => value.clone(),
                Some(InputDefault::Computed(compute)) => guarded(|| compute()).map_err(|reason| {
                    TypedError::new(
                        format!("failed to compute default for `{key}`: {reason}"),
                        ErrorType::ConnectionActionParamDefault,
                    )
                    .with_key(key)
                })?,
                None if input.required => {
                    return Err(TypedError::new(
                        format!("{key} is a required parameter for this action"),
                        ErrorType::ConnectionActionParamRequired,
                    )
                    .with_key(key));
                }
                None => continue,
            },
        };

        let value = match &input.formatter {
            Some(format) => guarded(|| format(&raw)).map_err(|reason| {
                TypedError::new(
                    format!("{key} could not be formatted: {reason}"),
                    ErrorType::ConnectionActionParamFormatting,
                )
                .with_key(key)
                .with_value(raw.clone())
            })?,
            None => raw,
        };

        if let Some(validate) = &input.validator {
            guarded(|| validate(&value)).map_err(|reason| {
                TypedError::new(reason, ErrorType::ConnectionActionParamValidation)
                    .with_key(key)
                    .with_value(value.clone())
            })?;
        }

        params.insert(key.to_string(), value);
    }

    Ok(params)
}

/// Runs a user-supplied formatter, validator or default, turning a panic into
/// an ordinary failure reason.
fn guarded<T>(hook: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(hook)).unwrap_or_else(|_| Err("panicked".to_string()))
}

fn into_run_error(error: BoxError) -> TypedError {
    match error.downcast::<TypedError>() {
        Ok(typed) => *typed,
        Err(other) => TypedError::new(other.to_string(), ErrorType::ConnectionActionRun),
    }
}
