//! # Typed Errors
//!
//! Every failure that leaves the runtime, whether during boot or while serving a
//! request, is a [`TypedError`]: a human message plus a machine-readable
//! [`ErrorType`], optionally pointing at the offending parameter `key` and `value`.
//!
//! Front ends never inspect messages. They branch on [`TypedError::kind`] alone
//! (e.g. to pick an HTTP status code).

use serde::Serialize;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Boxed error returned by action handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The machine-readable category of a [`TypedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // general
    ServerInitialization,
    ServerStart,
    ServerStop,

    // boot-time validation
    ConfigError,
    InitializerValidation,
    ActionValidation,
    TaskValidation,
    ServerValidation,

    // request pipeline
    ConnectionServerError,
    ConnectionActionNotFound,
    ConnectionActionParamRequired,
    ConnectionActionParamDefault,
    ConnectionActionParamValidation,
    ConnectionActionParamFormatting,
    ConnectionActionRun,
}

impl ErrorType {
    /// The wire name of this kind, e.g. `CONNECTION_ACTION_RUN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ServerInitialization => "SERVER_INITIALIZATION",
            ErrorType::ServerStart => "SERVER_START",
            ErrorType::ServerStop => "SERVER_STOP",
            ErrorType::ConfigError => "CONFIG_ERROR",
            ErrorType::InitializerValidation => "INITIALIZER_VALIDATION",
            ErrorType::ActionValidation => "ACTION_VALIDATION",
            ErrorType::TaskValidation => "TASK_VALIDATION",
            ErrorType::ServerValidation => "SERVER_VALIDATION",
            ErrorType::ConnectionServerError => "CONNECTION_SERVER_ERROR",
            ErrorType::ConnectionActionNotFound => "CONNECTION_ACTION_NOT_FOUND",
            ErrorType::ConnectionActionParamRequired => "CONNECTION_ACTION_PARAM_REQUIRED",
            ErrorType::ConnectionActionParamDefault => "CONNECTION_ACTION_PARAM_DEFAULT",
            ErrorType::ConnectionActionParamValidation => "CONNECTION_ACTION_PARAM_VALIDATION",
            ErrorType::ConnectionActionParamFormatting => "CONNECTION_ACTION_PARAM_FORMATTING",
            ErrorType::ConnectionActionRun => "CONNECTION_ACTION_RUN",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged error value.
///
/// # Architecture Note
/// `TypedError` is immutable once built. The builder-style `with_*` methods consume
/// `self`, so an error is fully described before it is handed to anyone.
///
/// The construction site is always recorded. A full backtrace is added when
/// `RUST_BACKTRACE` enables capturing. Either one surfaces as the `stack` field
/// when a front end frames the error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct TypedError {
    message: String,
    kind: ErrorType,
    key: Option<String>,
    value: Option<Value>,
    trace: Arc<Backtrace>,
    location: &'static Location<'static>,
}

impl TypedError {
    #[track_caller]
    pub fn new(message: impl Into<String>, kind: ErrorType) -> Self {
        Self {
            message: message.into(),
            kind,
            key: None,
            value: None,
            trace: Arc::new(Backtrace::capture()),
            location: Location::caller(),
        }
    }

    /// Attaches the name of the offending field.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches the offending value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorType {
        self.kind
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Where the error was built: the `file:line:column` of the construction
    /// site, followed by the backtrace when one was captured.
    pub fn stack(&self) -> String {
        match self.trace.status() {
            BacktraceStatus::Captured => format!("at {}\n{}", self.location, self.trace),
            _ => format!("at {}", self.location),
        }
    }

    /// Re-labels `self` as a failure of a wider operation, keeping the original message.
    #[track_caller]
    pub fn wrap(self, context: impl fmt::Display, kind: ErrorType) -> Self {
        let mut wrapped = TypedError::new(format!("{context}: {}", self.message), kind);
        wrapped.key = self.key;
        wrapped.value = self.value;
        wrapped
    }
}

/// JSON shape of a framed error (`{"message", "type", "key", "value", "stack"}`).
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub message: &'a str,
    #[serde(rename = "type")]
    pub kind: ErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a Value>,
    pub stack: String,
}

impl<'a> From<&'a TypedError> for ErrorBody<'a> {
    fn from(error: &'a TypedError) -> Self {
        ErrorBody {
            message: &error.message,
            kind: error.kind,
            key: error.key.as_deref(),
            value: error.value.as_ref(),
            stack: error.stack(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_includes_kind() {
        let err = TypedError::new("User not found", ErrorType::ConnectionActionRun);
        assert_eq!(err.to_string(), "[CONNECTION_ACTION_RUN] User not found");
    }

    #[test]
    fn test_kind_serializes_as_wire_name() {
        let encoded = serde_json::to_value(ErrorType::ConnectionActionParamRequired).unwrap();
        assert_eq!(encoded, json!("CONNECTION_ACTION_PARAM_REQUIRED"));
        assert_eq!(
            ErrorType::ConnectionActionParamRequired.as_str(),
            "CONNECTION_ACTION_PARAM_REQUIRED"
        );
    }

    #[test]
    fn test_error_body_skips_absent_fields() {
        let err =
            TypedError::new("missing", ErrorType::ConnectionActionParamRequired).with_key("email");
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(body["type"], "CONNECTION_ACTION_PARAM_REQUIRED");
        assert_eq!(body["key"], "email");
        assert!(body.get("value").is_none());
        assert!(body["stack"].as_str().unwrap().contains("error.rs"));
    }

    #[test]
    fn test_stack_names_construction_site() {
        let line = line!() + 1;
        let err = TypedError::new("boom", ErrorType::ConnectionActionRun);
        let stack = err.stack();
        assert!(stack.starts_with("at "));
        assert!(stack.contains(&format!("error.rs:{line}:")));
        assert_eq!(err.clone().stack(), stack);
    }

    #[test]
    fn test_wrap_keeps_message_and_field() {
        let err = TypedError::new("boom", ErrorType::ConfigError)
            .with_key("port")
            .with_value(json!("abc"))
            .wrap("component `web` failed to start", ErrorType::ServerStart);
        assert_eq!(err.kind(), ErrorType::ServerStart);
        assert_eq!(err.message(), "component `web` failed to start: boom");
        assert_eq!(err.key(), Some("port"));
        assert_eq!(err.value(), Some(&json!("abc")));
    }
}
