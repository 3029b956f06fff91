//! # Actions
//!
//! An action is a named request handler with a declared input schema. Front ends
//! never call an action directly: they hand raw parameters to
//! [`Connection::act`](crate::framework::Connection::act), which formats and
//! validates them against [`Action::inputs`] before calling [`Action::run`].
//!
//! ```rust,ignore
//! struct Echo;
//!
//! #[async_trait]
//! impl Action for Echo {
//!     fn name(&self) -> &str { "echo" }
//!
//!     fn inputs(&self) -> Inputs {
//!         Inputs::new().input("message", Input::required().formatter(ensure_string))
//!     }
//!
//!     fn web(&self) -> Option<WebRoute> {
//!         Some(WebRoute::new(HttpMethod::Get, "/echo"))
//!     }
//!
//!     async fn run(&self, params: Params, _connection: &mut Connection) -> Result<Value, BoxError> {
//!         Ok(json!({ "message": params["message"] }))
//!     }
//! }
//! ```

use crate::framework::connection::Connection;
use crate::framework::error::BoxError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Parameter map handed to actions and built by front ends.
pub type Params = serde_json::Map<String, Value>;

/// Turns a raw value into its typed form. `Err` carries a human-readable reason.
pub type Formatter = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Accepts or rejects a (formatted) value. `Err` carries a human-readable reason.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Value substituted when a parameter is absent.
#[derive(Clone)]
pub enum InputDefault {
    Value(Value),
    /// Produced on demand; a failure is reported as `CONNECTION_ACTION_PARAM_DEFAULT`.
    Computed(Arc<dyn Fn() -> Result<Value, String> + Send + Sync>),
}

impl fmt::Debug for InputDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            InputDefault::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Declaration of one action parameter.
#[derive(Clone, Default)]
pub struct Input {
    pub required: bool,
    pub default: Option<InputDefault>,
    pub formatter: Option<Formatter>,
    pub validator: Option<Validator>,
}

impl Input {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(InputDefault::Value(value.into()));
        self
    }

    pub fn default_with(
        mut self,
        compute: impl Fn() -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(InputDefault::Computed(Arc::new(compute)));
        self
    }

    pub fn formatter(
        mut self,
        formatter: impl Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("required", &self.required)
            .field("default", &self.default)
            .field("formatter", &self.formatter.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// An ordered input schema.
///
/// Declaration order is the order in which the pipeline checks parameters, and
/// therefore decides which missing or invalid field gets reported first.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    entries: Vec<(String, Input)>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, key: impl Into<String>, input: Input) -> Self {
        self.entries.push((key.into(), input));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Input)> {
        self.entries.iter().map(|(key, input)| (key.as_str(), input))
    }

    pub fn get(&self, key: &str) -> Option<&Input> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, input)| input)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// HTTP verbs an action can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// Binds an action to the web front end.
///
/// `route` is a regular expression matched against the whole path (below the API
/// prefix). Named groups such as `(?P<id>\d+)` become path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRoute {
    pub method: HttpMethod,
    pub route: String,
}

impl WebRoute {
    pub fn new(method: HttpMethod, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
        }
    }
}

/// A named, schema-validated request handler.
///
/// # Architecture Note
/// The four parts of the contract (name, inputs, binding, run) are explicit
/// trait items, so the registry can enumerate and validate every action at boot
/// rather than discovering problems on the first request.
///
/// `run` returns a boxed error: a [`TypedError`](crate::framework::TypedError)
/// passes through the pipeline unchanged, anything else is reported as
/// `CONNECTION_ACTION_RUN`.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Unique key of this action.
    fn name(&self) -> &str;

    /// Declared parameters, in checking order.
    fn inputs(&self) -> Inputs {
        Inputs::new()
    }

    /// Optional web binding.
    fn web(&self) -> Option<WebRoute> {
        None
    }

    /// Handles one request. `params` holds exactly the declared inputs that were present.
    async fn run(&self, params: Params, connection: &mut Connection) -> Result<Value, BoxError>;
}
