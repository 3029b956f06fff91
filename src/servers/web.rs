//! # Web Front End
//!
//! Serves three kinds of request from one listener:
//!
//! | Path | Handling |
//! |---|---|
//! | `{api_route}/...` | resolved to an action by method + route, run through [`Connection::act`] |
//! | `{asset_route}/...` | file under `assets_dir` |
//! | anything else | first existing page candidate under `pages_dir` |
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped ─start─▶ Starting ─bind ok─▶ Running ─stop─▶ Draining ─in-flight = 0─▶ Stopped
//!                     └──── bind error ──▶ Stopped
//! ```
//!
//! `stop` closes the listener first, so new connections are refused, and then
//! waits for every in-flight request to finish before it returns. Actions are
//! never cancelled mid-run.
//!
//! ## Response Framing
//!
//! Successful action responses are pretty-printed JSON and refresh the session
//! cookie. Failures are framed as `{"error": {message, type, key, value, stack}}`
//! with status 404 for `CONNECTION_ACTION_NOT_FOUND` and missing files, 500 for
//! everything else.

use crate::config::{Config, SessionConfig, WebConfig};
use crate::framework::{
    ActionRegistry, Connection, ErrorBody, ErrorType, HttpMethod, Initializer, Params, ServiceTable,
    TypedError, ACTIONS_SERVICE,
};
use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use std::any::Any;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::form_urlencoded;

/// Component name of the web server.
pub const WEB_SERVER: &str = "web";

const SERVER_NAME_HEADER: HeaderName = HeaderName::from_static("x-server-name");
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const PAGE_EXTENSIONS: [&str; 6] = ["htm", "html", "js", "jsx", "ts", "tsx"];

/// Lifecycle state of a [`WebServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Draining,
}

struct Inner {
    state: ServerState,
    local_addr: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

/// HTTP front end, registered with the orchestrator like any other component.
pub struct WebServer {
    shared: Arc<Shared>,
    in_flight: Arc<AtomicUsize>,
    inner: Mutex<Inner>,
}

/// Read-only settings every request handler needs.
struct Shared {
    web: WebConfig,
    session: SessionConfig,
    server_name: String,
}

#[derive(Clone)]
struct RequestContext {
    shared: Arc<Shared>,
    services: Arc<ServiceTable>,
}

impl WebServer {
    pub fn new(config: &Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                web: config.server.web.clone(),
                session: config.session.clone(),
                server_name: config.process.name.clone(),
            }),
            in_flight: Arc::new(AtomicUsize::new(0)),
            inner: Mutex::new(Inner {
                state: ServerState::Stopped,
                local_addr: None,
                shutdown: None,
                task: None,
            }),
        }
    }

    pub fn state(&self) -> ServerState {
        self.inner().state
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner().local_addr
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The full request router, with in-flight tracking, panic recovery and
    /// request tracing applied.
    pub fn router(&self, services: Arc<ServiceTable>) -> Router {
        let context = RequestContext {
            shared: self.shared.clone(),
            services,
        };
        let server_name = self.shared.server_name.clone();

        Router::new()
            .fallback(handle_request)
            .with_state(context)
            .layer(CatchPanicLayer::custom(move |_panic: Box<dyn Any + Send + 'static>| {
                let error =
                    TypedError::new("request handler panicked", ErrorType::ConnectionServerError);
                frame_error(&error, StatusCode::INTERNAL_SERVER_ERROR, &server_name)
            }))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(self.in_flight.clone(), track_in_flight))
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ServerState) {
        self.inner().state = state;
    }
}

#[async_trait]
impl Initializer for WebServer {
    fn name(&self) -> &str {
        WEB_SERVER
    }

    fn load_priority(&self) -> i32 {
        800
    }

    fn start_priority(&self) -> i32 {
        900
    }

    /// Front ends stop first so no request reaches a component that is already gone.
    fn stop_priority(&self) -> i32 {
        100
    }

    async fn start(&self, services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        {
            let mut inner = self.inner();
            if inner.state != ServerState::Stopped {
                return Err(TypedError::new(
                    format!("web server cannot start while {:?}", inner.state),
                    ErrorType::ServerStart,
                ));
            }
            inner.state = ServerState::Starting;
        }

        let web = &self.shared.web;
        let listener = match TcpListener::bind((web.host.as_str(), web.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                self.set_state(ServerState::Stopped);
                return Err(TypedError::new(
                    format!("cannot bind {}:{}: {e}", web.host, web.port),
                    ErrorType::ServerStart,
                ));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.set_state(ServerState::Stopped);
                return Err(TypedError::new(
                    format!("cannot read bound address: {e}"),
                    ErrorType::ServerStart,
                ));
            }
        };

        let app = self.router(services.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        {
            let mut inner = self.inner();
            inner.state = ServerState::Running;
            inner.local_addr = Some(local_addr);
            inner.shutdown = Some(shutdown_tx);
            inner.task = Some(task);
        }

        info!(
            address = %local_addr,
            api_route = %web.api_route,
            asset_route = %web.asset_route,
            "Web server listening"
        );
        Ok(())
    }

    async fn stop(&self, _services: &Arc<ServiceTable>) -> Result<(), TypedError> {
        let (shutdown, task) = {
            let mut inner = self.inner();
            if inner.state != ServerState::Running {
                return Ok(());
            }
            inner.state = ServerState::Draining;
            (inner.shutdown.take(), inner.task.take())
        };

        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }

        let poll = self.shared.web.drain_poll_interval();
        loop {
            let pending_requests = self.in_flight();
            if pending_requests == 0 {
                break;
            }
            info!(pending_requests, "Waiting for web server shutdown...");
            tokio::time::sleep(poll).await;
        }

        let outcome = match task {
            Some(task) => task.await,
            None => Ok(Ok(())),
        };

        {
            let mut inner = self.inner();
            inner.state = ServerState::Stopped;
            inner.local_addr = None;
        }

        match outcome {
            Ok(Ok(())) => {
                info!("Web server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(TypedError::new(
                format!("web server failed: {e}"),
                ErrorType::ServerStop,
            )),
            Err(e) => Err(TypedError::new(
                format!("web server task failed: {e}"),
                ErrorType::ServerStop,
            )),
        }
    }
}

// =============================================================================
// REQUEST HANDLING
// =============================================================================

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn track_in_flight(
    State(counter): State<Arc<AtomicUsize>>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = InFlightGuard::enter(counter);
    next.run(request).await
}

async fn handle_request(State(context): State<RequestContext>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let web = &context.shared.web;

    if let Some(rest) = strip_route(&path, &web.api_route) {
        let rest = rest.to_string();
        return handle_action(&context, rest, request).await;
    }
    if let Some(rest) = strip_route(&path, &web.asset_route) {
        return handle_asset(&context, rest).await;
    }
    handle_page(&context, &path).await
}

/// `Some(rest)` when `path` is `route` followed by `/...`; `rest` keeps the slash.
fn strip_route<'a>(path: &'a str, route: &str) -> Option<&'a str> {
    path.strip_prefix(route).filter(|rest| rest.starts_with('/'))
}

async fn handle_action(
    context: &RequestContext,
    action_path: String,
    request: Request,
) -> Response {
    let server_name = &context.shared.server_name;
    let method = request.method().as_str().to_string();
    let url = request.uri().to_string();
    let query = request.uri().query().map(str::to_string);
    let remote_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let connection_id = session_cookie(request.headers(), &context.shared.session.cookie_name);
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable request body");
            Bytes::new()
        }
    };

    let registry = context.services.get::<ActionRegistry>(ACTIONS_SERVICE);
    let binding = match (registry, method.parse::<HttpMethod>()) {
        (Some(registry), Ok(http_method)) => registry.resolve_by_binding(http_method, &action_path),
        _ => None,
    };

    let mut params = Params::new();
    let action_name = binding.map(|matched| {
        params.extend(matched.path_params);
        matched.action.name().to_string()
    });
    params.extend(body_params(&body, is_json));
    if let Some(query) = &query {
        params.extend(form_params(query.as_bytes()));
    }

    let mut connection = Connection::new("web", remote_ip, connection_id, context.services.clone());
    match connection.act(action_name.as_deref(), params, &method, &url).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(body) => {
                let mut response = json_response(StatusCode::OK, body, server_name);
                let cookie = format!(
                    "{}={}; Max-Age={}",
                    context.shared.session.cookie_name,
                    connection.id(),
                    context.shared.session.ttl_secs
                );
                if let Ok(cookie) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().insert(SET_COOKIE, cookie);
                }
                response
            }
            Err(e) => {
                let error = TypedError::new(
                    format!("cannot serialize response: {e}"),
                    ErrorType::ConnectionServerError,
                );
                frame_error(&error, StatusCode::INTERNAL_SERVER_ERROR, server_name)
            }
        },
        Err(error) => frame_error(&error, status_for(error.kind()), server_name),
    }
}

async fn handle_asset(context: &RequestContext, asset_path: &str) -> Response {
    let relative = asset_path.trim_start_matches('/');
    if !is_safe_relative(relative) {
        return not_found(asset_path, &context.shared.server_name);
    }
    let file = Path::new(&context.shared.web.assets_dir).join(relative);
    match read_regular_file(&file).await {
        Some(contents) => file_response(&file, contents, &context.shared.server_name),
        None => not_found(asset_path, &context.shared.server_name),
    }
}

async fn handle_page(context: &RequestContext, path: &str) -> Response {
    if !is_safe_relative(path.trim_start_matches('/')) {
        return not_found(path, &context.shared.server_name);
    }
    for candidate in page_candidates(&context.shared.web.pages_dir, path) {
        if let Some(contents) = read_regular_file(&candidate).await {
            return file_response(&candidate, contents, &context.shared.server_name);
        }
    }
    not_found(path, &context.shared.server_name)
}

/// Files that may serve `path`, in lookup order.
pub fn page_candidates(pages_dir: &str, path: &str) -> Vec<PathBuf> {
    let base = format!("{}{}", pages_dir.trim_end_matches('/'), path);
    let index_base = if base.ends_with('/') {
        format!("{base}index")
    } else {
        format!("{base}/index")
    };

    let mut candidates = vec![PathBuf::from(&base)];
    candidates.extend(
        PAGE_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{base}.{ext}"))),
    );
    candidates.extend(
        PAGE_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{index_base}.{ext}"))),
    );
    candidates
}

fn is_safe_relative(path: &str) -> bool {
    !path.split(['/', '\\']).any(|segment| segment == "..")
}

async fn read_regular_file(path: &Path) -> Option<Vec<u8>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    tokio::fs::read(path).await.ok()
}

fn body_params(body: &[u8], is_json: bool) -> Params {
    if body.is_empty() {
        return Params::new();
    }
    if is_json {
        return match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => Params::new(),
        };
    }
    form_params(body)
}

fn form_params(input: &[u8]) -> Params {
    form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn status_for(kind: ErrorType) -> StatusCode {
    match kind {
        ErrorType::ConnectionActionNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// RESPONSE FRAMING
// =============================================================================

fn not_found(path: &str, server_name: &str) -> Response {
    let error = TypedError::new(format!("file not found: {path}"), ErrorType::ConnectionServerError)
        .with_key("file")
        .with_value(Value::String(path.to_string()));
    frame_error(&error, StatusCode::NOT_FOUND, server_name)
}

fn frame_error(error: &TypedError, status: StatusCode, server_name: &str) -> Response {
    let body = json!({ "error": ErrorBody::from(error) });
    json_response(status, format!("{body}\n"), server_name)
}

fn json_response(status: StatusCode, body: String, server_name: &str) -> Response {
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    insert_server_name(&mut response, server_name);
    response
}

fn file_response(path: &Path, contents: Vec<u8>, server_name: &str) -> Response {
    let mut response = (StatusCode::OK, Body::from(contents)).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type(path)));
    insert_server_name(&mut response, server_name);
    response
}

fn insert_server_name(response: &mut Response, server_name: &str) {
    if let Ok(value) = HeaderValue::from_str(server_name) {
        response.headers_mut().insert(SERVER_NAME_HEADER, value);
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("htm" | "html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "jsx" | "mjs") => "text/javascript; charset=utf-8",
        Some("ts" | "tsx") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
