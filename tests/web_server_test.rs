use action_runtime::actions::default_actions;
use action_runtime::config::Config;
use action_runtime::framework::mock::FnAction;
use action_runtime::framework::{
    Action, ActionRegistry, ErrorType, HttpMethod, Initializer, Input, Inputs, ServiceTable,
    WebRoute, ACTIONS_SERVICE,
};
use action_runtime::initializers::{ActionsInitializer, ProcessInitializer, SessionInitializer};
use action_runtime::lifecycle::{Orchestrator, OrchestratorState};
use action_runtime::servers::{ServerState, WebServer};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestServer {
    orchestrator: Orchestrator,
    web: Arc<WebServer>,
    base: String,
    assets: TempDir,
    pages: TempDir,
}

async fn boot(extra_actions: Vec<Arc<dyn Action>>) -> TestServer {
    let assets = tempfile::tempdir().unwrap();
    let pages = tempfile::tempdir().unwrap();
    let assets_dir = assets.path().to_string_lossy().into_owned();
    let pages_dir = pages.path().to_string_lossy().into_owned();

    let config = Config::from_lookup(|key| match key {
        "PROCESS_NAME" => Some("test-server".to_string()),
        "WEB_SERVER_HOST" => Some("127.0.0.1".to_string()),
        "WEB_SERVER_PORT" => Some("0".to_string()),
        "WEB_SERVER_ASSETS_DIR" => Some(assets_dir.clone()),
        "WEB_SERVER_PAGES_DIR" => Some(pages_dir.clone()),
        "WEB_SERVER_DRAIN_POLL_MS" => Some("10".to_string()),
        _ => None,
    })
    .unwrap();

    let mut actions = default_actions();
    actions.extend(extra_actions);

    let web = Arc::new(WebServer::new(&config));
    let mut orchestrator = Orchestrator::new();
    orchestrator
        .register(Arc::new(ProcessInitializer::new(config.process.name.clone())))
        .unwrap();
    orchestrator.register(Arc::new(ActionsInitializer::new(actions))).unwrap();
    orchestrator
        .register(Arc::new(SessionInitializer::new(&config.session)))
        .unwrap();
    orchestrator.register(web.clone()).unwrap();
    orchestrator.boot().await.unwrap();

    let base = format!("http://{}", web.local_addr().unwrap());
    TestServer {
        orchestrator,
        web,
        base,
        assets,
        pages,
    }
}

fn echo_id() -> Arc<dyn Action> {
    Arc::new(
        FnAction::new("echoId", |params, _| Ok(Value::Object(params)))
            .inputs(Inputs::new().input("id", Input::required()))
            .web(WebRoute::new(HttpMethod::Put, "/echo/(?P<id>[^/]+)")),
    )
}

#[tokio::test]
async fn test_action_success_framing() {
    let mut server = boot(vec![]).await;

    let response = reqwest::get(format!("{}/api/status", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["x-server-name"], "test-server");
    let cookie = headers["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("__session="));
    assert!(cookie.ends_with("; Max-Age=86400"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "test-server");
    assert_eq!(body["pid"], json!(std::process::id()));
    assert!(body["uptime"].is_u64());

    server.orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_action_is_404() {
    let mut server = boot(vec![]).await;

    let response = reqwest::get(format!("{}/api/nothing-here", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("set-cookie").is_none());
    let text = response.text().await.unwrap();
    assert!(text.ends_with('\n'));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"]["type"], "CONNECTION_ACTION_NOT_FOUND");
    let stack = body["error"]["stack"].as_str().unwrap();
    assert!(stack.starts_with("at "));
    assert!(stack.contains(".rs:"));

    // Known route, wrong method.
    let response = reqwest::Client::new()
        .post(format!("{}/api/status", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_param_errors_are_500() {
    let mut server = boot(vec![]).await;

    let response = reqwest::Client::new()
        .put(format!("{}/api/session", server.base))
        .form(&[("email", "not-an-email")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "CONNECTION_ACTION_PARAM_VALIDATION");
    assert_eq!(body["error"]["key"], "email");
    assert_eq!(body["error"]["message"], "This is not a valid email");
    assert!(body["error"]["stack"].is_string());

    server.orchestrator.shutdown().await.unwrap();
}

/// Path params, then body, then query; later sources win.
#[tokio::test]
async fn test_param_precedence() {
    let mut server = boot(vec![echo_id()]).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/echo/from-path", server.base);

    let only_path: Value = client.put(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(only_path, json!({"id": "from-path"}));

    let with_body: Value = client
        .put(&url)
        .json(&json!({"id": "from-body"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(with_body, json!({"id": "from-body"}));

    let with_query: Value = client
        .put(format!("{url}?id=from-query"))
        .json(&json!({"id": "from-body"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(with_query, json!({"id": "from-query"}));

    // Malformed JSON is ignored rather than rejected.
    let malformed: Value = client
        .put(&url)
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(malformed, json!({"id": "from-path"}));

    server.orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_session_cookie_round_trip() {
    let mut server = boot(vec![]).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/session", server.base);

    let created = client
        .put(&url)
        .form(&[
            ("email", "Ada@Example.com"),
            ("password", "correct horse"),
            ("remember", "1"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);
    let cookie = created.headers()["set-cookie"].to_str().unwrap().to_string();
    let session_cookie = cookie.split(';').next().unwrap().to_string();

    let viewed: Value = client
        .get(&url)
        .header("cookie", &session_cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        viewed,
        json!({"session": {"email": "ada@example.com", "remember": true}})
    );

    let anonymous: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(anonymous, json!({"session": null}));

    server.orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_assets() {
    let mut server = boot(vec![]).await;
    std::fs::create_dir_all(server.assets.path().join("css")).unwrap();
    std::fs::write(server.assets.path().join("css/app.css"), "body { margin: 0 }").unwrap();

    let response = reqwest::get(format!("{}/assets/css/app.css", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/css; charset=utf-8");
    assert_eq!(response.text().await.unwrap(), "body { margin: 0 }");

    let response = reqwest::get(format!("{}/assets/css/missing.css", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "CONNECTION_SERVER_ERROR");

    // Directories are not files.
    let response = reqwest::get(format!("{}/assets/css", server.base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_page_candidates() {
    let mut server = boot(vec![]).await;
    let pages = server.pages.path();
    std::fs::create_dir_all(pages.join("about")).unwrap();
    std::fs::write(pages.join("about.html"), "<h1>about.html</h1>").unwrap();
    std::fs::write(pages.join("about/index.htm"), "<h1>about/index.htm</h1>").unwrap();
    std::fs::create_dir_all(pages.join("docs")).unwrap();
    std::fs::write(pages.join("docs/index.tsx"), "export default () => null").unwrap();
    std::fs::write(pages.join("index.html"), "<h1>home</h1>").unwrap();

    let about = reqwest::get(format!("{}/about", server.base)).await.unwrap();
    assert_eq!(about.status(), StatusCode::OK);
    assert_eq!(about.text().await.unwrap(), "<h1>about.html</h1>");

    let docs = reqwest::get(format!("{}/docs", server.base)).await.unwrap();
    assert_eq!(docs.status(), StatusCode::OK);
    assert_eq!(docs.text().await.unwrap(), "export default () => null");

    let home = reqwest::get(format!("{}/", server.base)).await.unwrap();
    assert_eq!(home.text().await.unwrap(), "<h1>home</h1>");

    let missing = reqwest::get(format!("{}/nowhere", server.base)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    server.orchestrator.shutdown().await.unwrap();
}

/// Stopping refuses new connections but lets the in-flight request finish.
#[tokio::test]
async fn test_stop_drains_in_flight_requests() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let slow: Arc<dyn Action> = Arc::new(
        FnAction::new("slow", move |_, _| {
            flag.store(true, Ordering::SeqCst);
            Ok(json!({"done": true}))
        })
        .delay(Duration::from_millis(300))
        .web(WebRoute::new(HttpMethod::Get, "/slow")),
    );
    let TestServer {
        mut orchestrator,
        web,
        base,
        ..
    } = boot(vec![slow]).await;

    let request = tokio::spawn(reqwest::get(format!("{base}/api/slow")));
    for _ in 0..200 {
        if web.in_flight() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(web.in_flight(), 1);

    let shutdown = tokio::spawn(async move {
        let outcome = orchestrator.shutdown().await;
        (orchestrator, outcome)
    });
    for _ in 0..200 {
        if web.state() == ServerState::Draining {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(web.state(), ServerState::Draining);

    // The listener closes as soon as draining begins.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let mut refused = false;
    for _ in 0..20 {
        if client.get(format!("{base}/api/status")).send().await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(refused);
    assert!(!finished.load(Ordering::SeqCst));
    assert_eq!(web.state(), ServerState::Draining);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (orchestrator, outcome) = shutdown.await.unwrap();
    outcome.unwrap();
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(web.state(), ServerState::Stopped);
    assert_eq!(web.in_flight(), 0);
    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let mut server = boot(vec![]).await;
    let services = server.orchestrator.services().unwrap().clone();

    let err = server.web.start(&services).await.unwrap_err();
    assert_eq!(err.kind(), ErrorType::ServerStart);
    assert_eq!(server.web.state(), ServerState::Running);

    server.orchestrator.shutdown().await.unwrap();
    // Stopping a stopped server is a no-op.
    server.web.stop(&services).await.unwrap();
}

#[tokio::test]
async fn test_router_without_listener() {
    let mut registry = ActionRegistry::new();
    registry.register(echo_id()).unwrap();
    let mut table = ServiceTable::new();
    table.provide(ACTIONS_SERVICE, registry).unwrap();
    let web = WebServer::new(&Config::default());

    let response = web
        .router(Arc::new(table))
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/echo/42?extra=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-server-name"], "action-runtime");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"id": "42"}));
}
