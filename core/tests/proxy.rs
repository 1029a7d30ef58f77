//! End-to-end tests driving the dev server router against a live local
//! upstream.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use devrelay_core::config::{Config, RuleConfig};
use devrelay_core::proxy::{ProxyServer, RuleSet};

async fn echo(request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
    Json(serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "host": parts.headers.get(header::HOST).and_then(|v| v.to_str().ok()),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn down() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "down")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/down", get(down))
        .route("/slow", get(slow))
        .fallback(echo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn tca_rule(target: String) -> RuleConfig {
    RuleConfig {
        prefix: "/tca".to_string(),
        target,
        change_origin: true,
        secure: true,
        segment_boundary: false,
        rewrite: None,
    }
}

fn dev_router(rule: RuleConfig, request_timeout: u64) -> Router {
    let mut config = Config::default();
    config.static_files.root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/static");
    config.timeouts.request_timeout = request_timeout;
    let rules = RuleSet::compile(&[rule]).unwrap();
    ProxyServer::new(&config, rules).router()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn forwards_with_prefix_stripped() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/tca/foo/bar?x=1")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let body = body_json(response).await;
    assert_eq!(body["method"], "GET");
    assert_eq!(body["path"], "/foo/bar");
    assert_eq!(body["query"], "x=1");
}

#[tokio::test]
async fn change_origin_sends_upstream_host() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/tca/foo")
        .header(header::HOST, "localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let body = body_json(response).await;
    assert_eq!(body["host"], upstream.to_string());
}

#[tokio::test]
async fn inbound_host_preserved_without_change_origin() {
    let upstream = spawn_upstream().await;
    let mut rule = tca_rule(format!("http://{upstream}"));
    rule.change_origin = false;
    let router = dev_router(rule, 5);

    let request = Request::builder()
        .uri("/tca/foo")
        .header(header::HOST, "localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let body = body_json(response).await;
    assert_eq!(body["host"], "localhost:3000");
}

#[tokio::test]
async fn bare_prefix_hits_upstream_root() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/tca")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["path"], "/");
}

#[tokio::test]
async fn loose_match_forwards_without_separator() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/tcafoo")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["path"], "/foo");
}

#[tokio::test]
async fn segment_boundary_falls_through_to_static() {
    let upstream = spawn_upstream().await;
    let mut rule = tca_rule(format!("http://{upstream}"));
    rule.segment_boundary = true;
    let router = dev_router(rule, 5);

    let request = Request::builder()
        .uri("/tcafoo")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_matching_request_served_from_static_root() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/index.html")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("devrelay static fixture"));
}

#[tokio::test]
async fn post_body_is_forwarded() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let payload = "hello upstream";
    let request = Request::builder()
        .method("POST")
        .uri("/tca/submit")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, payload.len().to_string())
        .body(Body::from(payload))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/submit");
    assert_eq!(body["body"], payload);
}

#[tokio::test]
async fn upstream_error_status_is_relayed() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 5);

    let request = Request::builder()
        .uri("/tca/down")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "down");
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let router = dev_router(tca_rule("http://127.0.0.1:9".to_string()), 5);

    let request = Request::builder()
        .uri("/tca/foo")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn upstream_timeout_is_gateway_timeout() {
    let upstream = spawn_upstream().await;
    let router = dev_router(tca_rule(format!("http://{upstream}")), 1);

    let request = Request::builder()
        .uri("/tca/slow")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
