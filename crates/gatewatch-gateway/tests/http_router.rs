#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use gatewatch_core::names::*;
use gatewatch_gateway::app_state::AppState;
use gatewatch_gateway::pipeline::Plugin;
use gatewatch_gateway::{config, router};

use plugin_support::{counter, latency, CommitThenFail, Fail, Streaming};

const CONFIG: &str = r#"
version: 1
gateway:
  max_body_bytes: 16
routes:
  - { prefix: "/order", rpc_type: "dubbo" }
"#;

fn app(yaml: &str) -> (AppState, Router) {
    let state = AppState::new(config::load_from_str(yaml).unwrap()).unwrap();
    let router = router::build_router(state.clone());
    (state, router)
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn request_through_pipeline_is_counted() {
    let (state, router) = app(CONFIG);

    let req = Request::builder()
        .method("POST")
        .uri("/order/findById?id=7")
        .body(Body::from("{\"id\":7}"))
        .unwrap();
    let (status, body) = send(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["method"], "POST");
    assert_eq!(v["path"], "/order/findById");
    assert_eq!(v["rpc_type"], "dubbo");
    assert_eq!(v["body_bytes"], 8);

    let reg = state.registry();
    assert_eq!(counter(reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(reg, REQUEST_TYPE_TOTAL, &["/order/findById", "dubbo"]), 1);
    assert_eq!(counter(reg, REQUEST_THROW_TOTAL, &[]), 0);
    assert_eq!(latency(reg, EXECUTE_LATENCY_MILLIS, &[]).0, 1);
    assert_eq!(latency(reg, EXECUTE_LATENCY_PATH_MILLIS, &["/order/findById"]).0, 1);
}

#[tokio::test]
async fn metrics_endpoint_renders_registry() {
    let (_state, router) = app(CONFIG);

    let (status, _) = send(router.clone(), get("/users/1")).await;
    assert_eq!(status, StatusCode::OK);

    let resp = router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();

    assert!(text.contains("# TYPE gatewatch_request_total counter"));
    assert!(text.contains("gatewatch_request_type_total{path=\"/users/1\",type=\"http\"} 1"));
    assert!(text.contains("gatewatch_execute_latency_millis_count 1"));
    assert!(text.contains("sentinel_request_restrict_total 0"));
}

#[tokio::test]
async fn ops_endpoints_are_not_counted() {
    let (state, router) = app(CONFIG);

    let (status, body) = send(router.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, _) = send(router.clone(), get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);

    state.set_draining();
    let (status, body) = send(router, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, b"draining");

    assert_eq!(counter(state.registry(), REQUEST_TOTAL, &[]), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected_before_the_pipeline() {
    let (state, router) = app(CONFIG);

    let req = Request::builder()
        .method("POST")
        .uri("/order/save")
        .header(header::CONTENT_LENGTH, "64")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();
    let (status, body) = send(router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(counter(state.registry(), REQUEST_TOTAL, &[]), 0);
}

#[tokio::test]
async fn failing_stage_maps_to_bad_gateway_and_counts_throw() {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let state = AppState::with_plugins(cfg, vec![Fail::after(0)]).unwrap();
    let router = router::build_router(state.clone());

    let (status, body) = send(router, get("/order/save")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["code"], "BAD_GATEWAY");

    let reg = state.registry();
    assert_eq!(counter(reg, REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(reg, REQUEST_THROW_TOTAL, &[]), 1);
    assert_eq!(latency(reg, EXECUTE_LATENCY_PATH_MILLIS, &["/order/save"]).0, 1);
}

#[tokio::test]
async fn failure_after_commit_keeps_the_committed_response() {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let stage: Arc<dyn Plugin> = Arc::new(CommitThenFail);
    let state = AppState::with_plugins(cfg, vec![stage]).unwrap();
    let router = router::build_router(state.clone());

    let (status, body) = send(router, get("/order/save")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["partial"], true);

    let reg = state.registry();
    assert_eq!(counter(reg, REQUEST_THROW_TOTAL, &[]), 1);
    assert_eq!(latency(reg, EXECUTE_LATENCY_MILLIS, &[]).0, 1);
}

#[tokio::test]
async fn streamed_body_is_timed_when_headers_go_out() {
    let cfg = config::load_from_str(CONFIG).unwrap();
    let state = AppState::with_plugins(cfg, vec![Streaming::after(0)]).unwrap();
    let router = router::build_router(state.clone());

    let resp = router.oneshot(get("/feed")).await.unwrap();
    assert_eq!(latency(state.registry(), EXECUTE_LATENCY_MILLIS, &[]).0, 1);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ab");
}

#[tokio::test]
async fn disabled_metrics_record_nothing() {
    let (state, router) = app("version: 1\nmetrics:\n  enabled: false\n");
    assert_eq!(state.pipeline().names(), vec!["echo"]);

    let (status, _) = send(router, get("/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counter(state.registry(), REQUEST_TOTAL, &[]), 0);
    assert_eq!(latency(state.registry(), EXECUTE_LATENCY_MILLIS, &[]).0, 0);
}

#[tokio::test]
async fn forwarding_sink_applies_off_the_request_path() {
    let (state, router) = app("version: 1\nmetrics:\n  forward_queue: 64\n");
    assert_eq!(state.pipeline().names(), vec!["metrics", "echo"]);

    let (status, _) = send(router, get("/a")).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..100 {
        if latency(state.registry(), EXECUTE_LATENCY_MILLIS, &[]).0 == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(counter(state.registry(), REQUEST_TOTAL, &[]), 1);
    assert_eq!(counter(state.registry(), REQUEST_TYPE_TOTAL, &["/a", "http"]), 1);
    assert_eq!(latency(state.registry(), EXECUTE_LATENCY_MILLIS, &[]).0, 1);
}

#[test]
fn forwarding_sink_needs_a_runtime() {
    let cfg = config::load_from_str("version: 1\nmetrics:\n  forward_queue: 8\n").unwrap();
    let err = AppState::new(cfg).err().expect("must fail");
    assert!(err.is_config());
}
