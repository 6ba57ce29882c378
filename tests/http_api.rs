//! HTTP surface driven through the router and the stream frame channel,
//! without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use model_fanout::config::ServerConfig;
use model_fanout::http::websocket::{stream_frames, StreamFrame};
use model_fanout::http::{AppState, BackendSummary, HttpServer, QueryResponse, X_REQUEST_ID};
use model_fanout::orchestrator::{BackendState, StatusEvent};
use tower::ServiceExt;

mod common;
use common::ScriptedBackend;

fn router() -> Router {
    let orchestrator = common::orchestrator(&[
        ("alpha", ScriptedBackend::succeeding("alpha", 2)),
        ("beta", ScriptedBackend::succeeding("beta", 3)),
    ]);
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    HttpServer::build_router(&ServerConfig::default(), state)
}

fn post_query(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_query_returns_ranked_items_and_statuses() {
    let response = router()
        .oneshot(post_query(r#"{"prompt":"what is rust?"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));

    let body: QueryResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.responses.len(), 5);
    for pair in body.responses.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    assert!(body
        .responses
        .iter()
        .all(|item| item.origin_backend.is_some()));

    assert_eq!(body.statuses.len(), 4);
    assert_eq!(
        body.statuses
            .iter()
            .filter(|s| s.state == BackendState::Success)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let request = Request::builder()
        .uri("/health")
        .header(X_REQUEST_ID, "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[X_REQUEST_ID], "trace-me");
}

#[tokio::test]
async fn test_blank_prompt_is_rejected() {
    let response = router()
        .oneshot(post_query(r#"{"prompt":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("prompt"));
}

#[tokio::test]
async fn test_backends_lists_limiter_state() {
    let request = Request::builder()
        .uri("/backends")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let backends: Vec<BackendSummary> =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    let names: Vec<_> = backends.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["alpha", "beta"]);
    assert!(backends.iter().all(|b| b.capacity == 100.0 && b.queued == 0));
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

fn mixed_orchestrator(backends: [Arc<ScriptedBackend>; 3]) -> Arc<model_fanout::Orchestrator> {
    let [alpha, beta, gamma] = backends;
    Arc::new(common::orchestrator(&[
        ("alpha", alpha),
        ("beta", beta),
        ("gamma", gamma),
    ]))
}

#[tokio::test(start_paused = true)]
async fn test_stream_sends_statuses_then_result() {
    let orchestrator = mixed_orchestrator([
        ScriptedBackend::succeeding("alpha", 2),
        ScriptedBackend::failing("beta"),
        ScriptedBackend::slow("gamma", Duration::from_secs(1)),
    ]);

    let mut frames = stream_frames(orchestrator, "stream me".to_string());
    let mut received = Vec::new();
    while let Some(frame) = frames.recv().await {
        received.push(frame);
    }

    let Some(StreamFrame::Result { responses }) = received.pop() else {
        panic!("last frame was not the result: {received:?}");
    };
    assert_eq!(responses.len(), 3);
    for pair in responses.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }

    let events: Vec<StatusEvent> = received
        .into_iter()
        .map(|frame| match frame {
            StreamFrame::Status(event) => event,
            StreamFrame::Result { .. } => panic!("result frame before the end"),
        })
        .collect();
    assert_eq!(events.len(), 6);

    for (name, terminal) in [
        ("alpha", BackendState::Success),
        ("beta", BackendState::Error),
        ("gamma", BackendState::Success),
    ] {
        let pending_at = events
            .iter()
            .position(|e| e.backend == name && e.state == BackendState::Pending)
            .unwrap();
        let terminal_at = events
            .iter()
            .position(|e| e.backend == name && e.state.is_terminal())
            .unwrap();
        assert!(pending_at < terminal_at, "{name} resolved before pending");
        assert_eq!(events[terminal_at].state, terminal);
    }
}

#[tokio::test(start_paused = true)]
async fn test_stream_fan_out_survives_a_closed_receiver() {
    let alpha = ScriptedBackend::succeeding("alpha", 1);
    let beta = ScriptedBackend::failing("beta");
    let gamma = ScriptedBackend::slow("gamma", Duration::from_secs(1));
    let orchestrator = mixed_orchestrator([alpha.clone(), beta.clone(), gamma.clone()]);

    let mut frames = stream_frames(orchestrator, "going away".to_string());
    assert!(matches!(frames.recv().await, Some(StreamFrame::Status(_))));
    drop(frames);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(alpha.calls(), 1);
    assert_eq!(beta.calls(), 3);
    assert_eq!(gamma.calls(), 1);
}
