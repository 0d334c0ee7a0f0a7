//! OpenAI-compatible client tests against a local stand-in endpoint.

#![cfg(feature = "server")]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use vidsift::{
    AnalysisError, FrameAnalyzer, OpenAiVisionAnalyzer, VisionSettings, analysis::FALLBACK_ANALYSIS,
};

#[derive(Clone)]
struct Endpoint {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn completions(
    State(endpoint): State<Endpoint>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    endpoint.seen.lock().unwrap().push((authorization, request));
    (endpoint.status, Json(endpoint.reply.clone())).into_response()
}

/// Serve `reply` with `status` on an ephemeral port and return the API base.
async fn spawn_endpoint(status: StatusCode, reply: Value) -> (String, Endpoint) {
    let endpoint = Endpoint {
        status,
        reply,
        seen: Arc::default(),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(endpoint.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{address}/v1"), endpoint)
}

fn analyzer(api_base: String) -> OpenAiVisionAnalyzer {
    OpenAiVisionAnalyzer::new(VisionSettings {
        api_key: "sk-test".to_string(),
        api_base,
        ..VisionSettings::default()
    })
    .unwrap()
}

#[tokio::test]
async fn returns_first_choice_content() {
    let (api_base, endpoint) = spawn_endpoint(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "role": "assistant", "content": "Steady gaze." } }] }),
    )
    .await;

    let analysis = analyzer(api_base).analyze(&[0xff, 0xd8, 0xff, 0xe0]).await.unwrap();
    assert_eq!(analysis, "Steady gaze.");

    let seen = endpoint.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (authorization, request) = &seen[0];
    assert_eq!(authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(request["model"], "gpt-4o");
    assert_eq!(request["max_tokens"], 500);
    assert!(
        request["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .is_some_and(|url| url.starts_with("data:image/jpeg;base64,"))
    );
}

#[tokio::test]
async fn empty_choices_fall_back() {
    let (api_base, _endpoint) = spawn_endpoint(StatusCode::OK, json!({ "choices": [] })).await;

    let analysis = analyzer(api_base).analyze(b"jpeg").await.unwrap();
    assert_eq!(analysis, FALLBACK_ANALYSIS);
}

#[tokio::test]
async fn error_status_is_reported() {
    let (api_base, _endpoint) = spawn_endpoint(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    )
    .await;

    let result = analyzer(api_base).analyze(b"jpeg").await;
    match result {
        Err(AnalysisError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key"), "{body}");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let result = analyzer(format!("http://{address}/v1")).analyze(b"jpeg").await;
    assert!(matches!(result, Err(AnalysisError::Request(_))), "{result:?}");
}
