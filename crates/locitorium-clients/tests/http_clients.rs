//! Client behaviour against in-process HTTP stubs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use locitorium_clients::{DebugSink, NominatimClient, OllamaClient, RetryPolicy};
use locitorium_core::{Error, Gazetteer, LanguageModel, Scalar};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<AtomicUsize>,
    params: Arc<Mutex<Vec<HashMap<String, String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

fn nominatim_stub(recorder: Recorder, status: StatusCode) -> Router {
    Router::new()
        .route(
            "/search",
            get(
                move |State(rec): State<Recorder>, Query(params): Query<HashMap<String, String>>| async move {
                    rec.hits.fetch_add(1, Ordering::SeqCst);
                    rec.params.lock().push(params);
                    let body = json!([
                        {
                            "osm_type": "relation",
                            "osm_id": 4097196,
                            "display_name": "広島市, 広島県, 日本",
                            "lat": "34.3916058",
                            "lon": "132.4518156",
                            "boundingbox": ["34.2", "34.6", "132.1", "132.7"],
                            "category": "boundary",
                            "place_rank": 12,
                            "importance": 0.71,
                            "address": {"city": "広島市", "country_code": "jp"}
                        },
                        {
                            "osm_type": "node",
                            "osm_id": 1,
                            "display_name": "Hiroshima, Gifu",
                            "lat": "35.0",
                            "lon": "136.0"
                        }
                    ]);
                    (status, Json(body))
                },
            ),
        )
        .with_state(recorder)
}

fn ollama_stub(recorder: Recorder, content: &'static str) -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(move |State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                rec.hits.fetch_add(1, Ordering::SeqCst);
                rec.bodies.lock().push(body);
                Json(json!({
                    "model": "stub",
                    "message": {"role": "assistant", "content": content},
                    "done": true
                }))
            }),
        )
        .with_state(recorder)
}

#[tokio::test]
async fn test_search_sends_query_and_maps_candidates() {
    let recorder = Recorder::default();
    let base = spawn(nominatim_stub(recorder.clone(), StatusCode::OK)).await;
    let client = NominatimClient::new(&base, 7, Duration::from_secs(5)).unwrap();

    let candidates = client.search("広島").await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].rank, 1);
    assert_eq!(candidates[1].rank, 2);
    assert_eq!(candidates[0].country_code.as_deref(), Some("JP"));
    assert_eq!(candidates[0].lat, Scalar::from("34.3916058"));
    assert_eq!(candidates[1].country_code, None);

    let params = recorder.params.lock().clone();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["q"], "広島");
    assert_eq!(params[0]["format"], "jsonv2");
    assert_eq!(params[0]["addressdetails"], "1");
    assert_eq!(params[0]["limit"], "7");
}

#[tokio::test]
async fn test_search_server_error_is_upstream_unavailable_without_retry() {
    let recorder = Recorder::default();
    let base = spawn(nominatim_stub(recorder.clone(), StatusCode::SERVICE_UNAVAILABLE)).await;
    let client = NominatimClient::new(&base, 10, Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_retry(3));

    let err = client.search("Tokyo").await.unwrap_err();

    assert!(matches!(err, Error::UpstreamUnavailable(_)));
    assert_eq!(recorder.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_search_client_error_is_retried() {
    let recorder = Recorder::default();
    let base = spawn(nominatim_stub(recorder.clone(), StatusCode::TOO_MANY_REQUESTS)).await;
    let client = NominatimClient::new(&base, 10, Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_retry(3));

    let err = client.search("Tokyo").await.unwrap_err();

    assert!(matches!(err, Error::Http(_)));
    assert_eq!(recorder.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_generate_parses_fenced_reply_and_sends_schema() {
    let recorder = Recorder::default();
    let base = spawn(ollama_stub(
        recorder.clone(),
        "Here is the result:\n```json\n{\"mentions\": [{\"mention\": \"広島\"}]}\n```",
    ))
    .await;
    let client = OllamaClient::new(&base, "qwen3:8b", Duration::from_secs(5))
        .unwrap()
        .with_thinking(Some(false));
    let schema = json!({"type": "object", "required": ["mentions"]});

    let reply = client.generate("Extract places", &schema, "d1_extract").await.unwrap();

    assert_eq!(reply["mentions"][0]["mention"], json!("広島"));
    let bodies = recorder.bodies.lock().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], json!("qwen3:8b"));
    assert_eq!(bodies[0]["stream"], json!(false));
    assert_eq!(bodies[0]["format"], schema);
    assert_eq!(bodies[0]["messages"][0]["content"], json!("Extract places"));
    assert_eq!(bodies[0]["options"]["temperature"], json!(0.0));
    assert_eq!(bodies[0]["options"]["thinking"], json!(false));
}

#[tokio::test]
async fn test_generate_invalid_reply_exhausts_two_attempts() {
    let recorder = Recorder::default();
    let base = spawn(ollama_stub(recorder.clone(), "I could not find anything.")).await;
    let client = OllamaClient::new(&base, "m", Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(fast_retry(2));

    let err = client
        .generate("prompt", &json!({"type": "object"}), "tag")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidOutput(_)));
    assert_eq!(recorder.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_generate_writes_debug_artifacts() {
    let recorder = Recorder::default();
    let base = spawn(ollama_stub(recorder, "{\"results\": []}")).await;
    let dir = tempfile::tempdir().unwrap();
    let client = OllamaClient::new(&base, "m", Duration::from_secs(5))
        .unwrap()
        .with_debug_sink(DebugSink::new(dir.path()));

    client
        .generate("resolve these", &json!({"type": "object"}), "doc:1_resolve")
        .await
        .unwrap();

    let prompt = std::fs::read_to_string(dir.path().join("doc_1_resolve_prompt.txt")).unwrap();
    let response = std::fs::read_to_string(dir.path().join("doc_1_resolve_response.txt")).unwrap();
    assert_eq!(prompt, "resolve these");
    assert_eq!(response, "{\"results\": []}");
}
