use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::Value;

use chat_widget::{
    ChatService, ExchangeOutcome, HttpTransport, Message, Origin, ReplyPhase, TranscriptChange,
    WidgetConfig, WidgetError,
};

#[derive(Clone, Default)]
struct Backend {
    requests: Arc<Mutex<Vec<Value>>>,
}

fn reply_line(content: &str, can_rating: bool) -> String {
    let event = serde_json::json!({
        "type": "reply",
        "payload": { "content": content, "can_rating": can_rating, "is_final": false },
    });
    format!("data: {event}\n")
}

/// Streams a reply to the posted content in deliberately awkward byte pieces.
async fn chat_sse(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    backend.requests.lock().unwrap().push(body);

    if content == "fail" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    let mut wire = String::new();
    wire.push_str(": connected\n");
    wire.push_str(&reply_line("你", true));
    wire.push_str("data: {not json\n");
    wire.push_str("data: {\"type\":\"token_stat\",\"payload\":{\"used\":12}}\n");
    wire.push_str(&reply_line("ignored, not rateable", false));
    wire.push_str(&reply_line(&format!("你好, {content}"), true));
    wire.push('\n');
    // No trailing newline: must never reach the transcript.
    wire.push_str(reply_line("lost tail", true).trim_end());

    // 5-byte pieces split the CJK characters and the `data:` prefixes.
    let pieces: Vec<Vec<u8>> = wire.as_bytes().chunks(5).map(<[u8]>::to_vec).collect();
    let stream = futures_util::stream::iter(pieces).then(|piece| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok::<_, Infallible>(piece)
    });
    Body::from_stream(stream).into_response()
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/v1/qbot/chat/sse", post(chat_sse))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/qbot/chat/sse"), backend)
}

fn service(endpoint: &str) -> ChatService<HttpTransport> {
    let config = WidgetConfig::new(endpoint, "bot-key")
        .with_visitor_id("visitor-1")
        .with_session_id("session-1");
    let transport = HttpTransport::new(&config).unwrap();
    ChatService::new(config, transport)
}

#[tokio::test]
async fn reply_streams_into_transcript_over_http() {
    let (endpoint, backend) = spawn_backend().await;
    let mut chat = service(&endpoint);

    let outcome = chat.submit("hello").await.unwrap();

    assert_eq!(
        outcome,
        ExchangeOutcome::Completed { qualifying_events: 2, malformed_lines: 1 }
    );
    let messages = chat.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].origin, Origin::User);
    assert_eq!(messages[1].origin, Origin::Assistant);
    assert_eq!(messages[1].text, "你好, hello");
    assert!(messages[1].complete);
    assert_eq!(chat.phase(), ReplyPhase::Done);

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["content"], "hello");
    assert_eq!(requests[0]["bot_app_key"], "bot-key");
    assert_eq!(requests[0]["visitor_biz_id"], "visitor-1");
    assert_eq!(requests[0]["session_id"], "session-1");
    assert_eq!(requests[0]["visitor_labels"], serde_json::json!([]));
}

#[tokio::test]
async fn observers_track_every_step() {
    let (endpoint, _backend) = spawn_backend().await;
    let mut chat = service(&endpoint);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    chat.transcript_mut()
        .subscribe(move |change: &TranscriptChange, messages: &[Message]| {
            let text = messages.last().map(|m| m.text.clone()).unwrap_or_default();
            sink.lock().unwrap().push((*change, text));
        });

    chat.submit("world").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (TranscriptChange::Appended { index: 0 }, "world".to_string()),
            (TranscriptChange::Appended { index: 1 }, String::new()),
            (TranscriptChange::Replaced { index: 1 }, "你".to_string()),
            (TranscriptChange::Replaced { index: 1 }, "你好, world".to_string()),
            (TranscriptChange::Completed { index: 1 }, "你好, world".to_string()),
        ]
    );
}

#[tokio::test]
async fn server_error_leaves_only_user_message() {
    let (endpoint, _backend) = spawn_backend().await;
    let mut chat = service(&endpoint);

    let err = chat.submit("fail").await.unwrap_err();

    assert!(matches!(err, WidgetError::HttpStatus { status: 500 }));
    assert_eq!(chat.transcript().len(), 1);
    assert!(chat.transcript()[0].is_user());
    assert!(!chat.awaiting_reply());

    // The session is still usable.
    chat.submit("again").await.unwrap();
    assert_eq!(chat.transcript().len(), 3);
    assert_eq!(chat.transcript()[2].text, "你好, again");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Grab a free port, then close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut chat = service(&format!("http://{addr}/sse"));
    let err = chat.submit("hello").await.unwrap_err();

    assert!(err.is_transport());
    let messages = chat.transcript().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "hello");
}
