//! HttpBackend and PanelController against a local engine stub.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use contextsync_lib::backend::protocol::{SelectionRequest, StatsRequest};
use contextsync_lib::{
    event_channel, BackendError, ContextBackend, ContextSource, HttpBackend, LineRange,
    NotificationLevel, PanelController, Settings, StatsRecord, ViewState,
};

async fn serve(app: Router) -> Settings {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Settings {
        api_base_url: format!("http://{}", addr),
        request_timeout_secs: 2,
        connect_timeout_secs: 1,
        ..Settings::default()
    }
}

fn selection() -> SelectionRequest {
    SelectionRequest::new("def charge(): ...", "billing.py", LineRange::new(3, 9))
}

#[tokio::test]
async fn test_stats_ok() {
    let app = Router::new().route(
        "/context/stats",
        post(|Json(body): Json<Value>| async move {
            let n = body["snippets"].as_array().map(|a| a.len()).unwrap_or(0);
            let records: Vec<Value> = (0..n)
                .map(|i| json!({"slack_count": i, "jira_count": 1, "open_jira_count": 0}))
                .collect();
            Json(Value::Array(records))
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let stats = backend
        .stats(StatsRequest { snippets: vec!["a".into(), "b".into()] })
        .await
        .unwrap();

    assert_eq!(stats, vec![StatsRecord::new(0, 1, 0), StatsRecord::new(1, 1, 0)]);
}

#[tokio::test]
async fn test_server_error_status() {
    let app = Router::new().route("/context/stats", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend.stats(StatsRequest { snippets: vec!["a".into()] }).await.unwrap_err();

    assert_eq!(err, BackendError::Status(500));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let app = Router::new().route("/explain", post(|| async { "<html>oops</html>" }));
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend.explain(selection()).await.unwrap_err();

    assert!(matches!(err, BackendError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let settings = Settings {
        api_base_url: format!("http://{}", addr),
        ..Settings::default()
    };
    let backend = HttpBackend::new(&settings);

    let err = backend.sync().await.unwrap_err();

    assert!(matches!(err, BackendError::Unreachable(_)), "got {:?}", err);
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let app = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"reply": "too late"}))
        }),
    );
    let mut settings = serve(app).await;
    settings.request_timeout_secs = 1;
    let backend = HttpBackend::new(&settings);

    let err = backend
        .chat(contextsync_lib::backend::ChatRequest {
            message: "hi".into(),
            history: Vec::new(),
            context: String::new(),
        })
        .await
        .unwrap_err();

    assert_eq!(err, BackendError::Timeout);
}

#[tokio::test]
async fn test_selection_wire_format() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
    let app = Router::new().route(
        "/context/retrieve",
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                Json(json!([]))
            }
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let objects = backend.retrieve(selection()).await.unwrap();

    assert!(objects.is_empty());
    assert_eq!(
        rx.recv().await.unwrap(),
        json!({"code_snippet": "def charge(): ...", "file_path": "billing.py", "line_numbers": "3-9"})
    );
}

#[tokio::test]
async fn test_panel_shows_server_error() {
    let app = Router::new().route("/explain", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let backend = Arc::new(HttpBackend::new(&serve(app).await));
    let (events, _rx) = event_channel();
    let panel = PanelController::new(backend, events);

    panel.explain_intent("x = 1", "a.py", LineRange::new(1, 1)).await;

    assert_eq!(panel.view(), ViewState::Error { message: "Error: Server returned 500".into() });
}

#[tokio::test]
async fn test_panel_groups_retrieved_records() {
    let app = Router::new().route(
        "/context/retrieve",
        post(|| async {
            Json(json!([
                {"source": "slack", "title_or_user": "alice", "content_summary": "retry storm", "url": ""},
                {"source": "linear", "title_or_user": "LIN-4", "content_summary": "flaky"},
                {"source": "JIRA", "title_or_user": "PAY-7", "content_summary": "double charge",
                 "url": "https://jira.example.com/PAY-7", "relevance_score": 0.91,
                 "related_code_files": ["billing.py"]}
            ]))
        }),
    );
    let backend = Arc::new(HttpBackend::new(&serve(app).await));
    let (events, _rx) = event_channel();
    let panel = PanelController::new(backend, events);

    panel.fetch_context("x", "billing.py", LineRange::new(1, 2)).await;

    match panel.view() {
        ViewState::ContentCards { groups } => {
            let sources: Vec<ContextSource> = groups.iter().map(|g| g.source.clone()).collect();
            assert_eq!(
                sources,
                vec![ContextSource::Jira, ContextSource::Slack, ContextSource::Other("LINEAR".into())]
            );
            assert_eq!(groups[0].records[0].related_code_files, vec!["billing.py".to_string()]);
            assert_eq!(groups[1].records[0].url, None);
        }
        other => panic!("expected cards, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_error_body_reported_with_engine_message() {
    let app = Router::new().route(
        "/context/sync",
        post(|| async { Json(json!({"status": "error", "message": "Slack token revoked"})) }),
    );
    let backend = Arc::new(HttpBackend::new(&serve(app).await));
    let (events, _rx) = event_channel();
    let panel = PanelController::new(backend, events);

    let notification = panel.trigger_sync().await;

    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, "Sync failed: Slack token revoked");
}
