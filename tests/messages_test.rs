mod common;

use axum::http::StatusCode;
use axum_test::TestServer;

// ---------------------------------------------------------------------------
// GET /api/v1/messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_returns_messages_after_the_offset() {
    let (app, state) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let prefix = common::key_prefix();

    let store = state.chat.store();
    let first = store
        .append(&format!("{prefix}-1"), "one")
        .await
        .expect("append");
    let second = store
        .append(&format!("{prefix}-2"), "two")
        .await
        .expect("append");

    let resp = server
        .get("/api/v1/messages")
        .add_query_param("after", first.id)
        .await;
    resp.assert_status(StatusCode::OK);

    let body: serde_json::Value = resp.json();
    let ours: Vec<&serde_json::Value> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| {
            m["idempotency_key"]
                .as_str()
                .is_some_and(|k| k.starts_with(&prefix))
        })
        .collect();

    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0]["id"], second.id);
    assert_eq!(ours[0]["content"], "two");
    assert!(ours[0]["created_at"].is_string());

    common::cleanup_messages(&state.db, &prefix).await;
}

#[tokio::test]
async fn history_clamps_the_page_size() {
    let (app, state) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let prefix = common::key_prefix();

    let store = state.chat.store();
    let mut base = 0;
    for i in 0..3 {
        let m = store
            .append(&format!("{prefix}-{i}"), "row")
            .await
            .expect("append");
        if i == 0 {
            base = m.id - 1;
        }
    }

    let resp = server
        .get("/api/v1/messages")
        .add_query_param("after", base)
        .add_query_param("limit", 1)
        .await;
    resp.assert_status(StatusCode::OK);

    let body: serde_json::Value = resp.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    common::cleanup_messages(&state.db, &prefix).await;
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_connected_sessions() {
    let (app, state) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status(StatusCode::OK);

    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected_sessions"], 0);
    assert_eq!(body["recovered_sessions"], 0);
    assert!(body["oldest_session_age_secs"].is_null());

    // The counts track the registry.
    state.sessions.register("gw_fresh", false);
    state.sessions.register("gw_resumed", true);
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["connected_sessions"], 2);
    assert_eq!(body["recovered_sessions"], 1);
    assert!(body["oldest_session_age_secs"].is_u64());

    state.sessions.remove("gw_fresh");
    state.sessions.remove("gw_resumed");
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_serves_the_client_page() {
    let (app, _state) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/").await;
    resp.assert_status(StatusCode::OK);
    assert!(resp.text().contains("/gateway"));
}
