use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use murmur::bus::ChatBus;
use murmur::config::Config;
use murmur::gateway::registry::SessionRegistry;
use murmur::gateway::service::ChatService;
use murmur::store::MessageStore;
use murmur::AppState;

/// Build a test AppState against the `_test`-suffixed database with a
/// local-only bus (no Redis needed; cross-worker fan-out is covered by the
/// two-state tests below sharing one bus).
pub async fn test_state() -> AppState {
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let mut config = Config::from_env();
    config.database_url = murmur::config::with_test_db_suffix(&config.database_url);

    let db = murmur::db::pool::connect(&config.database_url).await;

    AppState {
        db: db.clone(),
        chat: ChatService::new(MessageStore::new(db), ChatBus::local()),
        sessions: Arc::new(SessionRegistry::new()),
        config: Arc::new(config),
    }
}

/// Build the full application router wired to the test state.
#[allow(dead_code)]
pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    let app = murmur::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background; returns its address and the shared state.
#[allow(dead_code)]
pub async fn start_ws_server() -> (SocketAddr, AppState) {
    let state = test_state().await;
    let app = murmur::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// A fresh idempotency-key prefix so runs never collide in the shared
/// test database.
pub fn key_prefix() -> String {
    murmur::id::opaque_id("t", 6)
}

/// Delete every test message whose idempotency key starts with `prefix`.
#[allow(dead_code)]
pub async fn cleanup_messages(db: &murmur::db::pool::DbPool, prefix: &str) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    use murmur::db::schema::messages;

    let mut conn = db.get().await.expect("pool");
    diesel::delete(messages::table.filter(messages::idempotency_key.like(format!("{prefix}%"))))
        .execute(&mut conn)
        .await
        .expect("cleanup");
}
