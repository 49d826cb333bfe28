use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use murmur::bus::ChatBus;
use murmur::config::Config;
use murmur::gateway::registry::SessionRegistry;
use murmur::gateway::service::ChatService;
use murmur::store::MessageStore;
use murmur::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // Connect to the shared message log.
    let db = murmur::db::pool::connect(&config.database_url).await;
    let store = MessageStore::new(db.clone());

    // Join the cluster-wide broadcast domain, or run local-only without Redis.
    let bus = match &config.redis_url {
        Some(url) => ChatBus::connect(url, &config.bus_channel).await,
        None => {
            tracing::info!("no REDIS_URL configured; fan-out is local to this worker");
            ChatBus::local()
        }
    };

    let state = AppState {
        db,
        chat: ChatService::new(store, bus),
        sessions: Arc::new(SessionRegistry::new()),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(murmur::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "murmur worker listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
