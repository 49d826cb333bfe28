pub mod bus;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod id;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use config::Config;
use db::pool::DbPool;
use gateway::registry::SessionRegistry;
use gateway::service::ChatService;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub chat: ChatService,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<Config>,
}
