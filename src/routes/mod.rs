pub mod health;
pub mod index;
pub mod messages;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(index::router())
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest("/api/v1", messages::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health, messages::list_messages),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::models::message::Message,
            health::HealthResponse,
            messages::ListMessagesResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Messages", description = "Message history"),
    )
)]
pub struct ApiDoc;
