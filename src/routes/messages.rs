//! Message history endpoint.
//!
//! Read-only view over the message log for clients that want history without
//! holding a gateway connection. Live delivery and recovery both go through
//! the gateway; this route never touches the bus.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::message::Message;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages))
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    /// Return messages with a sequence id strictly greater than this.
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListMessagesResponse {
    pub data: Vec<Message>,
}

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    params(
        ("after" = Option<i64>, Query, description = "Return messages after this sequence id"),
        ("limit" = Option<i64>, Query, description = "Page size, 1-100 (default 50)"),
    ),
    responses(
        (status = 200, body = ListMessagesResponse),
        (status = 503, body = crate::error::ApiErrorBody),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<ListMessagesResponse>, ApiError> {
    let after = params.after.unwrap_or(0).max(0);
    let limit = params.limit.unwrap_or(50).clamp(1, 100);

    let data = state.chat.store().read_page(after, limit).await?;

    Ok(Json(ListMessagesResponse { data }))
}
