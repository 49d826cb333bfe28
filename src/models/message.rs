use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::messages;

/// A stored chat message. Immutable once written.
///
/// `id` is the server-assigned sequence id (BIGSERIAL): strictly increasing,
/// never reused, and the authoritative global delivery order.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: i64,
    /// Client-chosen token for one logical send attempt. UNIQUE in the store;
    /// a retried send with the same key never creates a second row.
    pub idempotency_key: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub idempotency_key: &'a str,
    pub content: &'a str,
}
