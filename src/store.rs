//! Durable, append-only message log.
//!
//! The store is the single source of truth for message order and for
//! duplicate detection. Both guarantees are delegated to the storage engine:
//! sequence ids come from a BIGSERIAL column and retried sends are rejected
//! by the UNIQUE constraint on `idempotency_key`, so no application-level
//! locking is needed even with many worker processes appending concurrently.

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::db::pool::DbPool;
use crate::db::schema::messages;
use crate::models::message::{Message, NewMessage};

/// Errors surfaced by the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The idempotency key already exists. Benign: the original attempt
    /// succeeded and no new row was written.
    DuplicateKey,
    /// The durable medium could not be reached. Never fatal to the worker;
    /// callers degrade per their own policy.
    Unavailable,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateKey => write!(f, "idempotency key already exists"),
            StoreError::Unavailable => write!(f, "message log unavailable"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Handle to the shared message log. Cloneable; wraps the connection pool.
#[derive(Clone)]
pub struct MessageStore {
    pool: DbPool,
}

impl MessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one message, allocating the next sequence id.
    ///
    /// Atomic: either a new row is durably written and returned, or the key
    /// collides and `DuplicateKey` comes back with no mutation. The
    /// insert-or-reject happens inside a single statement, so concurrent
    /// appends from other workers can never double-write a retried send.
    pub async fn append(
        &self,
        idempotency_key: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            tracing::error!(?e, "failed to get log connection");
            StoreError::Unavailable
        })?;

        diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(messages::table)
                .values(NewMessage {
                    idempotency_key,
                    content,
                })
                .returning(Message::as_returning()),
            &mut conn,
        )
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::DuplicateKey
            }
            other => {
                tracing::error!(?other, "append failed");
                StoreError::Unavailable
            }
        })
    }

    /// Read every stored message with a sequence id greater than `after`,
    /// ascending. A finite snapshot of the current log state, re-scanned on
    /// each call; used only for recovery replay, never for live fan-out.
    pub async fn read_from(&self, after: i64) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            tracing::error!(?e, "failed to get log connection");
            StoreError::Unavailable
        })?;

        diesel_async::RunQueryDsl::load(
            messages::table
                .filter(messages::id.gt(after))
                .order(messages::id.asc())
                .select(Message::as_select()),
            &mut conn,
        )
        .await
        .map_err(|e| {
            tracing::error!(?e, after, "replay scan failed");
            StoreError::Unavailable
        })
    }

    /// Bounded variant of [`read_from`](Self::read_from) for the HTTP
    /// history endpoint.
    pub async fn read_page(&self, after: i64, limit: i64) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.pool.get().await.map_err(|e| {
            tracing::error!(?e, "failed to get log connection");
            StoreError::Unavailable
        })?;

        diesel_async::RunQueryDsl::load(
            messages::table
                .filter(messages::id.gt(after))
                .order(messages::id.asc())
                .limit(limit)
                .select(Message::as_select()),
            &mut conn,
        )
        .await
        .map_err(|e| {
            tracing::error!(?e, after, "history read failed");
            StoreError::Unavailable
        })
    }
}
