//! Chat service: orchestrates the message log and the broadcast bus.

use std::sync::Arc;

use crate::bus::ChatBus;
use crate::models::message::Message;
use crate::store::{MessageStore, StoreError};

use super::session::ConnectionSession;

/// Result of one submit attempt, surfaced to the sending client as an ack,
/// a duplicate ack, or a failure.
pub enum SubmitOutcome {
    /// Stored under a fresh sequence id and published to every worker.
    Stored(Arc<Message>),
    /// The idempotency key already exists: the original attempt was stored
    /// and broadcast, so nothing is published again.
    Duplicate,
    /// The message log is unreachable. Nothing was stored and nothing is
    /// published — an unpersisted message must never reach other clients.
    Unavailable,
}

/// Shared chat orchestration. Cloneable; store in AppState.
#[derive(Clone)]
pub struct ChatService {
    store: MessageStore,
    bus: ChatBus,
}

impl ChatService {
    pub fn new(store: MessageStore, bus: ChatBus) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn bus(&self) -> &ChatBus {
        &self.bus
    }

    /// Persist one send attempt and fan it out.
    ///
    /// Append happens strictly before publish, so bus delivery order matches
    /// log order for every message this worker publishes.
    pub async fn submit(&self, idempotency_key: &str, content: &str) -> SubmitOutcome {
        match self.store.append(idempotency_key, content).await {
            Ok(message) => {
                let message = Arc::new(message);
                self.bus.publish(Arc::clone(&message)).await;
                SubmitOutcome::Stored(message)
            }
            Err(StoreError::DuplicateKey) => SubmitOutcome::Duplicate,
            Err(StoreError::Unavailable) => SubmitOutcome::Unavailable,
        }
    }

    /// Fetch the history a reconnecting session missed.
    ///
    /// Returns the stored messages after the session's offset, ascending. A
    /// recovered session gets nothing (the transport guarantees no gap). If
    /// the log is unreachable the session is admitted with empty history —
    /// availability over completeness; the client is not told about the gap.
    pub async fn recover(&self, session: &ConnectionSession) -> Vec<Message> {
        if session.recovered {
            return Vec::new();
        }

        match self.store.read_from(session.delivered()).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(
                    %e,
                    session_id = %session.session_id,
                    offset = session.delivered(),
                    "replay unavailable; admitting session without history"
                );
                Vec::new()
            }
        }
    }
}
