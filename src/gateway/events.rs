//! Gateway opcodes and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::Message;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_SEND: u8 = 2;
pub const OP_ACK: u8 = 3;
pub const OP_SEND_FAILED: u8 = 5;
pub const OP_HEARTBEAT_ACK: u8 = 6;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<i64>,
    pub d: Value,
}

impl GatewayMessage {
    /// Build a MESSAGE_CREATE dispatch (op=0) for one stored message. Used
    /// for live fan-out and recovery replay alike; the client cannot tell
    /// the two apart except by ordering.
    pub fn message_create(message: &Message) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(EventName::MESSAGE_CREATE.to_string()),
            s: Some(message.id),
            d: serde_json::json!({
                "sequence_id": message.id,
                "content": message.content,
                "created_at": message.created_at,
            }),
        }
    }

    /// Acknowledge a stored send (op=3).
    pub fn ack(idempotency_key: &str, sequence_id: i64) -> Self {
        Self {
            op: OP_ACK,
            t: None,
            s: None,
            d: serde_json::json!({
                "idempotency_key": idempotency_key,
                "sequence_id": sequence_id,
                "duplicate": false,
            }),
        }
    }

    /// Acknowledge a retried send whose key already exists (op=3). The
    /// original attempt was stored and broadcast, so there is nothing new
    /// to report beyond "you may stop retrying".
    pub fn duplicate_ack(idempotency_key: &str) -> Self {
        Self {
            op: OP_ACK,
            t: None,
            s: None,
            d: serde_json::json!({
                "idempotency_key": idempotency_key,
                "duplicate": true,
            }),
        }
    }

    /// Report a failed send (op=5). Nothing was stored or broadcast.
    pub fn send_failed(idempotency_key: Option<&str>, reason: &str) -> Self {
        Self {
            op: OP_SEND_FAILED,
            t: None,
            s: None,
            d: serde_json::json!({
                "idempotency_key": idempotency_key,
                "reason": reason,
            }),
        }
    }

    /// Build a HEARTBEAT_ACK message (op=6).
    pub fn heartbeat_ack(seq: i64) -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            s: None,
            d: serde_json::json!({ "ack": seq }),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

/// SEND payload (op=2): one logical chat send attempt.
#[derive(Debug, Deserialize)]
pub struct SendPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// HEARTBEAT payload (op=1).
#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(default)]
    pub seq: i64,
}

// ---------------------------------------------------------------------------
// Dispatch event types
// ---------------------------------------------------------------------------

/// Event names dispatched to clients.
pub struct EventName;

impl EventName {
    pub const MESSAGE_CREATE: &'static str = "MESSAGE_CREATE";
}
