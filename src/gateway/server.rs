//! WebSocket upgrade handler and per-connection event loop.
//!
//! One task per connection multiplexes three things with `tokio::select!`:
//! frames from the client, messages from the broadcast bus, and the
//! heartbeat deadline. An in-flight submit always runs to completion inside
//! its select arm, so a client disconnecting mid-send never cancels a
//! message that was already accepted for storage.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::id;
use crate::AppState;

use super::events::{
    ClientMessage, GatewayMessage, HeartbeatPayload, SendPayload, OP_HEARTBEAT, OP_SEND,
};
use super::service::SubmitOutcome;
use super::session::ConnectionSession;

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;

/// Heartbeat interval clients are expected to honor (ms).
pub const HEARTBEAT_INTERVAL_MS: u64 = 41250;

type WsSink = futures_util::stream::SplitSink<WebSocket, WsMessage>;

/// Connection-establishment parameters supplied on the upgrade request.
///
/// `offset` is the highest sequence id the client has already seen;
/// `recovered` is the externally-computed flag saying the transport restored
/// the previous socket with no possible gap.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub recovered: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, params))
}

async fn handle_connection(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (mut ws_tx, ws_rx) = socket.split();

    let session = Arc::new(ConnectionSession::new(
        id::session_id(),
        params.offset.max(0),
        params.recovered,
    ));

    tracing::info!(
        session_id = %session.session_id,
        offset = params.offset,
        recovered = params.recovered,
        "gateway session accepted"
    );

    // Subscribe before replaying so nothing published during the replay scan
    // is lost; the session watermark drops whatever both paths deliver.
    let bus_rx = state.chat.bus().subscribe();

    // Replay stored history to this connection only, ascending, before any
    // live message. A recovered session skips this entirely.
    for message in state.chat.recover(&session).await {
        if !session.claim(message.id) {
            continue;
        }
        if send_json(&mut ws_tx, &GatewayMessage::message_create(&message))
            .await
            .is_err()
        {
            tracing::debug!(session_id = %session.session_id, "client left during replay");
            return;
        }
    }

    state.sessions.register(&session.session_id, session.recovered);

    run_session(&state, Arc::clone(&session), ws_tx, ws_rx, bus_rx).await;

    state.sessions.remove(&session.session_id);

    tracing::info!(session_id = %session.session_id, "gateway session closed");
}

/// Main session event loop: client frames, bus fan-out, heartbeat deadline.
async fn run_session(
    state: &AppState,
    session: Arc<ConnectionSession>,
    mut ws_tx: WsSink,
    mut ws_rx: futures_util::stream::SplitStream<WebSocket>,
    mut bus_rx: broadcast::Receiver<Arc<crate::models::message::Message>>,
) {
    // Client must heartbeat within 1.5x the advertised interval.
    let heartbeat_deadline = Duration::from_millis(HEARTBEAT_INTERVAL_MS * 3 / 2);
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            // Client sends us a frame.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };

                        match client_msg.op {
                            OP_SEND => {
                                let payload: SendPayload =
                                    serde_json::from_value(client_msg.d).unwrap_or(SendPayload {
                                        content: None,
                                        idempotency_key: None,
                                    });
                                if handle_send(state, &session, &mut ws_tx, payload).await.is_err() {
                                    break;
                                }
                            }
                            OP_HEARTBEAT => {
                                got_heartbeat = true;
                                let payload: HeartbeatPayload =
                                    serde_json::from_value(client_msg.d).unwrap_or(HeartbeatPayload { seq: 0 });
                                if send_json(&mut ws_tx, &GatewayMessage::heartbeat_ack(payload.seq)).await.is_err() {
                                    break;
                                }
                            }
                            _ => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_OPCODE, "Unknown opcode").await;
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, session_id = %session.session_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Live message from the broadcast bus.
            result = bus_rx.recv() => {
                match result {
                    Ok(message) => {
                        // Already delivered through replay, or out of order
                        // relative to what this client has seen — skip.
                        if !session.claim(message.id) {
                            continue;
                        }
                        if send_json(&mut ws_tx, &GatewayMessage::message_create(&message)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            session_id = %session.session_id,
                            skipped = n,
                            "session lagged behind fan-out"
                        );
                        // Continue — the client re-syncs from the log on reconnect.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Heartbeat timeout check.
            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(session_id = %session.session_id, "heartbeat timeout");
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

/// Validate and submit one send attempt, replying with ack / duplicate ack /
/// failure on this connection. `Err` means the socket is gone.
async fn handle_send(
    state: &AppState,
    session: &ConnectionSession,
    ws_tx: &mut WsSink,
    payload: SendPayload,
) -> Result<(), axum::Error> {
    // Both values reach the store exactly as the client supplied them;
    // normalizing the key would make distinct client keys collide and turn a
    // real send into a false duplicate.
    let key = match payload.idempotency_key.as_deref() {
        Some(k) if !k.is_empty() => k,
        _ => {
            return send_json(
                ws_tx,
                &GatewayMessage::send_failed(None, "idempotency_key is required"),
            )
            .await;
        }
    };
    let content = match payload.content.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => {
            return send_json(
                ws_tx,
                &GatewayMessage::send_failed(Some(key), "content is required"),
            )
            .await;
        }
    };

    match state.chat.submit(key, content).await {
        SubmitOutcome::Stored(message) => {
            tracing::debug!(
                session_id = %session.session_id,
                sequence_id = message.id,
                "message stored"
            );
            send_json(ws_tx, &GatewayMessage::ack(key, message.id)).await
        }
        SubmitOutcome::Duplicate => send_json(ws_tx, &GatewayMessage::duplicate_ack(key)).await,
        SubmitOutcome::Unavailable => {
            send_json(
                ws_tx,
                &GatewayMessage::send_failed(Some(key), "message log unavailable"),
            )
            .await
        }
    }
}

async fn send_json(ws_tx: &mut WsSink, msg: &GatewayMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_tx.send(WsMessage::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = WsMessage::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
