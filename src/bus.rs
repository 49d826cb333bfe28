//! Cross-process broadcast bus.
//!
//! Fan-out within one worker uses a single `tokio::sync::broadcast` channel;
//! each connected gateway session holds its own receiver. Fan-out across
//! workers rides Redis pub/sub: a publish goes to Redis, and every worker
//! (the publisher included) runs a relay task that forwards each payload
//! from its Redis subscription into its local channel. Self-delivery through
//! the same path keeps one fan-out route for everybody, so a sender's own
//! messages and everyone else's arrive in the same order.
//!
//! Without a `REDIS_URL`, or when a publish cannot reach Redis, the bus
//! degrades to local-only fan-out. Clients on other workers recover the gap
//! from the message log on their next reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast;

use crate::models::message::Message;

/// Capacity of the per-worker broadcast channel. Slow receivers that fall
/// behind will skip messages (RecvError::Lagged) and re-sync via recovery.
const BROADCAST_CAPACITY: usize = 4096;

/// Delay before the relay retries a dropped Redis subscription.
const RELAY_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// The broadcast bus for this worker. Cloneable; store in AppState.
#[derive(Clone)]
pub struct ChatBus {
    local: broadcast::Sender<Arc<Message>>,
    publisher: Option<redis::aio::ConnectionManager>,
    channel: String,
}

impl ChatBus {
    /// Local-only bus: single-process mode and tests.
    pub fn local() -> Self {
        let (local, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            local,
            publisher: None,
            channel: String::new(),
        }
    }

    /// Connect the bus to the cluster-wide Redis channel and spawn the relay
    /// task. Falls back to local-only fan-out if Redis cannot be reached;
    /// never fatal to the worker.
    pub async fn connect(redis_url: &str, channel: &str) -> Self {
        let (local, _) = broadcast::channel(BROADCAST_CAPACITY);

        let client = match redis::Client::open(redis_url) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(?e, "invalid REDIS_URL; bus running local-only");
                return Self {
                    local,
                    publisher: None,
                    channel: String::new(),
                };
            }
        };

        let publisher = match redis::aio::ConnectionManager::new(client.clone()).await {
            Ok(mgr) => Some(mgr),
            Err(e) => {
                tracing::warn!(?e, "redis unreachable; bus running local-only");
                None
            }
        };

        if publisher.is_some() {
            tokio::spawn(run_relay(client, channel.to_string(), local.clone()));
        }

        Self {
            local,
            publisher,
            channel: channel.to_string(),
        }
    }

    /// Subscribe to the fan-out stream. Each gateway session calls this once
    /// to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Message>> {
        self.local.subscribe()
    }

    /// Publish a stored message to every session on every worker.
    ///
    /// When Redis is attached, delivery to this worker's own sessions happens
    /// through the relay, not here; publishing locally as well would hand
    /// local sessions the message twice.
    pub async fn publish(&self, message: Arc<Message>) {
        let Some(mgr) = &self.publisher else {
            // send() errs only when no receiver exists — that's fine.
            let _ = self.local.send(message);
            return;
        };

        let payload = match serde_json::to_string(message.as_ref()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(?e, "failed to encode bus payload");
                return;
            }
        };

        use redis::AsyncCommands;
        let mut mgr = mgr.clone();
        if let Err(e) = mgr.publish::<_, _, ()>(&self.channel, payload).await {
            tracing::warn!(?e, "bus publish failed; degrading to local fan-out");
            let _ = self.local.send(message);
        }
    }
}

/// Forward every payload from the Redis subscription into the local channel.
/// Runs for the life of the worker, re-subscribing after connection loss.
async fn run_relay(
    client: redis::Client,
    channel: String,
    local: broadcast::Sender<Arc<Message>>,
) {
    loop {
        let mut pubsub = match client.get_async_pubsub().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(?e, "bus relay cannot reach redis; retrying");
                tokio::time::sleep(RELAY_RECONNECT_DELAY).await;
                continue;
            }
        };

        if let Err(e) = pubsub.subscribe(&channel).await {
            tracing::warn!(?e, %channel, "bus relay subscribe failed; retrying");
            tokio::time::sleep(RELAY_RECONNECT_DELAY).await;
            continue;
        }

        tracing::info!(%channel, "bus relay subscribed");

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(?e, "unreadable bus payload");
                    continue;
                }
            };

            match serde_json::from_str::<Message>(&payload) {
                Ok(message) => {
                    let _ = local.send(Arc::new(message));
                }
                Err(e) => tracing::warn!(?e, "ignoring malformed bus payload"),
            }
        }

        tracing::warn!(%channel, "bus relay stream ended; reconnecting");
        tokio::time::sleep(RELAY_RECONNECT_DELAY).await;
    }
}
