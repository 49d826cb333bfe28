//! Registry of sessions currently connected to this worker.
//!
//! Sessions are worker-local and never migrate; the registry exists for
//! observability (the `/health` connected-session count), not for recovery.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Snapshot recorded when a session is accepted.
pub struct ConnectedSession {
    pub recovered: bool,
    pub connected_at: Instant,
}

/// Live sessions on this worker, keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, ConnectedSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted session.
    pub fn register(&self, session_id: &str, recovered: bool) {
        self.sessions.insert(
            session_id.to_string(),
            ConnectedSession {
                recovered,
                connected_at: Instant::now(),
            },
        );
    }

    /// Drop a closed session. Idempotent.
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Number of sessions currently connected to this worker.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of connected sessions that resumed an earlier connection.
    pub fn recovered_len(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.value().recovered)
            .count()
    }

    /// Age of the oldest session on this worker, `None` when idle.
    pub fn longest_session_age(&self) -> Option<Duration> {
        self.sessions
            .iter()
            .map(|entry| entry.value().connected_at.elapsed())
            .max()
    }
}
