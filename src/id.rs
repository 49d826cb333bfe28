//! Opaque prefixed identifiers for ephemeral gateway sessions.

use rand::Rng;

/// Generate an opaque random id with the given prefix and byte length.
pub fn opaque_id(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

/// Session id for one gateway connection (`gw_` prefix).
pub fn session_id() -> String {
    opaque_id("gw", 12)
}
