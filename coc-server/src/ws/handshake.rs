//! RFC 6455 §4.2.2 handshake: derive `Sec-WebSocket-Accept` from the
//! client's `Sec-WebSocket-Key` without axum's built-in `ws` extractor.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// True when the request carries the headers a WebSocket upgrade requires:
/// `Connection: Upgrade`, `Upgrade: websocket`, and a version we speak.
pub fn is_upgrade_request(headers: &axum::http::HeaderMap) -> bool {
    let connection_has_upgrade = headers
        .get(axum::http::header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    let upgrade_is_websocket = headers
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    let version_ok = headers
        .get("sec-websocket-version")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "13")
        .unwrap_or(false);
    connection_has_upgrade && upgrade_is_websocket && version_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rfc_6455_worked_example() {
        // the example straight out of RFC 6455 section 1.3
        assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }
}
