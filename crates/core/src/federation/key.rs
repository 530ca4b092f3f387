//! `GET /_matrix/key/v2/server/{key_id}`
//!
//! Gets the homeserver's published signing keys. The key id path segment is
//! optional; servers answer with all current keys either way.

use url::Url;

use crate::sending::{SendRequest, SendResult};

/// Builds the unauthenticated key discovery request.
///
/// `origin` is the peer's base URL, e.g. `https://peer.test:8448`.
pub fn server_keys_request(origin: &str, prefix: &str, key_id: Option<&str>) -> SendResult<SendRequest> {
    let prefix = prefix.trim_end_matches('/');
    let url = match key_id {
        Some(key_id) => Url::parse(&format!("{origin}{prefix}/server/{key_id}"))?,
        None => Url::parse(&format!("{origin}{prefix}/server"))?,
    };
    Ok(crate::sending::get(url))
}

#[cfg(test)]
mod tests {
    use super::server_keys_request;
    use crate::federation::KEY_DISCOVERY_PREFIX;

    #[test]
    fn builds_key_url() {
        let request = server_keys_request("https://peer.test:8448", KEY_DISCOVERY_PREFIX, Some("ed25519:1")).unwrap();
        assert_eq!(request.method(), &http::Method::GET);
        assert_eq!(request.url().as_str(), "https://peer.test:8448/_matrix/key/v2/server/ed25519:1");

        let request = server_keys_request("http://peer.test", "/_matrix/key/v2/", None).unwrap();
        assert_eq!(request.url().path(), "/_matrix/key/v2/server");
    }
}
