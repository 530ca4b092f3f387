mod cache;
mod verify;

pub use cache::*;
pub use verify::*;

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::core::UnixMillis;
use crate::core::federation::discovery::{ServerSigningKeys, TlsFingerprint, VerifyKey};
use crate::core::serde::{Base64, CanonicalJsonObject, to_json_object};
use crate::core::{Identity, signatures};

/// How long a published key response stays valid.
pub const KEY_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// A failed attempt to obtain a peer's verify key.
///
/// Cloneable so one coalesced fetch can report the same failure to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFetchError {
    #[error("failed to reach key server: {0}")]
    Network(String),
    #[error("malformed key response: {0}")]
    Malformed(String),
    #[error("key response is for `{found}`, expected `{expected}`")]
    ServerNameMismatch { expected: String, found: String },
    #[error("`{server}` does not publish key `{key_id}`")]
    KeyNotFound { server: String, key_id: String },
    #[error("key response is not signed by the key it publishes: {0}")]
    InvalidSignature(String),
    #[error("key fetch was aborted")]
    Aborted,
}

/// This server's key discovery response, not yet signed.
///
/// `valid_until_ts` is always [`KEY_VALIDITY`] from now.
pub fn server_keys(identity: &Identity, tls_fingerprints: &[TlsFingerprint]) -> ServerSigningKeys {
    let valid_until_ts = UnixMillis::now().saturating_add(KEY_VALIDITY);
    ServerSigningKeys {
        verify_keys: BTreeMap::from([(
            identity.key_id(),
            VerifyKey::new(Base64::new(identity.public_key().to_vec())),
        )]),
        tls_fingerprints: tls_fingerprints.to_vec(),
        ..ServerSigningKeys::new(identity.name(), valid_until_ts)
    }
}

/// [`server_keys`], signed by `identity`.
pub fn signed_server_keys(
    identity: &Identity,
    tls_fingerprints: &[TlsFingerprint],
) -> Result<CanonicalJsonObject, signatures::Error> {
    let mut object = to_json_object(&server_keys(identity, tls_fingerprints))?;
    identity.sign_json(&mut object)?;
    Ok(object)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_keys_are_self_signed() {
        let identity = Identity::generate("s.test:8448", "1");
        let object = signed_server_keys(&identity, &[]).unwrap();

        assert_eq!(object["server_name"], json!("s.test:8448"));
        assert_eq!(object["old_verify_keys"], json!({}));
        assert_eq!(object["tls_fingerprints"], json!([]));
        assert!(object["valid_until_ts"].as_u64().unwrap() > UnixMillis::now().get());
        identity.verify_json(&object).unwrap();

        let key = verify_server_keys("s.test:8448", "ed25519:1", object).unwrap();
        assert_eq!(key, identity.public_key().to_vec());
    }
}
