//! Server key discovery types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::UnixMillis;
use crate::serde::Base64;

/// Public key of the homeserver for verifying digital signatures.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VerifyKey {
    /// The unpadded base64-encoded key.
    pub key: Base64,
}

impl VerifyKey {
    /// Creates a new `VerifyKey` from the given key.
    pub fn new(key: Base64) -> Self {
        Self { key }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            key: Base64::new(bytes),
        }
    }
}

/// A key the server used to use, but stopped using.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OldVerifyKey {
    /// Timestamp when this key expired.
    pub expired_ts: UnixMillis,

    /// The unpadded base64-encoded key.
    pub key: Base64,
}

/// Hash of the TLS certificate a server presents, keyed by hash algorithm,
/// e.g. `{"sha256": "<unpadded base64>"}`.
pub type TlsFingerprint = BTreeMap<String, Base64>;

/// A server's published signing keys, signed by the server itself.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ServerSigningKeys {
    /// DNS name of the homeserver.
    pub server_name: String,

    /// Public keys of the homeserver for verifying digital signatures.
    pub verify_keys: BTreeMap<String, VerifyKey>,

    /// Public keys that the homeserver used to use and when it stopped using them.
    #[serde(default)]
    pub old_verify_keys: BTreeMap<String, OldVerifyKey>,

    /// Digital signatures of this object signed using the verify_keys.
    ///
    /// Map of server name to keys by key ID.
    #[serde(default)]
    pub signatures: BTreeMap<String, BTreeMap<String, String>>,

    /// Timestamp when the keys should be refreshed.
    pub valid_until_ts: UnixMillis,

    /// Fingerprints of the TLS certificate the server serves with.
    #[serde(default)]
    pub tls_fingerprints: Vec<TlsFingerprint>,
}

impl ServerSigningKeys {
    /// Creates a new `ServerSigningKeys` with the given server name and validity timestamp.
    ///
    /// All other fields will be empty.
    pub fn new(server_name: impl Into<String>, valid_until_ts: UnixMillis) -> Self {
        Self {
            server_name: server_name.into(),
            verify_keys: BTreeMap::new(),
            old_verify_keys: BTreeMap::new(),
            signatures: BTreeMap::new(),
            valid_until_ts,
            tls_fingerprints: Vec::new(),
        }
    }
}
