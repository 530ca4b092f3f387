//! The signing identity a process federates as.

use std::fmt;

use crate::serde::{Base64, CanonicalJsonObject};
use crate::signatures::{self, Ed25519KeyPair};

/// A principal's name together with its active signing key.
///
/// Created once at startup and shared read-only afterwards. The secret half of
/// the key is only ever used to sign; it is not serialized anywhere.
pub struct Identity {
    name: String,
    key_pair: Ed25519KeyPair,
}

impl Identity {
    pub fn new(name: impl Into<String>, key_pair: Ed25519KeyPair) -> Self {
        Self {
            name: name.into(),
            key_pair,
        }
    }

    /// Creates an identity with a freshly generated Ed25519 key.
    pub fn generate(name: impl Into<String>, key_version: impl Into<String>) -> Self {
        Self::new(name, Ed25519KeyPair::generate(key_version))
    }

    /// The principal name, usually `host:port`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The active key id, e.g. `ed25519:1`.
    pub fn key_id(&self) -> String {
        self.key_pair.key_id()
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key_pair.public_key()
    }

    pub fn secret_key(&self) -> [u8; 32] {
        self.key_pair.secret_key()
    }

    pub fn key_pair(&self) -> &Ed25519KeyPair {
        &self.key_pair
    }

    /// Adds `signatures[name][key_id]` to the object.
    pub fn sign_json(&self, object: &mut CanonicalJsonObject) -> Result<(), signatures::Error> {
        signatures::sign_json(&self.name, &self.key_pair, object)
    }

    /// Checks that the object carries a valid signature by this identity.
    pub fn verify_json(&self, object: &CanonicalJsonObject) -> Result<(), signatures::Error> {
        signatures::verify_json_with_key(&self.public_key(), &self.name, &self.key_id(), object)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("key_id", &self.key_id())
            .field("public_key", &Base64::new(self.public_key().to_vec()))
            .finish_non_exhaustive()
    }
}
