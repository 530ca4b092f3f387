//! Public and private key pairs.

use std::collections::BTreeMap;
use std::fmt;

use ed25519_dalek::{SECRET_KEY_LENGTH, Signer as _, SigningKey, VerifyingKey};
use rand_core::OsRng;

use super::{Algorithm, Error, Signature};
use crate::serde::Base64;

/// A cryptographic key pair for digitally signing data.
pub trait KeyPair: Sized {
    /// Signs a JSON object.
    ///
    /// # Parameters
    ///
    /// * message: An arbitrary series of bytes to sign.
    fn sign(&self, message: &[u8]) -> Signature;
}

/// An Ed25519 key pair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,

    /// The specific name of the key pair.
    version: String,
}

impl Ed25519KeyPair {
    /// Generates a new key pair from the operating system's random source.
    pub fn generate(version: impl Into<String>) -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            version: version.into(),
        }
    }

    /// Recreates a key pair from its 32-byte secret seed.
    pub fn from_seed(seed: &[u8], version: impl Into<String>) -> Result<Self, Error> {
        let seed: [u8; SECRET_KEY_LENGTH] = seed.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "expected a {SECRET_KEY_LENGTH}-byte Ed25519 seed, got {} bytes",
                seed.len()
            ))
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
            version: version.into(),
        })
    }

    /// Returns the version string for this keypair.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The key id, e.g. `ed25519:1`.
    pub fn key_id(&self) -> String {
        format!("{}:{}", Algorithm::Ed25519, self.version)
    }

    /// Returns the public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Returns the secret seed. It never leaves the process on its own.
    pub fn secret_key(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl KeyPair for Ed25519KeyPair {
    fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            algorithm: Algorithm::Ed25519,
            signature: self.signing_key.sign(message).to_bytes().to_vec(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Ed25519KeyPair")
            .field("verifying_key", &Base64::new(self.public_key().to_vec()))
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Parses raw public key bytes into an Ed25519 verifying key.
pub(super) fn verifying_key(public_key: &[u8]) -> Result<VerifyingKey, Error> {
    let bytes: &[u8; 32] = public_key.try_into().map_err(|_| {
        Error::InvalidKey(format!("expected a 32-byte Ed25519 public key, got {} bytes", public_key.len()))
    })?;
    VerifyingKey::from_bytes(bytes).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// A map from entity names to sets of public keys for that entity.
///
/// "Entity" is generally a homeserver, e.g. "example.com".
pub type PublicKeyMap = BTreeMap<String, PublicKeySet>;

/// A set of public keys for a single homeserver.
///
/// This is represented as a map from key ID to base64-encoded signature.
pub type PublicKeySet = BTreeMap<String, Base64>;
