use thiserror::Error;

use crate::serde::CanonicalJsonError;

/// `fedmock-core::signatures` error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The key id is not of the form `algorithm:version`.
    #[error("malformed signing key id `{0}`")]
    InvalidKeyId(String),

    /// The version part of the key id contains characters other than
    /// alphanumerics and `_`.
    #[error("invalid signing key version `{0}`")]
    InvalidVersion(String),

    /// The signature's algorithm is not supported.
    #[error("unsupported algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    /// An existing `signatures` field is not shaped like a signature map.
    #[error("malformed signatures: {0}")]
    MalformedSignatures(String),

    /// Raw key material had the wrong shape.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The object could not be brought into canonical form.
    #[error(transparent)]
    CanonicalJson(#[from] CanonicalJsonError),

    /// A base64 field could not be decoded.
    #[error("base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The signature check itself failed.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Reasons a signed object fails verification.
///
/// Missing structure is reported the same way as a bad signature: callers
/// treat every variant as "not signed by this key".
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VerificationError {
    /// The object has no `signatures` object.
    #[error("no `signatures` object present")]
    SignaturesMissing,

    /// The object's signatures do not include the entity.
    #[error("could not find signatures for `{0}`")]
    SignatureNotFound(String),

    /// There is no signature by the entity using the key id.
    #[error("could not find signature by `{entity}` with key `{key_id}`")]
    KeyIdNotFound { entity: String, key_id: String },

    /// The public key map has no key for the entity.
    #[error("could not find public key for `{0}`")]
    PublicKeyNotFound(String),

    /// A signature entry is not a string.
    #[error("signature by `{entity}` with key `{key_id}` is not a string")]
    MalformedSignature { entity: String, key_id: String },

    /// The Ed25519 check rejected the signature or key.
    #[error(transparent)]
    Signature(#[from] ed25519_dalek::SignatureError),
}
