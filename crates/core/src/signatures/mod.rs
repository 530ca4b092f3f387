//! Digital signatures according to the [Matrix](https://matrix.org/) specification.
//!
//! Homeservers sign federation requests and their key discovery responses.
//! Each signing key pair has an identifier, which consists of the name of the
//! digital signature algorithm it uses and a "version" string, separated by a
//! colon. The version is an arbitrary identifier used to distinguish key pairs
//! using the same algorithm from the same homeserver.
//!
//! Signatures are stored within the signed JSON object itself, under
//! `signatures[entity][key_id]`, as unpadded base64. The bytes that are signed
//! are the canonical JSON form of the object without its `signatures` and
//! `unsigned` fields, so signing is independent of field order and of any
//! signatures already present.
//!
//! # Signing
//!
//! To sign an arbitrary JSON object, use the `sign_json` function.
//!
//! # Verifying signatures
//!
//! To verify a signature made with one known key, use `verify_json_with_key`.
//! To check an object against a map of entities to keys, use `verify_json`.
use std::fmt;

pub use self::{
    error::{Error, VerificationError},
    functions::{canonical_json, sign_json, signature_of, verify_json, verify_json_with_key},
    keys::{Ed25519KeyPair, KeyPair, PublicKeyMap, PublicKeySet},
};
use crate::serde::base64;

mod error;
mod functions;
mod keys;

/// The algorithm used for signing data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Algorithm {
    /// The Ed25519 digital signature algorithm.
    Ed25519,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the algorithm and version from a key identifier.
pub fn split_id(id: &str) -> Result<(Algorithm, String), Error> {
    /// The length of a valid signature ID.
    const SIGNATURE_ID_LENGTH: usize = 2;

    let signature_id: Vec<&str> = id.split(':').collect();

    if signature_id.len() != SIGNATURE_ID_LENGTH {
        return Err(Error::InvalidKeyId(id.to_owned()));
    }

    let version = signature_id[1];

    const EXTRA_ALLOWED: [u8; 1] = [b'_'];
    if version.is_empty()
        || !version
            .bytes()
            .all(|ch| ch.is_ascii_alphanumeric() || EXTRA_ALLOWED.contains(&ch))
    {
        return Err(Error::InvalidVersion(version.into()));
    }

    let algorithm = match signature_id[0] {
        "ed25519" => Algorithm::Ed25519,
        algorithm => return Err(Error::UnsupportedAlgorithm(algorithm.into())),
    };

    Ok((algorithm, version.to_owned()))
}

/// A digital signature.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Signature {
    pub(crate) algorithm: Algorithm,
    pub(crate) signature: Vec<u8>,
    pub(crate) version: String,
}

impl Signature {
    /// Unpadded standard base64 of the signature bytes.
    pub fn base64(&self) -> String {
        base64::encode(&self.signature)
    }

    /// The key id, e.g. "ed25519:1".
    pub fn id(&self) -> String {
        format!("{}:{}", self.algorithm, self.version)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches2::assert_matches;
    use serde_json::{from_str as from_json_str, json, to_string as to_json_string};

    use super::{
        Algorithm, Ed25519KeyPair, Error, KeyPair, VerificationError, canonical_json, sign_json, split_id,
        verify_json, verify_json_with_key,
    };
    use crate::serde::{Base64, CanonicalJsonObject, base64};

    const SEED: &str = "2OjO919uwYS3oMP7tR/g+In9i9M1dXaYg9z+0DRP7q0";
    const PUBLIC_KEY: &str = "3TPraTczVkDPTRaX4K+AfUuyx7Mzq1UafTXypnl0t2k";

    fn keypair() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&base64::decode(SEED).unwrap(), "1").unwrap()
    }

    fn public_key_map() -> BTreeMap<String, BTreeMap<String, Base64>> {
        let mut signature_set = BTreeMap::new();
        signature_set.insert("ed25519:1".to_owned(), Base64::parse(PUBLIC_KEY).unwrap());

        let mut public_key_map = BTreeMap::new();
        public_key_map.insert("domain".to_owned(), signature_set);
        public_key_map
    }

    fn object(value: serde_json::Value) -> CanonicalJsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn valid_key_id() {
        assert_eq!(
            split_id("ed25519:abc_def").unwrap(),
            (Algorithm::Ed25519, "abc_def".to_owned())
        );
    }

    #[test]
    fn invalid_valid_key_id_length() {
        assert_matches!(split_id("ed25519:abcdef:123456"), Err(Error::InvalidKeyId(_)));
        assert_matches!(split_id("ed25519"), Err(Error::InvalidKeyId(_)));
    }

    #[test]
    fn invalid_key_id_version() {
        assert_matches!(split_id("ed25519:abc!def"), Err(Error::InvalidVersion(_)));
        assert_matches!(split_id("ed25519:"), Err(Error::InvalidVersion(_)));
    }

    #[test]
    fn invalid_key_id_algorithm() {
        assert_matches!(split_id("foobar:abcdef"), Err(Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn keypair_signature_carries_key_id() {
        let signature = keypair().sign(b"message");
        assert_eq!(signature.id(), "ed25519:1");
        assert_eq!(signature.base64().len(), 86);
    }

    #[test]
    fn keypair_exposes_public_key() {
        let keypair = keypair();
        assert_eq!(base64::encode(keypair.public_key()), PUBLIC_KEY);
        assert_eq!(keypair.key_id(), "ed25519:1");
        assert!(!format!("{keypair:?}").contains(SEED));
    }

    #[test]
    fn sign_empty_json() {
        let mut value = CanonicalJsonObject::new();

        sign_json("domain", &keypair(), &mut value).unwrap();

        assert_eq!(
            to_json_string(&value).unwrap(),
            r#"{"signatures":{"domain":{"ed25519:1":"lXjsnvhVlz8t3etR+6AEJ0IT70WujeHC1CFjDDsVx0xSig1Bx7lvoi1x3j/2/GPNjQM4a2gD34UqsXFluaQEBA"}}}"#
        );
    }

    #[test]
    fn verify_empty_json() {
        let value = from_json_str(
            r#"{"signatures":{"domain":{"ed25519:1":"lXjsnvhVlz8t3etR+6AEJ0IT70WujeHC1CFjDDsVx0xSig1Bx7lvoi1x3j/2/GPNjQM4a2gD34UqsXFluaQEBA"}}}"#,
        )
        .unwrap();

        verify_json(&public_key_map(), &value).unwrap();
    }

    #[test]
    fn sign_minimal_json() {
        let keypair = keypair();

        let mut alpha_object = from_json_str(r#"{ "one": 1, "two": "Two" }"#).unwrap();
        sign_json("domain", &keypair, &mut alpha_object).unwrap();

        assert_eq!(
            canonical_json(&alpha_object).unwrap(),
            r#"{"one":1,"two":"Two"}"#
        );
        assert_eq!(
            alpha_object["signatures"]["domain"]["ed25519:1"],
            "t6Ehmh6XTDz7qNWI0QI5tNPSliWLPQP/+Fzz3LpdCS7q1k2G2/5b5Embs2j4uG3ZeivejrzqSVoBcdocRpa+AQ"
        );

        let mut reverse_alpha_object = from_json_str(r#"{ "two": "Two", "one": 1 }"#).unwrap();
        sign_json("domain", &keypair, &mut reverse_alpha_object).unwrap();

        assert_eq!(alpha_object["signatures"], reverse_alpha_object["signatures"]);
    }

    #[test]
    fn verify_minimal_json() {
        let value = from_json_str(
            r#"{"one":1,"signatures":{"domain":{"ed25519:1":"t6Ehmh6XTDz7qNWI0QI5tNPSliWLPQP/+Fzz3LpdCS7q1k2G2/5b5Embs2j4uG3ZeivejrzqSVoBcdocRpa+AQ"}},"two":"Two"}"#
        ).unwrap();

        verify_json(&public_key_map(), &value).unwrap();

        let reverse_value = from_json_str(
            r#"{"two":"Two","signatures":{"domain":{"ed25519:1":"t6Ehmh6XTDz7qNWI0QI5tNPSliWLPQP/+Fzz3LpdCS7q1k2G2/5b5Embs2j4uG3ZeivejrzqSVoBcdocRpa+AQ"}},"one":1}"#
        ).unwrap();

        verify_json(&public_key_map(), &reverse_value).unwrap();
    }

    #[test]
    fn fail_verify_json() {
        let value = from_json_str(
            r#"{"not":"empty","signatures":{"domain":"lXjsnvhVlz8t3etR+6AEJ0IT70WujeHC1CFjDDsVx0xSig1Bx7lvoi1x3j/2/GPNjQM4a2gD34UqsXFluaQEBA"}}"#,
        )
        .unwrap();

        verify_json(&public_key_map(), &value).unwrap_err();
    }

    #[test]
    fn sign_then_verify_with_generated_key() {
        let keypair = Ed25519KeyPair::generate("abc");
        let mut value = object(json!({
            "method": "PUT",
            "uri": "/_matrix/federation/v1/send/1?x=y",
            "origin": "a.test:8448",
            "destination": "b.test:8448",
            "content": { "origin": "a.test:8448", "pdus": [1, 2, { "n": null }] },
        }));
        sign_json("a.test:8448", &keypair, &mut value).unwrap();

        verify_json_with_key(&keypair.public_key(), "a.test:8448", "ed25519:abc", &value).unwrap();
    }

    #[test]
    fn signing_keeps_unsigned_out_of_the_signed_bytes() {
        let keypair = keypair();
        let mut value = object(json!({ "one": 1, "unsigned": { "age": 10 } }));
        sign_json("domain", &keypair, &mut value).unwrap();

        value.insert("unsigned".to_owned(), json!({ "age": 99 }));
        verify_json_with_key(&keypair.public_key(), "domain", "ed25519:1", &value).unwrap();
    }

    #[test]
    fn tampering_breaks_verification() {
        let keypair = keypair();
        let mut value = object(json!({
            "method": "PUT",
            "content": { "nested": { "deep": "value" } },
        }));
        sign_json("domain", &keypair, &mut value).unwrap();

        let mut top = value.clone();
        top.insert("method".to_owned(), json!("GET"));
        assert_matches!(
            verify_json_with_key(&keypair.public_key(), "domain", "ed25519:1", &top),
            Err(Error::Verification(VerificationError::Signature(_)))
        );

        let mut nested = value.clone();
        nested["content"]["nested"]["deep"] = json!("other");
        verify_json_with_key(&keypair.public_key(), "domain", "ed25519:1", &nested).unwrap_err();

        let mut added = value;
        added.insert("extra".to_owned(), json!(true));
        verify_json_with_key(&keypair.public_key(), "domain", "ed25519:1", &added).unwrap_err();
    }

    #[test]
    fn missing_structure_is_a_verification_failure() {
        let keypair = keypair();
        let public_key = keypair.public_key();

        let bare = object(json!({ "one": 1 }));
        assert_matches!(
            verify_json_with_key(&public_key, "domain", "ed25519:1", &bare),
            Err(Error::Verification(VerificationError::SignaturesMissing))
        );

        let mut signed = bare.clone();
        sign_json("domain", &keypair, &mut signed).unwrap();
        assert_matches!(
            verify_json_with_key(&public_key, "other", "ed25519:1", &signed),
            Err(Error::Verification(VerificationError::SignatureNotFound(_)))
        );
        assert_matches!(
            verify_json_with_key(&public_key, "domain", "ed25519:9", &signed),
            Err(Error::Verification(VerificationError::KeyIdNotFound { .. }))
        );
    }

    #[test]
    fn wrong_key_fails() {
        let mut value = object(json!({ "one": 1 }));
        sign_json("domain", &keypair(), &mut value).unwrap();

        let other = Ed25519KeyPair::generate("1");
        verify_json_with_key(&other.public_key(), "domain", "ed25519:1", &value).unwrap_err();
    }

    #[test]
    fn field_order_does_not_change_signature() {
        let mut first = CanonicalJsonObject::new();
        first.insert("origin".to_owned(), json!("a.test"));
        first.insert("content".to_owned(), json!({ "b": 2, "a": [1, { "y": 1, "x": 2 }] }));
        let mut second = CanonicalJsonObject::new();
        second.insert("content".to_owned(), json!({ "a": [1, { "x": 2, "y": 1 }], "b": 2 }));
        second.insert("origin".to_owned(), json!("a.test"));

        sign_json("domain", &keypair(), &mut first).unwrap();
        sign_json("domain", &keypair(), &mut second).unwrap();
        assert_eq!(first["signatures"], second["signatures"]);
    }

    #[test]
    fn keypair_sign_is_deterministic() {
        let keypair = keypair();
        assert_eq!(keypair.sign(b"message"), keypair.sign(b"message"));
    }
}
