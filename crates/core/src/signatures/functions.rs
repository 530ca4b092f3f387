//! Functions for signing and verifying JSON.

use ed25519_dalek::Verifier as _;
use serde_json::Value as JsonValue;

use super::keys::verifying_key;
use super::{Algorithm, Error, KeyPair, PublicKeyMap, VerificationError, split_id};
use crate::serde::{CanonicalJsonObject, base64, to_canonical_string};

/// Top-level fields left out of the signed bytes.
const CANONICAL_JSON_FIELDS_TO_REMOVE: &[&str] = &["signatures", "unsigned"];

/// Converts a JSON object into the "canonical" string form, leaving out the
/// `signatures` and `unsigned` fields.
///
/// # Parameters
///
/// * object: The JSON object to convert.
pub fn canonical_json(object: &CanonicalJsonObject) -> Result<String, Error> {
    let mut object = object.clone();
    for field in CANONICAL_JSON_FIELDS_TO_REMOVE {
        object.remove(*field);
    }
    Ok(to_canonical_string(&JsonValue::Object(object))?)
}

/// Signs an arbitrary JSON object and adds the signature to an object under
/// the key `signatures`.
///
/// If `signatures` is already present, the new signature will be appended to
/// the existing ones, replacing any earlier signature by the same entity and
/// key id.
///
/// # Parameters
///
/// * entity_id: The identifier of the entity creating the signature.
///   Generally this means a homeserver, e.g. "example.com".
/// * key_pair: A cryptographic key pair used to sign the JSON.
/// * object: A JSON object to sign according and append a signature to.
///
/// # Errors
///
/// Returns an error if:
///
/// * `object` contains a field called `signatures` that is not a JSON object.
/// * `object` contains a number with no canonical form.
pub fn sign_json<K>(entity_id: &str, key_pair: &K, object: &mut CanonicalJsonObject) -> Result<(), Error>
where
    K: KeyPair,
{
    let json = canonical_json(object)?;
    let signature = key_pair.sign(json.as_bytes());

    let signatures = object
        .entry("signatures")
        .or_insert_with(|| JsonValue::Object(CanonicalJsonObject::new()));
    let JsonValue::Object(signatures) = signatures else {
        return Err(Error::MalformedSignatures("field `signatures` must be a JSON object".to_owned()));
    };

    let entity = signatures
        .entry(entity_id)
        .or_insert_with(|| JsonValue::Object(CanonicalJsonObject::new()));
    let JsonValue::Object(entity) = entity else {
        return Err(Error::MalformedSignatures(format!("signatures of `{entity_id}` must be a JSON object")));
    };

    entity.insert(signature.id(), JsonValue::String(signature.base64()));
    Ok(())
}

/// Returns the encoded signature `entity_id` made with `key_id`, if the object
/// carries one.
pub fn signature_of<'a>(
    object: &'a CanonicalJsonObject,
    entity_id: &str,
    key_id: &str,
) -> Result<&'a str, VerificationError> {
    let signatures = object
        .get("signatures")
        .and_then(JsonValue::as_object)
        .ok_or(VerificationError::SignaturesMissing)?;
    let entity = signatures
        .get(entity_id)
        .and_then(JsonValue::as_object)
        .ok_or_else(|| VerificationError::SignatureNotFound(entity_id.to_owned()))?;
    let signature = entity.get(key_id).ok_or_else(|| VerificationError::KeyIdNotFound {
        entity: entity_id.to_owned(),
        key_id: key_id.to_owned(),
    })?;
    signature.as_str().ok_or_else(|| VerificationError::MalformedSignature {
        entity: entity_id.to_owned(),
        key_id: key_id.to_owned(),
    })
}

/// Verifies the signature `entity_id` made over `object` with the key
/// `key_id`.
///
/// The signature entry must exist under `signatures[entity_id][key_id]`;
/// any missing level fails verification.
pub fn verify_json_with_key(
    public_key: &[u8],
    entity_id: &str,
    key_id: &str,
    object: &CanonicalJsonObject,
) -> Result<(), Error> {
    let (algorithm, _) = split_id(key_id)?;
    let encoded = signature_of(object, entity_id, key_id)?;
    let signature_bytes = base64::decode(encoded)?;
    let canonical = canonical_json(object)?;

    match algorithm {
        Algorithm::Ed25519 => verify_ed25519(public_key, &signature_bytes, canonical.as_bytes()),
    }
}

/// Uses a set of public keys to verify a signed JSON object.
///
/// Every entity in `public_key_map` must have signed the object with at least
/// one of the listed keys that it also has a signature for.
///
/// # Parameters
///
/// * public_key_map: A map from entity identifiers to a map from key
///   identifiers to public keys.
/// * object: The JSON object that was signed.
pub fn verify_json(public_key_map: &PublicKeyMap, object: &CanonicalJsonObject) -> Result<(), Error> {
    let signatures = object
        .get("signatures")
        .and_then(JsonValue::as_object)
        .ok_or(VerificationError::SignaturesMissing)?;

    for (entity_id, public_keys) in public_key_map {
        let entity_signatures = signatures
            .get(entity_id)
            .and_then(JsonValue::as_object)
            .ok_or_else(|| VerificationError::SignatureNotFound(entity_id.clone()))?;

        let Some((key_id, public_key)) = public_keys
            .iter()
            .find(|(key_id, _)| entity_signatures.contains_key(key_id.as_str()))
        else {
            return Err(VerificationError::PublicKeyNotFound(entity_id.clone()).into());
        };

        verify_json_with_key(public_key.as_bytes(), entity_id, key_id, object)?;
    }

    Ok(())
}

fn verify_ed25519(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), Error> {
    let key = verifying_key(public_key)?;
    let signature = ed25519_dalek::Signature::from_slice(signature).map_err(VerificationError::Signature)?;
    key.verify(message, &signature).map_err(VerificationError::Signature)?;
    Ok(())
}
