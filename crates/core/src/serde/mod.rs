//! (De)serialization helpers.

pub mod base64;
pub mod canonical_json;

pub use serde_json::Value as JsonValue;

pub use self::base64::Base64;
pub use self::canonical_json::{CanonicalJsonError, CanonicalJsonObject, to_canonical_string};

/// Parses the bytes as a JSON object.
pub fn json_object_from_slice(bytes: &[u8]) -> Result<CanonicalJsonObject, CanonicalJsonError> {
    match serde_json::from_slice::<JsonValue>(bytes)? {
        JsonValue::Object(object) => Ok(object),
        _ => Err(CanonicalJsonError::NotObject),
    }
}

/// Converts any serializable value into a JSON object.
pub fn to_json_object<T: ::serde::Serialize + ?Sized>(value: &T) -> Result<CanonicalJsonObject, CanonicalJsonError> {
    match serde_json::to_value(value)? {
        JsonValue::Object(object) => Ok(object),
        _ => Err(CanonicalJsonError::NotObject),
    }
}

/// For `#[serde(default = "...")]` on flags that default to on.
pub fn default_true() -> bool {
    true
}
