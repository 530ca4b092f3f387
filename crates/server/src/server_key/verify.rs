use crate::core::CanonicalJsonObject;
use crate::core::federation::discovery::ServerSigningKeys;
use crate::core::signatures;

use super::KeyFetchError;

/// Checks a key discovery response from `server` and extracts the key
/// `key_id` from it.
///
/// The response must name `server`, publish `key_id`, and carry a
/// `signatures[server][key_id]` made with that same key.
pub fn verify_server_keys(
    server: &str,
    key_id: &str,
    object: CanonicalJsonObject,
) -> Result<Vec<u8>, KeyFetchError> {
    let keys: ServerSigningKeys = serde_json::from_value(object.clone().into())
        .map_err(|e| KeyFetchError::Malformed(e.to_string()))?;

    if keys.server_name != server {
        return Err(KeyFetchError::ServerNameMismatch {
            expected: server.to_owned(),
            found: keys.server_name,
        });
    }

    let Some(verify_key) = keys.verify_keys.get(key_id) else {
        return Err(KeyFetchError::KeyNotFound {
            server: server.to_owned(),
            key_id: key_id.to_owned(),
        });
    };
    let key = verify_key.key.as_bytes().to_vec();

    signatures::verify_json_with_key(&key, server, key_id, &object)
        .map_err(|e| KeyFetchError::InvalidSignature(e.to_string()))?;

    Ok(key)
}
