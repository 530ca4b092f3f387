//! Key discovery, answered without authentication.

use salvo::http::{Method, StatusCode};

use super::HandlerReply;
use crate::core::MatrixError;
use crate::core::federation::discovery::TlsFingerprint;
use crate::core::serde::to_json_object;
use crate::server_key::server_keys;
use crate::{AppResult, AuthError, Federated};

/// Returns the path below the key discovery prefix, if `path` is under it.
pub(super) fn key_discovery_path<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix.trim_end_matches('/'))?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// #GET /_matrix/key/v2/server/{key_id}
/// Gets the public signing keys of this server.
///
/// The key id segment is optional and does not filter: the current key is
/// always returned, valid for 24 hours and signed by itself.
pub(super) fn server_signing_keys<F>(
    federated: &F,
    tls_fingerprints: &[TlsFingerprint],
    method: &Method,
    rest: &str,
) -> AppResult<HandlerReply>
where
    F: Federated + ?Sized,
{
    let segments = rest.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    if !matches!(segments.as_slice(), ["server"] | ["server", _]) {
        return Err(AuthError::DispatchNotFound(rest.to_owned()).into());
    }
    if *method != Method::GET {
        return Err(MatrixError {
            status_code: Some(StatusCode::METHOD_NOT_ALLOWED),
            ..MatrixError::unrecognized("Unrecognized request")
        }
        .into());
    }

    let keys = server_keys(federated.identity(), tls_fingerprints);
    Ok(HandlerReply::Signed(to_json_object(&keys)?))
}
