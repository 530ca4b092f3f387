//! (De)serializable types for the [Matrix Server-Server API][federation-api]
//! that the authentication layer touches.
//!
//! [federation-api]: https://spec.matrix.org/latest/server-server-api/

pub mod discovery;
pub mod key;

/// Path prefix of the server key discovery API.
pub const KEY_DISCOVERY_PREFIX: &str = "/_matrix/key/v2";
