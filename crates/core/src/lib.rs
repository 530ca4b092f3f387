#![allow(missing_docs)]
//! Core types shared by the fedmock crates: signing identities, canonical
//! JSON, `X-Matrix` request authorization and the server key discovery wire
//! format.

pub mod authorization;
pub mod error;
pub mod federation;
pub mod identity;
pub mod sending;
pub mod serde;
pub mod signatures;
mod time;

pub use error::MatrixError;
pub use identity::Identity;
pub use time::UnixMillis;

pub use self::serde::{CanonicalJsonObject, JsonValue};
