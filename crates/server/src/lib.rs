#![allow(missing_docs)]
//! A Matrix federation peer for test harnesses.
//!
//! [`FederationClient`] signs outgoing requests with the harness identity,
//! [`InboundServer`] verifies the `X-Matrix` signature of incoming requests
//! before handing them to registered handlers, and both share one
//! [`KeyCache`] of peer verify keys.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod hoops;
pub mod logging;
pub mod routing;
pub mod sending;
pub mod server_key;
pub mod tls;

mod cjson;
pub use cjson::Cjson;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{AppError, AuthError};
pub use fedmock_core as core;
pub use routing::{FederationHandler, HandlerRegistry, HandlerReply, InboundRequest, InboundServer};
pub use sending::{FederationClient, FederationSettings, Transport};
pub use server_key::{KeyCache, KeyFetchError};

use crate::core::{CanonicalJsonObject, Identity};

pub type AppResult<T> = Result<T, crate::AppError>;

/// What both the outbound and the inbound role can do with the shared
/// identity and key cache.
#[async_trait]
pub trait Federated: Send + Sync {
    fn identity(&self) -> &Identity;

    /// Signs `object` as this server, adding `signatures[name][key_id]`.
    fn sign_data(&self, object: &mut CanonicalJsonObject) -> AppResult<()> {
        self.identity().sign_json(object)?;
        Ok(())
    }

    /// Resolves a peer verify key, fetching it on a cache miss.
    async fn get_key(&self, principal: &str, key_id: &str) -> Result<Vec<u8>, KeyFetchError>;
}

/// Wires one identity and one key cache into a client and a server.
///
/// Peers are reached over HTTP with a `reqwest` client built from `settings`.
pub fn configure(
    identity: Identity,
    key_cache: KeyCache,
    settings: FederationSettings,
    registry: HandlerRegistry,
) -> AppResult<(FederationClient, InboundServer)> {
    let transport = sending::http_client(&settings)?;
    Ok(configure_with_transport(
        identity,
        key_cache,
        settings,
        registry,
        Arc::new(transport),
    ))
}

/// Like [`configure`], with the transport supplied by the caller.
pub fn configure_with_transport(
    identity: Identity,
    key_cache: KeyCache,
    settings: FederationSettings,
    registry: HandlerRegistry,
    transport: Arc<dyn Transport>,
) -> (FederationClient, InboundServer) {
    let client = FederationClient::new(Arc::new(identity), key_cache, settings, transport);
    let server = InboundServer::new(client.clone(), registry);
    (client, server)
}
