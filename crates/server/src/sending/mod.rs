use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use url::{Position, Url};

use crate::core::authorization::XMatrix;
use crate::core::federation::KEY_DISCOVERY_PREFIX;
use crate::core::federation::key::server_keys_request;
pub use crate::core::sending::*;
use crate::core::serde::{CanonicalJsonObject, JsonValue, json_object_from_slice};
use crate::core::{Identity, MatrixError, signatures};
use crate::server_key::{KeyCache, KeyFetchError, verify_server_keys};
use crate::{AppResult, Federated};

mod transport;
pub use transport::*;
#[cfg(test)]
pub(crate) use transport::scripted;

/// How peers are reached.
#[derive(Clone, Debug)]
pub struct FederationSettings {
    /// Scheme used for requests this server builds itself, e.g. key fetches.
    pub scheme: String,
    pub key_discovery_prefix: String,
    /// Peers in a test harness mostly serve self-signed certificates.
    pub accept_invalid_certs: bool,
    /// Largest inbound request body read, in bytes.
    pub max_request_size: usize,
}

/// Default for [`FederationSettings::max_request_size`].
pub const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            scheme: "https".to_owned(),
            key_discovery_prefix: KEY_DISCOVERY_PREFIX.to_owned(),
            accept_invalid_certs: true,
            max_request_size: MAX_REQUEST_SIZE,
        }
    }
}

/// Sends requests signed as this server and fetches peer keys.
///
/// Cheap to clone; clones share the identity, key cache and transport.
#[derive(Clone)]
pub struct FederationClient {
    identity: Arc<Identity>,
    key_cache: KeyCache,
    settings: Arc<FederationSettings>,
    transport: Arc<dyn Transport>,
}

impl FederationClient {
    pub fn new(
        identity: Arc<Identity>,
        key_cache: KeyCache,
        settings: FederationSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            key_cache,
            settings: Arc::new(settings),
            transport,
        }
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    pub fn settings(&self) -> &FederationSettings {
        &self.settings
    }

    /// Signs the request `method url` with an optional JSON body and returns
    /// the `Authorization` credentials for it.
    ///
    /// `None` and an empty object are different bodies: only the latter adds
    /// `content` to the signed JSON.
    pub fn sign_request(&self, method: &Method, url: &Url, body: Option<&JsonValue>) -> AppResult<XMatrix> {
        let origin = self.identity.name();
        let key_id = self.identity.key_id();

        let mut request_map = CanonicalJsonObject::new();
        if let Some(body) = body {
            request_map.insert("content".to_owned(), body.clone());
        }
        request_map.insert("method".to_owned(), method.as_str().into());
        request_map.insert("uri".to_owned(), request_uri(url).into());
        request_map.insert("origin".to_owned(), origin.into());
        request_map.insert("destination".to_owned(), destination(url).into());

        self.sign_data(&mut request_map)?;
        let sig = signatures::signature_of(&request_map, origin, &key_id).map_err(signatures::Error::from)?;

        Ok(XMatrix::new(origin, key_id.as_str(), sig))
    }

    /// Sends a signed request to the peer named by `url`'s authority.
    #[tracing::instrument(skip(self, body), fields(origin = %self.identity.name()))]
    pub async fn send(&self, method: Method, url: Url, body: Option<JsonValue>) -> AppResult<reqwest::Response> {
        let x_matrix = self.sign_request(&method, &url, body.as_ref())?;

        let mut request = SendRequest::new(method, url);
        if let Some(body) = &body {
            request = request.json_body(body)?;
        }
        let request = request.stuff((AUTHORIZATION, x_matrix.to_header_value()?))?;

        let url = request.url().clone();
        debug!(%url, "sending federation request");
        match self.transport.execute(request.into_inner()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(%url, error = %e, "could not send federation request");
                Err(e.into())
            }
        }
    }

    /// Like [`send`](Self::send), decoding a successful JSON reply.
    ///
    /// Any non-2xx reply becomes the [`MatrixError`] the peer described.
    pub async fn send_json<T>(&self, method: Method, url: Url, body: Option<JsonValue>) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, url, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let url = response.url().clone();
        let body = response.bytes().await.unwrap_or_default();
        warn!(%url, %status, "peer answered with an error");
        Err(MatrixError::from_response(status, &body).into())
    }

    /// Fetches `server`'s key `key_id` from its key discovery endpoint.
    ///
    /// The request is not signed. The response must name `server`, publish
    /// `key_id`, and be signed with that key.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_key(&self, server: &str, key_id: &str) -> Result<Vec<u8>, KeyFetchError> {
        let origin = format!("{}://{server}", self.settings.scheme);
        let request = server_keys_request(&origin, &self.settings.key_discovery_prefix, Some(key_id))
            .map_err(|e| KeyFetchError::Network(e.to_string()))?;

        let response = self
            .transport
            .execute(request.into_inner())
            .await
            .map_err(|e| KeyFetchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(KeyFetchError::Network(format!("key server answered {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| KeyFetchError::Network(e.to_string()))?;
        let object = json_object_from_slice(&body).map_err(|e| KeyFetchError::Malformed(e.to_string()))?;

        let key = verify_server_keys(server, key_id, object)?;
        debug!("fetched verify key");
        Ok(key)
    }
}

#[async_trait]
impl Federated for FederationClient {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn get_key(&self, principal: &str, key_id: &str) -> Result<Vec<u8>, KeyFetchError> {
        if principal == self.identity.name() && key_id == self.identity.key_id() {
            return Ok(self.identity.public_key().to_vec());
        }

        let client = self.clone();
        self.key_cache
            .get(principal, key_id, move |server, key_id| async move {
                client.fetch_key(&server, &key_id).await
            })
            .await
    }
}

impl std::fmt::Debug for FederationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationClient")
            .field("identity", &self.identity)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Path and query, as signed in `uri`.
fn request_uri(url: &Url) -> &str {
    &url[Position::BeforePath..Position::AfterQuery]
}

/// Host and port, as signed in `destination`.
fn destination(url: &Url) -> &str {
    &url[Position::BeforeHost..Position::AfterPort]
}
