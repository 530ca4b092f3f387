use serde::Deserialize;

use super::LoggerConfig;
use crate::core::federation::KEY_DISCOVERY_PREFIX;
use crate::core::serde::{base64, default_true};
use crate::core::signatures::Ed25519KeyPair;
use crate::core::Identity;
use crate::sending::MAX_REQUEST_SIZE;
use crate::{AppError, AppResult, FederationSettings};

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub tls: Option<TlsConfig>,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// The name this server signs as, usually `host:port`.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    /// Version half of the key id, `ed25519:<key_version>`.
    #[serde(default = "default_key_version")]
    pub key_version: String,
    /// Base64 Ed25519 seed. A new key is generated at every start when unset.
    pub signing_key: Option<String>,
    #[serde(default = "default_key_discovery_prefix")]
    pub key_discovery_prefix: String,
    /// Scheme used to reach peers.
    #[serde(default = "default_federation_scheme")]
    pub federation_scheme: String,
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    /// Largest inbound request body, in bytes.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,

    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain.
    pub cert: String,
    /// PEM private key.
    pub key: String,
}

impl ServerConfig {
    pub fn federation_settings(&self) -> FederationSettings {
        FederationSettings {
            scheme: self.federation_scheme.clone(),
            key_discovery_prefix: self.key_discovery_prefix.clone(),
            accept_invalid_certs: self.accept_invalid_certs,
            max_request_size: self.max_request_size,
        }
    }

    /// The identity to sign as, from the configured seed or a fresh key.
    pub fn identity(&self) -> AppResult<Identity> {
        let key_pair = match &self.signing_key {
            Some(seed) => {
                let seed = base64::decode(seed)
                    .map_err(|e| AppError::public(format!("signing_key is not valid base64: {e}")))?;
                Ed25519KeyPair::from_seed(&seed, self.key_version.clone())?
            }
            None => Ed25519KeyPair::generate(self.key_version.clone()),
        };
        Ok(Identity::new(self.server_name.clone(), key_pair))
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8448".into()
}

fn default_server_name() -> String {
    "localhost:8448".into()
}

fn default_key_version() -> String {
    "1".into()
}

fn default_key_discovery_prefix() -> String {
    KEY_DISCOVERY_PREFIX.into()
}

fn default_federation_scheme() -> String {
    "https".into()
}

fn default_max_request_size() -> usize {
    MAX_REQUEST_SIZE
}
