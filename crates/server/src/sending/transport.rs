use std::time::Duration;

use async_trait::async_trait;

use super::FederationSettings;
use crate::AppResult;
use crate::core::sending::SendError;

/// Moves a built request to a peer and hands back its response.
///
/// Signing happens before a request reaches the transport, so an
/// implementation only deals with the wire.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, SendError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, SendError> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}

/// Returns a reqwest client for talking to peers.
pub fn http_client(settings: &FederationSettings) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(60 * 3))
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()?;
    Ok(client)
}
