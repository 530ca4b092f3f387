mod key;
mod registry;

pub use registry::*;

use std::sync::Arc;

use async_trait::async_trait;
use salvo::http::StatusCode;
use salvo::prelude::{Depot, FlowCtrl, Handler, Json, Request, Response, Router, Service, Writer};

use crate::core::Identity;
use crate::core::federation::discovery::TlsFingerprint;
use crate::server_key::KeyFetchError;
use crate::{AppResult, AuthError, Cjson, Federated, FederationClient, hoops, tls};

/// Answers federation requests as this server.
///
/// Key discovery under the configured prefix is served without
/// authentication. Every other request must carry a valid `X-Matrix`
/// signature before it reaches the [`HandlerRegistry`].
#[derive(Clone)]
pub struct InboundServer {
    client: FederationClient,
    registry: Arc<HandlerRegistry>,
    tls_fingerprints: Arc<Vec<TlsFingerprint>>,
}

impl InboundServer {
    pub fn new(client: FederationClient, registry: HandlerRegistry) -> Self {
        Self {
            client,
            registry: Arc::new(registry),
            tls_fingerprints: Arc::new(Vec::new()),
        }
    }

    /// Advertises the fingerprint of the DER certificate this server serves
    /// TLS with.
    pub fn with_certificate(mut self, der: &[u8]) -> Self {
        self.tls_fingerprints = Arc::new(vec![tls::fingerprint(der)]);
        self
    }

    /// The client used to fetch peer keys, sharing this server's identity and
    /// key cache.
    pub fn client(&self) -> &FederationClient {
        &self.client
    }

    pub fn router(self) -> Router {
        Router::with_path("{**rest}").goal(self)
    }

    pub fn service(self) -> Service {
        Service::new(self.router()).catcher(hoops::catcher())
    }

    async fn serve(&self, req: &mut Request) -> AppResult<HandlerReply> {
        let path = req.uri().path().to_owned();
        if let Some(rest) = key::key_discovery_path(&self.client.settings().key_discovery_prefix, &path) {
            return key::server_signing_keys(self, &self.tls_fingerprints, req.method(), rest);
        }

        let max_body_size = self.client.settings().max_request_size;
        let authed = hoops::auth_by_signatures(self, req, max_body_size).await?;

        let Some((handler, segments)) = self.registry.resolve(&path) else {
            return Err(AuthError::DispatchNotFound(path).into());
        };
        debug!(origin = %authed.origin, %path, "dispatching federation request");
        let request = InboundRequest {
            origin: authed.origin,
            method: req.method().clone(),
            query: req.uri().query().map(ToOwned::to_owned),
            path,
            segments,
            body: authed.body,
        };
        FederationHandler::handle(handler.as_ref(), request).await
    }

    fn write_reply(&self, reply: HandlerReply, res: &mut Response) -> AppResult<()> {
        match reply {
            HandlerReply::Raw { status, body } => {
                res.status_code(status);
                if let Some(body) = body {
                    res.render(Json(body));
                }
            }
            HandlerReply::Signed(mut object) => {
                self.sign_data(&mut object)?;
                res.status_code(StatusCode::OK);
                res.render(Cjson(object));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for InboundServer {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, _ctrl: &mut FlowCtrl) {
        let result = match self.serve(req).await {
            Ok(reply) => self.write_reply(reply, res),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            e.write(req, depot, res).await;
        }
    }
}

#[async_trait]
impl Federated for InboundServer {
    fn identity(&self) -> &Identity {
        self.client.identity()
    }

    async fn get_key(&self, principal: &str, key_id: &str) -> Result<Vec<u8>, KeyFetchError> {
        self.client.get_key(principal, key_id).await
    }
}

impl std::fmt::Debug for InboundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundServer")
            .field("client", &self.client)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
