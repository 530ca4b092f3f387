use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use salvo::http::{Method, StatusCode};

use crate::AppResult;
use crate::core::serde::{CanonicalJsonObject, JsonValue};

/// An authenticated request, as handed to a [`FederationHandler`].
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// The server that signed the request.
    pub origin: String,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Path segments after the prefix the handler was registered under.
    pub segments: Vec<String>,
    pub body: Option<CanonicalJsonObject>,
}

/// What a handler answers with.
#[derive(Debug, Clone)]
pub enum HandlerReply {
    /// Sent as is. A `None` body sends no body at all.
    Raw { status: StatusCode, body: Option<JsonValue> },
    /// Signed by the server's identity and sent with `200 OK`.
    Signed(CanonicalJsonObject),
}

impl HandlerReply {
    pub fn ok(body: JsonValue) -> Self {
        Self::Raw {
            status: StatusCode::OK,
            body: Some(body),
        }
    }
}

#[async_trait]
pub trait FederationHandler: Send + Sync + 'static {
    async fn handle(&self, request: InboundRequest) -> AppResult<HandlerReply>;
}

#[async_trait]
impl<F, Fut> FederationHandler for F
where
    F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<HandlerReply>> + Send + 'static,
{
    async fn handle(&self, request: InboundRequest) -> AppResult<HandlerReply> {
        self(request).await
    }
}

/// Handlers keyed by the `/`-separated path prefix they serve.
///
/// The deepest registered prefix of a request path wins; a handler under `/`
/// catches everything no other handler claims.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<Vec<String>, Arc<dyn FederationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `prefix`, replacing any earlier one.
    pub fn push(mut self, prefix: &str, handler: impl FederationHandler) -> Self {
        self.handlers.insert(segments(prefix), Arc::new(handler));
        self
    }

    /// Finds the handler for `path` and the segments left after its prefix.
    pub fn resolve(&self, path: &str) -> Option<(Arc<dyn FederationHandler>, Vec<String>)> {
        let segments = segments(path);
        (0..=segments.len()).rev().find_map(|len| {
            self.handlers
                .get(&segments[..len])
                .map(|handler| (handler.clone(), segments[len..].to_vec()))
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut prefixes = self
            .handlers
            .keys()
            .map(|segments| format!("/{}", segments.join("/")))
            .collect::<Vec<_>>();
        prefixes.sort();
        f.debug_struct("HandlerRegistry").field("prefixes", &prefixes).finish()
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
