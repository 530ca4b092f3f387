use std::io;

use async_trait::async_trait;
use salvo::http::StatusCode;
use salvo::prelude::{Depot, Request, Response, Writer};
use thiserror::Error;

use crate::core::MatrixError;
use crate::server_key::KeyFetchError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("public: `{0}`")]
    Public(String),
    #[error("internal: `{0}`")]
    Internal(String),
    #[error("io: `{0}`")]
    Io(#[from] io::Error),
    #[error("reqwest: `{0}`")]
    Reqwest(#[from] reqwest::Error),
    #[error("Matrix error: `{0}`")]
    Matrix(#[from] crate::core::MatrixError),
    #[error("Auth error: `{0}`")]
    Auth(#[from] AuthError),
    #[error("Send error: `{0}`")]
    Send(#[from] crate::core::sending::SendError),
    #[error("Signatures error: `{0}`")]
    Signatures(#[from] crate::core::signatures::Error),
    #[error("CanonicalJson error: `{0}`")]
    CanonicalJson(#[from] crate::core::serde::CanonicalJsonError),
    #[error("Invalid header value: `{0}`")]
    InvalidHeaderValue(#[from] salvo::http::header::InvalidHeaderValue),
}

impl AppError {
    pub fn public<S: Into<String>>(msg: S) -> Self {
        Self::Public(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Why an incoming federation request was turned away.
///
/// Answered with `403 {"errcode":"UNAUTHORIZED"}`, except for
/// [`AuthError::BodyTooLarge`] (413 `M_TOO_LARGE`) and
/// [`AuthError::DispatchNotFound`] (a bare 404).
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or invalid X-Matrix authorization: {0}")]
    MissingAuthParam(String),
    #[error("Request body origin `{body}` does not match authorization origin `{header}`")]
    OriginMismatch { header: String, body: String },
    #[error("Request body is not a JSON object: {0}")]
    BadJson(String),
    #[error("Request body is over {0} bytes")]
    BodyTooLarge(usize),
    #[error("Failed to fetch verify key: {0}")]
    KeyFetchFailed(#[from] KeyFetchError),
    #[error("Failed to verify X-Matrix signature: {0}")]
    SignatureInvalid(String),
    #[error("No handler registered for `{0}`")]
    DispatchNotFound(String),
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, req: &mut Request, depot: &mut Depot, res: &mut Response) {
        let matrix = match self {
            Self::Auth(AuthError::DispatchNotFound(path)) => {
                debug!(%path, "no federation handler");
                res.status_code(StatusCode::NOT_FOUND);
                return;
            }
            Self::Auth(e @ AuthError::BodyTooLarge(_)) => MatrixError::too_large(e.to_string()),
            Self::Auth(e) => MatrixError::unauthorized(e.to_string()),
            Self::Matrix(e) => e,
            Self::Public(msg) => MatrixError::unknown(msg),
            e => {
                error!(error = %e, "internal error");
                MatrixError::unknown("unknown error happened.")
            }
        };
        matrix.write(req, depot, res).await;
    }
}

#[cfg(test)]
mod tests {
    use salvo::prelude::*;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::{Value as JsonValue, json};

    use super::{AppError, AuthError};
    use crate::AppResult;
    use crate::server_key::KeyFetchError;

    #[handler]
    async fn rejected() -> AppResult<()> {
        Err(AuthError::KeyFetchFailed(KeyFetchError::KeyNotFound {
            server: "peer.test".to_owned(),
            key_id: "ed25519:9".to_owned(),
        })
        .into())
    }

    #[handler]
    async fn oversized() -> AppResult<()> {
        Err(AuthError::BodyTooLarge(1024).into())
    }

    #[handler]
    async fn unrouted() -> AppResult<()> {
        Err(AuthError::DispatchNotFound("/nothing".to_owned()).into())
    }

    #[handler]
    async fn broken() -> AppResult<()> {
        Err(AppError::internal("database on fire"))
    }

    fn service() -> Service {
        let router = Router::new()
            .push(Router::with_path("rejected").get(rejected))
            .push(Router::with_path("oversized").get(oversized))
            .push(Router::with_path("unrouted").get(unrouted))
            .push(Router::with_path("broken").get(broken));
        Service::new(router).catcher(crate::hoops::catcher())
    }

    #[tokio::test]
    async fn auth_errors_are_unauthorized() {
        let mut res = TestClient::get("http://127.0.0.1/rejected").send(&service()).await;
        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        let body: JsonValue = res.take_json().await.unwrap();
        assert_eq!(body["errcode"], json!("UNAUTHORIZED"));
        assert!(body["error"].as_str().unwrap().contains("ed25519:9"));
    }

    #[tokio::test]
    async fn oversized_body_is_not_an_auth_failure() {
        let mut res = TestClient::get("http://127.0.0.1/oversized").send(&service()).await;
        assert_eq!(res.status_code, Some(StatusCode::PAYLOAD_TOO_LARGE));
        let body: JsonValue = res.take_json().await.unwrap();
        assert_eq!(body["errcode"], json!("M_TOO_LARGE"));
    }

    #[tokio::test]
    async fn dispatch_miss_is_bare_not_found() {
        let mut res = TestClient::get("http://127.0.0.1/unrouted").send(&service()).await;
        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
        assert_eq!(res.take_string().await.unwrap(), "");
    }

    #[tokio::test]
    async fn internal_errors_are_hidden() {
        let mut res = TestClient::get("http://127.0.0.1/broken").send(&service()).await;
        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
        let body: JsonValue = res.take_json().await.unwrap();
        assert_eq!(body["errcode"], json!("M_UNKNOWN"));
        assert!(!body["error"].as_str().unwrap().contains("fire"));
    }
}
