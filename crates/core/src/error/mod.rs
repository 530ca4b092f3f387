//! Errors that can be sent to, or received from, a federation peer.

use std::error::Error as StdError;
use std::fmt;
use std::iter::FromIterator;

use http::StatusCode;
use salvo::http::{Response, header};
use salvo::writing::Scribe;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

mod kind;
pub use kind::*;

macro_rules! simple_kind_fns {
    ($($fname:ident, $kind:ident;)+) => {
        $(
            /// Create a new `MatrixError`.
            pub fn $fname(body: impl Into<ErrorBody>) -> Self {
                Self::new(ErrorKind::$kind, body)
            }
        )+
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody(JsonMap<String, JsonValue>);

impl ErrorBody {
    /// The human readable `error` message, if any.
    pub fn message(&self) -> Option<&str> {
        self.0.get("error").and_then(JsonValue::as_str)
    }
}

impl From<String> for ErrorBody {
    fn from(message: String) -> Self {
        Self(JsonMap::from_iter(vec![("error".to_owned(), json!(message))]))
    }
}
impl From<&str> for ErrorBody {
    fn from(message: &str) -> Self {
        Self(JsonMap::from_iter(vec![("error".to_owned(), json!(message))]))
    }
}
impl From<JsonMap<String, JsonValue>> for ErrorBody {
    fn from(inner: JsonMap<String, JsonValue>) -> Self {
        Self(inner)
    }
}

/// A Matrix Error
#[derive(Debug, Clone)]
#[allow(clippy::exhaustive_structs)]
pub struct MatrixError {
    /// The http status code.
    pub status_code: Option<StatusCode>,

    pub kind: ErrorKind,

    /// The http response's body.
    pub body: ErrorBody,
}

impl MatrixError {
    pub fn new(kind: ErrorKind, body: impl Into<ErrorBody>) -> Self {
        Self {
            status_code: None,
            kind,
            body: body.into(),
        }
    }

    simple_kind_fns! {
        unauthorized, Unauthorized;
        too_large, TooLarge;
        unknown, Unknown;
        unrecognized, Unrecognized;
    }

    /// Rebuilds the error a peer answered with.
    ///
    /// The body's `errcode` selects the kind; everything else in the body is
    /// kept as is.
    pub fn from_response(status_code: StatusCode, body: &[u8]) -> Self {
        let mut body = serde_json::from_slice::<JsonMap<String, JsonValue>>(body).unwrap_or_default();
        let kind = body
            .remove("errcode")
            .and_then(|code| code.as_str().map(ErrorKind::from_errcode))
            .unwrap_or(ErrorKind::Unknown);
        if !body.contains_key("error") {
            body.insert("error".to_owned(), json!(format!("peer responded with {status_code}")));
        }
        Self {
            status_code: Some(status_code),
            kind,
            body: body.into(),
        }
    }

    /// The status code this error is rendered with.
    pub fn status(&self) -> StatusCode {
        self.status_code.unwrap_or_else(|| self.kind.status_code())
    }

    /// The JSON body sent on the wire, `errcode` included.
    pub fn to_json(&self) -> JsonMap<String, JsonValue> {
        let mut body = self.body.0.clone();
        body.insert("errcode".to_owned(), self.kind.errcode().into());
        body
    }
}

impl Serialize for MatrixError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} / {}]", self.status().as_u16(), self.kind)?;
        if let Some(message) = self.body.message() {
            write!(f, " {message}")?;
        }
        Ok(())
    }
}

impl StdError for MatrixError {}

impl Scribe for MatrixError {
    fn render(self, res: &mut Response) {
        res.add_header(header::CONTENT_TYPE, "application/json", true).ok();

        if res.status_code.map(|c| c.is_success()).unwrap_or(true) {
            res.status_code(self.status());
        }

        match serde_json::to_vec(&self.to_json()) {
            Ok(bytes) => {
                res.write_body(bytes).ok();
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to serialize error body");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::{ErrorKind, MatrixError};

    #[test]
    fn unauthorized_body() {
        let error = MatrixError::unauthorized("Failed to verify X-Matrix signature.");
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({ "errcode": "UNAUTHORIZED", "error": "Failed to verify X-Matrix signature." })
        );
    }

    #[test]
    fn from_peer_response() {
        let error = MatrixError::from_response(
            StatusCode::NOT_FOUND,
            br#"{"errcode":"M_NOT_FOUND","error":"no room"}"#,
        );
        assert_eq!(error.kind, ErrorKind::NotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.body.message(), Some("no room"));

        let error = MatrixError::from_response(StatusCode::BAD_GATEWAY, b"<html>");
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.body.message(), Some("peer responded with 502 Bad Gateway"));

        let error = MatrixError::from_response(StatusCode::BAD_REQUEST, br#"{"errcode":"M_WEIRD"}"#);
        assert_eq!(error.kind, ErrorKind::Custom("M_WEIRD".to_owned()));
    }
}
