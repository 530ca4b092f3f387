//! The `X-Matrix` HTTP authorization scheme for server-server requests.
//!
//! Emitted as `X-Matrix origin="<name>",key="<key_id>",sig="<signature>"`
//! with no whitespace between parameters. Parsing is lenient: whitespace
//! around parameters, bare values and any parameter-name casing are accepted.

use std::fmt;

use http::HeaderValue;
use http::header::InvalidHeaderValue;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XMatrixParseError {
    #[error("authorization scheme is not `X-Matrix`")]
    Scheme,
    #[error("missing `{0}` parameter")]
    MissingParam(&'static str),
    #[error("duplicate `{0}` parameter")]
    DuplicateParam(String),
    #[error("malformed parameter `{0}`")]
    Malformed(String),
}

/// Credentials of a server-server request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XMatrix {
    /// The server name of the sending server.
    pub origin: String,
    /// The server name of the receiving sender, when the sender names it.
    pub destination: Option<String>,
    /// The ID, including the algorithm name, of the sending server's key that
    /// was used to sign the request.
    pub key: String,
    /// The signature of the JSON.
    pub sig: String,
}

impl XMatrix {
    pub const SCHEME: &'static str = "X-Matrix";

    /// Creates a new `XMatrix` without a destination.
    pub fn new(origin: impl Into<String>, key: impl Into<String>, sig: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: None,
            key: key.into(),
            sig: sig.into(),
        }
    }

    /// Parses an `Authorization` header value.
    pub fn parse(value: &str) -> Result<Self, XMatrixParseError> {
        let value = value.trim();
        let (scheme, params) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
        if !scheme.eq_ignore_ascii_case(Self::SCHEME) {
            return Err(XMatrixParseError::Scheme);
        }

        let mut origin = None;
        let mut destination = None;
        let mut key = None;
        let mut sig = None;

        for param in split_params(params) {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let Some((name, value)) = param.split_once('=') else {
                return Err(XMatrixParseError::Malformed(param.to_owned()));
            };
            let name = name.trim().to_ascii_lowercase();
            let value = unquote(value.trim()).ok_or_else(|| XMatrixParseError::Malformed(param.to_owned()))?;

            let slot = match name.as_str() {
                "origin" => &mut origin,
                "destination" => &mut destination,
                "key" => &mut key,
                "sig" => &mut sig,
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(XMatrixParseError::DuplicateParam(name));
            }
        }

        Ok(Self {
            origin: origin.ok_or(XMatrixParseError::MissingParam("origin"))?,
            destination,
            key: key.ok_or(XMatrixParseError::MissingParam("key"))?,
            sig: sig.ok_or(XMatrixParseError::MissingParam("sig"))?,
        })
    }

    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for XMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} origin=\"{}\"", Self::SCHEME, escape(&self.origin))?;
        if let Some(destination) = &self.destination {
            write!(f, ",destination=\"{}\"", escape(destination))?;
        }
        write!(f, ",key=\"{}\",sig=\"{}\"", escape(&self.key), escape(&self.sig))
    }
}

/// Splits on commas that are not inside a quoted string.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (index, ch) in params.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&params[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

fn unquote(value: &str) -> Option<String> {
    let Some(inner) = value.strip_prefix('"') else {
        return (!value.contains('"')).then(|| value.to_owned());
    };
    let inner = inner.strip_suffix('"')?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
