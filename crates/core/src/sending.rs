//! Outgoing request builders.

use std::ops::{Deref, DerefMut};

use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method};
use reqwest::Request as ReqwestRequest;
use serde::Serialize;
use thiserror::Error;
use url::{ParseError, Url};

#[derive(Debug)]
pub struct SendRequest {
    inner: ReqwestRequest,
}

macro_rules! method {
    ($name:ident, $method:ident) => {
        pub fn $name(url: Url) -> SendRequest {
            SendRequest {
                inner: ReqwestRequest::new(Method::$method, url),
            }
        }
    };
}
method!(get, GET);

#[derive(Error, Debug)]
pub enum SendError {
    #[error("parse url: `{0}`")]
    Url(#[from] ParseError),
    #[error("reqwest: `{0}`")]
    Reqwest(#[from] reqwest::Error),
    #[error("json: `{0}`")]
    Json(#[from] serde_json::Error),
}

pub type SendResult<T> = Result<T, SendError>;

impl SendRequest {
    /// Starts a request with an arbitrary method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            inner: ReqwestRequest::new(method, url),
        }
    }

    pub fn into_inner(self) -> reqwest::Request {
        self.inner
    }

    pub fn stuff(mut self, modifier: impl SendModifier) -> Result<Self, SendError> {
        modifier.modify(&mut self)?;
        if self.body().is_some() && !self.headers().contains_key(CONTENT_TYPE) {
            self.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(self)
    }

    /// Sets a JSON body.
    pub fn json_body<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, SendError> {
        self.stuff(JsonBody(serde_json::to_vec(body)?))
    }
}

impl Deref for SendRequest {
    type Target = ReqwestRequest;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl DerefMut for SendRequest {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

pub trait SendModifier {
    fn modify(self, request: &mut SendRequest) -> Result<(), SendError>;
}

impl SendModifier for (HeaderName, HeaderValue) {
    fn modify(self, request: &mut SendRequest) -> Result<(), SendError> {
        request.headers_mut().append(self.0, self.1);
        Ok(())
    }
}

struct JsonBody(Vec<u8>);

impl SendModifier for JsonBody {
    fn modify(self, request: &mut SendRequest) -> Result<(), SendError> {
        *request.body_mut() = Some(self.0.into());
        Ok(())
    }
}
