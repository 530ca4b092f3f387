use http_body_util::LengthLimitError;
use salvo::http::ParseError;
use salvo::http::header::AUTHORIZATION;
use salvo::prelude::*;
use serde_json::json;

use crate::core::authorization::XMatrix;
use crate::core::serde::{CanonicalJsonObject, JsonValue, json_object_from_slice};
use crate::core::signatures;
use crate::{AuthError, Federated};

/// A request whose `X-Matrix` signature checked out.
#[derive(Debug)]
pub struct Authed {
    pub origin: String,
    pub body: Option<CanonicalJsonObject>,
}

/// Verifies the `X-Matrix` signature on `req` as seen by `federated`.
///
/// The body, when there is one, must be a JSON object whose `origin` matches
/// the header; that is checked before the signer's key is looked up. Bodies
/// over `max_body_size` bytes are not read.
pub async fn auth_by_signatures<F>(
    federated: &F,
    req: &mut Request,
    max_body_size: usize,
) -> Result<Authed, AuthError>
where
    F: Federated + ?Sized,
{
    let x_matrix = match parse_authorization(req) {
        Ok(x_matrix) => x_matrix,
        Err(e) => {
            warn!(path = %req.uri().path(), error = %e, "rejected federation request");
            return Err(e);
        }
    };

    match auth_by_signatures_inner(federated, &x_matrix, req, max_body_size).await {
        Ok(body) => Ok(Authed {
            origin: x_matrix.origin,
            body,
        }),
        Err(e) => {
            warn!(
                origin = %x_matrix.origin,
                key = %x_matrix.key,
                error = %e,
                "rejected federation request"
            );
            Err(e)
        }
    }
}

fn parse_authorization(req: &Request) -> Result<XMatrix, AuthError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Err(AuthError::MissingAuthParam("no Authorization header".to_owned()));
    };
    let header = header
        .to_str()
        .map_err(|_| AuthError::MissingAuthParam("Authorization header is not ASCII".to_owned()))?;
    XMatrix::parse(header).map_err(|e| AuthError::MissingAuthParam(e.to_string()))
}

async fn auth_by_signatures_inner<F>(
    federated: &F,
    x_matrix: &XMatrix,
    req: &mut Request,
    max_body_size: usize,
) -> Result<Option<CanonicalJsonObject>, AuthError>
where
    F: Federated + ?Sized,
{
    let server_name = federated.identity().name();
    if let Some(destination) = &x_matrix.destination {
        if destination != server_name {
            return Err(AuthError::SignatureInvalid(format!(
                "request is for `{destination}`, not `{server_name}`"
            )));
        }
    }
    signatures::split_id(&x_matrix.key).map_err(|e| AuthError::SignatureInvalid(e.to_string()))?;

    let method = req.method().as_str().to_owned();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let payload = match req.payload_with_max_size(max_body_size).await {
        Ok(payload) => payload,
        Err(ParseError::Other(e)) if e.is::<LengthLimitError>() => {
            return Err(AuthError::BodyTooLarge(max_body_size));
        }
        Err(e) => return Err(AuthError::BadJson(e.to_string())),
    };
    let body = if payload.is_empty() {
        None
    } else {
        Some(json_object_from_slice(payload).map_err(|e| AuthError::BadJson(e.to_string()))?)
    };

    if let Some(body) = &body {
        let body_origin = body.get("origin").and_then(JsonValue::as_str);
        if body_origin != Some(x_matrix.origin.as_str()) {
            return Err(AuthError::OriginMismatch {
                header: x_matrix.origin.clone(),
                body: body_origin.unwrap_or_default().to_owned(),
            });
        }
    }

    let mut authorization = CanonicalJsonObject::new();
    authorization.insert("destination".to_owned(), server_name.into());
    authorization.insert("method".to_owned(), method.into());
    authorization.insert("origin".to_owned(), x_matrix.origin.as_str().into());
    authorization.insert("uri".to_owned(), uri.into());
    authorization.insert(
        "signatures".to_owned(),
        json!({ &x_matrix.origin: { &x_matrix.key: &x_matrix.sig } }),
    );
    if let Some(body) = &body {
        authorization.insert("content".to_owned(), JsonValue::Object(body.clone()));
    }

    let key = federated.get_key(&x_matrix.origin, &x_matrix.key).await?;

    signatures::verify_json_with_key(&key, &x_matrix.origin, &x_matrix.key, &authorization)
        .map_err(|e| AuthError::SignatureInvalid(e.to_string()))?;

    Ok(body)
}
