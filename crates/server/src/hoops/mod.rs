use salvo::catcher::Catcher;
use salvo::http::StatusCode;
use salvo::prelude::*;

use crate::core::MatrixError;

mod auth;
pub use auth::{Authed, auth_by_signatures};

/// The catcher every fedmock service installs.
pub fn catcher() -> Catcher {
    Catcher::default().hoop(catch_status_error)
}

/// Gives bodiless error statuses a Matrix error body.
///
/// A bare 404 is left alone: unmatched federation paths answer without a body.
#[handler]
pub async fn catch_status_error(req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    let status = res.status_code.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status != StatusCode::NOT_FOUND {
        let message = status.canonical_reason().unwrap_or("Unknown error");
        let matrix = MatrixError {
            status_code: Some(status),
            ..MatrixError::unknown(message)
        };
        matrix.write(req, depot, res).await;
    }
    ctrl.skip_rest();
}
