//! HTTP request handlers for the webhook receiver.
//!
//! Every rejected request is answered with a plain-text body carrying the
//! [`HookError`] message and a status derived from the error:
//!
//! | Error | Status |
//! |---|---|
//! | `UnknownRoute` | 404 |
//! | `MissingHeaders`, `InvalidJson`, `BodyRead` | 400 |
//! | `SignatureMismatch` | 401 |
//! | `PayloadTooLarge` | 413 |
//! | `Handler` | 500 |

pub mod receive;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hookwire_core::HookError;
use tracing::{error, warn};

pub use receive::{receive_webhook, webhook_handler, PreParsedBody};

/// Status code for a receipt or dispatch error.
pub fn error_status(error: &HookError) -> StatusCode {
    match error {
        HookError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
        HookError::MissingHeaders { .. }
        | HookError::InvalidJson { .. }
        | HookError::BodyRead { .. } => StatusCode::BAD_REQUEST,
        HookError::SignatureMismatch => StatusCode::UNAUTHORIZED,
        HookError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        HookError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Creates the plain-text response for `error`.
pub fn error_response(error: &HookError) -> Response {
    let status = error_status(error);

    if error.is_client_error() {
        warn!(code = error.code(), status = status.as_u16(), error = %error, "Rejected delivery");
    } else {
        error!(code = error.code(), status = status.as_u16(), error = %error, "Delivery failed");
    }

    (status, error.to_string()).into_response()
}
