//! webhook::error
//!
//! Webhook failures and their HTTP responses.
//!
//! Every response body is `{"details": "..."}`. Store failure details are
//! logged but never sent back, except for conflicts.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use super::payload::EventError;
use crate::engine::DispatchError;

/// Generic client error text.
pub const INVALID_REQUEST: &str = "Invalid Request";
/// Generic server error text.
pub const PUSH_FAILED: &str = "Failed to push changes to Github";

/// Errors from handling one webhook request.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The body is not a JSON object of the expected shape.
    #[error("malformed request body: {0}")]
    Malformed(String),

    /// The token does not match the configured secret.
    #[error("unauthorized")]
    Unauthorized,

    /// The body is well-formed but not a valid event.
    #[error("invalid event: {0}")]
    Invalid(#[from] EventError),

    /// Applying the event to the store failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl WebhookError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Malformed(_) | WebhookError::Invalid(_) => StatusCode::BAD_REQUEST,
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::Dispatch(e) if e.is_conflict() => StatusCode::CONFLICT,
            WebhookError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent back as `details`.
    pub fn details(&self) -> String {
        match self {
            WebhookError::Malformed(_) | WebhookError::Unauthorized => INVALID_REQUEST.to_string(),
            WebhookError::Invalid(e) => format!("{}: {}", INVALID_REQUEST, e),
            WebhookError::Dispatch(e) if e.is_conflict() => format!("Conflicting change: {}", e),
            WebhookError::Dispatch(_) => PUSH_FAILED.to_string(),
        }
    }
}

/// Response body for every webhook reply.
#[derive(Debug, Serialize)]
pub struct Details {
    pub details: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "webhook failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "webhook rejected");
        }
        (
            status,
            Json(Details {
                details: self.details(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::ForgeError;

    #[test]
    fn client_errors() {
        let malformed = WebhookError::Malformed("eof".into());
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(malformed.details(), "Invalid Request");

        let invalid = WebhookError::from(EventError::MissingField("event"));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.details(), "Invalid Request: missing field 'event'");

        assert_eq!(WebhookError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebhookError::Unauthorized.details(), "Invalid Request");
    }

    #[test]
    fn store_errors() {
        let conflict = WebhookError::from(DispatchError::from(ForgeError::StaleVersion(
            "sha mismatch".into(),
        )));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(conflict.details().starts_with("Conflicting change: "));

        let transient = WebhookError::from(DispatchError::from(ForgeError::NetworkError(
            "timed out".into(),
        )));
        assert_eq!(transient.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transient.details(), "Failed to push changes to Github");
    }
}
