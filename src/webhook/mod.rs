//! webhook
//!
//! The inbound HTTP boundary.
//!
//! # Routes
//!
//! - `POST /` - CMS webhook: authenticate, validate, dispatch
//! - `GET /healthz` - liveness
//! - anything else - 400 `Invalid Request`
//!
//! # Request Flow
//!
//! ```text
//! body -> parse -> token check -> validate -> Dispatcher -> {"details": outcome}
//! ```
//!
//! The token is checked before the event is validated, and no store call is
//! made for a request that fails either check.

pub mod error;
pub mod payload;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{Details, WebhookError, INVALID_REQUEST, PUSH_FAILED};
pub use payload::{EventError, WebhookPayload};

use crate::engine::{Dispatcher, Outcome};

/// Shared state of the webhook server.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Dispatcher,
    secret: Arc<str>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher", &self.dispatcher)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, secret: impl Into<Arc<str>>) -> Self {
        Self {
            dispatcher,
            secret: secret.into(),
        }
    }

    /// Run one raw webhook body through authentication, validation and
    /// dispatch.
    pub async fn process(&self, body: &[u8]) -> Result<Outcome, WebhookError> {
        let payload =
            WebhookPayload::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;
        if !payload.is_authentic(&self.secret) {
            return Err(WebhookError::Unauthorized);
        }
        let event = payload.into_event()?;
        Ok(self.dispatcher.dispatch(event).await?)
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook_handler).fallback(invalid_request))
        .route("/healthz", get(health_handler).fallback(invalid_request))
        .fallback(invalid_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the webhook until Ctrl-C.
pub async fn serve(state: AppState, bind: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "webhook listener started");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    // If the handler cannot be installed, run until killed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn webhook_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Details>, WebhookError> {
    let outcome = state.process(&body).await?;
    Ok(Json(Details {
        details: outcome.to_string(),
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn invalid_request() -> WebhookError {
    WebhookError::Malformed("no such route".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use crate::forge::Forge;

    fn state(forge: &MockForge) -> AppState {
        let forge: Arc<dyn Forge> = Arc::new(forge.clone());
        AppState::new(Dispatcher::new(forge, "md"), "s3cret")
    }

    #[tokio::test]
    async fn wrong_token_makes_no_store_calls() {
        let forge = MockForge::new();
        let body = br#"{"event":"post_delete","metadata":{"token":"nope","slug_id":"abc"}}"#;

        let err = state(&forge).process(body).await.unwrap_err();
        assert!(matches!(err, WebhookError::Unauthorized));
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn token_checked_before_validation() {
        let forge = MockForge::new();
        let body = br#"{"event":"bogus","metadata":{"token":"nope"}}"#;

        let err = state(&forge).process(body).await.unwrap_err();
        assert!(matches!(err, WebhookError::Unauthorized));
    }

    #[tokio::test]
    async fn invalid_event_makes_no_store_calls() {
        let forge = MockForge::new();
        let body = br#"{"event":"post_create","metadata":{"token":"s3cret","slug_id":"abc"}}"#;

        let err = state(&forge).process(body).await.unwrap_err();
        assert!(matches!(err, WebhookError::Invalid(_)));
        assert!(forge.operations().is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let debug_output = format!("{:?}", state(&MockForge::new()));
        assert!(!debug_output.contains("s3cret"));
    }
}
