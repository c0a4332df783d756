//! webhook::payload
//!
//! The CMS webhook body and its validation into a [`ChangeEvent`].
//!
//! Parsing is lenient about shape (unknown fields are ignored, everything is
//! optional) so that the token can be checked before anything else is
//! looked at. [`WebhookPayload::into_event`] then enforces the fields each
//! event kind needs.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::frontmatter::PostContent;
use crate::core::types::{ExternalId, TypeError};
use crate::engine::ChangeEvent;

/// Event kind for a newly published post.
pub const POST_CREATE: &str = "post_create";
/// Event kind for an edited post.
pub const POST_UPDATE: &str = "post_update";
/// Event kind for a removed post.
pub const POST_DELETE: &str = "post_delete";

/// Errors from validating a webhook payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid slug_id: {0}")]
    InvalidId(#[from] TypeError),
}

/// Webhook request body.
///
/// ```json
/// { "event": "post_create",
///   "metadata": { "token": "...", "slug_id": "abc123", "created_at": "2021-01-01" },
///   "content": { "title": "Hello World", "body": "text", "subtitle": "...", "tags": ["a"] } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub event: Option<String>,
    pub metadata: Metadata,
    pub content: Content,
}

/// `metadata` object of the webhook body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub token: Option<String>,
    pub slug_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// `content` object of the webhook body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Content {
    pub title: Option<String>,
    pub body: Option<String>,
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
}

impl WebhookPayload {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Whether the payload carries the shared secret.
    ///
    /// The comparison takes the same time wherever the tokens differ.
    pub fn is_authentic(&self, secret: &str) -> bool {
        match &self.metadata.token {
            Some(token) => constant_time_eq(token, secret),
            None => false,
        }
    }

    /// Validate the payload into a change event.
    pub fn into_event(self) -> Result<ChangeEvent, EventError> {
        let kind = self.event.ok_or(EventError::MissingField("event"))?;
        let metadata = self.metadata;
        let slug_id = metadata
            .slug_id
            .ok_or(EventError::MissingField("metadata.slug_id"))?;

        let date = match kind.as_str() {
            POST_DELETE => None,
            POST_CREATE => Some(
                metadata
                    .created_at
                    .ok_or(EventError::MissingField("metadata.created_at"))?,
            ),
            POST_UPDATE => Some(
                metadata
                    .updated_at
                    .ok_or(EventError::MissingField("metadata.updated_at"))?,
            ),
            _ => return Err(EventError::UnknownEvent(kind.clone())),
        };
        let id = ExternalId::new(slug_id)?;

        let Some(date) = date else {
            return Ok(ChangeEvent::Delete { id });
        };
        let post = self.content.into_post(date)?;
        if kind == POST_CREATE {
            Ok(ChangeEvent::Create { id, post })
        } else {
            Ok(ChangeEvent::Update { id, post })
        }
    }
}

impl Content {
    fn into_post(self, date: String) -> Result<PostContent, EventError> {
        Ok(PostContent {
            title: self.title.ok_or(EventError::MissingField("content.title"))?,
            body: self.body.ok_or(EventError::MissingField("content.body"))?,
            description: self.subtitle,
            tags: self.tags,
            date,
        })
    }
}

/// Compare two secrets without short-circuiting on the first difference.
///
/// Both sides are hashed first so the comparison length does not depend on
/// the inputs either.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
