//! engine::dispatch
//!
//! Turns one validated change event into store calls.
//!
//! # Decisions
//!
//! | Event    | Existing post          | Action                        |
//! |----------|------------------------|-------------------------------|
//! | `Delete` | found                  | `delete_file`                 |
//! | `Delete` | absent                 | nothing                       |
//! | `Create` | (not looked up)        | `create_file`                 |
//! | `Update` | found, same file name  | `update_file`                 |
//! | `Update` | found, new file name   | [`rename_and_replace`]        |
//! | `Update` | absent                 | `create_file`                 |
//!
//! The existing post is looked up for every event, so each mutating call
//! carries a version token fetched moments before. Nothing is cached between
//! events.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::transaction::{rename_and_replace, TransactionError};
use crate::core::frontmatter::PostContent;
use crate::core::naming::post_file_name;
use crate::core::types::ExternalId;
use crate::forge::{CreateFileRequest, DeleteFileRequest, Forge, ForgeError, UpdateFileRequest};

/// A validated inbound change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A post was published for the first time.
    Create { id: ExternalId, post: PostContent },
    /// A post was edited. Its title may have changed.
    Update { id: ExternalId, post: PostContent },
    /// A post was removed.
    Delete { id: ExternalId },
}

impl ChangeEvent {
    /// The external id the event is about.
    pub fn id(&self) -> &ExternalId {
        match self {
            ChangeEvent::Create { id, .. }
            | ChangeEvent::Update { id, .. }
            | ChangeEvent::Delete { id } => id,
        }
    }

    /// Event kind as named on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Create { .. } => "post_create",
            ChangeEvent::Update { .. } => "post_update",
            ChangeEvent::Delete { .. } => "post_delete",
        }
    }
}

/// What a dispatched event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { name: String },
    Updated { name: String },
    Renamed { from: String, to: String },
    Deleted { name: String },
    /// A delete for a post that is not in the store.
    AlreadyAbsent { id: ExternalId },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created { name } => write!(f, "Post Created: {}", name),
            Outcome::Updated { name } => write!(f, "Post Updated: {}", name),
            Outcome::Renamed { from, to } => write!(f, "Post Updated: {} (renamed from {})", to, from),
            Outcome::Deleted { name } => write!(f, "Post Deleted: {}", name),
            Outcome::AlreadyAbsent { id } => write!(f, "Post Already Deleted: {}", id),
        }
    }
}

/// Errors from dispatching an event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A single store call failed.
    #[error("store error: {0}")]
    Store(#[from] ForgeError),

    /// The rename transaction failed.
    #[error(transparent)]
    Rename(#[from] TransactionError),

    /// The post could not be rendered into file text.
    #[error("render error: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl DispatchError {
    /// Whether the event lost a race against a concurrent change.
    pub fn is_conflict(&self) -> bool {
        match self {
            DispatchError::Store(e) => e.is_conflict(),
            DispatchError::Rename(e) => e.is_conflict(),
            DispatchError::Render(_) => false,
        }
    }
}

/// Applies change events to one store.
#[derive(Clone)]
pub struct Dispatcher {
    forge: Arc<dyn Forge>,
    extension: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("forge", &self.forge.name())
            .field("extension", &self.extension)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher writing `<slug>-<id>.<extension>` files.
    pub fn new(forge: Arc<dyn Forge>, extension: impl Into<String>) -> Self {
        Self {
            forge,
            extension: extension.into(),
        }
    }

    /// The store this dispatcher writes to.
    pub fn forge(&self) -> &Arc<dyn Forge> {
        &self.forge
    }

    /// Apply one event.
    pub async fn dispatch(&self, event: ChangeEvent) -> Result<Outcome, DispatchError> {
        debug!(event = event.kind(), id = %event.id(), "dispatching");
        let outcome = match event {
            ChangeEvent::Delete { id } => self.delete(&id).await?,
            ChangeEvent::Create { id, post } => {
                let name = post_file_name(&post.title, &id, &self.extension);
                self.create(name, &post).await?
            }
            ChangeEvent::Update { id, post } => self.update(&id, &post).await?,
        };
        info!(outcome = %outcome, "applied change");
        Ok(outcome)
    }

    async fn delete(&self, id: &ExternalId) -> Result<Outcome, DispatchError> {
        let Some(existing) = self.forge.find_post(id).await? else {
            return Ok(Outcome::AlreadyAbsent { id: id.clone() });
        };

        self.forge
            .delete_file(DeleteFileRequest {
                message: format!("delete: {}", existing.name),
                name: existing.name.clone(),
                sha: existing.sha,
                branch: None,
            })
            .await?;
        Ok(Outcome::Deleted {
            name: existing.name,
        })
    }

    async fn create(&self, name: String, post: &PostContent) -> Result<Outcome, DispatchError> {
        self.forge
            .create_file(CreateFileRequest {
                message: format!("create: {}", name),
                name: name.clone(),
                content: post.render()?,
                branch: None,
            })
            .await?;
        Ok(Outcome::Created { name })
    }

    async fn update(&self, id: &ExternalId, post: &PostContent) -> Result<Outcome, DispatchError> {
        let name = post_file_name(&post.title, id, &self.extension);

        let Some(existing) = self.forge.find_post(id).await? else {
            debug!(id = %id, "no existing post, creating");
            return self.create(name, post).await;
        };

        if existing.name == name {
            self.forge
                .update_file(UpdateFileRequest {
                    message: format!("update: {}", name),
                    name: name.clone(),
                    content: post.render()?,
                    sha: existing.sha,
                    branch: None,
                })
                .await?;
            return Ok(Outcome::Updated { name });
        }

        let content = post.render()?;
        rename_and_replace(
            self.forge.as_ref(),
            &existing.name,
            &existing.sha,
            &name,
            &content,
        )
        .await?;
        Ok(Outcome::Renamed {
            from: existing.name,
            to: name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;

    fn post(title: &str) -> PostContent {
        PostContent {
            title: title.to_string(),
            body: "text".to_string(),
            description: None,
            tags: Vec::new(),
            date: "2021-01-01".to_string(),
        }
    }

    fn id(s: &str) -> ExternalId {
        ExternalId::new(s).unwrap()
    }

    #[test]
    fn outcome_display() {
        assert_eq!(
            Outcome::Created {
                name: "a-1.md".into()
            }
            .to_string(),
            "Post Created: a-1.md"
        );
        assert_eq!(
            Outcome::Renamed {
                from: "a-1.md".into(),
                to: "b-1.md".into()
            }
            .to_string(),
            "Post Updated: b-1.md (renamed from a-1.md)"
        );
        assert_eq!(
            Outcome::AlreadyAbsent { id: id("x") }.to_string(),
            "Post Already Deleted: x"
        );
    }

    #[test]
    fn event_accessors() {
        let event = ChangeEvent::Delete { id: id("abc") };
        assert_eq!(event.id().as_str(), "abc");
        assert_eq!(event.kind(), "post_delete");
    }

    #[tokio::test]
    async fn create_uses_canonical_name() {
        let forge = MockForge::new();
        let dispatcher = Dispatcher::new(Arc::new(forge.clone()), "md");

        let outcome = dispatcher
            .dispatch(ChangeEvent::Create {
                id: id("abc123"),
                post: post("Hello World"),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Created {
                name: "hello-world-abc123.md".into()
            }
        );
        assert!(forge.file("master", "hello-world-abc123.md").is_some());
    }

    #[tokio::test]
    async fn store_conflict_is_classified() {
        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");
        let dispatcher = Dispatcher::new(Arc::new(forge), "md");

        let err = dispatcher
            .dispatch(ChangeEvent::Create {
                id: id("abc123"),
                post: post("Hello World"),
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn debug_names_forge() {
        let dispatcher = Dispatcher::new(Arc::new(MockForge::new()), "md");
        assert!(format!("{:?}", dispatcher).contains("mock"));
    }
}
