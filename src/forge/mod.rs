//! forge
//!
//! Abstraction for the remote file store that holds the post files.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for single-file writes plus the
//! branch and pull request primitives needed to land multi-file changes
//! atomically. The engine only ever sees `Arc<dyn Forge>`.
//!
//! - Every mutating file operation carries the caller's version token
//! - Forge failures are reported unchanged; the forge never retries
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use postbridge::forge::{github::GitHubForge, Forge};
//!
//! let forge: Arc<dyn Forge> = Arc::new(GitHubForge::from_config(&config.github)?);
//! if let Some(post) = forge.find_post(&id).await? {
//!     println!("{} at {}", post.name, post.sha);
//! }
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
