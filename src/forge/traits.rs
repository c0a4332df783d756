//! forge::traits
//!
//! Forge trait definition for the remote file store.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is a network round-trip
//! to the hosting provider. All methods return `Result` so that provider
//! failures surface to the caller unchanged.
//!
//! A forge is scoped to one repository, one base branch and one content
//! directory. File operations take store-relative file names; the forge adds
//! the content directory prefix itself.
//!
//! Mutating file operations carry the caller's version token (`sha`) and the
//! store rejects them if it no longer matches. That check is the only
//! concurrency control in the system.
//!
//! # Example
//!
//! ```ignore
//! use postbridge::forge::{Forge, UpdateFileRequest};
//!
//! async fn touch(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     if let Some(post) = forge.find_post(&id).await? {
//!         forge.update_file(UpdateFileRequest {
//!             name: post.name.clone(),
//!             content: "---\ntitle: Hi\n---\n\nbody".to_string(),
//!             sha: post.sha,
//!             message: format!("update: {}", post.name),
//!             branch: None,
//!         }).await?;
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, ExternalId};

/// Errors from forge operations.
///
/// These error types map to the failure modes of a content API with
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource already exists (create of an existing file or ref).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The supplied version token no longer matches the store.
    #[error("stale version: {0}")]
    StaleVersion(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error, including request timeouts.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// Whether this is an optimistic-concurrency violation.
    ///
    /// Such failures are reported to the caller as conflicts and never
    /// retried: a retry needs a freshly fetched version token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ForgeError::Conflict(_) | ForgeError::StaleVersion(_))
    }

    /// Whether this is a provider or network fault that a later redelivery
    /// of the same event may get past.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::RateLimited | ForgeError::NetworkError(_) => true,
            ForgeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Reference to an existing post file on the base branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    /// Repository-relative path (content directory included)
    pub path: String,
    /// Store-relative file name
    pub name: String,
    /// Current content hash, required for update and delete
    pub sha: String,
}

/// A commit produced by a single file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit SHA
    pub sha: String,
    /// Parent commit SHAs
    pub parents: Vec<String>,
}

impl CommitInfo {
    /// Whether this commit directly follows `sha`.
    pub fn follows(&self, sha: &str) -> bool {
        self.parents.iter().any(|p| p == sha)
    }
}

/// Request to create a new file.
#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    /// Store-relative file name
    pub name: String,
    /// Raw file text (encoding is the forge's concern)
    pub content: String,
    /// Commit message
    pub message: String,
    /// Target branch (`None` = base branch)
    pub branch: Option<String>,
}

/// Request to replace the content of an existing file.
#[derive(Debug, Clone)]
pub struct UpdateFileRequest {
    pub name: String,
    pub content: String,
    /// Version token the caller last saw
    pub sha: String,
    pub message: String,
    pub branch: Option<String>,
}

/// Request to delete an existing file.
#[derive(Debug, Clone)]
pub struct DeleteFileRequest {
    pub name: String,
    /// Version token the caller last saw
    pub sha: String,
    pub message: String,
    pub branch: Option<String>,
}

/// A branch created to stage a multi-step change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBranch {
    /// The new branch
    pub head_ref: BranchName,
    /// The branch it was created from
    pub base_ref: String,
    /// Commit the new branch points at
    pub sha: String,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// PR state (open, closed, merged)
    pub state: PrState,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
    /// Head commit SHA at the time of the response
    pub head_sha: String,
}

/// PR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    /// PR is open and awaiting merge
    Open,
    /// PR is closed without being merged
    Closed,
    /// PR has been merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// Merge method for merging a PR.
///
/// Renames only ever land as a single squashed commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMethod {
    /// Squash all commits and merge
    #[default]
    Squash,
}

impl MergeMethod {
    /// API name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Squash => "squash",
        }
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to merge a pull request.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// The merge method
    pub method: MergeMethod,
    /// Title of the resulting commit on the base branch
    pub commit_title: String,
    /// The merge is refused unless the PR head is still at this commit
    pub expected_head_sha: String,
}

/// The Forge trait for the remote file store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the webhook server shares one forge
/// across request tasks, and a rename issues two writes concurrently.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `Conflict` / `StaleVersion`: report a conflict, do not retry
/// - `NotFound`: resource doesn't exist
/// - `RateLimited` / `NetworkError` / 5xx `ApiError`: transient, surface as failure
/// - `AuthFailed`: configuration problem
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github", "mock").
    fn name(&self) -> &'static str;

    /// The branch posts are committed to by default.
    fn base_branch(&self) -> &str;

    /// Find the post file embedding `id` in its name on the base branch.
    ///
    /// Returns `None` when no file matches or the content directory does
    /// not exist yet.
    async fn find_post(&self, id: &ExternalId) -> Result<Option<PostRef>, ForgeError>;

    /// Create a file.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a file already exists at that path on that branch
    async fn create_file(&self, request: CreateFileRequest) -> Result<CommitInfo, ForgeError>;

    /// Replace a file's content.
    ///
    /// # Errors
    ///
    /// - `StaleVersion` if `request.sha` is not the file's current version
    async fn update_file(&self, request: UpdateFileRequest) -> Result<CommitInfo, ForgeError>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// - `StaleVersion` if `request.sha` is not the file's current version
    /// - `NotFound` if there is no such file
    async fn delete_file(&self, request: DeleteFileRequest) -> Result<CommitInfo, ForgeError>;

    /// Create branch `name` pointing at the current tip of `from`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `from` does not exist
    /// - `Conflict` if `name` already exists
    async fn create_branch(
        &self,
        name: &BranchName,
        from: &str,
    ) -> Result<PendingBranch, ForgeError>;

    /// Open a pull request.
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Merge a pull request, returning the SHA of the commit on the base branch.
    ///
    /// # Errors
    ///
    /// - `StaleVersion` if the PR head moved past `expected_head_sha`
    /// - `NotFound` if the PR doesn't exist
    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<String, ForgeError>;

    /// Delete a branch.
    async fn delete_branch(&self, name: &str) -> Result<(), ForgeError>;
}
