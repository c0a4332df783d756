//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps an in-memory model of a repository: branches with
//! files, a commit tip and a commit log per branch, plus pull requests. File
//! versions are content hashes and commit SHAs are derived from the parent,
//! so the optimistic-concurrency checks behave like the real store.
//!
//! A squash merge replays the changes made on the PR head branch onto the
//! base branch as one new commit.
//!
//! Failure scenarios are configured with [`FailOn`], and
//! [`MockForge::push_before_merge`] simulates a foreign push landing on a PR
//! head between verification and merge.
//!
//! # Example
//!
//! ```
//! use postbridge::core::types::ExternalId;
//! use postbridge::forge::mock::MockForge;
//! use postbridge::forge::{CreateFileRequest, Forge};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//!
//! forge.create_file(CreateFileRequest {
//!     name: "hello-abc123.md".to_string(),
//!     content: "hello".to_string(),
//!     message: "create: hello-abc123.md".to_string(),
//!     branch: None,
//! }).await.unwrap();
//!
//! let id = ExternalId::new("abc123").unwrap();
//! let post = forge.find_post(&id).await.unwrap().unwrap();
//! assert_eq!(post.name, "hello-abc123.md");
//! assert_eq!(forge.commit_count("master"), 1);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::traits::{
    CommitInfo, CreateFileRequest, CreatePrRequest, DeleteFileRequest, Forge, ForgeError,
    MergeMethod, MergeRequest, PendingBranch, PostRef, PrState, PullRequest, UpdateFileRequest,
};
use crate::core::config::{DEFAULT_BASE_BRANCH, DEFAULT_CONTENT_PATH};
use crate::core::naming::matches_external_id;
use crate::core::types::{BranchName, ExternalId};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    base_branch: String,
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    base_branch: String,
    content_path: String,
    branches: HashMap<String, MockBranch>,
    /// Stored PRs by number.
    prs: HashMap<u64, PullRequest>,
    /// Next PR number to assign.
    next_pr_number: u64,
    /// Monotonic counter mixed into commit SHAs.
    commit_seq: u64,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Files pushed onto a PR head right before its merge is checked.
    pending_pushes: Vec<(String, String)>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockBranch {
    /// File name → content
    files: BTreeMap<String, String>,
    tip: String,
    /// Every commit on this branch, oldest first
    log: Vec<String>,
    /// Changes made on this branch since it was created
    changes: Vec<Change>,
}

#[derive(Debug, Clone)]
enum Change {
    Put { name: String, content: String },
    Delete { name: String },
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    FindPost(ForgeError),
    CreateFile(ForgeError),
    UpdateFile(ForgeError),
    DeleteFile(ForgeError),
    CreateBranch(ForgeError),
    CreatePr(ForgeError),
    MergePr(ForgeError),
    DeleteBranch(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FindPost {
        id: String,
    },
    CreateFile {
        name: String,
        branch: String,
        message: String,
    },
    UpdateFile {
        name: String,
        branch: String,
        sha: String,
    },
    DeleteFile {
        name: String,
        branch: String,
        sha: String,
    },
    CreateBranch {
        name: String,
        from: String,
    },
    CreatePr {
        head: String,
        base: String,
        title: String,
    },
    MergePr {
        number: u64,
        method: MergeMethod,
        expected_head_sha: String,
    },
    DeleteBranch {
        name: String,
    },
}

impl MockOperation {
    /// Whether this operation changes repository state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, MockOperation::FindPost { .. })
    }
}

/// Version token of a file, the way the real store derives it.
pub fn content_sha(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

impl MockForge {
    /// Create a mock forge with an empty `master` base branch.
    pub fn new() -> Self {
        Self::with_base_branch(DEFAULT_BASE_BRANCH)
    }

    /// Create a mock forge with an empty base branch of the given name.
    pub fn with_base_branch(base: &str) -> Self {
        let mut branches = HashMap::new();
        branches.insert(
            base.to_string(),
            MockBranch {
                files: BTreeMap::new(),
                tip: "0".repeat(64),
                log: Vec::new(),
                changes: Vec::new(),
            },
        );

        Self {
            base_branch: base.to_string(),
            inner: Arc::new(Mutex::new(MockForgeInner {
                base_branch: base.to_string(),
                content_path: DEFAULT_CONTENT_PATH.to_string(),
                branches,
                prs: HashMap::new(),
                next_pr_number: 1,
                commit_seq: 0,
                fail_on: None,
                pending_pushes: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a file on the base branch.
    ///
    /// Seeding does not count as a commit and is not recorded.
    pub fn with_post(self, name: &str, content: &str) -> Self {
        {
            let mut inner = self.state();
            let base = inner.base_branch.clone();
            if let Some(branch) = inner.branches.get_mut(&base) {
                branch.files.insert(name.to_string(), content.to_string());
            }
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use postbridge::forge::mock::{MockForge, FailOn};
    /// use postbridge::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on a shared handle.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        let mut inner = self.state();
        inner.fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.state();
        inner.fail_on = None;
    }

    /// Commit `content` as `name` onto the head branch of the next PR that
    /// is merged, just before the expected head is checked.
    pub fn push_before_merge(&self, name: &str, content: &str) {
        let mut inner = self.state();
        inner
            .pending_pushes
            .push((name.to_string(), content.to_string()));
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.state();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.state();
        inner.operations.clear();
    }

    /// Content of a file on a branch.
    pub fn file(&self, branch: &str, name: &str) -> Option<String> {
        let inner = self.state();
        inner
            .branches
            .get(branch)
            .and_then(|b| b.files.get(name).cloned())
    }

    /// Names of all files on a branch, sorted.
    pub fn file_names(&self, branch: &str) -> Vec<String> {
        let inner = self.state();
        inner
            .branches
            .get(branch)
            .map(|b| b.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of commits made on a branch.
    pub fn commit_count(&self, branch: &str) -> usize {
        let inner = self.state();
        inner.branches.get(branch).map_or(0, |b| b.log.len())
    }

    /// Whether a branch exists.
    pub fn branch_exists(&self, name: &str) -> bool {
        let inner = self.state();
        inner.branches.contains_key(name)
    }

    /// Names of all branches other than the base branch, sorted.
    pub fn staging_branches(&self) -> Vec<String> {
        let inner = self.state();
        let mut names: Vec<String> = inner
            .branches
            .keys()
            .filter(|name| **name != inner.base_branch)
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Get a PR by number (for test verification).
    pub fn get_pr_sync(&self, number: u64) -> Option<PullRequest> {
        let inner = self.state();
        inner.prs.get(&number).cloned()
    }

    /// Get all PRs, ordered by number.
    pub fn all_prs(&self) -> Vec<PullRequest> {
        let inner = self.state();
        let mut prs: Vec<PullRequest> = inner.prs.values().cloned().collect();
        prs.sort_by_key(|pr| pr.number);
        prs
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.state();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.state();
        let error = match (&inner.fail_on, expected) {
            (Some(FailOn::FindPost(e)), "find_post")
            | (Some(FailOn::CreateFile(e)), "create_file")
            | (Some(FailOn::UpdateFile(e)), "update_file")
            | (Some(FailOn::DeleteFile(e)), "delete_file")
            | (Some(FailOn::CreateBranch(e)), "create_branch")
            | (Some(FailOn::CreatePr(e)), "create_pr")
            | (Some(FailOn::MergePr(e)), "merge_pr")
            | (Some(FailOn::DeleteBranch(e)), "delete_branch") => e.clone(),
            _ => return Ok(()),
        };
        Err(error)
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    fn branch_name(&self, branch: &Option<String>) -> String {
        branch.clone().unwrap_or_else(|| self.base_branch.clone())
    }

    fn branch_mut(&mut self, name: &str) -> Result<&mut MockBranch, ForgeError> {
        self.branches
            .get_mut(name)
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", name)))
    }

    /// Check a caller's version token against the file on a branch.
    fn check_version(&self, branch: &str, name: &str, sha: &str) -> Result<(), ForgeError> {
        let content = self
            .branches
            .get(branch)
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))?
            .files
            .get(name)
            .ok_or_else(|| ForgeError::NotFound(format!("{} on {}", name, branch)))?;
        if content_sha(content) != sha {
            return Err(ForgeError::StaleVersion(format!(
                "{} does not match {}",
                name, sha
            )));
        }
        Ok(())
    }

    /// Apply one change to a branch as a new commit.
    fn commit(
        &mut self,
        branch: &str,
        change: Change,
        message: &str,
    ) -> Result<CommitInfo, ForgeError> {
        self.commit_seq += 1;
        let seq = self.commit_seq;
        let is_base = branch == self.base_branch;
        let target = self.branch_mut(branch)?;

        match &change {
            Change::Put { name, content } => {
                target.files.insert(name.clone(), content.clone());
            }
            Change::Delete { name } => {
                target.files.remove(name);
            }
        }
        if !is_base {
            target.changes.push(change);
        }

        let parent = target.tip.clone();
        let mut hasher = Sha256::new();
        hasher.update(parent.as_bytes());
        hasher.update(message.as_bytes());
        hasher.update(seq.to_be_bytes());
        let sha = hex::encode(hasher.finalize());

        target.tip = sha.clone();
        target.log.push(sha.clone());

        Ok(CommitInfo {
            sha,
            parents: vec![parent],
        })
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn base_branch(&self) -> &str {
        &self.base_branch
    }

    async fn find_post(&self, id: &ExternalId) -> Result<Option<PostRef>, ForgeError> {
        self.record(MockOperation::FindPost { id: id.to_string() });
        self.check_fail("find_post")?;

        let inner = self.state();
        let base = inner
            .branches
            .get(&inner.base_branch)
            .ok_or_else(|| ForgeError::NotFound(inner.base_branch.clone()))?;

        Ok(base
            .files
            .iter()
            .find(|(name, _)| matches_external_id(name, id))
            .map(|(name, content)| PostRef {
                path: format!("{}/{}", inner.content_path, name),
                name: name.clone(),
                sha: content_sha(content),
            }))
    }

    async fn create_file(&self, request: CreateFileRequest) -> Result<CommitInfo, ForgeError> {
        let branch = self.state().branch_name(&request.branch);
        self.record(MockOperation::CreateFile {
            name: request.name.clone(),
            branch: branch.clone(),
            message: request.message.clone(),
        });
        self.check_fail("create_file")?;

        let mut inner = self.state();
        if inner.branch_mut(&branch)?.files.contains_key(&request.name) {
            return Err(ForgeError::Conflict(format!(
                "{} already exists on {}",
                request.name, branch
            )));
        }
        inner.commit(
            &branch,
            Change::Put {
                name: request.name,
                content: request.content,
            },
            &request.message,
        )
    }

    async fn update_file(&self, request: UpdateFileRequest) -> Result<CommitInfo, ForgeError> {
        let branch = self.state().branch_name(&request.branch);
        self.record(MockOperation::UpdateFile {
            name: request.name.clone(),
            branch: branch.clone(),
            sha: request.sha.clone(),
        });
        self.check_fail("update_file")?;

        let mut inner = self.state();
        inner.check_version(&branch, &request.name, &request.sha)?;
        inner.commit(
            &branch,
            Change::Put {
                name: request.name,
                content: request.content,
            },
            &request.message,
        )
    }

    async fn delete_file(&self, request: DeleteFileRequest) -> Result<CommitInfo, ForgeError> {
        let branch = self.state().branch_name(&request.branch);
        self.record(MockOperation::DeleteFile {
            name: request.name.clone(),
            branch: branch.clone(),
            sha: request.sha.clone(),
        });
        self.check_fail("delete_file")?;

        let mut inner = self.state();
        inner.check_version(&branch, &request.name, &request.sha)?;
        inner.commit(
            &branch,
            Change::Delete { name: request.name },
            &request.message,
        )
    }

    async fn create_branch(
        &self,
        name: &BranchName,
        from: &str,
    ) -> Result<PendingBranch, ForgeError> {
        self.record(MockOperation::CreateBranch {
            name: name.to_string(),
            from: from.to_string(),
        });
        self.check_fail("create_branch")?;

        let mut inner = self.state();
        if inner.branches.contains_key(name.as_str()) {
            return Err(ForgeError::Conflict(format!(
                "Reference already exists: {}",
                name
            )));
        }
        let mut branch = inner
            .branches
            .get(from)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", from)))?;
        branch.changes.clear();
        let sha = branch.tip.clone();
        inner.branches.insert(name.to_string(), branch);

        Ok(PendingBranch {
            head_ref: name.clone(),
            base_ref: from.to_string(),
            sha,
        })
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.state();
        if !inner.branches.contains_key(&request.base) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("base '{}' does not exist", request.base),
            });
        }
        let head_sha = inner
            .branches
            .get(&request.head)
            .map(|b| b.tip.clone())
            .ok_or_else(|| ForgeError::ApiError {
                status: 422,
                message: format!("head '{}' does not exist", request.head),
            })?;

        let number = inner.next_pr_number;
        inner.next_pr_number += 1;

        let pr = PullRequest {
            number,
            url: format!("https://github.com/mock/repo/pull/{}", number),
            state: PrState::Open,
            head: request.head,
            base: request.base,
            title: request.title,
            head_sha,
        };

        inner.prs.insert(number, pr.clone());
        Ok(pr)
    }

    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<String, ForgeError> {
        self.record(MockOperation::MergePr {
            number,
            method: request.method,
            expected_head_sha: request.expected_head_sha.clone(),
        });
        self.check_fail("merge_pr")?;

        let mut inner = self.state();
        let pr = inner
            .prs
            .get(&number)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))?;

        if pr.state != PrState::Open {
            return Err(ForgeError::ApiError {
                status: 405,
                message: format!("PR #{} is {}", number, pr.state),
            });
        }

        for (name, content) in std::mem::take(&mut inner.pending_pushes) {
            inner.commit(&pr.head, Change::Put { name, content }, "foreign push")?;
        }

        let head = inner.branch_mut(&pr.head)?;
        if head.tip != request.expected_head_sha {
            return Err(ForgeError::StaleVersion(format!(
                "Head branch was modified. Review and try the merge again. ({} != {})",
                head.tip, request.expected_head_sha
            )));
        }
        let changes = head.changes.clone();

        // Squash: all head changes land as one commit on base
        let base = inner.branch_mut(&pr.base)?;
        for change in &changes {
            match change {
                Change::Put { name, content } => {
                    base.files.insert(name.clone(), content.clone());
                }
                Change::Delete { name } => {
                    base.files.remove(name);
                }
            }
        }
        inner.commit_seq += 1;
        let seq = inner.commit_seq;
        let base = inner.branch_mut(&pr.base)?;
        let mut hasher = Sha256::new();
        hasher.update(base.tip.as_bytes());
        hasher.update(request.commit_title.as_bytes());
        hasher.update(seq.to_be_bytes());
        let sha = hex::encode(hasher.finalize());
        base.tip = sha.clone();
        base.log.push(sha.clone());

        if let Some(stored) = inner.prs.get_mut(&number) {
            stored.state = PrState::Merged;
        }

        Ok(sha)
    }

    async fn delete_branch(&self, name: &str) -> Result<(), ForgeError> {
        self.record(MockOperation::DeleteBranch {
            name: name.to_string(),
        });
        self.check_fail("delete_branch")?;

        let mut inner = self.state();
        if name == inner.base_branch {
            return Err(ForgeError::ApiError {
                status: 422,
                message: "cannot delete the base branch".to_string(),
            });
        }
        inner
            .branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", name)))
    }
}
