//! engine::transaction
//!
//! The rename transaction: replace one post file with another under a new
//! name, landing on the base branch as a single commit.
//!
//! # Protocol
//!
//! The contents API can only write one file per commit, so a rename is
//! staged on a throwaway branch and squash-merged:
//!
//! ```text
//! create branch -> open PR -> [delete old || create new] -> verify chain -> merge -> cleanup
//! ```
//!
//! 1. A `postbridge/rename-<uuid>` branch is created off base.
//! 2. A PR from that branch into base is opened; its head SHA is captured
//!    and must equal the tip the branch was created at.
//! 3. The old file is deleted and the new file created as two commits on the
//!    staging branch, concurrently. Both are awaited.
//! 4. The two commits must form a linear chain on top of the captured head.
//!    Anything else means a foreign commit landed on the staging branch.
//! 5. The PR is squash-merged, pinned to the chain tip. The store refuses the
//!    merge if the head moved after verification.
//! 6. The staging branch is deleted. Failing to delete it only logs.
//!
//! # Failure
//!
//! Any failing step aborts. Nothing is rolled back: base is untouched until
//! the merge, and the staging branch and PR are left behind for inspection.
//! The one exception is a PR that could not be opened: the branch holds no
//! commits yet, so it is deleted.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::naming::staging_branch_name;
use crate::core::types::BranchName;
use crate::forge::{
    CommitInfo, CreateFileRequest, CreatePrRequest, DeleteFileRequest, Forge, ForgeError,
    MergeMethod, MergeRequest, PullRequest,
};

/// Step of the rename transaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    CreateBranch,
    OpenPullRequest,
    StageChanges,
    VerifyHead,
    Merge,
}

impl std::fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionStage::CreateBranch => "create branch",
            TransactionStage::OpenPullRequest => "open pull request",
            TransactionStage::StageChanges => "stage changes",
            TransactionStage::VerifyHead => "verify head",
            TransactionStage::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// A failed rename transaction.
#[derive(Debug, Error)]
#[error("rename failed at {stage} (staging branch {staging_branch}): {source}")]
pub struct TransactionError {
    /// Step that failed
    pub stage: TransactionStage,
    /// Staging branch, left in place for inspection
    pub staging_branch: BranchName,
    /// Store error that caused the failure
    #[source]
    pub source: ForgeError,
}

impl TransactionError {
    fn at(stage: TransactionStage, staging_branch: &BranchName, source: ForgeError) -> Self {
        Self {
            stage,
            staging_branch: staging_branch.clone(),
            source,
        }
    }

    /// Whether the transaction lost a race against a concurrent change.
    pub fn is_conflict(&self) -> bool {
        self.source.is_conflict()
    }
}

/// A rename in flight: staging branch created and PR opened.
///
/// Lives only in memory. If the process dies, the transaction is abandoned.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    /// The PR from the staging branch into base
    pub pull_request: PullRequest,
    /// Head of the staging branch when the PR was opened
    pub head_sha: String,
    /// The staging branch
    pub head_ref: BranchName,
}

/// A rename that landed on base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTransaction {
    pub pull_request: u64,
    /// The squash commit on base
    pub merge_sha: String,
    pub staging_branch: BranchName,
}

/// Replace `old_name` (at version `old_sha`) with `new_name` holding
/// `new_content`, as one commit on the base branch.
pub async fn rename_and_replace(
    forge: &dyn Forge,
    old_name: &str,
    old_sha: &str,
    new_name: &str,
    new_content: &str,
) -> Result<MergedTransaction, TransactionError> {
    let pending = begin(forge, new_name).await?;

    let result = stage_and_merge(forge, &pending, old_name, old_sha, new_name, new_content).await;
    match result {
        Ok(merge_sha) => {
            cleanup(forge, &pending.head_ref).await;
            Ok(MergedTransaction {
                pull_request: pending.pull_request.number,
                merge_sha,
                staging_branch: pending.head_ref,
            })
        }
        Err(err) => {
            warn!(
                stage = %err.stage,
                branch = %pending.head_ref,
                pr = pending.pull_request.number,
                error = %err.source,
                "rename aborted, staging branch and pull request left in place"
            );
            Err(err)
        }
    }
}

/// Create the staging branch and open the PR.
pub async fn begin(forge: &dyn Forge, new_name: &str) -> Result<PendingTransaction, TransactionError> {
    let branch = staging_branch_name();
    let base = forge.base_branch().to_string();

    let created = forge
        .create_branch(&branch, &base)
        .await
        .map_err(|e| TransactionError::at(TransactionStage::CreateBranch, &branch, e))?;
    debug!(branch = %branch, base = %base, sha = %created.sha, "created staging branch");

    let opened = forge
        .create_pr(CreatePrRequest {
            head: branch.to_string(),
            base,
            title: format!("rename: {}", new_name),
            body: None,
        })
        .await;
    let pull_request = match opened {
        Ok(pr) => pr,
        Err(e) => {
            warn!(branch = %branch, error = %e, "failed to open rename pull request");
            cleanup(forge, &branch).await;
            return Err(TransactionError::at(TransactionStage::OpenPullRequest, &branch, e));
        }
    };
    info!(branch = %branch, pr = pull_request.number, "opened rename pull request");

    if pull_request.head_sha != created.sha {
        return Err(TransactionError::at(
            TransactionStage::OpenPullRequest,
            &branch,
            ForgeError::StaleVersion(format!(
                "pull request head {} is not the staging branch tip {}",
                pull_request.head_sha, created.sha
            )),
        ));
    }

    Ok(PendingTransaction {
        head_sha: pull_request.head_sha.clone(),
        pull_request,
        head_ref: branch,
    })
}

async fn stage_and_merge(
    forge: &dyn Forge,
    pending: &PendingTransaction,
    old_name: &str,
    old_sha: &str,
    new_name: &str,
    new_content: &str,
) -> Result<String, TransactionError> {
    let branch = &pending.head_ref;
    let fail = |stage: TransactionStage, e: ForgeError| TransactionError::at(stage, branch, e);

    let delete = forge.delete_file(DeleteFileRequest {
        name: old_name.to_string(),
        sha: old_sha.to_string(),
        message: format!("delete: {}", old_name),
        branch: Some(branch.to_string()),
    });
    let create = forge.create_file(CreateFileRequest {
        name: new_name.to_string(),
        content: new_content.to_string(),
        message: format!("create: {}", new_name),
        branch: Some(branch.to_string()),
    });
    let (deleted, created) = tokio::join!(delete, create);
    let deleted = deleted.map_err(|e| fail(TransactionStage::StageChanges, e))?;
    let created = created.map_err(|e| fail(TransactionStage::StageChanges, e))?;

    let tip = chain_tip(&pending.head_sha, &deleted, &created)
        .ok_or_else(|| {
            ForgeError::StaleVersion(format!(
                "{} moved outside this transaction (expected two commits on {})",
                branch, pending.head_sha
            ))
        })
        .map_err(|e| fail(TransactionStage::VerifyHead, e))?;
    debug!(branch = %branch, tip = %tip, "staging branch verified");

    let merge_sha = forge
        .merge_pr(
            pending.pull_request.number,
            MergeRequest {
                method: MergeMethod::Squash,
                commit_title: pending.pull_request.title.clone(),
                expected_head_sha: tip.to_string(),
            },
        )
        .await
        .map_err(|e| fail(TransactionStage::Merge, e))?;
    info!(
        pr = pending.pull_request.number,
        sha = %merge_sha,
        from = old_name,
        to = new_name,
        "rename merged"
    );

    Ok(merge_sha)
}

/// Tip of the chain `anchor -> first -> second`, in either order.
///
/// Returns `None` if the two commits do not sit directly on top of `anchor`
/// and of each other.
pub fn chain_tip<'a>(anchor: &str, a: &'a CommitInfo, b: &'a CommitInfo) -> Option<&'a str> {
    if a.follows(anchor) && b.follows(&a.sha) {
        Some(&b.sha)
    } else if b.follows(anchor) && a.follows(&b.sha) {
        Some(&a.sha)
    } else {
        None
    }
}

async fn cleanup(forge: &dyn Forge, branch: &BranchName) {
    match forge.delete_branch(branch.as_str()).await {
        Ok(()) => debug!(branch = %branch, "deleted staging branch"),
        Err(e) => warn!(branch = %branch, error = %e, "failed to delete staging branch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, parent: &str) -> CommitInfo {
        CommitInfo {
            sha: sha.to_string(),
            parents: vec![parent.to_string()],
        }
    }

    #[test]
    fn chain_in_order() {
        let first = commit("b", "a");
        let second = commit("c", "b");
        assert_eq!(chain_tip("a", &first, &second), Some("c"));
    }

    #[test]
    fn chain_in_reverse_order() {
        let first = commit("b", "a");
        let second = commit("c", "b");
        assert_eq!(chain_tip("a", &second, &first), Some("c"));
    }

    #[test]
    fn chain_broken_by_foreign_commit() {
        // a -> x (foreign) -> b -> c
        let first = commit("b", "x");
        let second = commit("c", "b");
        assert_eq!(chain_tip("a", &first, &second), None);
    }

    #[test]
    fn chain_with_gap_between_commits() {
        let first = commit("b", "a");
        let second = commit("c", "x");
        assert_eq!(chain_tip("a", &first, &second), None);
    }

    #[test]
    fn stage_display() {
        assert_eq!(TransactionStage::Merge.to_string(), "merge");
        assert_eq!(TransactionStage::CreateBranch.to_string(), "create branch");
    }

    #[test]
    fn error_reports_stage_and_branch() {
        let branch = BranchName::new("postbridge/rename-1").unwrap();
        let err = TransactionError::at(
            TransactionStage::Merge,
            &branch,
            ForgeError::StaleVersion("head moved".into()),
        );
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "rename failed at merge (staging branch postbridge/rename-1): stale version: head moved"
        );
    }
}
