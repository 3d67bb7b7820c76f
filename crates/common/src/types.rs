// Core domain types shared across the subsync crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ref prefix for branch heads.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Tree entry mode for a gitlink (submodule commit pointer).
pub const GITLINK_MODE: &str = "160000";

/// SHA GitHub reports as `after` when a branch is deleted.
pub const NULL_SHA: &str = "0000000000000000000000000000000000000000";

/// One monitored submodule and where its pointer lives in the parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmoduleBinding {
    /// Short name of the submodule repository (lookup key).
    pub submodule_repo: String,
    /// Branch of the submodule whose pushes trigger a sync.
    pub submodule_branch: String,
    /// Short name of the parent repository holding the gitlink.
    pub parent_repo: String,
    /// Parent branch that gets advanced.
    pub parent_branch: String,
    /// Path of the gitlink entry inside the parent tree.
    pub mount_path: String,
}

impl SubmoduleBinding {
    /// Full ref name (`refs/heads/<branch>`) of the watched submodule branch.
    pub fn watched_ref(&self) -> String {
        format!("{BRANCH_REF_PREFIX}{}", self.submodule_branch)
    }
}

/// A parsed push event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushNotification {
    /// `owner/name` of the pushed repository.
    pub source_repo_full_name: String,
    /// `name` of the pushed repository.
    pub source_repo_short_name: String,
    /// Full ref that was pushed, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before_sha: String,
    pub after_sha: String,
}

impl PushNotification {
    /// True when the push deleted the ref instead of moving it.
    pub fn is_branch_deletion(&self) -> bool {
        !self.after_sha.is_empty() && self.after_sha.bytes().all(|b| b == b'0')
    }
}

/// Snapshot of a parent branch at the moment it was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchHead {
    pub commit_sha: String,
    pub tree_sha: String,
}

/// Kind of object a tree entry points to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    /// Gitlink into another repository.
    Commit,
}

/// One entry of a tree object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    pub sha: String,
}

impl TreeEntry {
    /// A gitlink entry pointing `path` at `commit_sha`.
    pub fn gitlink(path: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: GITLINK_MODE.to_string(),
            kind: TreeEntryKind::Commit,
            sha: commit_sha.into(),
        }
    }
}

/// A tree created on the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeObject {
    pub sha: String,
    #[serde(default)]
    pub entries: Vec<TreeEntry>,
}

/// A commit created on the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitObject {
    pub sha: String,
    pub tree_sha: String,
    pub parent_sha: String,
    pub message: String,
}

/// Result of a non-forced ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdate {
    /// The ref now points at `sha`.
    Updated { sha: String },
    /// The ref did not move because the update was not a fast-forward.
    Rejected { reason: String },
}

/// `(repo, branch)` pair identifying a branch on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchKey {
    pub repo: String,
    pub branch: String,
}

impl BranchKey {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { repo: repo.into(), branch: branch.into() }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.branch)
    }
}
