// Access to the parent repository's object store.
//
// Four calls, each a single request with no retry and no caching. The sync
// orchestrator depends only on the trait; `GithubClient` is the REST
// implementation used in production.

pub mod client;
pub mod error;

use async_trait::async_trait;
use subsync_common::types::{BranchHead, CommitObject, RefUpdate, TreeEntry, TreeObject};

pub use client::GithubClient;
pub use error::{VcsError, VcsResult};

#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Current head commit of `branch` and that commit's tree.
    async fn read_branch_head(&self, repo: &str, branch: &str) -> VcsResult<BranchHead>;

    /// Create a tree equal to `base_tree_sha` with `entries` overlaid.
    async fn create_tree(
        &self,
        repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> VcsResult<TreeObject>;

    /// Create a single-parent commit.
    async fn create_commit(
        &self,
        repo: &str,
        tree_sha: &str,
        parent_sha: &str,
        message: &str,
    ) -> VcsResult<CommitObject>;

    /// Move `branch` to `new_sha` without forcing.
    ///
    /// A non-fast-forward update is reported as [`RefUpdate::Rejected`],
    /// not as an error.
    async fn update_ref(&self, repo: &str, branch: &str, new_sha: &str) -> VcsResult<RefUpdate>;
}
