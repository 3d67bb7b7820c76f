//! Submodule sync chain.
//!
//! One chain moves a parent branch's gitlink to a submodule's new commit in
//! four remote steps, each consuming the output of the previous one:
//!
//! ```text
//! Idle -> FetchedHead -> BuiltTree -> BuiltCommit -> RefUpdated
//!   \          \             \             \
//!    +----------+-------------+-------------+--> Aborted
//! ```
//!
//! The first failure aborts the chain. Trees and commits created before an
//! abort are unreferenced objects and need no cleanup. The ref update is never
//! forced: if the branch moved since `FetchHead`, the update is rejected and
//! the chain ends as not updated. Chains for the same parent branch are
//! serialized through [`BranchLocks`]; nothing is retried.

use std::fmt;
use std::sync::Arc;

use subsync_common::types::{
    BranchHead, BranchKey, CommitObject, PushNotification, RefUpdate, SubmoduleBinding, TreeEntry,
    TreeObject,
};
use thiserror::Error;
use tracing::{info_span, Instrument};

use crate::audit::{AuditLog, AuditRecord};
use crate::github::{VcsError, VersionControlClient};
use crate::locks::BranchLocks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    FetchHead,
    BuildTree,
    BuildCommit,
    UpdateRef,
}

impl SyncStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchHead => "fetch_head",
            Self::BuildTree => "build_tree",
            Self::BuildCommit => "build_commit",
            Self::UpdateRef => "update_ref",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncFailure {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// The branch moved after it was read; expected under contention.
    #[error("ref update rejected: {reason}")]
    Rejected { reason: String, expected_parent: String },
}

impl SyncFailure {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vcs(error) => error.kind(),
            Self::Rejected { .. } => "fast_forward_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    FetchedHead { head: BranchHead },
    BuiltTree { head: BranchHead, tree: TreeObject },
    BuiltCommit { commit: CommitObject },
    RefUpdated { commit: CommitObject },
    Aborted { step: SyncStep, failure: SyncFailure },
}

impl SyncState {
    /// Step that leaves this state, or `None` when terminal.
    pub const fn next_step(&self) -> Option<SyncStep> {
        match self {
            Self::Idle => Some(SyncStep::FetchHead),
            Self::FetchedHead { .. } => Some(SyncStep::BuildTree),
            Self::BuiltTree { .. } => Some(SyncStep::BuildCommit),
            Self::BuiltCommit { .. } => Some(SyncStep::UpdateRef),
            Self::RefUpdated { .. } | Self::Aborted { .. } => None,
        }
    }

    /// Object id produced by the step that entered this state.
    fn produced_sha(&self) -> Option<&str> {
        match self {
            Self::FetchedHead { head } => Some(&head.commit_sha),
            Self::BuiltTree { tree, .. } => Some(&tree.sha),
            Self::BuiltCommit { commit } | Self::RefUpdated { commit } => Some(&commit.sha),
            Self::Idle | Self::Aborted { .. } => None,
        }
    }
}

/// Terminal result of one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated { commit_sha: String, tree_sha: String },
    NotUpdated { step: SyncStep, failure: SyncFailure },
}

impl SyncOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Message of the commit that moves the gitlink. Always carries the full SHA.
pub fn commit_message(owner: &str, submodule_repo: &str, after_sha: &str) -> String {
    format!("auto-update submodule {owner}/{submodule_repo} to ({after_sha})")
}

pub struct SyncOrchestrator {
    client: Arc<dyn VersionControlClient>,
    audit: Arc<dyn AuditLog>,
    owner: String,
    locks: BranchLocks,
}

impl SyncOrchestrator {
    pub fn new(
        client: Arc<dyn VersionControlClient>,
        audit: Arc<dyn AuditLog>,
        owner: impl Into<String>,
    ) -> Self {
        Self { client, audit, owner: owner.into(), locks: BranchLocks::new() }
    }

    /// Run the chain for one matched push to completion.
    pub async fn sync(&self, binding: &SubmoduleBinding, push: &PushNotification) -> SyncOutcome {
        let key = BranchKey::new(&binding.parent_repo, &binding.parent_branch);
        let span = info_span!(
            "subsync.sync",
            submodule_repo = %binding.submodule_repo,
            parent = %key,
            after = %push.after_sha
        );
        async move {
            let _branch = self.locks.acquire(&key).await;

            let mut state = SyncState::Idle;
            loop {
                state = match state {
                    SyncState::RefUpdated { commit } => {
                        return self.updated(commit, binding, push);
                    }
                    SyncState::Aborted { step, failure } => {
                        return self.not_updated(step, failure, binding, push);
                    }
                    pending => self.advance(pending, binding, push).await,
                };
            }
        }
        .instrument(span)
        .await
    }

    /// Take the next step, turning a failure into `Aborted`.
    async fn advance(
        &self,
        state: SyncState,
        binding: &SubmoduleBinding,
        push: &PushNotification,
    ) -> SyncState {
        let Some(step) = state.next_step() else {
            return state;
        };

        match self.attempt(state, binding, push).await {
            Ok(next) => {
                if let Some(sha) = next.produced_sha() {
                    self.audit.record(AuditRecord::StepSucceeded { step, sha: sha.into() });
                }
                next
            }
            Err(failure) => SyncState::Aborted { step, failure },
        }
    }

    async fn attempt(
        &self,
        state: SyncState,
        binding: &SubmoduleBinding,
        push: &PushNotification,
    ) -> Result<SyncState, SyncFailure> {
        let repo = binding.parent_repo.as_str();
        match state {
            SyncState::Idle => {
                let head = self.client.read_branch_head(repo, &binding.parent_branch).await?;
                Ok(SyncState::FetchedHead { head })
            }
            SyncState::FetchedHead { head } => {
                let overlay = [TreeEntry::gitlink(&binding.mount_path, &push.after_sha)];
                let tree = self.client.create_tree(repo, &head.tree_sha, &overlay).await?;
                Ok(SyncState::BuiltTree { head, tree })
            }
            SyncState::BuiltTree { head, tree } => {
                let message = commit_message(&self.owner, &binding.submodule_repo, &push.after_sha);
                let commit =
                    self.client.create_commit(repo, &tree.sha, &head.commit_sha, &message).await?;
                Ok(SyncState::BuiltCommit { commit })
            }
            SyncState::BuiltCommit { commit } => {
                match self.client.update_ref(repo, &binding.parent_branch, &commit.sha).await? {
                    RefUpdate::Updated { .. } => Ok(SyncState::RefUpdated { commit }),
                    RefUpdate::Rejected { reason } => Err(SyncFailure::Rejected {
                        reason,
                        expected_parent: commit.parent_sha,
                    }),
                }
            }
            terminal @ (SyncState::RefUpdated { .. } | SyncState::Aborted { .. }) => Ok(terminal),
        }
    }

    fn updated(
        &self,
        commit: CommitObject,
        binding: &SubmoduleBinding,
        push: &PushNotification,
    ) -> SyncOutcome {
        self.audit.record(AuditRecord::Updated {
            owner: self.owner.clone(),
            submodule_repo: binding.submodule_repo.clone(),
            after: push.after_sha.clone(),
        });
        SyncOutcome::Updated { commit_sha: commit.sha, tree_sha: commit.tree_sha }
    }

    fn not_updated(
        &self,
        step: SyncStep,
        failure: SyncFailure,
        binding: &SubmoduleBinding,
        push: &PushNotification,
    ) -> SyncOutcome {
        let record = match &failure {
            SyncFailure::Rejected { reason, expected_parent } => AuditRecord::RefRejected {
                expected_parent: expected_parent.clone(),
                reason: reason.clone(),
            },
            SyncFailure::Vcs(_) => AuditRecord::StepFailed {
                step,
                kind: failure.kind(),
                detail: failure.to_string(),
            },
        };
        self.audit.record(record);
        self.audit.record(AuditRecord::NotUpdated {
            owner: self.owner.clone(),
            submodule_repo: binding.submodule_repo.clone(),
            before: push.before_sha.clone(),
        });
        SyncOutcome::NotUpdated { step, failure }
    }
}
