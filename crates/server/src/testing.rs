// In-memory `VersionControlClient` used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use subsync_common::types::{
    BranchHead, BranchKey, CommitObject, RefUpdate, SubmoduleBinding, TreeEntry, TreeObject,
};

use crate::github::{VcsError, VcsResult, VersionControlClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ReadBranchHead { repo: String, branch: String },
    CreateTree { repo: String, base_tree_sha: String, entries: Vec<TreeEntry> },
    CreateCommit { repo: String, tree_sha: String, parent_sha: String, message: String },
    UpdateRef { repo: String, branch: String, new_sha: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ReadBranchHead,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    heads: HashMap<BranchKey, BranchHead>,
    commits: HashMap<String, CommitObject>,
    tree_shas: VecDeque<String>,
    commit_shas: VecDeque<String>,
    failures: HashMap<Op, VcsError>,
    created: usize,
}

/// Stateful fake: branches move only on fast-forward from the current head.
#[derive(Debug, Default)]
pub struct FakeVcs {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(self, repo: &str, branch: &str, commit_sha: &str, tree_sha: &str) -> Self {
        self.set_head(repo, branch, commit_sha, tree_sha);
        self
    }

    pub fn with_tree_shas<const N: usize>(self, shas: [&str; N]) -> Self {
        self.lock().tree_shas.extend(shas.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_commit_shas<const N: usize>(self, shas: [&str; N]) -> Self {
        self.lock().commit_shas.extend(shas.iter().map(|s| s.to_string()));
        self
    }

    pub fn failing(self, op: Op, error: VcsError) -> Self {
        self.lock().failures.insert(op, error);
        self
    }

    /// Sleep inside every call so concurrent chains get a chance to interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Move a branch as an external writer would.
    pub fn set_head(&self, repo: &str, branch: &str, commit_sha: &str, tree_sha: &str) {
        self.lock().heads.insert(
            BranchKey::new(repo, branch),
            BranchHead { commit_sha: commit_sha.into(), tree_sha: tree_sha.into() },
        );
    }

    pub fn head(&self, repo: &str, branch: &str) -> Option<BranchHead> {
        self.lock().heads.get(&BranchKey::new(repo, branch)).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake vcs lock poisoned")
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn begin(&self, op: Op, call: Call) -> Result<MutexGuard<'_, State>, VcsError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(state),
        }
    }
}

pub fn binding() -> SubmoduleBinding {
    SubmoduleBinding {
        submodule_repo: "lib".into(),
        submodule_branch: "main".into(),
        parent_repo: "app".into(),
        parent_branch: "main".into(),
        mount_path: "vendor/lib".into(),
    }
}

pub fn push(after: &str) -> subsync_common::types::PushNotification {
    subsync_common::types::PushNotification {
        source_repo_full_name: "acme/lib".into(),
        source_repo_short_name: "lib".into(),
        git_ref: "refs/heads/main".into(),
        before_sha: "aaa111".into(),
        after_sha: after.into(),
    }
}

#[async_trait]
impl VersionControlClient for FakeVcs {
    async fn read_branch_head(&self, repo: &str, branch: &str) -> VcsResult<BranchHead> {
        self.pause().await;
        let call = Call::ReadBranchHead { repo: repo.into(), branch: branch.into() };
        let state = self.begin(Op::ReadBranchHead, call)?;
        state
            .heads
            .get(&BranchKey::new(repo, branch))
            .cloned()
            .ok_or_else(|| VcsError::NotFound { resource: format!("branch {repo}:{branch}") })
    }

    async fn create_tree(
        &self,
        repo: &str,
        base_tree_sha: &str,
        entries: &[TreeEntry],
    ) -> VcsResult<TreeObject> {
        self.pause().await;
        let call = Call::CreateTree {
            repo: repo.into(),
            base_tree_sha: base_tree_sha.into(),
            entries: entries.to_vec(),
        };
        let mut state = self.begin(Op::CreateTree, call)?;
        state.created += 1;
        let created = state.created;
        let sha = state.tree_shas.pop_front().unwrap_or_else(|| format!("tree-{created}"));
        Ok(TreeObject { sha, entries: entries.to_vec() })
    }

    async fn create_commit(
        &self,
        repo: &str,
        tree_sha: &str,
        parent_sha: &str,
        message: &str,
    ) -> VcsResult<CommitObject> {
        self.pause().await;
        let call = Call::CreateCommit {
            repo: repo.into(),
            tree_sha: tree_sha.into(),
            parent_sha: parent_sha.into(),
            message: message.into(),
        };
        let mut state = self.begin(Op::CreateCommit, call)?;
        state.created += 1;
        let created = state.created;
        let sha = state.commit_shas.pop_front().unwrap_or_else(|| format!("commit-{created}"));
        let commit = CommitObject {
            sha: sha.clone(),
            tree_sha: tree_sha.into(),
            parent_sha: parent_sha.into(),
            message: message.into(),
        };
        state.commits.insert(sha, commit.clone());
        Ok(commit)
    }

    async fn update_ref(&self, repo: &str, branch: &str, new_sha: &str) -> VcsResult<RefUpdate> {
        self.pause().await;
        let call =
            Call::UpdateRef { repo: repo.into(), branch: branch.into(), new_sha: new_sha.into() };
        let mut state = self.begin(Op::UpdateRef, call)?;
        let key = BranchKey::new(repo, branch);
        let commit = state
            .commits
            .get(new_sha)
            .cloned()
            .ok_or_else(|| VcsError::Validation { message: "Object does not exist".into() })?;
        let current = state
            .heads
            .get(&key)
            .cloned()
            .ok_or_else(|| VcsError::NotFound { resource: format!("ref {repo}:{branch}") })?;

        if commit.parent_sha != current.commit_sha {
            return Ok(RefUpdate::Rejected { reason: "Update is not a fast forward".into() });
        }

        state
            .heads
            .insert(key, BranchHead { commit_sha: commit.sha.clone(), tree_sha: commit.tree_sha });
        Ok(RefUpdate::Updated { sha: commit.sha })
    }
}
