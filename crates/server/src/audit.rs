//! Decision and outcome records for every handled event.
//!
//! Records carry full object ids. Truncation to 8 characters happens only in
//! [`AuditRecord::message`], which renders the human-readable line.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use subsync_common::display::ShortSha;
use tracing::{debug, error, info};

use crate::orchestrator::SyncStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Filtered-out events.
    Minor,
    Info,
    Error,
}

/// Why an event produced no remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    NotPush { kind: String },
    /// Push event without a decodable payload.
    EmptyPayload,
    Unmonitored,
    BranchMismatch { expected_ref: String },
    BranchDeleted,
}

impl FilterReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotPush { .. } => "not_push",
            Self::EmptyPayload => "empty_payload",
            Self::Unmonitored => "unmonitored_repo",
            Self::BranchMismatch { .. } => "unmonitored_branch",
            Self::BranchDeleted => "branch_deleted",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPush { kind } => write!(f, "`{kind}` is not a push event"),
            Self::EmptyPayload => write!(f, "push event carried no payload"),
            Self::Unmonitored => write!(f, "repository is not monitored"),
            Self::BranchMismatch { expected_ref } => write!(f, "only {expected_ref} is monitored"),
            Self::BranchDeleted => write!(f, "branch was deleted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    Filtered { event: String, repo: Option<String>, git_ref: Option<String>, reason: FilterReason },
    Received { repo: String, git_ref: String, before: String, after: String },
    StepSucceeded { step: SyncStep, sha: String },
    StepFailed { step: SyncStep, kind: &'static str, detail: String },
    /// The parent branch moved after it was read. Expected under contention.
    RefRejected { expected_parent: String, reason: String },
    Updated { owner: String, submodule_repo: String, after: String },
    NotUpdated { owner: String, submodule_repo: String, before: String },
}

impl AuditRecord {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Filtered { .. } => Severity::Minor,
            Self::StepFailed { .. } => Severity::Error,
            Self::Received { .. }
            | Self::StepSucceeded { .. }
            | Self::RefRejected { .. }
            | Self::Updated { .. }
            | Self::NotUpdated { .. } => Severity::Info,
        }
    }

    /// Human-readable line, with object ids shortened.
    pub fn message(&self) -> String {
        match self {
            Self::Filtered { event, repo, git_ref, reason } => format!(
                "ignored {event} event from {} {}: {reason}",
                repo.as_deref().unwrap_or("-"),
                git_ref.as_deref().unwrap_or("-"),
            ),
            Self::Received { repo, git_ref, before, after } => format!(
                "received push to {repo} {git_ref} ({}..{})",
                ShortSha(before),
                ShortSha(after)
            ),
            Self::StepSucceeded { step, sha } => format!("{step} succeeded ({})", ShortSha(sha)),
            Self::StepFailed { step, detail, .. } => format!("{step} failed: {detail}"),
            Self::RefRejected { expected_parent, reason } => format!(
                "{} not applied, branch moved past ({}): {reason}",
                SyncStep::UpdateRef,
                ShortSha(expected_parent)
            ),
            Self::Updated { owner, submodule_repo, after } => {
                format!("UPDATED submodule {owner}/{submodule_repo} to ({})", ShortSha(after))
            }
            Self::NotUpdated { before, .. } => {
                format!("NOT UPDATED — submodule is still at ({})", ShortSha(before))
            }
        }
    }
}

/// Sink for audit records.
pub trait AuditLog: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Forwards records to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, record: AuditRecord) {
        let message = record.message();
        match &record {
            AuditRecord::Filtered { event, repo, git_ref, reason } => debug!(
                event = %event,
                repo = repo.as_deref().unwrap_or(""),
                git_ref = git_ref.as_deref().unwrap_or(""),
                reason = reason.as_str(),
                "{message}"
            ),
            AuditRecord::Received { repo, git_ref, before, after } => info!(
                repo = %repo,
                git_ref = %git_ref,
                before = %before,
                after = %after,
                "{message}"
            ),
            AuditRecord::StepSucceeded { step, sha } => {
                info!(step = step.as_str(), sha = %sha, "{message}")
            }
            AuditRecord::StepFailed { step, kind, detail } => {
                error!(step = step.as_str(), error_kind = kind, detail = %detail, "{message}")
            }
            AuditRecord::RefRejected { expected_parent, reason } => info!(
                step = SyncStep::UpdateRef.as_str(),
                expected_parent = %expected_parent,
                reason = %reason,
                "{message}"
            ),
            AuditRecord::Updated { owner, submodule_repo, after } => info!(
                owner = %owner,
                submodule_repo = %submodule_repo,
                after = %after,
                "{message}"
            ),
            AuditRecord::NotUpdated { owner, submodule_repo, before } => info!(
                owner = %owner,
                submodule_repo = %submodule_repo,
                before = %before,
                "{message}"
            ),
        }
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().iter().map(AuditRecord::message).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}
