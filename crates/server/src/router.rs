// Event classification: decide which deliveries start a sync chain.

use std::sync::Arc;

use subsync_common::event::EventKind;
use subsync_common::types::PushNotification;

use crate::audit::{AuditLog, AuditRecord, FilterReason};
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::registry::SubmoduleRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// No remote calls were made.
    Ignored(FilterReason),
    Synced(SyncOutcome),
}

pub struct EventRouter {
    registry: Arc<SubmoduleRegistry>,
    orchestrator: Arc<SyncOrchestrator>,
    audit: Arc<dyn AuditLog>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<SubmoduleRegistry>,
        orchestrator: Arc<SyncOrchestrator>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { registry, orchestrator, audit }
    }

    /// Route one delivery. Only a push to the watched branch of a monitored
    /// submodule reaches the orchestrator.
    pub async fn handle(
        &self,
        kind: &EventKind,
        notification: Option<PushNotification>,
    ) -> RouteDecision {
        let push = match (kind, notification) {
            (EventKind::Push, Some(push)) => push,
            (EventKind::Push, None) => {
                return self.ignore(kind, None, FilterReason::EmptyPayload);
            }
            (other, notification) => {
                let reason = FilterReason::NotPush { kind: other.to_string() };
                return self.ignore(other, notification.as_ref(), reason);
            }
        };

        let Some(binding) = self.registry.lookup(&push.source_repo_short_name) else {
            return self.ignore(kind, Some(&push), FilterReason::Unmonitored);
        };

        let watched_ref = binding.watched_ref();
        if push.git_ref != watched_ref {
            let reason = FilterReason::BranchMismatch { expected_ref: watched_ref };
            return self.ignore(kind, Some(&push), reason);
        }

        if push.is_branch_deletion() {
            return self.ignore(kind, Some(&push), FilterReason::BranchDeleted);
        }

        self.audit.record(AuditRecord::Received {
            repo: push.source_repo_full_name.clone(),
            git_ref: push.git_ref.clone(),
            before: push.before_sha.clone(),
            after: push.after_sha.clone(),
        });

        RouteDecision::Synced(self.orchestrator.sync(binding, &push).await)
    }

    fn ignore(
        &self,
        kind: &EventKind,
        push: Option<&PushNotification>,
        reason: FilterReason,
    ) -> RouteDecision {
        self.audit.record(AuditRecord::Filtered {
            event: kind.to_string(),
            repo: push.map(|p| p.source_repo_full_name.clone()),
            git_ref: push.map(|p| p.git_ref.clone()),
            reason: reason.clone(),
        });
        RouteDecision::Ignored(reason)
    }
}
