//! In-process persistence (§4.J): sharded concurrent maps plus the
//! secondary indexes the contract requires. Adequate for the single-writer,
//! single-process model this core targets.

use crate::domain::approval::{Approval, ApprovalState};
use crate::domain::audit::AuditEvent;
use crate::domain::execution::{Execution, ExecutionState};
use crate::domain::ids::{ApprovalId, ExecutionId, PlaybookId, TriggerId, WebhookId};
use crate::domain::playbook::Playbook;
use crate::domain::sla::SlaPolicy;
use crate::domain::trigger::Trigger;
use crate::domain::webhook::Webhook;
use crate::error::SoarResult;
use crate::persistence::{
    ApprovalStore, AuditStore, ExecutionStore, PlaybookStore, SlaPolicyStore, TriggerStore, WebhookStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

/// A single in-process store backing all six persistence traits, in the
/// combined-store idiom of grouping related entity tables behind one handle.
#[derive(Default)]
pub struct InMemoryStore {
    executions: DashMap<ExecutionId, Execution>,
    /// fingerprint -> execution_id, for dedup lookups.
    fingerprint_index: DashMap<String, ExecutionId>,
    playbooks: DashMap<PlaybookId, Playbook>,
    triggers: DashMap<TriggerId, Trigger>,
    /// webhook_id -> trigger_id, enforcing the 1:1 binding (§9).
    trigger_by_webhook: DashMap<WebhookId, TriggerId>,
    webhooks: DashMap<WebhookId, Webhook>,
    approvals: DashMap<ApprovalId, Approval>,
    audit_log: RwLock<Vec<AuditEvent>>,
    sla_policies: DashMap<String, SlaPolicy>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_log_len(&self) -> usize {
        self.audit_log.read().len()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryStore {
    async fn save(&self, execution: &Execution) -> SoarResult<()> {
        self.fingerprint_index
            .insert(execution.fingerprint.clone(), execution.execution_id.clone());
        self.executions.insert(execution.execution_id.clone(), execution.clone());
        Ok(())
    }

    async fn get(&self, execution_id: &ExecutionId) -> SoarResult<Option<Execution>> {
        Ok(self.executions.get(execution_id).map(|e| e.clone()))
    }

    async fn find_by_fingerprint(&self, fingerprint: &str, within: DateTime<Utc>) -> SoarResult<Option<Execution>> {
        let Some(execution_id) = self.fingerprint_index.get(fingerprint).map(|r| r.clone()) else {
            return Ok(None);
        };
        let Some(execution) = self.executions.get(&execution_id) else {
            return Ok(None);
        };
        if execution.created_at >= within {
            Ok(Some(execution.clone()))
        } else {
            Ok(None)
        }
    }

    async fn list_by_state(&self, state: ExecutionState, limit: usize) -> SoarResult<Vec<Execution>> {
        let mut matches: Vec<Execution> = self
            .executions
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.clone())
            .collect();
        matches.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn list_by_webhook(&self, webhook_id: &WebhookId, limit: usize) -> SoarResult<Vec<Execution>> {
        let mut matches: Vec<Execution> = self
            .executions
            .iter()
            .filter(|e| &e.webhook_id == webhook_id)
            .map(|e| e.clone())
            .collect();
        matches.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl PlaybookStore for InMemoryStore {
    async fn save(&self, playbook: &Playbook) -> SoarResult<()> {
        self.playbooks.insert(playbook.playbook_id.clone(), playbook.clone());
        Ok(())
    }

    async fn get(&self, playbook_id: &PlaybookId) -> SoarResult<Option<Playbook>> {
        Ok(self.playbooks.get(playbook_id).map(|p| p.clone()))
    }
}

#[async_trait]
impl TriggerStore for InMemoryStore {
    async fn save(&self, trigger: &Trigger) -> SoarResult<()> {
        self.trigger_by_webhook
            .insert(trigger.webhook_id.clone(), trigger.trigger_id.clone());
        self.triggers.insert(trigger.trigger_id.clone(), trigger.clone());
        Ok(())
    }

    async fn get(&self, trigger_id: &TriggerId) -> SoarResult<Option<Trigger>> {
        Ok(self.triggers.get(trigger_id).map(|t| t.clone()))
    }

    async fn find_by_webhook(&self, webhook_id: &WebhookId) -> SoarResult<Option<Trigger>> {
        let Some(trigger_id) = self.trigger_by_webhook.get(webhook_id).map(|r| r.clone()) else {
            return Ok(None);
        };
        Ok(self.triggers.get(&trigger_id).map(|t| t.clone()))
    }
}

#[async_trait]
impl WebhookStore for InMemoryStore {
    async fn save(&self, webhook: &Webhook) -> SoarResult<()> {
        self.webhooks.insert(webhook.webhook_id.clone(), webhook.clone());
        Ok(())
    }

    async fn get(&self, webhook_id: &WebhookId) -> SoarResult<Option<Webhook>> {
        Ok(self.webhooks.get(webhook_id).map(|w| w.clone()))
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn save(&self, approval: &Approval) -> SoarResult<()> {
        self.approvals.insert(approval.approval_id.clone(), approval.clone());
        Ok(())
    }

    async fn get(&self, approval_id: &ApprovalId) -> SoarResult<Option<Approval>> {
        Ok(self.approvals.get(approval_id).map(|a| a.clone()))
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> SoarResult<Vec<Approval>> {
        Ok(self
            .approvals
            .iter()
            .filter(|a| a.state == ApprovalState::Pending && a.is_expired(now))
            .map(|a| a.clone())
            .collect())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn record(&self, event: AuditEvent) -> SoarResult<()> {
        // Best-effort per §7: a lock-poisoning or capacity issue here must
        // never roll back the caller's primary mutation.
        self.audit_log.write().push(event);
        Ok(())
    }
}

#[async_trait]
impl SlaPolicyStore for InMemoryStore {
    async fn save(&self, policy: &SlaPolicy) -> SoarResult<()> {
        let (scope, key) = policy.scope_key();
        self.sla_policies.insert(format!("{:?}:{}", scope, key), policy.clone());
        Ok(())
    }

    async fn resolve(&self, playbook_id: &PlaybookId, severity: Option<&str>) -> SoarResult<Option<SlaPolicy>> {
        use crate::domain::sla::SlaScope;

        let by_playbook = format!("{:?}:{}", SlaScope::Playbook, playbook_id);
        if let Some(policy) = self.sla_policies.get(&by_playbook) {
            if policy.enabled {
                return Ok(Some(policy.clone()));
            }
        }
        if let Some(sev) = severity {
            let by_severity = format!("{:?}:{}", SlaScope::Severity, sev);
            if let Some(policy) = self.sla_policies.get(&by_severity) {
                if policy.enabled {
                    return Ok(Some(policy.clone()));
                }
            }
        }
        let global = format!("{:?}:{}", SlaScope::Global, "");
        if let Some(policy) = self.sla_policies.get(&global) {
            if policy.enabled {
                return Ok(Some(policy.clone()));
            }
        }
        Ok(None)
    }
}

/// Placeholder re-export so callers can group the six traits behind one name
/// without pulling in every module individually.
pub type SharedStore = std::sync::Arc<InMemoryStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::SlaId;
    use crate::domain::sla::{SlaScope, SlaThresholds};

    fn thresholds() -> SlaThresholds {
        SlaThresholds {
            acknowledge_ms: 1000,
            containment_ms: 2000,
            resolution_ms: 3000,
        }
    }

    #[tokio::test]
    async fn sla_resolution_prefers_playbook_over_global() {
        let store = InMemoryStore::new();
        let playbook_id = PlaybookId::generate();

        let global = SlaPolicy {
            sla_id: SlaId::generate("global"),
            scope: SlaScope::Global,
            playbook_id: None,
            severity: None,
            thresholds: thresholds(),
            enabled: true,
            priority: 0,
        };
        SlaPolicyStore::save(&store, &global).await.unwrap();

        let specific = SlaPolicy {
            sla_id: SlaId::generate("pb"),
            scope: SlaScope::Playbook,
            playbook_id: Some(playbook_id.clone()),
            severity: None,
            thresholds: thresholds(),
            enabled: true,
            priority: 10,
        };
        SlaPolicyStore::save(&store, &specific).await.unwrap();

        let resolved = store.resolve(&playbook_id, None).await.unwrap().unwrap();
        assert_eq!(resolved.scope, SlaScope::Playbook);
    }

    #[tokio::test]
    async fn duplicate_fingerprint_within_window_is_found() {
        use crate::domain::ids::WebhookId;
        use crate::domain::sla::SlaStatus;
        use crate::domain::trigger::{MatchMode, Trigger, TriggerSnapshot};
        use serde_json::json;

        let store = InMemoryStore::new();
        let playbook_id = PlaybookId::generate();
        let webhook_id = WebhookId::generate();
        let trigger = Trigger::new(webhook_id.clone(), playbook_id.clone(), Vec::new(), MatchMode::All);
        let snapshot = TriggerSnapshot::from(&trigger);
        let now = Utc::now();
        let execution = Execution::new(
            playbook_id,
            "test".into(),
            json!({}),
            snapshot,
            now,
            "arrival_time".into(),
            webhook_id,
            "fp-123".into(),
            SlaStatus::new(now, &thresholds()),
        );
        ExecutionStore::save(&store, &execution).await.unwrap();

        let found = store
            .find_by_fingerprint("fp-123", now - chrono::Duration::seconds(10))
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
