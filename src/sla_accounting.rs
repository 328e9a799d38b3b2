//! SLA Accounting (§4.I): policy resolution, threshold copying, and breach
//! classification across the three MTTA/MTTC/MTTR dimensions.

use crate::config::SlaDefaults;
use crate::domain::execution::Execution;
use crate::domain::ids::PlaybookId;
use crate::domain::sla::{BreachReason, SlaThresholds};
use crate::persistence::SlaPolicyStore;
use chrono::{DateTime, Utc};

/// Resolve applicable thresholds by playbook → severity → global, falling
/// back to the process-wide defaults when no policy is enabled.
pub async fn resolve_thresholds(
    store: &dyn SlaPolicyStore,
    playbook_id: &PlaybookId,
    severity: Option<&str>,
    defaults: &SlaDefaults,
) -> SlaThresholds {
    match store.resolve(playbook_id, severity).await {
        Ok(Some(policy)) => policy.thresholds,
        _ => SlaThresholds {
            acknowledge_ms: defaults.acknowledge_ms,
            containment_ms: defaults.containment_ms,
            resolution_ms: defaults.resolution_ms,
        },
    }
}

/// Computed at execution insert time (§4.I: "record acknowledged_at at
/// execution insert; compute acknowledge breach immediately").
pub fn record_acknowledgement(execution: &mut Execution, acknowledged_at: DateTime<Utc>) {
    let elapsed_ms = (acknowledged_at - execution.sla_status.webhook_received_at).num_milliseconds();
    execution.sla_status.acknowledge.at = Some(acknowledged_at);
    execution.sla_status.acknowledge.breached = elapsed_ms > execution.sla_status.acknowledge.threshold_ms;
    if execution.sla_status.acknowledge.breached {
        execution.sla_status.acknowledge.breach_reason = Some(classify_breach(execution));
    }
}

/// Set the first time a non-shadow action-type step completes.
pub fn record_containment(execution: &mut Execution, contained_at: DateTime<Utc>) {
    if execution.sla_status.containment.at.is_some() {
        return;
    }
    let elapsed_ms = (contained_at - execution.sla_status.webhook_received_at).num_milliseconds();
    execution.sla_status.containment.at = Some(contained_at);
    execution.sla_status.containment.breached = elapsed_ms > execution.sla_status.containment.threshold_ms;
    if execution.sla_status.containment.breached {
        execution.sla_status.containment.breach_reason = Some(classify_breach(execution));
    }
}

/// Computed once the execution reaches a terminal state.
pub fn record_resolution(execution: &mut Execution, resolved_at: DateTime<Utc>) {
    let elapsed_ms = (resolved_at - execution.sla_status.webhook_received_at).num_milliseconds();
    execution.sla_status.resolution.at = Some(resolved_at);
    execution.sla_status.resolution.breached = elapsed_ms > execution.sla_status.resolution.threshold_ms;
    if execution.sla_status.resolution.breached {
        execution.sla_status.resolution.breach_reason = Some(classify_breach(execution));
    }
}

/// Heuristic breach-reason assignment (§4.I).
fn classify_breach(execution: &Execution) -> BreachReason {
    if execution.had_step_failure {
        BreachReason::AutomationFailure
    } else if execution.waiting_approval_fraction() > 0.5 {
        BreachReason::ManualInterventionDelay
    } else if execution.had_step_timeout {
        BreachReason::ExternalDependencyDelay
    } else {
        BreachReason::ResourceExhaustion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sla::SlaStatus;

    fn thresholds() -> SlaThresholds {
        SlaThresholds {
            acknowledge_ms: 1000,
            containment_ms: 2000,
            resolution_ms: 3000,
        }
    }

    fn execution() -> Execution {
        use crate::domain::ids::{PlaybookId, WebhookId};
        use crate::domain::trigger::{MatchMode, Trigger, TriggerSnapshot};
        use serde_json::json;

        let playbook_id = PlaybookId::generate();
        let webhook_id = WebhookId::generate();
        let trigger = Trigger::new(webhook_id.clone(), playbook_id.clone(), Vec::new(), MatchMode::All);
        let snapshot = TriggerSnapshot::from(&trigger);
        let now = Utc::now();
        Execution::new(
            playbook_id,
            "test".into(),
            json!({}),
            snapshot,
            now,
            "arrival_time".into(),
            webhook_id,
            "fp".into(),
            SlaStatus::new(now, &thresholds()),
        )
    }

    #[test]
    fn acknowledge_breach_is_flagged_past_threshold() {
        let mut exec = execution();
        let late = exec.sla_status.webhook_received_at + chrono::Duration::milliseconds(5000);
        record_acknowledgement(&mut exec, late);
        assert!(exec.sla_status.acknowledge.breached);
    }

    #[test]
    fn acknowledge_within_threshold_is_not_breached() {
        let mut exec = execution();
        let prompt = exec.sla_status.webhook_received_at + chrono::Duration::milliseconds(10);
        record_acknowledgement(&mut exec, prompt);
        assert!(!exec.sla_status.acknowledge.breached);
    }

    #[test]
    fn containment_is_only_recorded_once() {
        let mut exec = execution();
        let t1 = exec.sla_status.webhook_received_at + chrono::Duration::milliseconds(100);
        let t2 = exec.sla_status.webhook_received_at + chrono::Duration::milliseconds(9000);
        record_containment(&mut exec, t1);
        record_containment(&mut exec, t2);
        assert_eq!(exec.sla_status.containment.at, Some(t1));
    }

    #[test]
    fn breach_reason_prefers_automation_failure_when_a_step_failed() {
        let mut exec = execution();
        exec.had_step_failure = true;
        let late = exec.sla_status.webhook_received_at + chrono::Duration::milliseconds(5000);
        record_resolution(&mut exec, late);
        assert_eq!(
            exec.sla_status.resolution.breach_reason,
            Some(BreachReason::AutomationFailure)
        );
    }
}
