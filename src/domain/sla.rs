//! SLA policy and per-execution status (§3, §4.I).

use crate::domain::ids::{PlaybookId, SlaId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaScope {
    Playbook,
    Severity,
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaThresholds {
    pub acknowledge_ms: i64,
    pub containment_ms: i64,
    pub resolution_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub sla_id: SlaId,
    pub scope: SlaScope,
    pub playbook_id: Option<PlaybookId>,
    pub severity: Option<String>,
    pub thresholds: SlaThresholds,
    pub enabled: bool,
    pub priority: i32,
}

impl SlaPolicy {
    /// The (scope, key) pair used by the partial unique index (§4.J).
    pub fn scope_key(&self) -> (SlaScope, String) {
        let key = match self.scope {
            SlaScope::Playbook => self
                .playbook_id
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            SlaScope::Severity => self.severity.clone().unwrap_or_default(),
            SlaScope::Global => String::new(),
        };
        (self.scope, key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachReason {
    AutomationFailure,
    ManualInterventionDelay,
    ExternalDependencyDelay,
    ResourceExhaustion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionStatus {
    pub at: Option<chrono::DateTime<chrono::Utc>>,
    pub threshold_ms: i64,
    pub breached: bool,
    pub breach_reason: Option<BreachReason>,
}

/// Embedded per-execution SLA tracking, copied from the resolved policy at
/// creation time (§4.I).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaStatus {
    pub webhook_received_at: chrono::DateTime<chrono::Utc>,
    pub acknowledge: DimensionStatus,
    pub containment: DimensionStatus,
    pub resolution: DimensionStatus,
}

impl SlaStatus {
    pub fn new(webhook_received_at: chrono::DateTime<chrono::Utc>, thresholds: &SlaThresholds) -> Self {
        Self {
            webhook_received_at,
            acknowledge: DimensionStatus {
                threshold_ms: thresholds.acknowledge_ms,
                ..Default::default()
            },
            containment: DimensionStatus {
                threshold_ms: thresholds.containment_ms,
                ..Default::default()
            },
            resolution: DimensionStatus {
                threshold_ms: thresholds.resolution_ms,
                ..Default::default()
            },
        }
    }
}
