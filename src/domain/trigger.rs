//! Trigger data model (§3): predicates bound 1:1 to a webhook and a playbook.

use crate::domain::ids::{PlaybookId, TriggerId, WebhookId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operators available on a trigger predicate (§3, §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    RegexMatch,
    In,
    NotIn,
    Exists,
    NotExists,
}

/// A single `{field, operator, value}` predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// Combinator used across all predicates in a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    All,
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub trigger_id: TriggerId,
    pub webhook_id: WebhookId,
    pub playbook_id: PlaybookId,
    pub predicates: Vec<Predicate>,
    pub match_mode: MatchMode,
    /// Monotonically increasing; edits create a new version, old ones retained for audit.
    pub version: u32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    pub fn new(
        webhook_id: WebhookId,
        playbook_id: PlaybookId,
        predicates: Vec<Predicate>,
        match_mode: MatchMode,
    ) -> Self {
        Self {
            trigger_id: TriggerId::generate(),
            webhook_id,
            playbook_id,
            predicates,
            match_mode,
            version: 1,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Produce a new version, bumping `version` and preserving identity.
    pub fn new_version(&self, predicates: Vec<Predicate>, match_mode: MatchMode) -> Self {
        Self {
            trigger_id: self.trigger_id.clone(),
            webhook_id: self.webhook_id.clone(),
            playbook_id: self.playbook_id.clone(),
            predicates,
            match_mode,
            version: self.version + 1,
            enabled: self.enabled,
            created_at: Utc::now(),
        }
    }
}

/// A value-object copy of the trigger that accepted a given execution,
/// embedded so audits remain valid even if the live trigger is later edited
/// or deleted (§9 design note: embedded snapshot instead of FK chase).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSnapshot {
    pub trigger_id: TriggerId,
    pub version: u32,
    pub predicates: Vec<Predicate>,
    pub match_mode: MatchMode,
}

impl From<&Trigger> for TriggerSnapshot {
    fn from(t: &Trigger) -> Self {
        Self {
            trigger_id: t.trigger_id.clone(),
            version: t.version,
            predicates: t.predicates.clone(),
            match_mode: t.match_mode,
        }
    }
}
