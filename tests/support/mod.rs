//! Shared scaffolding for the execution-engine integration tests: a
//! minimal in-memory `Engine` plus helpers to build playbooks and poll an
//! execution through to a terminal state.

use cybersentinel_soar::config::SlaDefaults;
use cybersentinel_soar::connectors::registry::ConnectorRegistry;
use cybersentinel_soar::connectors::stubs::{EnrichmentStub, FirewallStub};
use cybersentinel_soar::domain::execution::{Execution, ExecutionState};
use cybersentinel_soar::domain::ids::{ExecutionId, PlaybookId, WebhookId};
use cybersentinel_soar::domain::playbook::Playbook;
use cybersentinel_soar::domain::sla::{SlaStatus, SlaThresholds};
use cybersentinel_soar::domain::trigger::{MatchMode, Trigger, TriggerSnapshot};
use cybersentinel_soar::engine::Engine;
use cybersentinel_soar::persistence::memory::InMemoryStore;
use cybersentinel_soar::persistence::{ExecutionStore, PlaybookStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub fn engine() -> Engine {
    let store = Arc::new(InMemoryStore::new());
    let mut registry = ConnectorRegistry::new();
    registry.register("abuseipdb", Arc::new(EnrichmentStub::default()));
    registry.register("firewall", Arc::new(FirewallStub::default()));
    Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(registry),
        SlaDefaults {
            acknowledge_ms: 60_000,
            containment_ms: 120_000,
            resolution_ms: 300_000,
        },
        16,
    )
}

pub async fn save_playbook(engine: &Engine, playbook: Playbook) -> PlaybookId {
    let id = playbook.playbook_id.clone();
    engine.playbooks.save(&playbook).await.unwrap();
    id
}

pub fn minimal_playbook(playbook_id: PlaybookId, steps: Vec<cybersentinel_soar::domain::playbook::Step>) -> Playbook {
    Playbook {
        playbook_id,
        name: "test playbook".into(),
        version: "1.0.0".into(),
        enabled: true,
        shadow_mode: false,
        steps,
    }
}

pub fn new_execution(playbook_id: PlaybookId, trigger_data: Value) -> Execution {
    let webhook_id = WebhookId::generate();
    let trigger = Trigger::new(webhook_id.clone(), playbook_id.clone(), Vec::new(), MatchMode::All);
    let snapshot = TriggerSnapshot::from(&trigger);
    let now = chrono::Utc::now();
    let thresholds = SlaThresholds {
        acknowledge_ms: 60_000,
        containment_ms: 120_000,
        resolution_ms: 300_000,
    };
    Execution::new(
        playbook_id,
        "test playbook".into(),
        trigger_data,
        snapshot,
        now,
        "arrival_time".into(),
        webhook_id,
        format!("fp-{}", fastrand::u64(..)),
        SlaStatus::new(now, &thresholds),
    )
}

/// Polls the store until `execution_id` reaches a terminal state or
/// `WAITING_APPROVAL`, or the timeout elapses.
pub async fn wait_for_state(engine: &Engine, execution_id: &ExecutionId, timeout: Duration) -> Execution {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let execution = engine.executions.get(execution_id).await.unwrap().unwrap();
        if execution.state.is_terminal() || execution.state == ExecutionState::WaitingApproval {
            return execution;
        }
        if tokio::time::Instant::now() >= deadline {
            return execution;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
