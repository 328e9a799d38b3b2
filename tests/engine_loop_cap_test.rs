//! Seed scenario: a step graph with a cycle (`on_success: goto` pointing
//! back at itself) terminates instead of running forever, once dispatches
//! exceed `MAX_STEP_EXECUTIONS`.

mod support;

use cybersentinel_soar::domain::execution::ExecutionState;
use cybersentinel_soar::domain::ids::PlaybookId;
use cybersentinel_soar::domain::playbook::{OnFailure, OnSuccess, Step, StepKind};
use cybersentinel_soar::engine::MAX_STEP_EXECUTIONS;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn a_self_looping_step_graph_terminates_at_the_dispatch_cap() {
    let engine = support::engine();

    let step = Step {
        step_id: "loop".into(),
        name: "Loop forever".into(),
        timeout_seconds: 5,
        on_success: OnSuccess::Goto { step_id: "loop".into() },
        on_failure: OnFailure::Stop,
        retry_policy: None,
        input: HashMap::new(),
        kind: StepKind::Enrichment {
            connector_id: "abuseipdb".into(),
            action_type: "lookup".into(),
            output_projection: None,
        },
    };
    let playbook_id = support::save_playbook(&engine, support::minimal_playbook(PlaybookId::generate(), vec![step])).await;

    let execution = support::new_execution(playbook_id, json!({}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(10)).await;

    assert_eq!(result.state, ExecutionState::Failed);
    let failure = result.failure.expect("expected a recorded failure detail");
    assert_eq!(failure.code, "LOOP_DETECTED");
    assert!(result.step_dispatch_count > MAX_STEP_EXECUTIONS);
}
