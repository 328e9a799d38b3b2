//! Seed scenarios: a high abuse score reaches the firewall block action; a
//! low score takes the condition's `on_false` branch straight to `__END__`
//! without ever dispatching the action step.

mod support;

use cybersentinel_soar::domain::execution::{ExecutionState, StepState};
use cybersentinel_soar::domain::ids::PlaybookId;
use cybersentinel_soar::domain::playbook::{OnFailure, OnSuccess, Step, StepKind};
use cybersentinel_soar::domain::trigger::Operator;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

fn steps() -> Vec<Step> {
    let mut enrich_input = HashMap::new();
    enrich_input.insert("ip".to_string(), "trigger_data.srcip".to_string());

    let mut block_input = HashMap::new();
    block_input.insert("ip".to_string(), "trigger_data.srcip".to_string());

    vec![
        Step {
            step_id: "enrich".into(),
            name: "Look up reputation".into(),
            timeout_seconds: 5,
            on_success: OnSuccess::Continue,
            on_failure: OnFailure::Stop,
            retry_policy: None,
            input: enrich_input,
            kind: StepKind::Enrichment {
                connector_id: "abuseipdb".into(),
                action_type: "lookup".into(),
                output_projection: None,
            },
        },
        Step {
            step_id: "check_score".into(),
            name: "Is this IP malicious?".into(),
            timeout_seconds: 5,
            on_success: OnSuccess::Continue,
            on_failure: OnFailure::Stop,
            retry_policy: None,
            input: HashMap::new(),
            kind: StepKind::Condition {
                field: "steps.enrich.output.abuse_score".into(),
                operator: Operator::Ge,
                value: json!(80),
                on_true: "block".into(),
                on_false: "__END__".into(),
            },
        },
        Step {
            step_id: "block".into(),
            name: "Block at the firewall".into(),
            timeout_seconds: 5,
            on_success: OnSuccess::End,
            on_failure: OnFailure::Stop,
            retry_policy: None,
            input: block_input,
            kind: StepKind::Action {
                connector_id: "firewall".into(),
                action_type: "block".into(),
                output_projection: None,
            },
        },
    ]
}

#[tokio::test]
async fn high_abuse_score_reaches_the_block_action() {
    let engine = support::engine();
    let playbook_id = support::save_playbook(&engine, support::minimal_playbook(PlaybookId::generate(), steps())).await;
    let execution = support::new_execution(playbook_id, json!({"srcip": "185.220.101.34"}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;

    assert_eq!(result.state, ExecutionState::Completed);
    let block = result.steps.get("block").expect("block step should have dispatched");
    assert_eq!(block.state, StepState::Completed);
    assert_eq!(block.output.as_ref().unwrap()["status"], json!("blocked"));
}

#[tokio::test]
async fn low_abuse_score_skips_the_block_action() {
    let engine = support::engine();
    let playbook_id = support::save_playbook(&engine, support::minimal_playbook(PlaybookId::generate(), steps())).await;
    let execution = support::new_execution(playbook_id, json!({"srcip": "1.2.3.4"}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;

    assert_eq!(result.state, ExecutionState::Completed);
    assert!(!result.steps.contains_key("block"), "block step must never dispatch on a low score");
    let condition = result.steps.get("check_score").unwrap();
    assert_eq!(condition.output.as_ref().unwrap()["branch_taken"], json!("on_false"));
}
