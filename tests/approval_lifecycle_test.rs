//! Seed scenarios: an operator decision resumes a suspended execution, and
//! an approval left pending past its deadline is timed out by the sweeper
//! and fails the execution via `on_timeout`.

mod support;

use cybersentinel_soar::domain::execution::{ExecutionState, StepState};
use cybersentinel_soar::domain::ids::PlaybookId;
use cybersentinel_soar::domain::playbook::{
    ApprovalTimeoutAction, OnFailure, OnSuccess, RejectedAction, Step, StepKind,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

fn approval_step(timeout_hours: f64) -> Step {
    Step {
        step_id: "approve".into(),
        name: "Approve the block".into(),
        timeout_seconds: 5,
        on_success: OnSuccess::Continue,
        on_failure: OnFailure::Stop,
        retry_policy: None,
        input: HashMap::new(),
        kind: StepKind::Approval {
            approvers: vec!["soc-lead".into()],
            message: "approve blocking {{trigger_data.srcip}}?".into(),
            timeout_hours,
            on_approved: "__END__".into(),
            on_rejected: RejectedAction::Fail,
            on_timeout: ApprovalTimeoutAction::Fail,
        },
    }
}

#[tokio::test]
async fn an_approved_decision_resumes_and_completes_the_execution() {
    let engine = support::engine();
    let playbook_id = support::save_playbook(
        &engine,
        support::minimal_playbook(PlaybookId::generate(), vec![approval_step(24.0)]),
    )
    .await;

    let execution = support::new_execution(playbook_id, json!({"srcip": "1.2.3.4"}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();

    let suspended = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    assert_eq!(suspended.state, ExecutionState::WaitingApproval);
    let approval_id = suspended.approval_id.expect("execution should carry the pending approval id");

    engine
        .decide_approval(&approval_id, cybersentinel_soar::domain::approval::ApprovalDecision::Approved, "soc-lead".into())
        .await
        .unwrap();

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    assert_eq!(result.state, ExecutionState::Completed);
    assert_eq!(result.steps.get("approve").unwrap().state, StepState::Completed);
}

#[tokio::test]
async fn a_rejected_decision_fails_the_execution_and_the_approval_step() {
    let engine = support::engine();
    let playbook_id = support::save_playbook(
        &engine,
        support::minimal_playbook(PlaybookId::generate(), vec![approval_step(24.0)]),
    )
    .await;

    let execution = support::new_execution(playbook_id, json!({}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();
    let suspended = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    let approval_id = suspended.approval_id.expect("execution should carry the pending approval id");

    engine
        .decide_approval(&approval_id, cybersentinel_soar::domain::approval::ApprovalDecision::Rejected, "soc-lead".into())
        .await
        .unwrap();

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    assert_eq!(result.state, ExecutionState::Failed);
    assert_eq!(result.failure.as_ref().unwrap().code, "APPROVAL_REJECTED");
    assert_eq!(result.steps.get("approve").unwrap().state, StepState::Failed);
}

#[tokio::test]
async fn a_decision_on_an_already_decided_approval_is_rejected() {
    let engine = support::engine();
    let playbook_id = support::save_playbook(
        &engine,
        support::minimal_playbook(PlaybookId::generate(), vec![approval_step(24.0)]),
    )
    .await;

    let execution = support::new_execution(playbook_id, json!({}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();
    let suspended = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    let approval_id = suspended.approval_id.unwrap();

    engine
        .decide_approval(&approval_id, cybersentinel_soar::domain::approval::ApprovalDecision::Approved, "soc-lead".into())
        .await
        .unwrap();

    let second = engine
        .decide_approval(&approval_id, cybersentinel_soar::domain::approval::ApprovalDecision::Rejected, "soc-lead-2".into())
        .await;
    assert!(matches!(
        second,
        Err(cybersentinel_soar::SoarError::Engine(cybersentinel_soar::error::EngineError::AlreadyDecided))
    ));
}

#[tokio::test]
async fn a_sweep_past_the_deadline_times_out_and_fails_the_execution() {
    let engine = support::engine();
    // ~50ms timeout: small enough to expire almost immediately, long enough
    // that the execution is reliably still WAITING_APPROVAL when we check.
    let timeout_hours = 50.0 / 3_600_000.0;
    let playbook_id = support::save_playbook(
        &engine,
        support::minimal_playbook(PlaybookId::generate(), vec![approval_step(timeout_hours)]),
    )
    .await;

    let execution = support::new_execution(playbook_id, json!({}));
    let execution_id = engine.admit_execution(execution, None).await.unwrap();
    let suspended = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    assert_eq!(suspended.state, ExecutionState::WaitingApproval);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let timed_out = engine.sweep_expired_approvals(chrono::Utc::now()).await.unwrap();
    assert_eq!(timed_out, 1);

    let result = support::wait_for_state(&engine, &execution_id, Duration::from_secs(2)).await;
    assert_eq!(result.state, ExecutionState::Failed);
    assert_eq!(result.failure.unwrap().code, "APPROVAL_TIMEOUT");
    assert_eq!(result.steps.get("approve").unwrap().state, StepState::Failed);
}
