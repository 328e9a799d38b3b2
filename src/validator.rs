//! Playbook validator (§4.E): a fail-closed static pass. Every issue found
//! is fatal; validator errors never reach the execution engine at run time.

use crate::domain::playbook::{ApprovalTimeoutAction, OnSuccess, Playbook, RejectedAction, StepKind, END};
use crate::error::ValidationError;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

static STEP_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn step_id_regex() -> &'static Regex {
    STEP_ID_REGEX.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid regex"))
}

pub fn validate(playbook: &Playbook) -> Result<(), ValidationError> {
    if playbook.playbook_id.as_str().is_empty() {
        return Err(ValidationError::MissingPlaybookId);
    }

    let mut seen_ids = HashSet::new();
    for step in &playbook.steps {
        if !step_id_regex().is_match(&step.step_id) {
            return Err(ValidationError::InvalidStepType(step.step_id.clone()));
        }
        if !seen_ids.insert(step.step_id.clone()) {
            return Err(ValidationError::DuplicateStepId(step.step_id.clone()));
        }
    }

    let known: HashSet<&str> = playbook.steps.iter().map(|s| s.step_id.as_str()).collect();

    for step in &playbook.steps {
        validate_step_fields(step, &known)?;
    }

    check_reachability(playbook, &known)?;
    check_termination(playbook, &known)?;

    Ok(())
}

fn resolves(target: &str, known: &HashSet<&str>) -> bool {
    target == END || known.contains(target)
}

fn validate_step_fields(
    step: &crate::domain::playbook::Step,
    known: &HashSet<&str>,
) -> Result<(), ValidationError> {
    match &step.kind {
        StepKind::Condition { on_true, on_false, .. } => {
            if on_true.is_empty() || on_false.is_empty() {
                return Err(ValidationError::ConditionMissingBranch(step.step_id.clone()));
            }
            if !resolves(on_true, known) {
                return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), on_true.clone()));
            }
            if !resolves(on_false, known) {
                return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), on_false.clone()));
            }
        }
        StepKind::Approval {
            approvers,
            timeout_hours,
            on_approved,
            on_rejected,
            on_timeout,
            ..
        } => {
            if approvers.is_empty() {
                return Err(ValidationError::MissingField(
                    step.step_id.clone(),
                    "approvers must be non-empty".into(),
                ));
            }
            if !timeout_hours.is_finite() || *timeout_hours <= 0.0 {
                return Err(ValidationError::MissingField(
                    step.step_id.clone(),
                    "timeout_hours must be present and positive".into(),
                ));
            }
            if !resolves(on_approved, known) {
                return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), on_approved.clone()));
            }
            if let RejectedAction::Goto(target) = on_rejected {
                if !resolves(target, known) {
                    return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), target.clone()));
                }
            }
            match on_timeout {
                ApprovalTimeoutAction::Goto(target) if !resolves(target, known) => {
                    return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), target.clone()));
                }
                _ => {}
            }
        }
        StepKind::Enrichment { connector_id, action_type, .. }
        | StepKind::Action { connector_id, action_type, .. }
        | StepKind::Notification { connector_id, action_type, .. } => {
            if connector_id.is_empty() || action_type.is_empty() {
                return Err(ValidationError::MissingField(
                    step.step_id.clone(),
                    "connector_id and action_type are required".into(),
                ));
            }
        }
    }

    if let OnSuccess::Goto { step_id } = &step.on_success {
        if !resolves(step_id, known) {
            return Err(ValidationError::InvalidGotoTarget(step.step_id.clone(), step_id.clone()));
        }
    }

    Ok(())
}

/// All declared outgoing edges from a step, per §4.E's termination/reachability pass.
fn outgoing_edges(step: &crate::domain::playbook::Step, playbook: &Playbook) -> Vec<String> {
    let mut edges = Vec::new();
    match &step.kind {
        StepKind::Condition { on_true, on_false, .. } => {
            edges.push(on_true.clone());
            edges.push(on_false.clone());
        }
        StepKind::Approval { on_approved, on_rejected, on_timeout, .. } => {
            edges.push(on_approved.clone());
            match on_rejected {
                RejectedAction::Goto(t) => edges.push(t.clone()),
                RejectedAction::Fail | RejectedAction::Stop => {}
            }
            match on_timeout {
                ApprovalTimeoutAction::Goto(t) => edges.push(t.clone()),
                ApprovalTimeoutAction::End => edges.push(END.to_string()),
                _ => {}
            }
        }
        StepKind::Enrichment { .. } | StepKind::Action { .. } | StepKind::Notification { .. } => {
            match &step.on_success {
                OnSuccess::Goto { step_id } => edges.push(step_id.clone()),
                OnSuccess::End => edges.push(END.to_string()),
                OnSuccess::Continue => {
                    if let Some(next) = playbook.next_declared(&step.step_id) {
                        edges.push(next.to_string());
                    } else {
                        edges.push(END.to_string());
                    }
                }
            }
        }
    }
    edges
}

fn check_reachability(playbook: &Playbook, known: &HashSet<&str>) -> Result<(), ValidationError> {
    let Some(entry) = playbook.entry_step_id() else {
        return Ok(());
    };

    let adjacency: HashMap<&str, Vec<String>> = playbook
        .steps
        .iter()
        .map(|s| (s.step_id.as_str(), outgoing_edges(s, playbook)))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![entry];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if let Some(edges) = adjacency.get(current) {
            for edge in edges {
                if edge != END && known.contains(edge.as_str()) {
                    stack.push(edge.as_str());
                }
            }
        }
    }

    for step in &playbook.steps {
        if !visited.contains(step.step_id.as_str()) {
            return Err(ValidationError::UnreachableStep(step.step_id.clone()));
        }
    }

    Ok(())
}

/// DFS cycle detection over the declared edge set, treating `__END__` as a sink.
fn check_termination(playbook: &Playbook, known: &HashSet<&str>) -> Result<(), ValidationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let adjacency: HashMap<&str, Vec<String>> = playbook
        .steps
        .iter()
        .map(|s| (s.step_id.as_str(), outgoing_edges(s, playbook)))
        .collect();

    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        adjacency: &'a HashMap<&'a str, Vec<String>>,
        known: &HashSet<&'a str>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), ValidationError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(ValidationError::Cycle(node.to_string())),
            None => {}
        }
        marks.insert(node, Mark::InProgress);
        if let Some(edges) = adjacency.get(node) {
            for edge in edges {
                if edge == END || !known.contains(edge.as_str()) {
                    continue;
                }
                visit(edge.as_str(), adjacency, known, marks)?;
            }
        }
        marks.insert(node, Mark::Done);
        Ok(())
    }

    for step in &playbook.steps {
        visit(&step.step_id, &adjacency, known, &mut marks)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::PlaybookId;
    use crate::domain::playbook::{OnFailure, Step};
    use std::collections::HashMap as Map;

    fn action_step(id: &str, on_success: OnSuccess) -> Step {
        Step {
            step_id: id.into(),
            name: id.into(),
            timeout_seconds: 30,
            on_success,
            on_failure: OnFailure::Stop,
            retry_policy: None,
            input: Map::new(),
            kind: StepKind::Action {
                connector_id: "firewall".into(),
                action_type: "block".into(),
                output_projection: None,
            },
        }
    }

    fn playbook(steps: Vec<Step>) -> Playbook {
        Playbook {
            playbook_id: PlaybookId::generate(),
            name: "test".into(),
            version: "1.0.0".into(),
            enabled: true,
            shadow_mode: false,
            steps,
        }
    }

    #[test]
    fn accepts_a_linear_playbook() {
        let pb = playbook(vec![
            action_step("a", OnSuccess::Continue),
            action_step("b", OnSuccess::End),
        ]);
        assert!(validate(&pb).is_ok());
    }

    #[test]
    fn rejects_duplicate_step_ids() {
        let pb = playbook(vec![
            action_step("a", OnSuccess::End),
            action_step("a", OnSuccess::End),
        ]);
        assert_eq!(validate(&pb), Err(ValidationError::DuplicateStepId("a".into())));
    }

    #[test]
    fn rejects_invalid_goto_target() {
        let pb = playbook(vec![action_step("a", OnSuccess::Goto { step_id: "nope".into() })]);
        assert!(matches!(validate(&pb), Err(ValidationError::InvalidGotoTarget(_, _))));
    }

    #[test]
    fn rejects_a_cycle() {
        let pb = playbook(vec![
            action_step("a", OnSuccess::Goto { step_id: "b".into() }),
            action_step("b", OnSuccess::Goto { step_id: "a".into() }),
        ]);
        assert!(matches!(validate(&pb), Err(ValidationError::Cycle(_))));
    }

    #[test]
    fn rejects_unreachable_step() {
        let pb = playbook(vec![
            action_step("a", OnSuccess::End),
            action_step("orphan", OnSuccess::End),
        ]);
        assert!(matches!(validate(&pb), Err(ValidationError::UnreachableStep(_))));
    }
}
