//! Trigger evaluator (§4.C): applies a conjunctive/disjunctive predicate set
//! to an alert payload to decide accept/drop.

use crate::domain::trigger::{MatchMode, Operator, Predicate, Trigger};
use crate::value_path::get_path;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

pub struct TriggerEvalResult {
    pub matched: bool,
    pub drop_reason: Option<&'static str>,
}

/// Evaluate every predicate in `trigger` against `payload`, combining per the
/// trigger's `match_mode`.
pub fn evaluate(trigger: &Trigger, payload: &Value) -> TriggerEvalResult {
    let outcomes: Vec<bool> = trigger
        .predicates
        .iter()
        .map(|p| evaluate_predicate(p, payload))
        .collect();

    let matched = if outcomes.is_empty() {
        true
    } else {
        match trigger.match_mode {
            MatchMode::All => outcomes.iter().all(|&b| b),
            MatchMode::Any => outcomes.iter().any(|&b| b),
        }
    };

    trace!(trigger_id = %trigger.trigger_id, matched, "trigger evaluated");

    TriggerEvalResult {
        matched,
        drop_reason: if matched {
            None
        } else {
            Some("matching_rules_not_satisfied")
        },
    }
}

fn evaluate_predicate(predicate: &Predicate, payload: &Value) -> bool {
    let resolved = get_path(payload, &predicate.field);
    evaluate_field(predicate.operator, resolved, &predicate.value)
}

/// Shared operator semantics, reused by the condition step dispatcher for
/// the same `{field, operator, value}` shape (§4.G).
pub fn evaluate_field(operator: Operator, resolved: Option<&Value>, expected: &Value) -> bool {
    match operator {
        Operator::Exists => resolved.is_some(),
        Operator::NotExists => resolved.is_none(),
        _ => {
            let Some(actual) = resolved else {
                return false;
            };
            apply_operator(operator, actual, expected)
        }
    }
}

fn apply_operator(operator: Operator, actual: &Value, expected: &Value) -> bool {
    match operator {
        Operator::Equals => values_equal(actual, expected),
        Operator::NotEquals => !values_equal(actual, expected),
        Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            compare_numeric(operator, actual, expected)
        }
        Operator::Contains => string_contains(actual, expected, true),
        Operator::NotContains => !string_contains(actual, expected, true),
        Operator::StartsWith => str_relation(actual, expected, |a, b| a.starts_with(b)),
        Operator::EndsWith => str_relation(actual, expected, |a, b| a.ends_with(b)),
        Operator::RegexMatch => regex_match(actual, expected),
        Operator::In => membership(actual, expected, true),
        Operator::NotIn => membership(actual, expected, false),
        Operator::Exists | Operator::NotExists => unreachable!("handled by caller"),
    }
}

/// Comparison on heterogeneous types yields false except for equals/not_equals.
fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

fn compare_numeric(operator: Operator, actual: &Value, expected: &Value) -> bool {
    let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) else {
        return false;
    };
    match operator {
        Operator::Lt => a < b,
        Operator::Le => a <= b,
        Operator::Gt => a > b,
        Operator::Ge => a >= b,
        _ => unreachable!(),
    }
}

fn str_relation(actual: &Value, expected: &Value, f: impl Fn(&str, &str) -> bool) -> bool {
    let (Some(a), Some(b)) = (actual.as_str(), expected.as_str()) else {
        return false;
    };
    f(a, b)
}

fn string_contains(actual: &Value, expected: &Value, _anchor_free: bool) -> bool {
    if let (Some(a), Some(b)) = (actual.as_str(), expected.as_str()) {
        return a.contains(b);
    }
    if let Value::Array(items) = actual {
        return items.contains(expected);
    }
    false
}

/// Perl-compatible subset; anchoring is entirely up to the pattern itself.
fn regex_match(actual: &Value, expected: &Value) -> bool {
    let (Some(a), Some(pattern)) = (actual.as_str(), expected.as_str()) else {
        return false;
    };
    Regex::new(pattern).map(|re| re.is_match(a)).unwrap_or(false)
}

/// `in`/`not_in` expect the comparison side to be an array.
fn membership(actual: &Value, expected: &Value, want_present: bool) -> bool {
    let Value::Array(items) = expected else {
        return false;
    };
    let present = items.contains(actual);
    present == want_present
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{PlaybookId, WebhookId};
    use serde_json::json;

    fn trigger(predicates: Vec<Predicate>, match_mode: MatchMode) -> Trigger {
        Trigger::new(WebhookId::generate(), PlaybookId::generate(), predicates, match_mode)
    }

    #[test]
    fn gt_operator_matches_high_severity_score() {
        let t = trigger(
            vec![Predicate {
                field: "abuse_score".into(),
                operator: Operator::Gt,
                value: json!(80),
            }],
            MatchMode::All,
        );
        let result = evaluate(&t, &json!({"abuse_score": 95}));
        assert!(result.matched);
    }

    #[test]
    fn any_mode_passes_when_one_predicate_matches() {
        let t = trigger(
            vec![
                Predicate { field: "severity".into(), operator: Operator::Equals, value: json!("low") },
                Predicate { field: "severity".into(), operator: Operator::Equals, value: json!("high") },
            ],
            MatchMode::Any,
        );
        let result = evaluate(&t, &json!({"severity": "high"}));
        assert!(result.matched);
    }

    #[test]
    fn missing_field_fails_non_exists_predicate() {
        let t = trigger(
            vec![Predicate { field: "data.srcip".into(), operator: Operator::Equals, value: json!("1.2.3.4") }],
            MatchMode::All,
        );
        let result = evaluate(&t, &json!({}));
        assert!(!result.matched);
        assert_eq!(result.drop_reason, Some("matching_rules_not_satisfied"));
    }

    #[test]
    fn exists_is_true_only_when_resolved() {
        let t = trigger(
            vec![Predicate { field: "data.srcip".into(), operator: Operator::Exists, value: Value::Null }],
            MatchMode::All,
        );
        assert!(evaluate(&t, &json!({"data": {"srcip": "x"}})).matched);
        assert!(!evaluate(&t, &json!({"data": {}})).matched);
    }

    #[test]
    fn heterogeneous_comparison_is_false_except_equality() {
        let t = trigger(
            vec![Predicate { field: "x".into(), operator: Operator::Gt, value: json!("not-a-number") }],
            MatchMode::All,
        );
        assert!(!evaluate(&t, &json!({"x": 5})).matched);
    }
}
