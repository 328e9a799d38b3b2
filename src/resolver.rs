//! Variable resolver (§4.F): resolves declarative input mappings and
//! performs template substitution. No expression language — pure lookups
//! and string replacement over a whitelisted path grammar (§9).

use crate::domain::playbook::Playbook;
use serde_json::Value;
use std::collections::HashMap;

/// Everything the resolver needs to answer a lookup: the immutable trigger
/// payload, completed step outputs, and the static playbook metadata.
pub struct ResolutionContext<'a> {
    pub trigger_data: &'a Value,
    pub step_outputs: &'a HashMap<String, Value>,
    pub playbook: &'a Playbook,
}

/// Resolve a single declarative input value (`trigger_data.*`,
/// `steps.<id>.output.*`, `playbook.*`, `literal:*`). Returns `None` for an
/// undefined path.
pub fn resolve(ctx: &ResolutionContext, expr: &str) -> Option<Value> {
    if let Some(raw) = expr.strip_prefix("literal:") {
        return Some(Value::String(raw.to_string()));
    }
    if let Some(path) = expr.strip_prefix("trigger_data.") {
        return crate::value_path::get_path(ctx.trigger_data, path).cloned();
    }
    if let Some(rest) = expr.strip_prefix("steps.") {
        let (step_id, path) = rest.split_once(".output.")?;
        let output = ctx.step_outputs.get(step_id)?;
        return crate::value_path::get_path(output, path).cloned();
    }
    if let Some(field) = expr.strip_prefix("playbook.") {
        return playbook_field(ctx.playbook, field);
    }
    None
}

fn playbook_field(playbook: &Playbook, field: &str) -> Option<Value> {
    match field {
        "playbook_id" => Some(Value::String(playbook.playbook_id.to_string())),
        "name" => Some(Value::String(playbook.name.clone())),
        "version" => Some(Value::String(playbook.version.clone())),
        "shadow_mode" => Some(Value::Bool(playbook.shadow_mode)),
        _ => None,
    }
}

/// Resolve an entire step `input` map. Returns the resolved values plus the
/// list of keys that resolved to undefined (callers decide which of those
/// are actually required).
pub fn resolve_inputs(
    ctx: &ResolutionContext,
    input: &HashMap<String, String>,
) -> (HashMap<String, Value>, Vec<String>) {
    let mut resolved = HashMap::with_capacity(input.len());
    let mut missing = Vec::new();
    for (key, expr) in input {
        match resolve(ctx, expr) {
            Some(value) => {
                resolved.insert(key.clone(), value);
            }
            None => missing.push(key.clone()),
        }
    }
    (resolved, missing)
}

/// Replace every `{{<source>.<path>}}` placeholder in `template` with its
/// stringified resolved value; missing paths resolve to the empty string.
pub fn render_template(ctx: &ResolutionContext, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let Some(start) = rest.find("{{") else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str("{{");
            out.push_str(after_open);
            break;
        };
        let expr = after_open[..end].trim();
        let value = resolve(ctx, expr)
            .map(|v| crate::value_path::stringify(&v))
            .unwrap_or_default();
        out.push_str(&value);
        rest = &after_open[end + 2..];
    }
    out
}
