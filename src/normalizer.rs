//! Event normalizer (§4.D): canonical `event_time` extraction and
//! deterministic fingerprinting for dedup.

use crate::domain::ids::WebhookId;
use crate::value_path::get_path;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

pub struct NormalizedEvent {
    pub event_time: DateTime<Utc>,
    pub event_time_source: &'static str,
}

const EVENT_TIME_FIELDS: [&str; 3] = ["event_time", "timestamp", "@timestamp"];

/// Extract `event_time` from the first present and parseable candidate field,
/// falling back to arrival time.
pub fn normalize_event_time(payload: &Value, arrival_time: DateTime<Utc>) -> NormalizedEvent {
    for field in EVENT_TIME_FIELDS {
        if let Some(value) = get_path(payload, field) {
            if let Some(parsed) = parse_timestamp_value(value) {
                return NormalizedEvent {
                    event_time: parsed,
                    event_time_source: field,
                };
            }
        }
    }
    NormalizedEvent {
        event_time: arrival_time,
        event_time_source: "arrival_time",
    }
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            epoch_to_datetime(raw)
        }
        _ => None,
    }
}

/// Parses epoch seconds, epoch milliseconds, or ISO 8601.
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(raw) = s.parse::<f64>() {
        return epoch_to_datetime(raw);
    }
    None
}

fn epoch_to_datetime(raw: f64) -> Option<DateTime<Utc>> {
    // Heuristic matching the spec's "epoch seconds or epoch milliseconds":
    // magnitudes above 10^12 are treated as milliseconds.
    let millis = if raw.abs() >= 1e12 { raw } else { raw * 1000.0 };
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// The fields that make up the "stable identifying subset" used for
/// fingerprinting (§4.D, resolved Open Question): rule id/name, source and
/// destination ip, and agent id. Missing fields serialize as `"∅"` so that
/// presence/absence is itself part of the fingerprint.
const FINGERPRINT_SENTINEL: &str = "\u{2205}";

fn field_or_sentinel<'a>(payload: &'a Value, candidates: &[&str]) -> String {
    for field in candidates {
        if let Some(v) = get_path(payload, field) {
            if !v.is_null() {
                return crate::value_path::stringify(v);
            }
        }
    }
    FINGERPRINT_SENTINEL.to_string()
}

/// `fingerprint = H(webhook_id || normalized_payload_subset || floor(event_time / bucket))`
pub fn fingerprint(
    webhook_id: &WebhookId,
    payload: &Value,
    event_time: DateTime<Utc>,
    bucket_secs: i64,
) -> String {
    let rule = field_or_sentinel(payload, &["rule.id", "rule.name"]);
    let srcip = field_or_sentinel(payload, &["data.srcip", "data.src_ip"]);
    let dstip = field_or_sentinel(payload, &["data.dstip", "data.dst_ip"]);
    let agent = field_or_sentinel(payload, &["agent.id"]);

    let bucket = if bucket_secs > 0 {
        event_time.timestamp().div_euclid(bucket_secs)
    } else {
        event_time.timestamp()
    };

    let mut hasher = blake3::Hasher::new();
    hasher.update(webhook_id.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(rule.as_bytes());
    hasher.update(b"|");
    hasher.update(srcip.as_bytes());
    hasher.update(b"|");
    hasher.update(dstip.as_bytes());
    hasher.update(b"|");
    hasher.update(agent.as_bytes());
    hasher.update(b"|");
    hasher.update(bucket.to_string().as_bytes());

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_event_time_over_timestamp() {
        let payload = json!({"event_time": "2024-01-01T00:00:00Z", "timestamp": "2024-06-01T00:00:00Z"});
        let result = normalize_event_time(&payload, Utc::now());
        assert_eq!(result.event_time_source, "event_time");
    }

    #[test]
    fn falls_back_to_arrival_time() {
        let arrival = Utc::now();
        let result = normalize_event_time(&json!({}), arrival);
        assert_eq!(result.event_time_source, "arrival_time");
        assert_eq!(result.event_time, arrival);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let webhook_id = WebhookId::generate();
        let payload = json!({"rule": {"id": "5710"}, "data": {"srcip": "1.2.3.4"}});
        let t = Utc::now();
        let a = fingerprint(&webhook_id, &payload, t, 60);
        let b = fingerprint(&webhook_id, &payload, t, 60);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_across_buckets() {
        let webhook_id = WebhookId::generate();
        let payload = json!({"rule": {"id": "5710"}});
        let t1 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t2 = Utc.timestamp_opt(1_700_000_200, 0).unwrap();
        assert_ne!(
            fingerprint(&webhook_id, &payload, t1, 60),
            fingerprint(&webhook_id, &payload, t2, 60)
        );
    }
}
