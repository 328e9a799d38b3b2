//! Replay protection (§4.A.2): timestamp-window checking plus a nonce cache.

use crate::domain::ids::WebhookId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq, Eq)]
pub enum TimestampCheck {
    Ok,
    Missing,
    Unparseable,
    Skewed,
}

/// Parses epoch seconds, epoch milliseconds, or ISO 8601, per §4.A.2.
pub fn parse_request_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    crate::normalizer::parse_timestamp_str(raw)
}

/// `±skew_secs` inclusive, per the boundary property in §8 ("exactly at ±300s is accepted").
pub fn check_timestamp(candidate: Option<&str>, now: DateTime<Utc>, skew_secs: i64) -> (TimestampCheck, Option<DateTime<Utc>>) {
    let Some(raw) = candidate else {
        return (TimestampCheck::Missing, None);
    };
    let Some(parsed) = parse_request_timestamp(raw) else {
        return (TimestampCheck::Unparseable, None);
    };
    let delta = (now - parsed).num_seconds().abs();
    if delta > skew_secs {
        (TimestampCheck::Skewed, Some(parsed))
    } else {
        (TimestampCheck::Ok, Some(parsed))
    }
}

/// `nonce = H(webhook_id || canonical(payload) || timestamp)`.
pub fn compute_nonce(webhook_id: &WebhookId, canonical_payload: &str, timestamp_raw: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(webhook_id.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(canonical_payload.as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp_raw.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub struct NonceCache {
    window: Duration,
    seen: DashMap<String, Instant>,
}

impl NonceCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: DashMap::new(),
        }
    }

    /// Returns `true` if the nonce was not previously seen within the window
    /// (and records it); `false` if it's a replay.
    pub fn observe(&self, nonce: String, now: Instant) -> bool {
        if let Some(seen_at) = self.seen.get(&nonce) {
            if now.duration_since(*seen_at) <= self.window {
                return false;
            }
        }
        self.seen.insert(nonce, now);
        true
    }

    pub fn sweep(&self, now: Instant) {
        let stale_after = self.window * 2;
        self.seen.retain(|_, seen_at| now.duration_since(*seen_at) < stale_after);
    }

    pub fn cache_size(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_skew_boundary_is_inclusive() {
        let now = Utc::now();
        let at_300 = (now - chrono::Duration::seconds(300)).to_rfc3339();
        let (check, _) = check_timestamp(Some(&at_300), now, 300);
        assert_eq!(check, TimestampCheck::Ok);
    }

    #[test]
    fn timestamp_skew_301_is_rejected() {
        let now = Utc::now();
        let at_301 = (now - chrono::Duration::seconds(301)).to_rfc3339();
        let (check, _) = check_timestamp(Some(&at_301), now, 300);
        assert_eq!(check, TimestampCheck::Skewed);
    }

    #[test]
    fn second_observation_of_the_same_nonce_is_a_replay() {
        let cache = NonceCache::new(Duration::from_secs(600));
        let now = Instant::now();
        assert!(cache.observe("abc".to_string(), now));
        assert!(!cache.observe("abc".to_string(), now));
    }
}
