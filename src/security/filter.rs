//! Security Filter (§4.A): one predicate, `admit`, composing four
//! sub-policies evaluated in order. First rejection wins. Trusted IPs
//! bypass all four checks.

use crate::domain::ids::{PlaybookId, WebhookId};
use crate::error::IngestionError;
use crate::security::flood::{FloodControl, FloodDecision};
use crate::security::hmac_verify::{self, SignatureCheck};
use crate::security::metrics::SecurityMetrics;
use crate::security::rate_limit::{RateDecision, RateLimiter};
use crate::security::replay::{self, NonceCache, TimestampCheck};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Everything the filter needs to evaluate a single inbound request.
pub struct AdmitRequest<'a> {
    pub client_ip: IpAddr,
    pub webhook_id: &'a WebhookId,
    /// Resolved from the URL-addressed webhook, independent of secret
    /// verification (which is the Webhook Authenticator's job in §4.B).
    pub playbook_id: &'a PlaybookId,
    pub raw_body: &'a [u8],
    pub canonical_payload: &'a str,
    pub timestamp_header: Option<&'a str>,
    pub signature_header: Option<&'a str>,
    pub webhook_secret: &'a str,
    pub now: DateTime<Utc>,
    pub monotonic_now: Instant,
}

pub struct SecurityFilter {
    pub rate_limiter: RateLimiter,
    pub nonce_cache: NonceCache,
    pub flood: FloodControl,
    pub metrics: SecurityMetrics,
    trusted_ips: Vec<IpAddr>,
    timestamp_skew_secs: i64,
}

impl SecurityFilter {
    pub fn new(config: &crate::config::SecurityConfig) -> Self {
        let trusted_ips = config
            .trusted_ips
            .iter()
            .filter_map(|s| s.parse::<IpAddr>().ok())
            .collect();
        Self {
            rate_limiter: RateLimiter::new(
                Duration::from_secs(config.rate_limit_window_secs),
                config.rate_limit_max_requests,
                Duration::from_secs(config.burst_window_secs),
                config.burst_max_requests,
                Duration::from_secs(config.ip_cooloff_secs),
            ),
            nonce_cache: NonceCache::new(Duration::from_secs(config.replay_window_secs)),
            flood: FloodControl::new(config.playbook_flood_per_min, config.global_flood_per_min),
            metrics: SecurityMetrics::default(),
            trusted_ips,
            timestamp_skew_secs: config.timestamp_skew_secs,
        }
    }

    pub fn admit(&self, req: &AdmitRequest) -> Result<(), IngestionError> {
        if self.trusted_ips.contains(&req.client_ip) {
            self.flood.record_admit(req.playbook_id, req.monotonic_now);
            self.metrics.record_admitted();
            return Ok(());
        }

        match self.rate_limiter.check(req.client_ip, req.monotonic_now) {
            RateDecision::Admit => {}
            RateDecision::Blocked { retry_after_secs } => {
                self.metrics.record_ip_blocked();
                return Err(IngestionError::IpBlocked { retry_after_secs });
            }
            RateDecision::BurstExceeded { retry_after_secs } => {
                self.metrics.record_burst_limited();
                return Err(IngestionError::BurstLimitExceeded { retry_after_secs });
            }
            RateDecision::RateExceeded { retry_after_secs } => {
                self.metrics.record_rate_limited();
                return Err(IngestionError::RateLimitExceeded { retry_after_secs });
            }
        }

        let (timestamp_check, parsed_timestamp) =
            replay::check_timestamp(req.timestamp_header, req.now, self.timestamp_skew_secs);
        match timestamp_check {
            TimestampCheck::Missing => {
                // A missing timestamp only blocks replay accounting when a
                // signature is present (HMAC mandates one); otherwise the
                // nonce falls back to the empty string.
            }
            TimestampCheck::Unparseable => {
                self.metrics.record_timestamp_rejected();
                return Err(IngestionError::InvalidTimestamp);
            }
            TimestampCheck::Skewed => {
                self.metrics.record_timestamp_rejected();
                return Err(IngestionError::TimestampSkew);
            }
            TimestampCheck::Ok => {}
        }

        let timestamp_raw = req.timestamp_header.unwrap_or("");
        let nonce = replay::compute_nonce(req.webhook_id, req.canonical_payload, timestamp_raw);
        if !self.nonce_cache.observe(nonce, req.monotonic_now) {
            self.metrics.record_replayed();
            return Err(IngestionError::DuplicateNonce);
        }

        if req.signature_header.is_some() {
            if parsed_timestamp.is_none() {
                self.metrics.record_timestamp_rejected();
                return Err(IngestionError::MissingTimestamp);
            }
            let message = format!("{}.{}", timestamp_raw, req.canonical_payload);
            match hmac_verify::verify(req.webhook_secret, message.as_bytes(), req.signature_header) {
                SignatureCheck::Valid => {}
                SignatureCheck::Missing | SignatureCheck::Malformed | SignatureCheck::Invalid => {
                    self.metrics.record_hmac_invalid();
                    return Err(IngestionError::InvalidSignature);
                }
            }
        }

        match self.flood.would_admit(req.playbook_id, req.monotonic_now) {
            FloodDecision::Admit => {}
            FloodDecision::PlaybookFlood => {
                self.metrics.record_playbook_flood_blocked();
                return Err(IngestionError::PlaybookFloodLimit);
            }
            FloodDecision::GlobalFlood => {
                self.metrics.record_global_flood_blocked();
                return Err(IngestionError::GlobalFloodLimit);
            }
        }

        self.flood.record_admit(req.playbook_id, req.monotonic_now);
        self.metrics.record_admitted();
        Ok(())
    }

    /// Background sweep, intended to run on a periodic task (per §4.A's
    /// "cache is a time-bucketed map with a background sweeper").
    pub fn sweep(&self, now: Instant) {
        self.rate_limiter.sweep(now);
        self.nonce_cache.sweep(now);
        self.flood.sweep(now);
    }

    pub fn metrics_snapshot(&self) -> crate::security::metrics::SecurityMetricsSnapshot {
        self.metrics
            .snapshot(self.rate_limiter.cache_size(), self.nonce_cache.cache_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;

    fn filter() -> SecurityFilter {
        SecurityFilter::new(&SecurityConfig::default())
    }

    fn base_req<'a>(
        webhook_id: &'a WebhookId,
        playbook_id: &'a PlaybookId,
        payload: &'a str,
    ) -> AdmitRequest<'a> {
        AdmitRequest {
            client_ip: "10.0.0.5".parse().unwrap(),
            webhook_id,
            playbook_id,
            raw_body: payload.as_bytes(),
            canonical_payload: payload,
            timestamp_header: None,
            signature_header: None,
            webhook_secret: "secret",
            now: Utc::now(),
            monotonic_now: Instant::now(),
        }
    }

    #[test]
    fn plain_request_without_signature_is_admitted() {
        let f = filter();
        let webhook_id = WebhookId::generate();
        let playbook_id = PlaybookId::generate();
        let req = base_req(&webhook_id, &playbook_id, "{}");
        assert!(f.admit(&req).is_ok());
    }

    #[test]
    fn replayed_nonce_is_rejected_on_second_attempt() {
        let f = filter();
        let webhook_id = WebhookId::generate();
        let playbook_id = PlaybookId::generate();
        let req = base_req(&webhook_id, &playbook_id, "{}");
        assert!(f.admit(&req).is_ok());
        assert_eq!(f.admit(&req), Err(IngestionError::DuplicateNonce));
    }

    #[test]
    fn trusted_ip_bypasses_everything() {
        let mut config = SecurityConfig::default();
        config.trusted_ips = vec!["10.0.0.5".to_string()];
        let f = SecurityFilter::new(&config);
        let webhook_id = WebhookId::generate();
        let playbook_id = PlaybookId::generate();
        let req = base_req(&webhook_id, &playbook_id, "{}");
        assert!(f.admit(&req).is_ok());
        assert!(f.admit(&req).is_ok());
    }

    #[test]
    fn missing_signature_header_passes_when_none_provided() {
        let f = filter();
        let webhook_id = WebhookId::generate();
        let playbook_id = PlaybookId::generate();
        let req = base_req(&webhook_id, &playbook_id, "{}");
        assert!(f.admit(&req).is_ok());
    }

    #[test]
    fn present_signature_requires_a_timestamp() {
        let f = filter();
        let webhook_id = WebhookId::generate();
        let playbook_id = PlaybookId::generate();
        let mut req = base_req(&webhook_id, &playbook_id, "{}");
        req.signature_header = Some("sha256=deadbeef");
        assert_eq!(f.admit(&req), Err(IngestionError::MissingTimestamp));
    }
}
