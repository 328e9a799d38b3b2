//! Security observability (§4.A, §6 `GET /security/metrics`): process-lifetime
//! counters, one per rejection reason, plus cache sizes reported by the
//! caller at snapshot time.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, serde::Serialize)]
pub struct SecurityMetricsSnapshot {
    pub rate_limited: u64,
    pub burst_limited: u64,
    pub ip_blocked: u64,
    pub replayed: u64,
    pub timestamp_rejected: u64,
    pub hmac_invalid: u64,
    pub playbook_flood_blocked: u64,
    pub global_flood_blocked: u64,
    pub admitted: u64,
    pub rate_limiter_cache_size: usize,
    pub nonce_cache_size: usize,
}

#[derive(Default)]
pub struct SecurityMetrics {
    rate_limited: AtomicU64,
    burst_limited: AtomicU64,
    ip_blocked: AtomicU64,
    replayed: AtomicU64,
    timestamp_rejected: AtomicU64,
    hmac_invalid: AtomicU64,
    playbook_flood_blocked: AtomicU64,
    global_flood_blocked: AtomicU64,
    admitted: AtomicU64,
}

macro_rules! counter_method {
    ($incr:ident, $field:ident) => {
        pub fn $incr(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl SecurityMetrics {
    counter_method!(record_rate_limited, rate_limited);
    counter_method!(record_burst_limited, burst_limited);
    counter_method!(record_ip_blocked, ip_blocked);
    counter_method!(record_replayed, replayed);
    counter_method!(record_timestamp_rejected, timestamp_rejected);
    counter_method!(record_hmac_invalid, hmac_invalid);
    counter_method!(record_playbook_flood_blocked, playbook_flood_blocked);
    counter_method!(record_global_flood_blocked, global_flood_blocked);
    counter_method!(record_admitted, admitted);

    pub fn snapshot(&self, rate_limiter_cache_size: usize, nonce_cache_size: usize) -> SecurityMetricsSnapshot {
        SecurityMetricsSnapshot {
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            burst_limited: self.burst_limited.load(Ordering::Relaxed),
            ip_blocked: self.ip_blocked.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            timestamp_rejected: self.timestamp_rejected.load(Ordering::Relaxed),
            hmac_invalid: self.hmac_invalid.load(Ordering::Relaxed),
            playbook_flood_blocked: self.playbook_flood_blocked.load(Ordering::Relaxed),
            global_flood_blocked: self.global_flood_blocked.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            rate_limiter_cache_size,
            nonce_cache_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = SecurityMetrics::default();
        metrics.record_rate_limited();
        metrics.record_rate_limited();
        let snap = metrics.snapshot(0, 0);
        assert_eq!(snap.rate_limited, 2);
        assert_eq!(snap.burst_limited, 0);
    }
}
