//! Retry backoff (§4.G): exponential backoff with a delay cap, applied when
//! a step's `on_failure` is `retry`.

use crate::domain::playbook::RetryPolicy;
use std::time::Duration;

/// Delay before the `attempt`-th retry (1-indexed: the first retry is attempt 1).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let multiplier = policy.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
    let delay_ms = (policy.initial_delay_ms as f64 * multiplier) as u64;
    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 1000,
        }
    }

    #[test]
    fn delay_doubles_each_attempt() {
        let p = policy();
        assert_eq!(backoff_delay(&p, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(&p, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(&p, 3), Duration::from_millis(400));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let p = policy();
        assert_eq!(backoff_delay(&p, 10), Duration::from_millis(1000));
    }
}
