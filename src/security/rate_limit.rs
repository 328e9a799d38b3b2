//! Per-IP sliding-window rate limiting and burst cool-off (§4.A.1).
//!
//! Each IP gets two time-bucketed windows: a long window and a short burst
//! window. Tripping the burst window blocks the IP for a cool-off period
//! independent of the long window's own accounting.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, Instant};

struct IpState {
    long_window: VecDeque<Instant>,
    burst_window: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl IpState {
    fn new() -> Self {
        Self {
            long_window: VecDeque::new(),
            burst_window: VecDeque::new(),
            blocked_until: None,
        }
    }
}

pub enum RateDecision {
    Admit,
    Blocked { retry_after_secs: u64 },
    BurstExceeded { retry_after_secs: u64 },
    RateExceeded { retry_after_secs: u64 },
}

pub struct RateLimiter {
    long_window: Duration,
    long_max: u32,
    burst_window: Duration,
    burst_max: u32,
    cooloff: Duration,
    states: DashMap<IpAddr, IpState>,
}

impl RateLimiter {
    pub fn new(long_window: Duration, long_max: u32, burst_window: Duration, burst_max: u32, cooloff: Duration) -> Self {
        Self {
            long_window,
            long_max,
            burst_window,
            burst_max,
            cooloff,
            states: DashMap::new(),
        }
    }

    /// Check and, on admit, record a request for `ip` at `now`.
    pub fn check(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut entry = self.states.entry(ip).or_insert_with(IpState::new);

        if let Some(until) = entry.blocked_until {
            if now < until {
                return RateDecision::Blocked {
                    retry_after_secs: (until - now).as_secs().max(1),
                };
            }
            entry.blocked_until = None;
        }

        trim(&mut entry.long_window, now, self.long_window);
        trim(&mut entry.burst_window, now, self.burst_window);

        entry.burst_window.push_back(now);
        // Boundary: the burst window is considered tripped exactly when its
        // counter *reaches* the configured max (the max-th request within
        // the window is the one rejected, not the one after it).
        if entry.burst_window.len() as u32 >= self.burst_max {
            entry.blocked_until = Some(now + self.cooloff);
            return RateDecision::BurstExceeded {
                retry_after_secs: self.cooloff.as_secs(),
            };
        }

        entry.long_window.push_back(now);
        if entry.long_window.len() as u32 >= self.long_max {
            return RateDecision::RateExceeded {
                retry_after_secs: self.long_window_secs(),
            };
        }

        RateDecision::Admit
    }

    fn long_window_secs(&self) -> u64 {
        self.long_window.as_secs().max(1)
    }

    /// Remove entries untouched for 2x their window, per §4.A sweeper contract.
    pub fn sweep(&self, now: Instant) {
        let stale_after = self.long_window * 2;
        self.states.retain(|_, state| {
            let recently_active = state
                .long_window
                .back()
                .map(|&t| now.duration_since(t) < stale_after)
                .unwrap_or(false);
            let still_blocked = state.blocked_until.map(|u| u > now).unwrap_or(false);
            recently_active || still_blocked
        });
    }

    pub fn cache_size(&self) -> usize {
        self.states.len()
    }
}

fn trim(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&front) = window.front() {
        if now.duration_since(front) > span {
            window.pop_front();
        } else {
            break;
        }
    }
}
