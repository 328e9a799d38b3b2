//! Flood control (§4.A.4): a per-playbook counter and a single global
//! counter, both sliding one-minute windows. Incremented only on admit, per
//! the spec's "increment only on admit" rule — a request rejected by an
//! earlier sub-policy never counts against either budget.

use crate::domain::ids::PlaybookId;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq, Eq)]
pub enum FloodDecision {
    Admit,
    PlaybookFlood,
    GlobalFlood,
}

pub struct FloodControl {
    playbook_max: u32,
    global_max: u32,
    per_playbook: DashMap<PlaybookId, VecDeque<Instant>>,
    global: parking_lot::Mutex<VecDeque<Instant>>,
}

impl FloodControl {
    pub fn new(playbook_max: u32, global_max: u32) -> Self {
        Self {
            playbook_max,
            global_max,
            per_playbook: DashMap::new(),
            global: parking_lot::Mutex::new(VecDeque::new()),
        }
    }

    /// Checks both counters without mutating state. Global is checked first
    /// since it's the tighter shared budget.
    pub fn would_admit(&self, playbook_id: &PlaybookId, now: Instant) -> FloodDecision {
        {
            let mut global = self.global.lock();
            trim(&mut global, now);
            if global.len() as u32 >= self.global_max {
                return FloodDecision::GlobalFlood;
            }
        }
        if let Some(mut entry) = self.per_playbook.get_mut(playbook_id) {
            trim(&mut entry, now);
            if entry.len() as u32 >= self.playbook_max {
                return FloodDecision::PlaybookFlood;
            }
        }
        FloodDecision::Admit
    }

    /// Records an admitted request against both counters.
    pub fn record_admit(&self, playbook_id: &PlaybookId, now: Instant) {
        self.global.lock().push_back(now);
        self.per_playbook
            .entry(playbook_id.clone())
            .or_insert_with(VecDeque::new)
            .push_back(now);
    }

    pub fn sweep(&self, now: Instant) {
        trim(&mut self.global.lock(), now);
        self.per_playbook.retain(|_, window| {
            trim(window, now);
            !window.is_empty()
        });
    }
}

fn trim(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&front) = window.front() {
        if now.duration_since(front) > WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flood_trips_before_playbook_flood() {
        let control = FloodControl::new(100, 2);
        let pb = PlaybookId::generate();
        let now = Instant::now();
        control.record_admit(&pb, now);
        control.record_admit(&pb, now);
        assert_eq!(control.would_admit(&pb, now), FloodDecision::GlobalFlood);
    }

    #[test]
    fn playbook_flood_trips_independently_of_other_playbooks() {
        let control = FloodControl::new(1, 100);
        let pb_a = PlaybookId::generate();
        let pb_b = PlaybookId::generate();
        let now = Instant::now();
        control.record_admit(&pb_a, now);
        assert_eq!(control.would_admit(&pb_a, now), FloodDecision::PlaybookFlood);
        assert_eq!(control.would_admit(&pb_b, now), FloodDecision::Admit);
    }
}
