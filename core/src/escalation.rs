//! Escalation policy: maps event recency to a response volume.
//!
//! Keeps a short, count-bounded history of prior event timestamps. Eviction
//! is purely by count; whether an old event still matters is re-evaluated by
//! timestamp on every lookup against the escalation period.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct EscalationPolicy {
    volumes: Vec<i32>,
    period: Duration,
    /// Timestamps of prior events, oldest first. Capacity `volumes.len() - 1`:
    /// more history than that can never raise the tier further.
    history: VecDeque<Instant>,
}

impl EscalationPolicy {
    /// `volumes` must already be validated (non-empty, strictly increasing);
    /// see [`crate::ResponderConfig::validate`].
    pub fn new(volumes: Vec<i32>, period: Duration) -> Self {
        let capacity = volumes.len().saturating_sub(1);
        Self {
            volumes,
            period,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Chooses the response volume for an event at `at` and records the
    /// event. The tier index is the number of prior events still within the
    /// escalation period, clamped to the loudest tier; the event being
    /// scored does not count against itself.
    pub fn choose(&mut self, at: Instant) -> i32 {
        let recent = self
            .history
            .iter()
            .filter(|&&e| at.saturating_duration_since(e) <= self.period)
            .count();
        let tier = recent.min(self.volumes.len() - 1);

        let capacity = self.volumes.len() - 1;
        if capacity > 0 {
            if self.history.len() == capacity {
                self.history.pop_front();
            }
            self.history.push_back(at);
        }

        self.volumes[tier]
    }
}
