//! Deterministic simulated-time timer scheduler.

use crate::collaborators::{FiredTimer, TimerHandle, TimerKind, TimerScheduler};

/// A timer waiting to fire.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTimer {
    handle: TimerHandle,
    kind: TimerKind,
    due: f64,
}

/// Timer scheduler driven by an explicit clock.
///
/// Time only moves when [`SimTimerScheduler::advance`] is called, which makes
/// stun and death timing reproducible in tests and headless runs.
#[derive(Debug, Default)]
pub struct SimTimerScheduler {
    /// Current simulated time (seconds).
    now: f64,
    /// Last handle minted.
    last_handle: u64,
    /// Armed timers.
    pending: Vec<PendingTimer>,
}

impl SimTimerScheduler {
    /// Create a scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of armed timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if `handle` is still armed.
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Seconds until `handle` fires, if armed.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.pending
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| (t.due - self.now).max(0.0) as f32)
    }

    /// Moves the clock forward and returns every timer that came due,
    /// earliest first. Timers due at the same instant fire in scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<FiredTimer> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now;

        let mut due: Vec<PendingTimer> = Vec::new();
        self.pending.retain(|t| {
            if t.due <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)));

        due.into_iter()
            .map(|t| FiredTimer {
                handle: t.handle,
                kind: t.kind,
            })
            .collect()
    }
}

impl TimerScheduler for SimTimerScheduler {
    fn schedule(&mut self, delay: f32, kind: TimerKind) -> TimerHandle {
        self.last_handle += 1;
        let handle = TimerHandle::from_raw(self.last_handle);
        self.pending.push(PendingTimer {
            handle,
            kind,
            due: self.now + f64::from(delay.max(0.0)),
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|t| t.handle != handle);
    }
}
