//! Sim-clock timers.
//!
//! Deadlines live on the same fixed-step clock the engine advances each
//! tick, so timer behavior is deterministic for a given tick rate. Due
//! timers fire their [`Completion`] tokens into the [`SignalBus`] in
//! (deadline, arming order) order.

use crate::signal::{Completion, SignalBus};

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TimerEntry {
    deadline_ms: f64,
    seq: u64,
    done: Completion,
}

/// Pending one-shot timers.
#[derive(Debug, Default)]
pub struct Timers {
    entries: Vec<TimerEntry>,
    seq: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `done` to fire `delay_ms` after `now_ms`.
    pub fn after(&mut self, now_ms: f64, delay_ms: u64, done: Completion) {
        self.seq += 1;
        self.entries.push(TimerEntry {
            deadline_ms: now_ms + delay_ms as f64,
            seq: self.seq,
            done,
        });
    }

    /// Fire every timer whose deadline has passed.
    pub fn tick(&mut self, now_ms: f64, bus: &mut SignalBus) {
        if self.entries.is_empty() {
            return;
        }
        let mut due: Vec<TimerEntry> = Vec::new();
        let mut remaining: Vec<TimerEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.deadline_ms <= now_ms {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;

        due.sort_by(|a, b| {
            a.deadline_ms
                .total_cmp(&b.deadline_ms)
                .then(a.seq.cmp(&b.seq))
        });
        for entry in due {
            bus.fire(entry.done);
        }
    }

    /// Drop every pending timer. Their tokens are never fired.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Number of pending timers.
    pub fn pending_len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandIds, CommandState};

    #[test]
    fn timers_fire_at_their_deadline_not_before() {
        let mut ids = CommandIds::new();
        let cmd = ids.alloc();
        let mut bus = SignalBus::new();
        let mut timers = Timers::new();

        timers.after(0.0, 100, bus.arm(cmd, CommandState::Succeeded));

        timers.tick(99.0, &mut bus);
        assert!(bus.drain().is_empty());
        assert_eq!(timers.pending_len(), 1);

        timers.tick(100.0, &mut bus);
        let resolutions = bus.drain();
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].command, cmd);
        assert_eq!(timers.pending_len(), 0);
    }

    #[test]
    fn simultaneous_deadlines_fire_in_arming_order() {
        let mut ids = CommandIds::new();
        let (a, b) = (ids.alloc(), ids.alloc());
        let mut bus = SignalBus::new();
        let mut timers = Timers::new();

        timers.after(0.0, 50, bus.arm(a, CommandState::Succeeded));
        timers.after(0.0, 50, bus.arm(b, CommandState::Succeeded));

        timers.tick(1000.0, &mut bus);
        let resolutions = bus.drain();
        assert_eq!(resolutions[0].command, a);
        assert_eq!(resolutions[1].command, b);
    }

    #[test]
    fn cancel_all_discards_pending_timers() {
        let mut ids = CommandIds::new();
        let mut bus = SignalBus::new();
        let mut timers = Timers::new();

        timers.after(0.0, 10, bus.arm(ids.alloc(), CommandState::Succeeded));
        timers.cancel_all();
        timers.tick(1000.0, &mut bus);
        assert!(bus.drain().is_empty());
    }
}
