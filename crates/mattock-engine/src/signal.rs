//! The signal bus: one-shot completion tokens connecting asynchronous
//! collaborators back to pending commands.
//!
//! A handler that cannot resolve its command synchronously *arms* the bus,
//! receiving a [`Completion`] token bound to (command, terminal state).
//! The token travels into a presentation call or a timer; firing it is the
//! suspension-resume signal. Tokens are one-shot by construction: firing
//! consumes the token, so "invoked exactly once" is enforced by move
//! semantics rather than by convention.
//!
//! Firing and resolving are two phases. `fire` only records the signal;
//! the scheduler drains the bus at the top of each tick and applies the
//! resulting transitions. This keeps collaborators from re-entering
//! dispatch while it is mid-mutation.

use std::collections::HashMap;

use tracing::debug;

use crate::command::{CommandId, CommandState};

// ---------------------------------------------------------------------------
// SignalId / Completion
// ---------------------------------------------------------------------------

/// Internal identity of one armed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(u64);

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sig{}", self.0)
    }
}

/// A one-shot completion token. Deliberately neither `Clone` nor `Copy`:
/// whoever holds it can fire it at most once.
#[derive(Debug)]
pub struct Completion {
    id: SignalId,
}

impl Completion {
    /// The underlying signal identity (diagnostics only).
    pub fn id(&self) -> SignalId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// One drained signal: which command resolves, to what state, and whether a
/// trailing delay still has to elapse first.
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub command: CommandId,
    pub state: CommandState,
    /// When set, the scheduler starts a timer for this many scaled
    /// milliseconds and resolves only when it fires. Used for
    /// animation-then-settle chains.
    pub delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// SignalBus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Armed {
    command: CommandId,
    state: CommandState,
    delay_ms: Option<u64>,
}

/// The completion ledger.
#[derive(Debug, Default)]
pub struct SignalBus {
    next: u64,
    armed: HashMap<SignalId, Armed>,
    fired: Vec<SignalId>,
    stale_fires: u64,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm_entry(&mut self, armed: Armed) -> Completion {
        let id = SignalId(self.next);
        self.next += 1;
        self.armed.insert(id, armed);
        Completion { id }
    }

    /// Arm a signal that resolves `command` to `state` when fired.
    pub fn arm(&mut self, command: CommandId, state: CommandState) -> Completion {
        self.arm_entry(Armed {
            command,
            state,
            delay_ms: None,
        })
    }

    /// Arm a signal that, when fired, waits another `delay_ms` before
    /// resolving `command` to `state`.
    pub fn arm_after(&mut self, command: CommandId, state: CommandState, delay_ms: u64) -> Completion {
        self.arm_entry(Armed {
            command,
            state,
            delay_ms: Some(delay_ms),
        })
    }

    /// Fire a completion token. A token whose signal was cancelled by a
    /// reset is ignored (and counted); it cannot corrupt a later attempt.
    pub fn fire(&mut self, done: Completion) {
        if self.armed.contains_key(&done.id) {
            self.fired.push(done.id);
        } else {
            self.stale_fires += 1;
            debug!(signal = %done.id, "completion fired after cancellation; ignored");
        }
    }

    /// Drain fired signals in firing order, removing their armed entries.
    pub fn drain(&mut self) -> Vec<Resolution> {
        let fired = std::mem::take(&mut self.fired);
        fired
            .into_iter()
            .filter_map(|id| {
                self.armed.remove(&id).map(|armed| Resolution {
                    command: armed.command,
                    state: armed.state,
                    delay_ms: armed.delay_ms,
                })
            })
            .collect()
    }

    /// Forget every armed and fired signal. Outstanding tokens become
    /// stale.
    pub fn cancel_all(&mut self) {
        self.armed.clear();
        self.fired.clear();
    }

    /// Number of currently armed, unfired signals.
    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    /// How many tokens fired after their signal was cancelled.
    pub fn stale_fires(&self) -> u64 {
        self.stale_fires
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
