//! FIFO command queues.
//!
//! The same queue type backs both the master program queue and each
//! entity's sub-queue. A queue separates *waiting* commands from the single
//! *in-flight* one: the scheduler takes a waiting command out to dispatch
//! it (so handlers can mutate the world without aliasing the queue), then
//! parks it in the in-flight slot until it reaches a terminal state.
//!
//! Failure is sticky: once any processed command has failed, the queue
//! reports `is_succeeded() == false` for the rest of the attempt, even
//! though draining continues.

use std::collections::VecDeque;

use crate::command::{Command, CommandState};

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// An ordered command sequence with at most one in-flight command.
#[derive(Debug, Default)]
pub struct CommandQueue {
    waiting: VecDeque<Command>,
    current: Option<Command>,
    begun: bool,
    processed: u64,
    failed: u64,
}

impl CommandQueue {
    /// A queue that waits for an explicit [`begin`](Self::begin) -- the
    /// master program queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that drains as soon as commands arrive -- entity sub-queues.
    pub fn started() -> Self {
        Self {
            begun: true,
            ..Self::default()
        }
    }

    /// Append a command at the tail.
    pub fn add(&mut self, cmd: Command) {
        self.waiting.push_back(cmd);
    }

    /// Insert a batch at the head, preserving the batch's order. Used for
    /// control-flow expansion.
    pub fn push_front_batch(&mut self, cmds: Vec<Command>) {
        for cmd in cmds.into_iter().rev() {
            self.waiting.push_front(cmd);
        }
    }

    /// Start processing. Idempotent.
    pub fn begin(&mut self) {
        self.begun = true;
    }

    pub fn has_begun(&self) -> bool {
        self.begun
    }

    /// True when no command is in flight.
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Take the next waiting command for dispatch. Only yields when the
    /// queue has begun and nothing is in flight; the caller must park the
    /// command back via [`set_current`](Self::set_current).
    pub fn pop_ready(&mut self) -> Option<Command> {
        if !self.begun || self.current.is_some() {
            return None;
        }
        self.waiting.pop_front()
    }

    /// Park a dispatched command as in-flight.
    pub fn set_current(&mut self, cmd: Command) {
        debug_assert!(self.current.is_none());
        self.current = Some(cmd);
    }

    /// Retire the in-flight command if it has reached a terminal state,
    /// recording the outcome.
    pub fn retire_terminal(&mut self) -> Option<Command> {
        if self.current.as_ref().is_some_and(Command::is_terminal) {
            let cmd = self.current.take()?;
            self.processed += 1;
            if cmd.state() == CommandState::Failed {
                self.failed += 1;
            }
            Some(cmd)
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&Command> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Command> {
        self.current.as_mut()
    }

    /// State of the in-flight command, if any.
    pub fn current_state(&self) -> Option<CommandState> {
        self.current.as_ref().map(Command::state)
    }

    /// Waiting plus in-flight commands.
    pub fn len(&self) -> usize {
        self.waiting.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once processing has begun and nothing remains queued or in
    /// flight. An empty program finishes vacuously.
    pub fn is_finished(&self) -> bool {
        self.begun && self.waiting.is_empty() && self.current.is_none()
    }

    /// True while no processed command has failed. Vacuously true before
    /// anything ran; can never flip back once a failure is recorded.
    pub fn is_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Number of commands retired so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Discard all waiting and in-flight commands and outcome counters.
    pub fn clear(&mut self) {
        self.waiting.clear();
        self.current = None;
        self.begun = false;
        self.processed = 0;
        self.failed = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Action, CommandIds, Target};

    fn cmd(ids: &mut CommandIds) -> Command {
        Command::new(ids.alloc(), Target::player(), Action::MoveForward)
    }

    #[test]
    fn pop_ready_requires_begin() {
        let mut ids = CommandIds::new();
        let mut q = CommandQueue::new();
        q.add(cmd(&mut ids));
        assert!(q.pop_ready().is_none());

        q.begin();
        assert!(q.pop_ready().is_some());
    }

    #[test]
    fn only_one_command_in_flight() {
        let mut ids = CommandIds::new();
        let mut q = CommandQueue::started();
        q.add(cmd(&mut ids));
        q.add(cmd(&mut ids));

        let first = q.pop_ready().unwrap();
        q.set_current(first);
        // Second stays queued while the first is in flight.
        assert!(q.pop_ready().is_none());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn retire_counts_failures_stickily() {
        let mut ids = CommandIds::new();
        let mut q = CommandQueue::started();

        let mut a = cmd(&mut ids);
        a.fail();
        q.set_current(a);
        assert!(q.retire_terminal().is_some());
        assert!(!q.is_succeeded());

        let mut b = cmd(&mut ids);
        b.succeed();
        q.set_current(b);
        q.retire_terminal();
        // One failure marks the whole attempt.
        assert!(!q.is_succeeded());
        assert_eq!(q.processed(), 2);
    }

    #[test]
    fn retire_ignores_pending_commands() {
        let mut ids = CommandIds::new();
        let mut q = CommandQueue::started();
        q.set_current(cmd(&mut ids));
        assert!(q.retire_terminal().is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn push_front_batch_preserves_batch_order() {
        let mut ids = CommandIds::new();
        let mut q = CommandQueue::started();
        q.add(Command::new(ids.alloc(), Target::player(), Action::CheckSolution));

        let batch = vec![
            Command::new(ids.alloc(), Target::player(), Action::MoveForward),
            Command::new(ids.alloc(), Target::player(), Action::DestroyBlock),
        ];
        q.push_front_batch(batch);

        let first = q.pop_ready().unwrap();
        assert_eq!(first.action, Action::MoveForward);
        q.set_current(first);
    }

    #[test]
    fn empty_begun_queue_is_vacuously_successful() {
        let mut q = CommandQueue::new();
        q.begin();
        assert!(q.is_finished());
        assert!(q.is_succeeded());
    }
}
