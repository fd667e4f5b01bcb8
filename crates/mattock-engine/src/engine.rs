//! The engine: owns the world, the queues, and the collaborators, and
//! advances everything one cooperative tick at a time.
//!
//! Each tick, in order:
//!
//! 1. The sim clock advances by the fixed step.
//! 2. Due timers and finished playbacks fire their completions into the
//!    signal bus.
//! 3. Drained resolutions apply their one-shot terminal transitions (or
//!    start their trailing delay).
//! 4. The master queue retires a terminal head and dispatches the next
//!    command -- at most one synchronous dispatch per tick.
//! 5. Every live entity's sub-queue does the same, independently, in spawn
//!    order.
//! 6. Buffered world events are delivered to listeners.
//! 7. A finished program reports its outcome through the attempt callback,
//!    exactly once.
//!
//! There is no preemption and no parallelism; interleaving across ticks is
//! the whole concurrency model.

use std::collections::HashMap;

use mattock_world::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::debug;

use crate::command::{Command, CommandId, CommandIds, CommandState, Step};
use crate::dispatch::{self, Ctx};
use crate::queue::CommandQueue;
use crate::signal::SignalBus;
use crate::snapshot::WorldSnapshot;
use crate::timer::Timers;
use crate::view::Presentation;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Fixed-step scheduling configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sim seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Multiplier applied to every handler delay (1.0 = authored timing).
    pub time_scale: f64,
    /// Seed for the deterministic RNG behind random moves and turns.
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    /// 60 ticks per second, authored timing, fixed seed.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            time_scale: 1.0,
            rng_seed: 0x6d61_7474,
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerDiagnostics
// ---------------------------------------------------------------------------

/// Counters exposed for tests and debugging. Reading them never changes
/// scheduling behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerDiagnostics {
    /// Commands handed to the dispatcher.
    pub dispatched: u64,
    /// Continuations synthesized by fan-out.
    pub fanned_out: u64,
    /// Commands retired as Succeeded (master and sub-queues).
    pub succeeded: u64,
    /// Commands retired as Failed.
    pub failed: u64,
    /// Rejected second terminal transitions.
    pub reuse_rejected: u64,
    /// Completions that resolved against no live command.
    pub stale_resolutions: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The attempt-completion callback: overall success plus the terminal
/// world snapshot.
pub type CompletionCallback = Box<dyn FnOnce(bool, WorldSnapshot)>;

/// The cooperative scheduler around one loaded level.
pub struct Engine<V: Presentation> {
    level: LevelData,
    world: GridWorld,
    registry: EntityRegistry,
    master: CommandQueue,
    subs: HashMap<EntityId, CommandQueue>,
    signals: SignalBus,
    timers: Timers,
    events: EventSink,
    view: V,
    rng: Pcg32,
    ids: CommandIds,
    config: EngineConfig,
    clock_ms: f64,
    ticks: u64,
    delay_factor: f64,
    diag: SchedulerDiagnostics,
    on_complete: Option<CompletionCallback>,
}

impl<V: Presentation> Engine<V> {
    /// Build the world from `level` and wrap it in a fresh scheduler.
    pub fn new(level: LevelData, config: EngineConfig, view: V) -> Result<Self, WorldError> {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        let (world, registry) = level.build()?;
        let subs = registry
            .ids_in_spawn_order()
            .into_iter()
            .map(|id| (id, CommandQueue::started()))
            .collect();
        let rng = Pcg32::seed_from_u64(config.rng_seed);
        Ok(Self {
            level,
            world,
            registry,
            master: CommandQueue::new(),
            subs,
            signals: SignalBus::new(),
            timers: Timers::new(),
            events: EventSink::new(),
            view,
            rng,
            ids: CommandIds::new(),
            config,
            clock_ms: 0.0,
            ticks: 0,
            delay_factor: 1.0,
            diag: SchedulerDiagnostics::default(),
            on_complete: None,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn master_queue(&self) -> &CommandQueue {
        &self.master
    }

    /// Pending commands (waiting + in flight) on one entity's sub-queue.
    pub fn sub_queue_len(&self, id: &EntityId) -> usize {
        self.subs.get(id).map_or(0, CommandQueue::len)
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The event sink, for listener registration.
    pub fn events_mut(&mut self) -> &mut EventSink {
        &mut self.events
    }

    pub fn diagnostics(&self) -> SchedulerDiagnostics {
        self.diag
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// True once the program queue has begun and fully drained.
    pub fn is_finished(&self) -> bool {
        self.master.is_finished()
    }

    /// True while no processed top-level command has failed.
    pub fn is_succeeded(&self) -> bool {
        self.master.is_succeeded()
    }

    /// Serializable snapshot of the current world state.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self.ticks, &self.world, &self.registry)
    }

    /// Content hash of the current world state.
    pub fn state_hash(&self) -> String {
        self.snapshot().hash
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start processing the master queue. Idempotent; normally called via
    /// `start_attempt`.
    pub fn begin(&mut self) {
        self.master.begin();
    }

    /// Discard every queue, timer, armed signal, and buffered event, and
    /// rebuild the world from the level recipe. Event listeners survive.
    pub fn reset(&mut self) -> Result<(), WorldError> {
        let (world, registry) = self.level.build()?;
        self.world = world;
        self.registry = registry;
        self.master.clear();
        self.subs = self
            .registry
            .ids_in_spawn_order()
            .into_iter()
            .map(|id| (id, CommandQueue::started()))
            .collect();
        self.signals.cancel_all();
        self.timers.cancel_all();
        self.events.clear_pending();
        self.rng = Pcg32::seed_from_u64(self.config.rng_seed);
        self.clock_ms = 0.0;
        self.ticks = 0;
        self.delay_factor = 1.0;
        self.diag = SchedulerDiagnostics::default();
        self.on_complete = None;
        debug!("engine reset");
        Ok(())
    }

    // -- tick ---------------------------------------------------------------

    /// Advance the simulation by one scheduling step.
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.clock_ms += self.config.fixed_dt * 1000.0;

        // Completions first: timers, then playbacks, then apply.
        self.timers.tick(self.clock_ms, &mut self.signals);
        self.view.pump(&mut self.signals);
        for resolution in self.signals.drain() {
            match resolution.delay_ms {
                Some(delay) => {
                    // Animation finished; the trailing settle starts now.
                    let done = self.signals.arm(resolution.command, resolution.state);
                    self.timers.after(self.clock_ms, delay, done);
                }
                None => self.resolve_command(resolution.command, resolution.state),
            }
        }

        self.delay_factor = backlog_delay_factor(self.master.len());

        // Master queue: retire a terminal head, then dispatch the next.
        if let Some(cmd) = self.master.retire_terminal() {
            self.count_retired(&cmd);
        }
        if let Some(mut cmd) = self.master.pop_ready() {
            let expansion = self.dispatch_command(&mut cmd);
            if let Some(steps) = expansion {
                let batch = self.instantiate(steps);
                self.master.push_front_batch(batch);
            }
            self.master.set_current(cmd);
        }

        // Entity sub-queues, in spawn order, independent of the master.
        for id in self.registry.ids_in_spawn_order() {
            if let Some(queue) = self.subs.get_mut(&id) {
                if let Some(cmd) = queue.retire_terminal() {
                    self.count_retired(&cmd);
                }
            }
            let next = match self.subs.get_mut(&id) {
                Some(queue) => queue.pop_ready(),
                None => None,
            };
            if let Some(mut cmd) = next {
                let expansion = self.dispatch_command(&mut cmd);
                if let Some(steps) = expansion {
                    let batch = self.instantiate(steps);
                    if let Some(queue) = self.subs.get_mut(&id) {
                        queue.push_front_batch(batch);
                    }
                }
                match self.subs.get_mut(&id) {
                    Some(queue) => queue.set_current(cmd),
                    // The entity destroyed itself during its own dispatch;
                    // its terminal command goes down with the queue.
                    None => debug!(entity = %id, "sub-queue gone after dispatch"),
                }
            }
        }

        // Drop queues whose entities died this tick.
        let registry = &self.registry;
        self.subs.retain(|id, _| registry.is_alive(id));

        self.events.deliver();

        // Program completion fires exactly once.
        if self.master.is_finished() && self.on_complete.is_some() {
            let success = self.master.is_succeeded();
            let snapshot = self.snapshot();
            if let Some(callback) = self.on_complete.take() {
                debug!(success, "attempt complete");
                callback(success, snapshot);
            }
        }
    }

    /// Run `n` ticks back to back.
    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    // -- internals ----------------------------------------------------------

    pub(crate) fn enqueue_master(&mut self, cmd: Command) -> CommandId {
        let id = cmd.id;
        self.master.add(cmd);
        id
    }

    pub(crate) fn set_on_complete(&mut self, callback: CompletionCallback) {
        self.on_complete = Some(callback);
    }

    pub(crate) fn alloc_id(&mut self) -> CommandId {
        self.ids.alloc()
    }

    pub(crate) fn sub_queue_mut(&mut self, id: &EntityId) -> Option<&mut CommandQueue> {
        self.subs.get_mut(id)
    }

    pub(crate) fn entity_alive(&self, id: &EntityId) -> bool {
        self.registry.is_alive(id)
    }

    fn dispatch_command(&mut self, cmd: &mut Command) -> Option<Vec<Step>> {
        let mut ctx = Ctx {
            world: &mut self.world,
            registry: &mut self.registry,
            subs: &mut self.subs,
            signals: &mut self.signals,
            timers: &mut self.timers,
            view: &mut self.view,
            events: &mut self.events,
            rng: &mut self.rng,
            ids: &mut self.ids,
            config: &self.config,
            diag: &mut self.diag,
            clock_ms: self.clock_ms,
            delay_factor: self.delay_factor,
        };
        dispatch::dispatch(&mut ctx, cmd)
    }

    fn instantiate(&mut self, steps: Vec<Step>) -> Vec<Command> {
        steps
            .into_iter()
            .map(|step| Command::new(self.ids.alloc(), step.target, step.action))
            .collect()
    }

    /// Apply a drained terminal transition to whichever queue holds the
    /// command. A missing command means its entity (and queue) died first;
    /// the resolution is stale and ignored.
    fn resolve_command(&mut self, id: CommandId, state: CommandState) {
        let cmd = match self.master.current_mut() {
            Some(cmd) if cmd.id == id => Some(cmd),
            _ => self
                .subs
                .values_mut()
                .filter_map(CommandQueue::current_mut)
                .find(|cmd| cmd.id == id),
        };
        match cmd {
            Some(cmd) => {
                if !cmd.resolve(state) {
                    self.diag.reuse_rejected += 1;
                }
            }
            None => {
                self.diag.stale_resolutions += 1;
                debug!(command = %id, "resolution arrived for a discarded command");
            }
        }
    }

    fn count_retired(&mut self, cmd: &Command) {
        match cmd.state() {
            CommandState::Succeeded => self.diag.succeeded += 1,
            CommandState::Failed => self.diag.failed += 1,
            CommandState::Pending => {}
        }
    }
}

/// Shorten handler delays once the program backlog passes 10 queued
/// commands, bottoming out at 20: a long program plays faster, never
/// slower.
fn backlog_delay_factor(queue_len: usize) -> f64 {
    const START_SPEED_UP: usize = 10;
    const END_SPEED_UP: usize = 20;
    let range = (END_SPEED_UP - START_SPEED_UP) as f64;
    let over = queue_len.saturating_sub(START_SPEED_UP).min(END_SPEED_UP - START_SPEED_UP) as f64;
    1.0 - over / range
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_factor_clamps_at_both_ends() {
        assert_eq!(backlog_delay_factor(0), 1.0);
        assert_eq!(backlog_delay_factor(10), 1.0);
        assert_eq!(backlog_delay_factor(15), 0.5);
        assert_eq!(backlog_delay_factor(20), 0.0);
        assert_eq!(backlog_delay_factor(500), 0.0);
    }
}
