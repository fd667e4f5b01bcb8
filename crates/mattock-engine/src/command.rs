//! Commands: the unit of scheduled work.
//!
//! A [`Command`] pairs a [`Target`] with an [`Action`] and a one-shot
//! terminal-state contract: `Pending -> Succeeded | Failed`, exactly once.
//! There is no persisted "executing" state -- while a command is live its
//! liveness is the armed continuation waiting to resolve it.
//!
//! Targets are tagged at construction time. Whether a program meant "the
//! entity named X" or "every entity of type X" is decided when the command
//! is built, never re-inferred from string shape at dispatch time.

use mattock_world::prelude::*;
use tracing::warn;

// ---------------------------------------------------------------------------
// CommandId
// ---------------------------------------------------------------------------

/// Identifies one command for the lifetime of an attempt. Allocated by
/// [`CommandIds`]; monotonically increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(u64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd{}", self.0)
    }
}

/// Allocator for [`CommandId`]s.
#[derive(Debug, Default)]
pub struct CommandIds {
    next: u64,
}

impl CommandIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> CommandId {
        let id = CommandId(self.next);
        self.next += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// CommandState
// ---------------------------------------------------------------------------

/// The one-shot command state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Pending,
    Succeeded,
    Failed,
}

impl CommandState {
    /// True for `Succeeded` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != CommandState::Pending
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Who a command addresses: one concrete entity, or every live entity of a
/// type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    ById(EntityId),
    ByType(TypeTag),
}

impl Target {
    /// The singleton player.
    pub fn player() -> Self {
        Target::ById(EntityId::player())
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Target::ById(EntityId::new(id))
    }

    pub fn by_type(tag: impl Into<String>) -> Self {
        Target::ByType(TypeTag::new(tag))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::ById(id) => write!(f, "entity '{id}'"),
            Target::ByType(tag) => write!(f, "type '{tag}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Action / Step
// ---------------------------------------------------------------------------

/// One entry in a control-flow body: an action bound to its own target.
/// Bodies are cloned into fresh commands on every expansion, so loop
/// iterations never share command state.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub target: Target,
    pub action: Action,
}

impl Step {
    pub fn new(target: Target, action: Action) -> Self {
        Self { target, action }
    }
}

/// The behavior payload of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// One step in the current facing.
    MoveForward,
    /// Face `facing`, then one step.
    MoveDirection { facing: Facing },
    /// One step in a rolled direction.
    MoveRandom,
    /// One step closing the distance to `other`.
    MoveToward { other: Target },
    /// One step opening the distance to `other`.
    MoveAway { other: Target },
    /// Walk until adjacent to `other`, one step (and one re-issued
    /// continuation) at a time.
    MoveTo { other: Target },
    /// Quarter turn.
    Turn { turn: Turn },
    /// Quarter turn in a rolled direction.
    TurnRandom,
    /// Punch whatever is directly ahead.
    DestroyBlock,
    /// Place `block` in the acting entity's own cell.
    PlaceBlock { block: BlockKind },
    /// Place `block` in the cell directly ahead.
    PlaceBlockAhead { block: BlockKind },
    /// Do nothing for `seconds` of scaled sim time.
    Wait { seconds: f64 },
    /// Forward a sound id to the presentation.
    PlaySound { sound: String },
    /// Spawn a `tag` entity in the cell one step in `direction` from the
    /// acting entity.
    SpawnEntity {
        tag: TypeTag,
        behavior: BehaviorKind,
        direction: Facing,
    },
    /// Spawn a `tag` entity at an absolute cell.
    SpawnEntityAt {
        tag: TypeTag,
        behavior: BehaviorKind,
        position: GridPos,
        facing: Facing,
    },
    /// Remove the targeted entity (or every entity of the targeted type).
    DestroyEntity,
    /// Trigger the targeted entity's use behavior on behalf of `user`.
    UseEntity { user: EntityId },
    /// Highlight the targeted entity.
    Flash,
    /// Play an explosion effect at the targeted entity's cell.
    Explode,
    StartDay,
    StartNight,
    /// Evaluate "is `block` directly ahead" once, then expand one of the
    /// two bodies in place.
    IfBlockAhead {
        block: BlockKind,
        then_body: Vec<Step>,
        else_body: Vec<Step>,
    },
    /// While `block` is directly ahead, expand `body` followed by a
    /// re-check.
    WhilePathAhead { block: BlockKind, body: Vec<Step> },
    /// Evaluate the level goal and play the matching end presentation.
    CheckSolution,
}

impl Action {
    /// Stable lowerCamel name for logs and presentation history.
    pub fn name(&self) -> &'static str {
        match self {
            Action::MoveForward => "moveForward",
            Action::MoveDirection { .. } => "moveDirection",
            Action::MoveRandom => "moveRandom",
            Action::MoveToward { .. } => "moveToward",
            Action::MoveAway { .. } => "moveAway",
            Action::MoveTo { .. } => "moveTo",
            Action::Turn { .. } => "turn",
            Action::TurnRandom => "turnRandom",
            Action::DestroyBlock => "destroyBlock",
            Action::PlaceBlock { .. } => "placeBlock",
            Action::PlaceBlockAhead { .. } => "placeBlockAhead",
            Action::Wait { .. } => "wait",
            Action::PlaySound { .. } => "playSound",
            Action::SpawnEntity { .. } => "spawnEntity",
            Action::SpawnEntityAt { .. } => "spawnEntityAt",
            Action::DestroyEntity => "destroyEntity",
            Action::UseEntity { .. } => "useEntity",
            Action::Flash => "flash",
            Action::Explode => "explode",
            Action::StartDay => "startDay",
            Action::StartNight => "startNight",
            Action::IfBlockAhead { .. } => "ifBlockAhead",
            Action::WhilePathAhead { .. } => "whilePathAhead",
            Action::CheckSolution => "checkSolution",
        }
    }
}

// ---------------------------------------------------------------------------
// CommandOrigin / Command
// ---------------------------------------------------------------------------

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    /// Issued by the caller-facing action API.
    Program,
    /// Synthesized by the dispatcher during fan-out, target already
    /// narrowed to one entity.
    FanOut,
}

/// One scheduled unit of work.
#[derive(Debug)]
pub struct Command {
    pub id: CommandId,
    pub target: Target,
    pub action: Action,
    pub origin: CommandOrigin,
    state: CommandState,
}

impl Command {
    /// A program-issued command.
    pub fn new(id: CommandId, target: Target, action: Action) -> Self {
        Self {
            id,
            target,
            action,
            origin: CommandOrigin::Program,
            state: CommandState::Pending,
        }
    }

    /// A fan-out continuation: the same action, narrowed to one entity.
    pub fn continuation(id: CommandId, entity: EntityId, action: Action) -> Self {
        Self {
            id,
            target: Target::ById(entity),
            action,
            origin: CommandOrigin::FanOut,
            state: CommandState::Pending,
        }
    }

    #[inline]
    pub fn state(&self) -> CommandState {
        self.state
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a terminal transition. Returns `false` -- and leaves the
    /// recorded state untouched -- when the command is already terminal or
    /// `state` is not terminal. A rejected transition is a caller bug, so
    /// it is logged; it must never re-fire downstream effects.
    pub fn resolve(&mut self, state: CommandState) -> bool {
        if !state.is_terminal() {
            warn!(command = %self.id, "resolve called with non-terminal state");
            return false;
        }
        if self.state.is_terminal() {
            warn!(
                command = %self.id,
                action = self.action.name(),
                current = ?self.state,
                attempted = ?state,
                "terminal state transition repeated; ignoring"
            );
            return false;
        }
        self.state = state;
        true
    }

    /// Shorthand for `resolve(Succeeded)`.
    pub fn succeed(&mut self) -> bool {
        self.resolve(CommandState::Succeeded)
    }

    /// Shorthand for `resolve(Failed)`.
    pub fn fail(&mut self) -> bool {
        self.resolve(CommandState::Failed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
