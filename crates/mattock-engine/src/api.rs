//! The caller-facing action API.
//!
//! One method per action kind. Each builds a command and appends it to the
//! master program queue; `push_to_entity` injects work directly onto a live
//! entity's sub-queue instead, outside the program flow. Nothing executes
//! until [`start_attempt`](Engine::start_attempt) (or
//! [`begin`](Engine::begin)) and the host starts ticking.

use mattock_world::prelude::*;

use crate::command::{Action, Command, CommandId, Step, Target};
use crate::engine::Engine;
use crate::snapshot::WorldSnapshot;
use crate::view::Presentation;
use crate::DispatchError;

impl<V: Presentation> Engine<V> {
    fn enqueue(&mut self, target: Target, action: Action) -> CommandId {
        let id = self.alloc_id();
        self.enqueue_master(Command::new(id, target, action))
    }

    // -- movement -----------------------------------------------------------

    /// One step in the target's current facing.
    pub fn move_forward(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::MoveForward)
    }

    /// Face `facing`, then one step.
    pub fn move_direction(&mut self, target: Target, facing: Facing) -> CommandId {
        self.enqueue(target, Action::MoveDirection { facing })
    }

    /// One step in a rolled direction.
    pub fn move_random(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::MoveRandom)
    }

    /// One step closing the distance from `target` to `toward`.
    pub fn move_toward(&mut self, target: Target, toward: Target) -> CommandId {
        self.enqueue(target, Action::MoveToward { other: toward })
    }

    /// One step opening the distance from `target` to `away_from`.
    pub fn move_away(&mut self, target: Target, away_from: Target) -> CommandId {
        self.enqueue(target, Action::MoveAway { other: away_from })
    }

    /// Walk `target` until adjacent to `destination`.
    pub fn move_to(&mut self, target: Target, destination: Target) -> CommandId {
        self.enqueue(target, Action::MoveTo { other: destination })
    }

    pub fn turn_left(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::Turn { turn: Turn::Left })
    }

    pub fn turn_right(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::Turn { turn: Turn::Right })
    }

    pub fn turn_random(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::TurnRandom)
    }

    // -- blocks -------------------------------------------------------------

    /// Punch whatever is directly ahead of the target.
    pub fn destroy_block(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::DestroyBlock)
    }

    /// Place `block` in the target's own cell.
    pub fn place_block(&mut self, target: Target, block: BlockKind) -> CommandId {
        self.enqueue(target, Action::PlaceBlock { block })
    }

    /// Place `block` in the cell directly ahead of the target.
    pub fn place_block_ahead(&mut self, target: Target, block: BlockKind) -> CommandId {
        self.enqueue(target, Action::PlaceBlockAhead { block })
    }

    // -- timing and effects -------------------------------------------------

    /// Idle for `seconds` of scaled sim time.
    pub fn wait(&mut self, target: Target, seconds: f64) -> CommandId {
        self.enqueue(target, Action::Wait { seconds })
    }

    /// Forward a sound id to the presentation.
    pub fn play_sound(&mut self, sound: impl Into<String>) -> CommandId {
        self.enqueue(Target::player(), Action::PlaySound {
            sound: sound.into(),
        })
    }

    /// Highlight the target.
    pub fn flash_entity(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::Flash)
    }

    /// Explosion effect at the target's cell.
    pub fn explode_entity(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::Explode)
    }

    // -- entities -----------------------------------------------------------

    /// Spawn a `tag` entity one step in `direction` from `beside`.
    pub fn spawn_entity(
        &mut self,
        beside: Target,
        tag: impl Into<String>,
        behavior: BehaviorKind,
        direction: Facing,
    ) -> CommandId {
        self.enqueue(beside, Action::SpawnEntity {
            tag: TypeTag::new(tag),
            behavior,
            direction,
        })
    }

    /// Spawn a `tag` entity at an absolute cell.
    pub fn spawn_entity_at(
        &mut self,
        tag: impl Into<String>,
        behavior: BehaviorKind,
        position: GridPos,
        facing: Facing,
    ) -> CommandId {
        self.enqueue(Target::player(), Action::SpawnEntityAt {
            tag: TypeTag::new(tag),
            behavior,
            position,
            facing,
        })
    }

    /// Remove the targeted entity (or every entity of the targeted type).
    pub fn destroy_entity(&mut self, target: Target) -> CommandId {
        self.enqueue(target, Action::DestroyEntity)
    }

    /// Trigger `target`'s use behavior on behalf of `user`.
    pub fn use_entity(&mut self, user: EntityId, target: Target) -> CommandId {
        self.enqueue(target, Action::UseEntity { user })
    }

    // -- world state --------------------------------------------------------

    pub fn start_day(&mut self) -> CommandId {
        self.enqueue(Target::player(), Action::StartDay)
    }

    pub fn start_night(&mut self) -> CommandId {
        self.enqueue(Target::player(), Action::StartNight)
    }

    // -- control flow -------------------------------------------------------

    /// Test "is `block` directly ahead of `target`" once at execution time
    /// and expand the matching body in place.
    pub fn if_block_ahead(
        &mut self,
        target: Target,
        block: BlockKind,
        then_body: Vec<Step>,
        else_body: Vec<Step>,
    ) -> CommandId {
        self.enqueue(target, Action::IfBlockAhead {
            block,
            then_body,
            else_body,
        })
    }

    /// Re-evaluate "is `block` directly ahead of `target`" before every
    /// iteration, expanding `body` while it holds.
    pub fn while_path_ahead(
        &mut self,
        target: Target,
        block: BlockKind,
        body: Vec<Step>,
    ) -> CommandId {
        self.enqueue(target, Action::WhilePathAhead { block, body })
    }

    /// Evaluate the level goal and play the matching end presentation.
    pub fn check_solution(&mut self) -> CommandId {
        self.enqueue(Target::player(), Action::CheckSolution)
    }

    // -- attempt lifecycle --------------------------------------------------

    /// Begin processing the enqueued program. `on_complete` fires exactly
    /// once, when the master queue drains, with the overall outcome and
    /// the terminal world snapshot.
    pub fn start_attempt(&mut self, on_complete: impl FnOnce(bool, WorldSnapshot) + 'static) {
        self.set_on_complete(Box::new(on_complete));
        self.begin();
    }

    /// Inject `action` directly onto a live entity's sub-queue, bypassing
    /// the program queue.
    pub fn push_to_entity(
        &mut self,
        entity: &EntityId,
        action: Action,
    ) -> Result<CommandId, DispatchError> {
        if !self.entity_alive(entity) {
            return Err(DispatchError::TargetNotFound {
                id: entity.clone(),
            });
        }
        let id = self.alloc_id();
        let cmd = Command::new(id, Target::ById(entity.clone()), action);
        match self.sub_queue_mut(entity) {
            Some(queue) => {
                queue.add(cmd);
                Ok(id)
            }
            None => Err(DispatchError::TargetNotFound {
                id: entity.clone(),
            }),
        }
    }
}
