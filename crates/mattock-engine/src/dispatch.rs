//! Target resolution and fan-out dispatch.
//!
//! `dispatch` is the single entry point for executing a command, whether it
//! came off the master queue or an entity sub-queue. It decides between
//! three shapes of work:
//!
//! - **Concrete target**: delegate to the per-entity handler, which owns
//!   the command's terminal transition.
//! - **Type target**: synthesize one continuation per matching entity and
//!   push it onto that entity's sub-queue, then mark the command Succeeded
//!   *immediately*. Success means "dispatch completed" -- children resolve
//!   on their own sub-queues and their failures never propagate back.
//! - **Control flow**: evaluate the predicate against live world state and
//!   hand the chosen body back to the owning queue for in-place expansion.
//!
//! Move relations (toward / away / to) get their own resolution path
//! because both sides of the relation may independently be a type filter.

use std::collections::HashMap;

use mattock_world::prelude::*;
use rand_pcg::Pcg32;
use tracing::debug;

use crate::command::{Action, Command, CommandIds, Step, Target};
use crate::engine::{EngineConfig, SchedulerDiagnostics};
use crate::handlers;
use crate::queue::CommandQueue;
use crate::signal::SignalBus;
use crate::timer::Timers;
use crate::view::Presentation;
use crate::DispatchError;

// ---------------------------------------------------------------------------
// Ctx
// ---------------------------------------------------------------------------

/// Everything a dispatch pass may touch, passed explicitly -- there is no
/// ambient controller object. The command being dispatched is *not* in
/// here: the scheduler takes it out of its queue first, so handlers can
/// push to any sub-queue without aliasing.
pub(crate) struct Ctx<'a, V: Presentation> {
    pub world: &'a mut GridWorld,
    pub registry: &'a mut EntityRegistry,
    pub subs: &'a mut HashMap<EntityId, CommandQueue>,
    pub signals: &'a mut SignalBus,
    pub timers: &'a mut Timers,
    pub view: &'a mut V,
    pub events: &'a mut EventSink,
    pub rng: &'a mut Pcg32,
    pub ids: &'a mut CommandIds,
    pub config: &'a EngineConfig,
    pub diag: &'a mut SchedulerDiagnostics,
    pub clock_ms: f64,
    /// Backlog-driven shortening of handler delays, 1.0 = no speed-up.
    pub delay_factor: f64,
}

impl<V: Presentation> Ctx<'_, V> {
    /// Apply the configured time scale to a raw delay.
    pub fn scaled_ms(&self, ms: u64) -> u64 {
        (ms as f64 * self.config.time_scale).round() as u64
    }

    /// A handler delay between `min_ms` and `max_ms`, shortened toward
    /// `min_ms` as the program backlog grows, then time-scaled.
    pub fn move_delay(&self, min_ms: u64, max_ms: u64) -> u64 {
        let eased = (max_ms as f64 * self.delay_factor).round() as u64;
        self.scaled_ms(eased.max(min_ms))
    }

    /// Synthesize a fan-out continuation of `action` on `entity`'s
    /// sub-queue.
    pub fn push_continuation(&mut self, entity: &EntityId, action: Action) {
        let cmd = Command::continuation(self.ids.alloc(), entity.clone(), action);
        debug!(command = %cmd.id, entity = %entity, action = cmd.action.name(), "continuation queued");
        self.subs
            .entry(entity.clone())
            .or_insert_with(CommandQueue::started)
            .add(cmd);
        self.diag.fanned_out += 1;
    }

    /// Fail `cmd` synchronously, recording why at debug level. Diagnostics
    /// never alter control flow.
    pub fn fail_with(&mut self, cmd: &mut Command, err: DispatchError) {
        debug!(
            command = %cmd.id,
            action = cmd.action.name(),
            error = %err,
            "command failed at dispatch"
        );
        cmd.fail();
    }

    /// Remove an entity and discard its pending sub-queue.
    pub fn remove_entity(&mut self, id: &EntityId) {
        self.registry.remove(id);
        self.subs.remove(id);
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// The three movement relations that resolve a reference entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Toward,
    Away,
    To,
}

impl Relation {
    /// Rebuild the action for a continuation with a narrowed reference.
    pub fn action(self, other: Target) -> Action {
        match self {
            Relation::Toward => Action::MoveToward { other },
            Relation::Away => Action::MoveAway { other },
            Relation::To => Action::MoveTo { other },
        }
    }
}

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

/// Execute one command. Returns the steps to expand in place of the
/// command when it was control flow, `None` otherwise.
pub(crate) fn dispatch<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
) -> Option<Vec<Step>> {
    ctx.diag.dispatched += 1;
    match cmd.action.clone() {
        Action::MoveToward { other } => {
            dispatch_relation(ctx, cmd, Relation::Toward, other);
            None
        }
        Action::MoveAway { other } => {
            dispatch_relation(ctx, cmd, Relation::Away, other);
            None
        }
        Action::MoveTo { other } => {
            dispatch_relation(ctx, cmd, Relation::To, other);
            None
        }
        Action::DestroyEntity => {
            dispatch_destroy_entity(ctx, cmd);
            None
        }
        action => match cmd.target.clone() {
            Target::ByType(tag) => {
                fan_out(ctx, cmd, &tag);
                None
            }
            Target::ById(id) => {
                if !ctx.registry.is_alive(&id) {
                    ctx.fail_with(cmd, DispatchError::TargetNotFound { id });
                    return None;
                }
                handlers::run(ctx, cmd, &id, action)
            }
        },
    }
}

/// Expand a type-targeted command into one continuation per matching
/// entity. Zero matches is still success: the parent reports that the
/// dispatch completed, not that any child did anything.
fn fan_out<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command, tag: &TypeTag) {
    let matches = ctx.registry.of_tag(tag);
    for id in &matches {
        ctx.push_continuation(id, cmd.action.clone());
    }
    debug!(
        command = %cmd.id,
        action = cmd.action.name(),
        tag = %tag,
        count = matches.len(),
        "fan-out complete"
    );
    cmd.succeed();
}

/// Resolve a move relation's two sides.
///
/// When the acting side is a type, every actor gets its own continuation
/// and the command succeeds at fan-out. When the reference side is a type,
/// the nearest candidate is chosen per actor -- strictly smallest distance
/// wins, ties keep the earliest-spawned candidate.
pub(crate) fn dispatch_relation<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    rel: Relation,
    other: Target,
) {
    if cmd.target == other {
        let target = cmd.target.clone();
        ctx.fail_with(cmd, DispatchError::SelfReferenceInvalid { target });
        return;
    }
    match (cmd.target.clone(), other) {
        (Target::ById(me), Target::ById(them)) => {
            if !ctx.registry.is_alive(&me) {
                ctx.fail_with(cmd, DispatchError::TargetNotFound { id: me });
                return;
            }
            if !ctx.registry.is_alive(&them) {
                ctx.fail_with(cmd, DispatchError::TargetNotFound { id: them });
                return;
            }
            handlers::relation_step(ctx, cmd, &me, &them, rel);
        }
        (Target::ById(me), Target::ByType(rtag)) => {
            if !ctx.registry.is_alive(&me) {
                ctx.fail_with(cmd, DispatchError::TargetNotFound { id: me });
                return;
            }
            let candidates = ctx.registry.of_tag(&rtag);
            match nearest_to(ctx.registry, &me, &candidates) {
                Some(them) => handlers::relation_step(ctx, cmd, &me, &them, rel),
                None => {
                    // Nothing to relate to; trivially done.
                    debug!(command = %cmd.id, tag = %rtag, "no relation candidates");
                    cmd.succeed();
                }
            }
        }
        (Target::ByType(tag), reference) => {
            let actors = ctx.registry.of_tag(&tag);
            match reference {
                Target::ById(them) => {
                    for actor in &actors {
                        ctx.push_continuation(actor, rel.action(Target::ById(them.clone())));
                    }
                }
                Target::ByType(rtag) => {
                    // Cross the sets: each actor independently picks its
                    // own nearest reference, resolved now.
                    let candidates = ctx.registry.of_tag(&rtag);
                    for actor in &actors {
                        if let Some(them) = nearest_to(ctx.registry, actor, &candidates) {
                            ctx.push_continuation(actor, rel.action(Target::ById(them)));
                        }
                    }
                }
            }
            cmd.succeed();
        }
    }
}

/// Destroy the targeted entity, or every entity of the targeted type.
/// Registry and type index mutate synchronously; pending sub-queues are
/// discarded. The player is indestructible -- a no-op, not a failure.
pub(crate) fn dispatch_destroy_entity<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command) {
    match cmd.target.clone() {
        Target::ById(id) => {
            if id.is_player() {
                debug!(command = %cmd.id, "the player cannot be destroyed");
            } else {
                ctx.remove_entity(&id);
            }
            cmd.succeed();
        }
        Target::ByType(tag) => {
            for id in ctx.registry.of_tag(&tag) {
                ctx.remove_entity(&id);
            }
            cmd.succeed();
        }
    }
}

/// The candidate at the strictly smallest distance from `me`; ties keep
/// the first-encountered candidate.
fn nearest_to(
    registry: &EntityRegistry,
    me: &EntityId,
    candidates: &[EntityId],
) -> Option<EntityId> {
    let my = registry.get(me)?.pos;
    let mut best: Option<(i64, EntityId)> = None;
    for candidate in candidates {
        let Some(entity) = registry.get(candidate) else {
            continue;
        };
        let distance = my.distance_sq(entity.pos);
        if best.as_ref().map_or(true, |(d, _)| distance < *d) {
            best = Some((distance, candidate.clone()));
        }
    }
    best.map(|(_, id)| id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_keeps_the_first_of_tied_candidates() {
        let mut registry = EntityRegistry::new();
        let mut put = |id: &str, x: i32| {
            registry
                .insert(Entity::new(
                    EntityId::new(id),
                    TypeTag::new("sheep"),
                    BehaviorKind::Creature,
                    GridPos::new(x, 0),
                    Facing::Up,
                ))
                .unwrap();
        };
        put("me", 0);
        put("far", 5);
        put("near_a", 3);
        put("near_b", -3);
        put("farther", 7);

        let candidates = [
            EntityId::new("far"),
            EntityId::new("near_a"),
            EntityId::new("near_b"),
            EntityId::new("farther"),
        ];
        let chosen = nearest_to(&registry, &EntityId::new("me"), &candidates);
        assert_eq!(chosen, Some(EntityId::new("near_a")));
    }

    #[test]
    fn nearest_skips_dead_candidates() {
        let mut registry = EntityRegistry::new();
        for (id, x) in [("me", 0), ("alive", 4)] {
            registry
                .insert(Entity::new(
                    EntityId::new(id),
                    TypeTag::new("sheep"),
                    BehaviorKind::Creature,
                    GridPos::new(x, 0),
                    Facing::Up,
                ))
                .unwrap();
        }
        let candidates = [EntityId::new("ghost"), EntityId::new("alive")];
        let chosen = nearest_to(&registry, &EntityId::new("me"), &candidates);
        assert_eq!(chosen, Some(EntityId::new("alive")));
    }
}
