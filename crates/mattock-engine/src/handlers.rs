//! Per-entity action handlers.
//!
//! A handler receives a command whose target has already resolved to one
//! live entity. It mutates the world, asks the presentation to play the
//! matching visual, and either resolves the command synchronously or arms
//! a completion on the signal bus. Handlers never dispatch other commands
//! directly -- cross-entity effects go through a continuation on the other
//! entity's sub-queue, picked up on a later tick.

use mattock_world::prelude::*;
use rand::Rng;
use tracing::debug;

use crate::command::{Action, Command, CommandState, Step, Target};
use crate::dispatch::{dispatch_destroy_entity, dispatch_relation, Ctx, Relation};
use crate::view::{BlockAnim, BumpAnim, MoveAnim, Presentation, TurnAnim, UseAnim};
use crate::DispatchError;

// Delay windows, pre-scaling. The max end eases toward the min as the
// program backlog grows (see `Ctx::move_delay`).
const MOVE_DELAY_MIN_MS: u64 = 200;
const MOVE_DELAY_MAX_MS: u64 = 400;
const TURN_DELAY_MIN_MS: u64 = 150;
const TURN_DELAY_MAX_MS: u64 = 300;
const PUNCH_DELAY_MIN_MS: u64 = 200;
const PUNCH_DELAY_MAX_MS: u64 = 600;
/// Settle time for a placement the grid refused.
const PLACE_BOUNCE_DELAY_MS: u64 = 800;
/// Settle time for a use action with nothing to trigger.
const USE_IDLE_DELAY_MS: u64 = 200;

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Execute `action` for the live entity `id`. Returns expansion steps for
/// control-flow actions.
pub(crate) fn run<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    action: Action,
) -> Option<Vec<Step>> {
    match action {
        Action::MoveForward => move_step(ctx, cmd, id, None),
        Action::MoveDirection { facing } => move_step(ctx, cmd, id, Some(facing)),
        Action::MoveRandom => {
            let facing = Facing::from_index(ctx.rng.gen_range(0..4));
            move_step(ctx, cmd, id, Some(facing));
        }
        Action::Turn { turn } => turn_step(ctx, cmd, id, turn),
        Action::TurnRandom => {
            let turn = if ctx.rng.gen_bool(0.5) {
                Turn::Left
            } else {
                Turn::Right
            };
            turn_step(ctx, cmd, id, turn);
        }
        Action::DestroyBlock => destroy_block(ctx, cmd, id),
        Action::PlaceBlock { block } => place_block(ctx, cmd, id, block),
        Action::PlaceBlockAhead { block } => place_block_ahead(ctx, cmd, id, block),
        Action::Wait { seconds } => wait(ctx, cmd, seconds),
        Action::PlaySound { sound } => {
            ctx.view.play_sound(&sound);
            cmd.succeed();
        }
        Action::SpawnEntity {
            tag,
            behavior,
            direction,
        } => spawn_beside(ctx, cmd, id, tag, behavior, direction),
        Action::SpawnEntityAt {
            tag,
            behavior,
            position,
            facing,
        } => spawn_at(ctx, cmd, tag, behavior, position, facing),
        Action::UseEntity { user } => use_entity(ctx, cmd, id, &user),
        Action::Flash => {
            let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
            ctx.view.play_flash(id.clone(), done);
        }
        Action::Explode => {
            if let Some(entity) = ctx.registry.get(id) {
                ctx.view.play_explosion(entity.pos);
            }
            cmd.succeed();
        }
        Action::StartDay => day_night(ctx, cmd, true),
        Action::StartNight => day_night(ctx, cmd, false),
        Action::IfBlockAhead {
            block,
            then_body,
            else_body,
        } => return if_block_ahead(ctx, cmd, id, block, then_body, else_body),
        Action::WhilePathAhead { block, body } => {
            return while_path_ahead(ctx, cmd, id, block, body)
        }
        Action::CheckSolution => check_solution(ctx, cmd),
        // The dispatcher resolves these before per-entity handling; a
        // continuation that re-enters with a concrete target takes the
        // same path.
        Action::MoveToward { other } => dispatch_relation(ctx, cmd, Relation::Toward, other),
        Action::MoveAway { other } => dispatch_relation(ctx, cmd, Relation::Away, other),
        Action::MoveTo { other } => dispatch_relation(ctx, cmd, Relation::To, other),
        Action::DestroyEntity => dispatch_destroy_entity(ctx, cmd),
    }
    None
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

fn move_step<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    direction: Option<Facing>,
) {
    let Some((from, current_facing, mobile)) = ctx
        .registry
        .get(id)
        .map(|e| (e.pos, e.facing, e.capabilities().mobile))
    else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    if !mobile {
        ctx.fail_with(
            cmd,
            DispatchError::ActionPreconditionFailed {
                reason: format!("entity '{id}' cannot move"),
            },
        );
        return;
    }

    let facing = direction.unwrap_or(current_facing);
    let dest = from.step(facing);
    let blocked = ctx.world.is_blocked_at(dest) || ctx.registry.is_occupied(dest);

    // The turn commits even when the step is refused.
    if let Some(entity) = ctx.registry.get_mut(id) {
        entity.facing = facing;
    }

    if blocked {
        debug!(command = %cmd.id, entity = %id, %dest, "move refused, destination blocked");
        let done = ctx.signals.arm(cmd.id, CommandState::Failed);
        ctx.view.play_bump(
            BumpAnim {
                entity: id.clone(),
                at: from,
                facing,
            },
            done,
        );
        return;
    }

    commit_move(ctx, id, dest);
    let done = ctx.signals.arm_after(
        cmd.id,
        CommandState::Succeeded,
        ctx.move_delay(MOVE_DELAY_MIN_MS, MOVE_DELAY_MAX_MS),
    );
    ctx.view.play_move(
        MoveAnim {
            entity: id.clone(),
            from,
            to: dest,
            facing,
        },
        done,
    );
}

fn commit_move<V: Presentation>(ctx: &mut Ctx<'_, V>, id: &EntityId, dest: GridPos) {
    if let Some(entity) = ctx.registry.get_mut(id) {
        entity.pos = dest;
    }
    if id.is_player() {
        ctx.world.set_player_pos(dest);
    }
}

fn turn_step<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command, id: &EntityId, turn: Turn) {
    let Some(facing) = ctx.registry.get_mut(id).map(|e| {
        e.facing = e.facing.turned(turn);
        e.facing
    }) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    let done = ctx.signals.arm_after(
        cmd.id,
        CommandState::Succeeded,
        ctx.move_delay(TURN_DELAY_MIN_MS, TURN_DELAY_MAX_MS),
    );
    ctx.view.play_turn(
        TurnAnim {
            entity: id.clone(),
            facing,
        },
        done,
    );
}

// ---------------------------------------------------------------------------
// Move relations
// ---------------------------------------------------------------------------

/// One step of a resolved relation: `me` approaches, flees, or walks to
/// `them`. For [`Relation::To`] a successful step also re-issues the
/// relation as a continuation on `me`'s own sub-queue, so the walk
/// continues chain-by-chain until adjacent.
pub(crate) fn relation_step<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    me: &EntityId,
    them: &EntityId,
    rel: Relation,
) {
    let Some((my, mobile)) = ctx
        .registry
        .get(me)
        .map(|e| (e.pos, e.capabilities().mobile))
    else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: me.clone() });
        return;
    };
    let Some(their) = ctx.registry.get(them).map(|e| e.pos) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: them.clone() });
        return;
    };
    if !mobile {
        ctx.fail_with(
            cmd,
            DispatchError::ActionPreconditionFailed {
                reason: format!("entity '{me}' cannot move"),
            },
        );
        return;
    }

    if rel != Relation::Away && my.is_adjacent(their) {
        cmd.succeed();
        return;
    }

    let chosen = step_candidates(my, their, rel).into_iter().find(|facing| {
        let dest = my.step(*facing);
        !ctx.world.is_blocked_at(dest) && !ctx.registry.is_occupied(dest)
    });

    let Some(facing) = chosen else {
        debug!(command = %cmd.id, entity = %me, "relation step refused, all candidates blocked");
        let current = ctx.registry.get(me).map_or(Facing::Up, |e| e.facing);
        let done = ctx.signals.arm(cmd.id, CommandState::Failed);
        ctx.view.play_bump(
            BumpAnim {
                entity: me.clone(),
                at: my,
                facing: current,
            },
            done,
        );
        return;
    };

    let dest = my.step(facing);
    if let Some(entity) = ctx.registry.get_mut(me) {
        entity.facing = facing;
    }
    commit_move(ctx, me, dest);

    let done = ctx.signals.arm_after(
        cmd.id,
        CommandState::Succeeded,
        ctx.move_delay(MOVE_DELAY_MIN_MS, MOVE_DELAY_MAX_MS),
    );
    ctx.view.play_move(
        MoveAnim {
            entity: me.clone(),
            from: my,
            to: dest,
            facing,
        },
        done,
    );

    if rel == Relation::To {
        ctx.push_continuation(me, Action::MoveTo {
            other: Target::ById(them.clone()),
        });
    }
}

/// Candidate facings for a relation step, preferred axis first: the axis
/// with the larger coordinate delta, x winning ties. Fleeing offers both
/// axes even when one delta is zero -- any perpendicular step still opens
/// distance.
fn step_candidates(my: GridPos, their: GridPos, rel: Relation) -> Vec<Facing> {
    let dx = their.x - my.x;
    let dy = their.y - my.y;
    match rel {
        Relation::Toward | Relation::To => {
            let toward_h = if dx > 0 { Facing::Right } else { Facing::Left };
            let toward_v = if dy > 0 { Facing::Down } else { Facing::Up };
            let mut out = Vec::with_capacity(2);
            if dx.abs() >= dy.abs() {
                if dx != 0 {
                    out.push(toward_h);
                }
                if dy != 0 {
                    out.push(toward_v);
                }
            } else {
                out.push(toward_v);
                if dx != 0 {
                    out.push(toward_h);
                }
            }
            out
        }
        Relation::Away => {
            let away_h = if dx >= 0 { Facing::Left } else { Facing::Right };
            let away_v = if dy >= 0 { Facing::Up } else { Facing::Down };
            if dx.abs() >= dy.abs() {
                vec![away_h, away_v]
            } else {
                vec![away_v, away_h]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

fn destroy_block<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command, id: &EntityId) {
    let Some((pos, facing)) = ctx.registry.get(id).map(|e| (e.pos, e.facing)) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    let ahead = pos.step(facing);

    if let Some(dropped) = ctx.world.destroy_at(ahead) {
        let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
        ctx.view.play_destroy_block(
            BlockAnim {
                entity: id.clone(),
                at: ahead,
                block: dropped,
            },
            done,
        );
        return;
    }

    // No destroyable block: a usable entity ahead gets a use continuation
    // on its own sub-queue instead, and this command is done.
    if let Some(front) = ctx.registry.entity_at(ahead).map(|e| e.id.clone()) {
        ctx.push_continuation(&front, Action::UseEntity { user: id.clone() });
        cmd.succeed();
        return;
    }

    // Nothing at all ahead: a no-op punch that settles after an idle.
    let done = ctx.signals.arm_after(
        cmd.id,
        CommandState::Succeeded,
        ctx.move_delay(PUNCH_DELAY_MIN_MS, PUNCH_DELAY_MAX_MS),
    );
    ctx.view.play_punch_air(
        BumpAnim {
            entity: id.clone(),
            at: pos,
            facing,
        },
        done,
    );
}

fn place_block<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    block: BlockKind,
) {
    let Some((pos, behavior)) = ctx.registry.get(id).map(|e| (e.pos, e.behavior)) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    let Some(ground) = ctx.world.block_at(PlaneKind::Ground, pos) else {
        ctx.fail_with(
            cmd,
            DispatchError::ActionPreconditionFailed {
                reason: format!("no ground under {pos}"),
            },
        );
        return;
    };

    let Some(plane) = (behavior.capabilities().place_over)(block, ground) else {
        ctx.fail_with(
            cmd,
            DispatchError::ActionPreconditionFailed {
                reason: format!("entity '{id}' may not place {block} over {ground}"),
            },
        );
        return;
    };

    let anim = BlockAnim {
        entity: id.clone(),
        at: pos,
        block,
    };
    if ctx.world.place_at(pos, block, plane) {
        let done = ctx.signals.arm_after(
            cmd.id,
            CommandState::Succeeded,
            ctx.move_delay(MOVE_DELAY_MIN_MS, MOVE_DELAY_MAX_MS),
        );
        ctx.view.play_place_block(anim, done);
    } else {
        // The grid refused the kind. The attempt looks failed on screen
        // but still counts as done after a longer settle.
        let done = ctx.signals.arm_after(
            cmd.id,
            CommandState::Succeeded,
            ctx.scaled_ms(PLACE_BOUNCE_DELAY_MS),
        );
        ctx.view.play_place_bounce(anim, done);
    }
}

fn place_block_ahead<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    block: BlockKind,
) {
    let Some((pos, facing)) = ctx.registry.get(id).map(|e| (e.pos, e.facing)) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    let ahead = pos.step(facing);

    let decision = match (
        ctx.world.block_at(PlaneKind::Action, ahead),
        ctx.world.block_at(PlaneKind::Ground, ahead),
    ) {
        (Some(BlockKind::Empty), Some(ground)) => ctx
            .registry
            .get(id)
            .and_then(|e| e.can_place_over(block, ground))
            .map(|plane| (plane, ground)),
        _ => None,
    };

    let placed = decision
        .map(|(plane, ground)| (ctx.world.place_at(ahead, block, plane), ground))
        .filter(|(ok, _)| *ok);

    match placed {
        Some((_, ground)) => {
            if ground.is_liquid() {
                ctx.view.play_sound("fizz");
            }
            let done = ctx.signals.arm_after(
                cmd.id,
                CommandState::Succeeded,
                ctx.move_delay(MOVE_DELAY_MIN_MS, MOVE_DELAY_MAX_MS),
            );
            ctx.view.play_place_block(
                BlockAnim {
                    entity: id.clone(),
                    at: ahead,
                    block,
                },
                done,
            );
        }
        None => {
            // Forward placement that cannot happen is a shrug, not a
            // failure: punch the air and move on.
            let done = ctx.signals.arm_after(
                cmd.id,
                CommandState::Succeeded,
                ctx.move_delay(PUNCH_DELAY_MIN_MS, PUNCH_DELAY_MAX_MS),
            );
            ctx.view.play_punch_air(
                BumpAnim {
                    entity: id.clone(),
                    at: pos,
                    facing,
                },
                done,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

fn wait<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command, seconds: f64) {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
    ctx.timers.after(ctx.clock_ms, ctx.scaled_ms(ms), done);
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

fn spawn_beside<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    tag: TypeTag,
    behavior: BehaviorKind,
    direction: Facing,
) {
    let Some(base) = ctx.registry.get(id).map(|e| e.pos) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return;
    };
    spawn_into(ctx, cmd, tag, behavior, base.step(direction), direction, Some(id.clone()));
}

fn spawn_at<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    tag: TypeTag,
    behavior: BehaviorKind,
    position: GridPos,
    facing: Facing,
) {
    spawn_into(ctx, cmd, tag, behavior, position, facing, None);
}

fn spawn_into<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    tag: TypeTag,
    behavior: BehaviorKind,
    cell: GridPos,
    facing: Facing,
    spawned_by: Option<EntityId>,
) {
    let valid =
        ctx.world.in_bounds(cell) && !ctx.world.is_blocked_at(cell) && !ctx.registry.is_occupied(cell);
    if !valid {
        ctx.fail_with(cmd, DispatchError::NoSpawnCell { pos: cell });
        return;
    }
    let new_id = ctx
        .registry
        .insert_generated(tag.clone(), behavior, cell, facing);
    ctx.subs
        .insert(new_id.clone(), crate::queue::CommandQueue::started());
    ctx.events.raise(WorldEvent::EntitySpawned {
        entity: new_id,
        tag,
        spawned_by,
    });
    cmd.succeed();
}

fn use_entity<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    target: &EntityId,
    user: &EntityId,
) {
    let Some((usable, used, pos)) = ctx
        .registry
        .get(target)
        .map(|e| (e.capabilities().usable, e.used, e.pos))
    else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: target.clone() });
        return;
    };

    if usable && !used {
        if let Some(entity) = ctx.registry.get_mut(target) {
            entity.used = true;
        }
        ctx.events.raise(WorldEvent::EntityUsed {
            entity: target.clone(),
            by: user.clone(),
        });
        let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
        ctx.view.play_shear(
            UseAnim {
                user: user.clone(),
                target: target.clone(),
                at: pos,
            },
            done,
        );
    } else {
        // Already used, or not usable at all: settle after a short idle.
        let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
        ctx.timers
            .after(ctx.clock_ms, ctx.scaled_ms(USE_IDLE_DELAY_MS), done);
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

fn day_night<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command, to_day: bool) {
    if ctx.world.is_daytime() == to_day {
        let state = if to_day { "day" } else { "night" };
        ctx.fail_with(
            cmd,
            DispatchError::ActionPreconditionFailed {
                reason: format!("already {state}time"),
            },
        );
        return;
    }
    ctx.world.set_daytime(to_day);
    ctx.events.raise(if to_day {
        WorldEvent::DayStarted
    } else {
        WorldEvent::NightStarted
    });
    cmd.succeed();
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

fn if_block_ahead<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    block: BlockKind,
    then_body: Vec<Step>,
    else_body: Vec<Step>,
) -> Option<Vec<Step>> {
    let Some((pos, facing)) = ctx.registry.get(id).map(|e| (e.pos, e.facing)) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return None;
    };
    let hit = ctx.world.forward_block_is(pos, facing, block);
    debug!(command = %cmd.id, %block, hit, "conditional evaluated");
    cmd.succeed();
    Some(if hit { then_body } else { else_body })
}

fn while_path_ahead<V: Presentation>(
    ctx: &mut Ctx<'_, V>,
    cmd: &mut Command,
    id: &EntityId,
    block: BlockKind,
    body: Vec<Step>,
) -> Option<Vec<Step>> {
    let Some((pos, facing)) = ctx.registry.get(id).map(|e| (e.pos, e.facing)) else {
        ctx.fail_with(cmd, DispatchError::TargetNotFound { id: id.clone() });
        return None;
    };
    if !ctx.world.forward_block_is(pos, facing, block) {
        // Guard false on first evaluation: zero iterations, plain success.
        cmd.succeed();
        return None;
    }
    // Expand a fresh copy of the body followed by a re-check of the same
    // loop. Cloning per iteration keeps iterations from sharing state.
    let mut steps = body.clone();
    steps.push(Step::new(
        cmd.target.clone(),
        Action::WhilePathAhead { block, body },
    ));
    cmd.succeed();
    Some(steps)
}

fn check_solution<V: Presentation>(ctx: &mut Ctx<'_, V>, cmd: &mut Command) {
    if ctx.world.is_solved() {
        let done = ctx.signals.arm(cmd.id, CommandState::Succeeded);
        ctx.view.play_success(done);
    } else {
        let done = ctx.signals.arm(cmd.id, CommandState::Failed);
        ctx.view.play_failure(done);
    }
}
