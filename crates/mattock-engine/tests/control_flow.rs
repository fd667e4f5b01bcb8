//! Conditional and loop commands: predicate evaluation against live world
//! state, in-place body expansion, per-iteration body cloning.

use mattock_engine::prelude::*;

// -- helpers ----------------------------------------------------------------

fn corridor(action: Vec<BlockKind>) -> LevelData {
    let width = action.len() as u32;
    LevelData {
        width,
        height: 1,
        ground_plane: vec![BlockKind::Grass; action.len()],
        action_plane: action,
        player_start: GridPos::new(0, 0),
        player_facing: Facing::Right,
        entities: vec![],
        daytime: true,
        goal: Goal::Freeplay,
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        fixed_dt: 0.1,
        ..EngineConfig::default()
    }
}

fn engine(action: Vec<BlockKind>) -> Engine<InstantView> {
    Engine::new(corridor(action), fast_config(), InstantView::new()).unwrap()
}

fn run_to_finish(engine: &mut Engine<InstantView>) {
    for _ in 0..2000 {
        if engine.is_finished() {
            return;
        }
        engine.tick();
    }
    panic!("program did not finish within 2000 ticks");
}

fn step(action: Action) -> Step {
    Step::new(Target::player(), action)
}

// -- conditionals -----------------------------------------------------------

#[test]
fn if_expands_the_then_branch_on_a_hit() {
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::Empty, BlockKind::LogOak]);
    engine.move_forward(Target::player()); // now the log is ahead
    engine.if_block_ahead(
        Target::player(),
        BlockKind::LogOak,
        vec![step(Action::DestroyBlock)],
        vec![step(Action::Turn { turn: Turn::Left })],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    // The then-branch ran: the log is gone and no turn happened.
    assert_eq!(
        engine.world().block_at(PlaneKind::Action, GridPos::new(2, 0)),
        Some(BlockKind::Empty)
    );
    assert_eq!(engine.registry().player().unwrap().facing, Facing::Right);
}

#[test]
fn if_expands_the_else_branch_on_a_miss() {
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::Empty]);
    engine.if_block_ahead(
        Target::player(),
        BlockKind::LogOak,
        vec![step(Action::DestroyBlock)],
        vec![step(Action::Turn { turn: Turn::Left })],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    assert_eq!(engine.registry().player().unwrap().facing, Facing::Up);
    // The then-branch never played a destroy.
    assert!(engine
        .view()
        .history
        .iter()
        .all(|label| !label.starts_with("destroyBlock")));
}

#[test]
fn expansion_runs_before_the_rest_of_the_program() {
    // The conditional's body must execute ahead of the already-queued
    // trailing command.
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::Empty, BlockKind::Empty]);
    engine.if_block_ahead(
        Target::player(),
        BlockKind::Empty,
        vec![step(Action::MoveForward)],
        vec![],
    );
    engine.turn_left(Target::player());
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    let history = &engine.view().history;
    let move_at = history.iter().position(|l| l.starts_with("move ")).unwrap();
    let turn_at = history.iter().position(|l| l.starts_with("turn ")).unwrap();
    assert!(move_at < turn_at, "body must run before the trailing turn");
}

// -- loops ------------------------------------------------------------------

#[test]
fn while_with_a_false_guard_runs_zero_iterations() {
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::LogOak]);
    engine.while_path_ahead(
        Target::player(),
        BlockKind::Empty,
        vec![step(Action::MoveForward)],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(0, 0));
    assert!(engine.view().history.is_empty());
}

#[test]
fn while_walks_until_the_path_ends() {
    // Five open cells: four true evaluations, then the edge stops it.
    let mut engine = engine(vec![BlockKind::Empty; 5]);
    engine.while_path_ahead(
        Target::player(),
        BlockKind::Empty,
        vec![step(Action::MoveForward)],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(4, 0));
    // Exactly one move per true evaluation.
    let moves = engine
        .view()
        .history
        .iter()
        .filter(|l| l.starts_with("move "))
        .count();
    assert_eq!(moves, 4);
}

#[test]
fn while_terminates_when_the_body_changes_the_guard() {
    // The guard is "a log ahead"; destroying it makes the next re-check
    // false after exactly one iteration.
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::LogOak, BlockKind::Empty]);
    engine.while_path_ahead(
        Target::player(),
        BlockKind::LogOak,
        vec![step(Action::DestroyBlock)],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    let destroys = engine
        .view()
        .history
        .iter()
        .filter(|l| l.starts_with("destroyBlock"))
        .count();
    assert_eq!(destroys, 1);
    assert_eq!(
        engine.world().block_at(PlaneKind::Action, GridPos::new(1, 0)),
        Some(BlockKind::Empty)
    );
}

#[test]
fn nested_bodies_expand_depth_first() {
    // A conditional inside a loop body: the inner expansion must complete
    // before the loop re-check runs.
    let mut engine = engine(vec![BlockKind::Empty, BlockKind::Empty, BlockKind::Empty]);
    engine.while_path_ahead(
        Target::player(),
        BlockKind::Empty,
        vec![step(Action::IfBlockAhead {
            block: BlockKind::Empty,
            then_body: vec![step(Action::MoveForward)],
            else_body: vec![],
        })],
    );
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(2, 0));
}
