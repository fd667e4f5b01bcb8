//! Target resolution: fan-out, proximity tie-breaking, and self-reference
//! rejection.

use mattock_engine::prelude::*;

// -- helpers ----------------------------------------------------------------

fn sheep(id: &str, x: i32, y: i32) -> EntityDef {
    EntityDef {
        id: EntityId::new(id),
        tag: TypeTag::new("sheep"),
        behavior: BehaviorKind::Creature,
        position: GridPos::new(x, y),
        facing: Facing::Down,
    }
}

fn zombie(id: &str, x: i32, y: i32) -> EntityDef {
    EntityDef {
        id: EntityId::new(id),
        tag: TypeTag::new("zombie"),
        behavior: BehaviorKind::Creature,
        position: GridPos::new(x, y),
        facing: Facing::Down,
    }
}

/// Wide open pasture with the player in the middle.
fn pasture(entities: Vec<EntityDef>) -> LevelData {
    LevelData {
        width: 11,
        height: 11,
        ground_plane: vec![BlockKind::Grass; 121],
        action_plane: vec![BlockKind::Empty; 121],
        player_start: GridPos::new(5, 5),
        player_facing: Facing::Right,
        entities,
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

fn engine(entities: Vec<EntityDef>) -> Engine<InstantView> {
    Engine::new(pasture(entities), fast_config(), InstantView::new()).unwrap()
}

fn run_to_finish(engine: &mut Engine<InstantView>) {
    for _ in 0..1000 {
        if engine.is_finished() {
            return;
        }
        engine.tick();
    }
    panic!("program did not finish within 1000 ticks");
}

// -- fan-out ----------------------------------------------------------------

#[test]
fn type_target_fans_out_one_continuation_per_match() {
    let mut engine = engine(vec![
        sheep("s1", 1, 1),
        sheep("s2", 9, 1),
        sheep("s3", 1, 9),
    ]);
    engine.move_forward(Target::by_type("sheep"));
    engine.begin();
    engine.tick();

    // The parent succeeded at dispatch, before any child resolved.
    assert_eq!(
        engine.master_queue().current_state(),
        Some(CommandState::Succeeded)
    );
    assert_eq!(engine.diagnostics().fanned_out, 3);
    for id in ["s1", "s2", "s3"] {
        assert_eq!(engine.sub_queue_len(&EntityId::new(id)), 1);
    }
    // No child has reached a terminal state yet.
    assert_eq!(engine.diagnostics().succeeded, 0);

    run_to_finish(&mut engine);
    engine.run_ticks(100);
    // All three sheep stepped down one cell.
    assert_eq!(
        engine.registry().get(&EntityId::new("s1")).unwrap().pos,
        GridPos::new(1, 2)
    );
    assert_eq!(
        engine.registry().get(&EntityId::new("s2")).unwrap().pos,
        GridPos::new(9, 2)
    );
}

#[test]
fn fan_out_with_zero_matches_succeeds_trivially() {
    let mut engine = engine(vec![]);
    engine.move_forward(Target::by_type("sheep"));
    engine.begin();
    engine.tick();

    assert_eq!(
        engine.master_queue().current_state(),
        Some(CommandState::Succeeded)
    );
    assert_eq!(engine.diagnostics().fanned_out, 0);

    run_to_finish(&mut engine);
    assert!(engine.is_succeeded());
}

#[test]
fn child_failure_never_reaches_the_parent_program() {
    // Both sheep are told to walk down; one is boxed in by a zombie.
    let mut engine = engine(vec![
        sheep("free", 1, 1),
        sheep("boxed", 9, 1),
        zombie("wall", 9, 2),
    ]);
    engine.move_forward(Target::by_type("sheep"));
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);

    // Let the children play out.
    engine.run_ticks(100);
    assert!(engine.is_succeeded());
    let diag = engine.diagnostics();
    assert_eq!(diag.fanned_out, 2);
    // One child stepped, the other bumped and failed -- locally.
    assert!(diag.failed >= 1);
    assert_eq!(
        engine.registry().get(&EntityId::new("boxed")).unwrap().pos,
        GridPos::new(9, 1)
    );
}

#[test]
fn missing_concrete_target_fails_only_that_command() {
    let mut engine = engine(vec![sheep("s1", 1, 1)]);
    engine.move_forward(Target::by_id("nobody"));
    engine.move_forward(Target::player());
    engine.begin();
    run_to_finish(&mut engine);

    assert!(!engine.is_succeeded());
    // The second command still ran.
    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(6, 5));
}

// -- self-reference ---------------------------------------------------------

#[test]
fn move_toward_self_fails_immediately_without_mutation() {
    let mut engine = engine(vec![sheep("s1", 1, 1)]);
    let before = engine.registry().get(&EntityId::new("s1")).unwrap().pos;

    engine.move_toward(Target::by_id("s1"), Target::by_id("s1"));
    engine.begin();
    engine.tick();

    assert_eq!(
        engine.master_queue().current_state(),
        Some(CommandState::Failed)
    );
    assert_eq!(
        engine.registry().get(&EntityId::new("s1")).unwrap().pos,
        before
    );
    // Nothing was played and nothing fanned out.
    assert!(engine.view().history.is_empty());
    assert_eq!(engine.diagnostics().fanned_out, 0);
}

#[test]
fn move_away_from_self_type_fails_immediately() {
    let mut engine = engine(vec![sheep("s1", 1, 1), sheep("s2", 9, 9)]);
    engine.move_away(Target::by_type("sheep"), Target::by_type("sheep"));
    engine.begin();
    engine.tick();

    assert_eq!(
        engine.master_queue().current_state(),
        Some(CommandState::Failed)
    );
    assert_eq!(engine.diagnostics().fanned_out, 0);
}

// -- proximity --------------------------------------------------------------

#[test]
fn move_toward_picks_the_first_of_the_nearest_candidates() {
    // Candidates at distances 5, 3, 3, 7 from the player. The tie at
    // distance 3 keeps the earlier-spawned candidate, so the player steps
    // east toward d3a, not west toward d3b.
    let level = LevelData {
        width: 15,
        height: 15,
        ground_plane: vec![BlockKind::Grass; 225],
        action_plane: vec![BlockKind::Empty; 225],
        player_start: GridPos::new(7, 7),
        player_facing: Facing::Up,
        entities: vec![
            sheep("d5", 12, 7),
            sheep("d3a", 10, 7),
            sheep("d3b", 4, 7),
            sheep("d7", 0, 7),
        ],
        daytime: true,
        goal: Goal::Freeplay,
    };
    let mut engine = Engine::new(level, fast_config(), InstantView::new()).unwrap();
    engine.move_toward(Target::player(), Target::by_type("sheep"));
    engine.begin();
    run_to_finish(&mut engine);

    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(8, 7));
    assert_eq!(engine.registry().player().unwrap().facing, Facing::Right);
}

#[test]
fn move_toward_adjacent_reference_is_a_no_op_success() {
    let mut engine = engine(vec![sheep("s1", 6, 5)]);
    engine.move_toward(Target::player(), Target::by_id("s1"));
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);
    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(5, 5));
}

#[test]
fn type_to_type_crosses_each_actor_with_its_own_nearest() {
    // Two zombies, two sheep; each zombie should approach its own closest
    // sheep, not a globally chosen one.
    let mut engine = engine(vec![
        zombie("z_west", 1, 5),
        zombie("z_east", 9, 5),
        sheep("s_west", 3, 5),
        sheep("s_east", 7, 5),
    ]);
    engine.move_toward(Target::by_type("zombie"), Target::by_type("sheep"));
    engine.begin();
    engine.tick();
    assert_eq!(engine.diagnostics().fanned_out, 2);

    run_to_finish(&mut engine);
    engine.run_ticks(60);

    assert_eq!(
        engine.registry().get(&EntityId::new("z_west")).unwrap().pos,
        GridPos::new(2, 5)
    );
    assert_eq!(
        engine.registry().get(&EntityId::new("z_east")).unwrap().pos,
        GridPos::new(8, 5)
    );
}

#[test]
fn move_toward_with_no_candidates_succeeds_vacuously() {
    let mut engine = engine(vec![]);
    engine.move_toward(Target::player(), Target::by_type("sheep"));
    engine.start_attempt(|success, _| assert!(success));
    run_to_finish(&mut engine);
    assert_eq!(engine.registry().player().unwrap().pos, GridPos::new(5, 5));
}

// -- move-to chains ---------------------------------------------------------

#[test]
fn move_to_walks_until_adjacent_via_sub_queue_continuations() {
    let mut engine = engine(vec![sheep("s1", 9, 5)]);
    engine.move_to(Target::player(), Target::by_id("s1"));
    engine.begin();
    run_to_finish(&mut engine);

    // The first step happened under the master command...
    assert!(engine.registry().player().unwrap().pos.x >= 6);

    // ...and the rest of the walk continues on the player's sub-queue.
    engine.run_ticks(400);
    let player = engine.registry().player().unwrap();
    assert!(
        player.pos.is_adjacent(GridPos::new(9, 5)),
        "player at {} should end adjacent to the sheep",
        player.pos
    );
}
