//! Property tests over random programs.
//!
//! Generates random straight-line programs (no control flow -- loops get
//! deterministic coverage elsewhere) against a pasture with a few sheep,
//! runs them to completion, and checks the scheduler's bookkeeping
//! invariants: every dispatched command reaches a terminal state exactly
//! once, no terminal transition ever re-fires, and type-targeted dispatch
//! fans out one continuation per live match.

use mattock_engine::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    MoveForward,
    MoveDirection(u8),
    TurnLeft,
    TurnRight,
    Wait(u8),
    DestroyBlock,
    PlaceBlock,
    FlashSheep,
    HerdSheepForward,
    MoveTowardSheep,
    MoveAwaySheep,
    PlaySound,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::MoveForward),
        (0u8..4).prop_map(Op::MoveDirection),
        Just(Op::TurnLeft),
        Just(Op::TurnRight),
        (0u8..3).prop_map(Op::Wait),
        Just(Op::DestroyBlock),
        Just(Op::PlaceBlock),
        Just(Op::FlashSheep),
        Just(Op::HerdSheepForward),
        Just(Op::MoveTowardSheep),
        Just(Op::MoveAwaySheep),
        Just(Op::PlaySound),
    ]
}

fn pasture() -> LevelData {
    let mut action = vec![BlockKind::Empty; 81];
    // A few logs to punch.
    action[4 * 9 + 6] = BlockKind::LogOak;
    action[2 * 9 + 2] = BlockKind::LogBirch;
    LevelData {
        width: 9,
        height: 9,
        ground_plane: vec![BlockKind::Grass; 81],
        action_plane: action,
        player_start: GridPos::new(4, 4),
        player_facing: Facing::Right,
        entities: vec![
            EntityDef {
                id: EntityId::new("woolly"),
                tag: TypeTag::new("sheep"),
                behavior: BehaviorKind::Creature,
                position: GridPos::new(1, 1),
                facing: Facing::Down,
            },
            EntityDef {
                id: EntityId::new("shorn"),
                tag: TypeTag::new("sheep"),
                behavior: BehaviorKind::Creature,
                position: GridPos::new(7, 6),
                facing: Facing::Up,
            },
        ],
        daytime: true,
        goal: Goal::Freeplay,
    }
}

fn apply(engine: &mut Engine<InstantView>, op: &Op) {
    let player = Target::player();
    let sheep = Target::by_type("sheep");
    match op {
        Op::MoveForward => engine.move_forward(player),
        Op::MoveDirection(i) => engine.move_direction(player, Facing::from_index(*i as usize)),
        Op::TurnLeft => engine.turn_left(player),
        Op::TurnRight => engine.turn_right(player),
        Op::Wait(tenths) => engine.wait(player, *tenths as f64 / 10.0),
        Op::DestroyBlock => engine.destroy_block(player),
        Op::PlaceBlock => engine.place_block(player, BlockKind::Wool),
        Op::FlashSheep => engine.flash_entity(sheep),
        Op::HerdSheepForward => engine.move_forward(sheep),
        Op::MoveTowardSheep => engine.move_toward(player, sheep),
        Op::MoveAwaySheep => engine.move_away(player, sheep),
        Op::PlaySound => engine.play_sound("step"),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random programs drain completely and every command resolves exactly
    /// once.
    #[test]
    fn programs_drain_with_one_shot_resolutions(ops in prop::collection::vec(op_strategy(), 1..15)) {
        let config = EngineConfig { fixed_dt: 0.1, ..EngineConfig::default() };
        let mut engine = Engine::new(pasture(), config, InstantView::new()).unwrap();

        for op in &ops {
            apply(&mut engine, op);
        }
        engine.begin();

        let mut finished_at = None;
        for tick in 0..4000u64 {
            if engine.is_finished() {
                finished_at = Some(tick);
                break;
            }
            engine.tick();
        }
        prop_assert!(finished_at.is_some(), "program never drained");

        // Let fanned-out sub-queue work play out too.
        engine.run_ticks(600);

        let diag = engine.diagnostics();
        // Exactly once: nothing resolved twice, nothing left un-resolved.
        prop_assert_eq!(diag.reuse_rejected, 0);
        prop_assert_eq!(diag.succeeded + diag.failed, diag.dispatched);
        // The view no longer holds any unfired completion.
        prop_assert!(!engine.view().is_animating());
    }

    /// Fan-out count always equals the number of live matching entities at
    /// dispatch time (two sheep, nothing in these programs kills one).
    #[test]
    fn fan_out_count_matches_live_entities(herds in 1usize..5) {
        let config = EngineConfig { fixed_dt: 0.1, ..EngineConfig::default() };
        let mut engine = Engine::new(pasture(), config, InstantView::new()).unwrap();

        for _ in 0..herds {
            engine.move_forward(Target::by_type("sheep"));
        }
        engine.begin();
        for _ in 0..4000 {
            if engine.is_finished() {
                break;
            }
            engine.tick();
        }
        engine.run_ticks(400);

        let diag = engine.diagnostics();
        prop_assert_eq!(diag.fanned_out, 2 * herds as u64);
        prop_assert_eq!(diag.succeeded + diag.failed, diag.dispatched);
    }
}
