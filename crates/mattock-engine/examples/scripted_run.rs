//! Headless scripted attempt: walk a corridor, fell the tree at the end,
//! and check the goal. Run with `RUST_LOG=mattock_engine=debug` to watch
//! the scheduler work.

use anyhow::Result;
use mattock_engine::prelude::*;
use tracing_subscriber::EnvFilter;

fn level() -> LevelData {
    LevelData {
        width: 6,
        height: 1,
        ground_plane: vec![BlockKind::Grass; 6],
        action_plane: vec![
            BlockKind::Empty,
            BlockKind::Empty,
            BlockKind::Empty,
            BlockKind::Empty,
            BlockKind::Empty,
            BlockKind::LogOak,
        ],
        player_start: GridPos::new(0, 0),
        player_facing: Facing::Right,
        entities: vec![],
        daytime: true,
        goal: Goal::BlocksCleared {
            block: BlockKind::LogOak,
        },
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = EngineConfig {
        fixed_dt: 0.1,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(level(), config, InstantView::new())?;

    // The program: walk while the path is open, punch the tree, verify.
    engine.while_path_ahead(
        Target::player(),
        BlockKind::Empty,
        vec![Step::new(Target::player(), Action::MoveForward)],
    );
    engine.destroy_block(Target::player());
    engine.check_solution();
    engine.start_attempt(|success, snapshot| {
        println!("attempt finished: success={success} hash={}", snapshot.hash);
    });

    for _ in 0..3000 {
        if engine.is_finished() {
            break;
        }
        engine.tick();
    }

    println!("ticks: {}", engine.tick_count());
    for line in &engine.view().history {
        println!("  {line}");
    }
    println!(
        "player ended at {} after {} commands",
        engine.registry().player().map(|p| p.pos.to_string()).unwrap_or_default(),
        engine.diagnostics().dispatched
    );
    Ok(())
}
