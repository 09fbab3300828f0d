//! Headless soak runner
//!
//! Seeds a level, drives the sim with a scripted input for N ticks, and
//! reports event totals. Usage: `bubble-blitz [seed] [ticks]`.

use bubble_blitz::consts::{FIELD_HEIGHT, FIELD_WIDTH, TILE_SIZE};
use bubble_blitz::sim::{GameEvent, GameState, Playfield, TickInput, populate_level, tick};
use bubble_blitz::tuning::Tuning;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xB0B_B1E5);
    let ticks: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(7200);

    let field = Playfield::new(
        (FIELD_WIDTH / TILE_SIZE) as usize,
        (FIELD_HEIGHT / TILE_SIZE) as usize,
    );
    let mut state = GameState::new(seed, field, Tuning::default());
    populate_level(&mut state);
    log::info!("soak start: seed={seed} ticks={ticks}");

    let mut destroyed = 0u64;
    let mut spawned = 0u64;
    let mut player_hits = 0u64;
    let mut cleared_at: Option<u64> = None;

    for i in 0..ticks {
        // Scripted input: sweep back and forth, fire in bursts
        let input = TickInput {
            move_dir: (i as f32 * 0.01).sin(),
            fire: i % 24 == 0,
        };
        tick(&mut state, &input);
        for event in state.drain_events() {
            match event {
                GameEvent::BallSpawned { .. } => spawned += 1,
                GameEvent::BallDestroyed { .. } => destroyed += 1,
                GameEvent::PlayerHit { .. } => player_hits += 1,
                GameEvent::LevelCleared => cleared_at = cleared_at.or(Some(state.now)),
                _ => {}
            }
        }
    }

    println!(
        "seed {seed}: {ticks} ticks, score {}, balls {spawned} spawned / {destroyed} destroyed, \
         {player_hits} player hits, level cleared: {}",
        state.score,
        cleared_at.map_or("no".to_string(), |t| format!("tick {t}")),
    );
}
