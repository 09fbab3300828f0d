//! Fixed timestep simulation tick
//!
//! Frame order: player input, collision orchestration, per-entity
//! housekeeping, effect expiries, burst-clear cadence, completion check.
//! Destruction always resolves before effect snapshots are taken, and every
//! scan works a stable snapshot of the active set, so nothing is mutated
//! while it is being iterated.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collide;
use super::field::Cell;
use super::state::{GameEvent, GameState, Shot};
use super::table::Family;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Horizontal move direction, -1..=1
    pub move_dir: f32,
    /// Fire a shot
    pub fire: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    let dt = SIM_DT;
    state.now += 1;
    let now = state.now;

    // Player movement and weapon fire
    if state.player.invuln_ticks > 0 {
        state.player.invuln_ticks -= 1;
    }
    let half_w = state.player.half.x;
    state.player.pos.x = (state.player.pos.x
        + input.move_dir.clamp(-1.0, 1.0) * PLAYER_SPEED * dt)
        .clamp(half_w, state.field.width() - half_w);
    if input.fire && state.shots.len() < state.tuning.max_shots {
        let id = state.next_entity_id();
        let pos = state.player.pos - Vec2::new(0.0, state.player.half.y);
        state.shots.push(Shot {
            id,
            pos,
            vel: Vec2::new(0.0, -SHOT_SPEED),
            half: Vec2::new(SHOT_HALF_WIDTH, SHOT_HALF_HEIGHT),
        });
    }

    collide::resolve(state, dt);

    // Per-entity housekeeping reads the contact flags the step just filled
    for e in state.population.iter_mut_all() {
        e.on_tick(now);
    }

    state.effects.step(now, &mut state.population);

    // Burst-clear cadence: one real consumption per interval; entries that
    // died some other way in the meantime are skipped without stalling
    if state.burst.due(now) {
        while let Some(id) = state.burst.take_next(now) {
            if state.population.get(id).is_some() {
                state.emit(GameEvent::BurstFeedback { id });
                state.damage_entity(id);
                break;
            }
            log::debug!("burst-clear skipped stale entry {id}");
        }
        state.burst.settle();
    }

    // Level completion: the outstanding ball count reached zero
    if !state.level_cleared && state.population.balls.is_empty() {
        state.level_cleared = true;
        state.emit(GameEvent::LevelCleared);
        log::info!("level clear at tick {now}, score {}", state.score);
    }

    // Ensure deterministic ordering
    state.population.normalize_order();
}

/// Seed the level: breakable platform band, initial ball roster, flyers
/// and walkers, all placed from the run seed.
pub fn populate_level(state: &mut GameState) {
    let mut rng = Pcg32::seed_from_u64(state.seed);

    let row = state.tuning.breakable_row.min(state.field.rows() - 1);
    let hp = state.tuning.breakable_hp.max(1);
    for col in 2..state.field.cols().saturating_sub(2) {
        if rng.random_bool(0.8) {
            state.field.set_cell(col, row, Cell::Breakable { hp });
        }
    }

    let tiers = state.tuning.initial_ball_tiers.clone();
    for (i, tier) in tiers.into_iter().enumerate() {
        let x = state.field.width() * rng.random_range(0.15..0.85);
        let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
        let pos = Vec2::new(x, state.field.height() * 0.25);
        state.spawn_ball(Family::Gravity, tier, pos, dir, i as u32);
    }
    let orbit_tiers = state.tuning.initial_orbit_tiers.clone();
    for (i, tier) in orbit_tiers.into_iter().enumerate() {
        let x = state.field.width() * rng.random_range(0.15..0.85);
        let dir = if i % 2 == 0 { -1.0 } else { 1.0 };
        let pos = Vec2::new(x, state.field.height() * 0.4);
        state.spawn_ball(Family::Orbit, tier, pos, dir, 100 + i as u32);
    }

    for i in 0..state.tuning.initial_flyers {
        let from_left = i % 2 == 0;
        let x = if from_left { 8.0 } else { state.field.width() - 8.0 };
        let y = state.field.height() * rng.random_range(0.15..0.5);
        state.spawn_flyer(Vec2::new(x, y), if from_left { 1.0 } else { -1.0 });
    }
    for _ in 0..state.tuning.initial_walkers {
        let x = state.field.width() * rng.random_range(0.1..0.9);
        let y = state.field.height() - WALKER_HALF - 1.0;
        let dir = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        state.spawn_walker(Vec2::new(x, y), dir);
    }

    log::info!(
        "level populated: {} balls, {} flyers, {} walkers",
        state.population.balls.len(),
        state.population.flyers.len(),
        state.population.walkers.len(),
    );
}
