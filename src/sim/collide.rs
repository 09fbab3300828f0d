//! Collision orchestration
//!
//! The per-frame routine that pairs shots against entities, entities
//! against geometry, and the player against entities, dispatching each
//! qualifying contact to its handler exactly once. The pairings are
//! independent of each other; within each, destruction is deferred to a
//! collected pass so no collection is mutated while it is being walked.

use glam::Vec2;

use super::entity::{Category, EntityId, EntityKind, WalkerPhase};
use super::state::{GameEvent, GameState};
use crate::consts::*;

/// Run every pairing for one frame
pub fn resolve(state: &mut GameState, dt: f32) {
    advance_shots(state, dt);
    step_entities(state, dt);
    shots_vs_entities(state);
    player_vs_entities(state);
    sweep_out_of_bounds(state);
}

#[inline]
fn overlap(a: (Vec2, Vec2), b: (Vec2, Vec2)) -> bool {
    a.0.x < b.1.x && a.1.x > b.0.x && a.0.y < b.1.y && a.1.y > b.0.y
}

/// Move shots upward; a shot ends at the ceiling or the first solid cell,
/// chipping the cell if it was breakable.
fn advance_shots(state: &mut GameState, dt: f32) {
    let mut cell_hits: Vec<(usize, usize)> = Vec::new();
    let field = &state.field;
    state.shots.retain_mut(|shot| {
        shot.pos += shot.vel * dt;
        let tip = Vec2::new(shot.pos.x, shot.pos.y - shot.half.y);
        if tip.y <= 0.0 {
            return false;
        }
        if let Some((col, row)) = field.cell_at(tip) {
            if field.is_solid(col, row) {
                cell_hits.push((col, row));
                return false;
            }
        }
        true
    });
    for (col, row) in cell_hits {
        chip_cell(state, col, row);
    }
}

/// Damage a breakable cell; a destroyed cell may roll a drop.
fn chip_cell(state: &mut GameState, col: usize, row: usize) {
    if !state.field.chip(col, row) {
        return;
    }
    state.emit(GameEvent::CellBroken { col, row });

    // Deterministic drop roll: hash-mixed from seed, tick and cell
    let hash = state
        .seed
        .wrapping_mul(2654435761)
        .wrapping_add(state.now)
        .wrapping_mul(7919)
        .wrapping_add((col * 31 + row) as u64);
    if (hash % 100) < state.tuning.drop_chance_percent as u64 {
        let mode = if (hash / 100) % 2 == 0 {
            super::entity::SpecialMode::Freeze
        } else {
            super::entity::SpecialMode::Burst
        };
        let dir = if (hash / 200) % 2 == 0 { 1.0 } else { -1.0 };
        let pos = state.field.cell_center(col, row) - Vec2::new(0.0, TILE_SIZE);
        let id = state.spawn_special(mode, pos, dir);
        log::info!("drop spawned special {id} at cell ({col},{row})");
    }
}

/// Step every body against the field and dispatch contact responses.
/// Breakable cells hit by a freshly processed ball contact are chipped;
/// flying walkers explode on their first real landing.
fn step_entities(state: &mut GameState, dt: f32) {
    let mut cell_hits: Vec<(usize, usize)> = Vec::new();
    let mut explosions: Vec<EntityId> = Vec::new();
    let field = &state.field;

    for e in state.population.iter_mut_all() {
        let fresh = e.contact_cooldown == 0;
        let contacts = e.body.step(field, dt);
        e.on_geometry_contact();

        if fresh && e.category() == Category::Ball {
            cell_hits.extend(contacts.breakable_hits);
        }

        match &mut e.kind {
            EntityKind::Walker { phase } => match phase {
                WalkerPhase::Patrol => {
                    // Turn at ledge edges; the arena floor itself never ends
                    let grounded = e.body.blocked.down || e.body.touching.down;
                    if grounded && e.contact_cooldown == 0 {
                        let vx = e.body.velocity().x;
                        let probe = e.body.pos
                            + Vec2::new(
                                vx.signum() * (e.body.half.x + 2.0),
                                e.body.half.y + 2.0,
                            );
                        let supported = probe.y >= field.height()
                            || field
                                .cell_at(probe)
                                .map(|(c, r)| field.is_solid(c, r))
                                .unwrap_or(false);
                        if !supported {
                            let mut v = e.body.velocity();
                            v.x = -vx;
                            e.body.set_velocity(v);
                            e.contact_cooldown = CONTACT_COOLDOWN_TICKS;
                        }
                    }
                }
                WalkerPhase::Flying { grace } => {
                    // The engine may still report grounded on the launch
                    // frame; the grace flag swallows exactly one report
                    if *grace {
                        *grace = false;
                    } else if e.body.blocked.down || e.body.touching.down {
                        explosions.push(e.id);
                    }
                }
                WalkerPhase::Stunned { .. } => {}
            },
            _ => {}
        }
    }

    for (col, row) in cell_hits {
        chip_cell(state, col, row);
    }
    for id in explosions {
        log::debug!("flying walker {id} hit the ground");
        state.damage_entity(id);
    }
}

/// Pair shots against entities. A shot is consumed by its first match, so
/// one shot overlapping two entities in the same frame hits only one; the
/// damage itself runs after the scan on a stable snapshot.
fn shots_vs_entities(state: &mut GameState) {
    let mut consumed: Vec<u32> = Vec::new();
    let mut to_damage: Vec<EntityId> = Vec::new();
    let mut to_stun: Vec<EntityId> = Vec::new();

    for shot in &state.shots {
        let hit = state
            .population
            .iter_all()
            .find(|e| e.alive && overlap(shot.aabb(), e.body.aabb()));
        let Some(e) = hit else { continue };
        consumed.push(shot.id);
        let stuns = matches!(
            e.kind,
            EntityKind::Walker {
                phase: WalkerPhase::Patrol | WalkerPhase::Stunned { .. }
            }
        );
        if stuns {
            if !to_stun.contains(&e.id) {
                to_stun.push(e.id);
            }
        } else if !to_damage.contains(&e.id) {
            to_damage.push(e.id);
        }
    }

    state.shots.retain(|s| !consumed.contains(&s.id));
    let now = state.now;
    for id in to_stun {
        if let Some(e) = state.population.get_mut(id) {
            e.stun(now);
        }
    }
    for id in to_damage {
        state.damage_entity(id);
    }
}

/// Player overlaps: balls hurt the player (no bounce), stunned walkers get
/// launched by the touch.
fn player_vs_entities(state: &mut GameState) {
    let pa = state.player.aabb();

    if state.player.invuln_ticks == 0 {
        let hit = state
            .population
            .balls
            .iter()
            .any(|e| e.alive && overlap(pa, e.body.aabb()));
        if hit {
            state.player.lives = state.player.lives.saturating_sub(1);
            state.player.invuln_ticks = INVULN_TICKS;
            let lives_left = state.player.lives;
            state.emit(GameEvent::PlayerHit { lives_left });
            log::info!("player hit, {lives_left} lives left");
        }
    }

    for e in state.population.walkers.iter_mut() {
        if e.is_stunned() && overlap(pa, e.body.aabb()) {
            e.launch();
        }
    }
}

/// Remove anything that drifted past the playfield by the safety margin.
/// No score is awarded for these.
fn sweep_out_of_bounds(state: &mut GameState) {
    let ids: Vec<EntityId> = state
        .population
        .iter_all()
        .filter(|e| state.field.out_of_bounds(e.body.pos, DESPAWN_MARGIN))
        .map(|e| e.id)
        .collect();
    for id in ids {
        state.despawn_silent(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::field::{Cell, Playfield};
    use crate::sim::state::Shot;
    use crate::sim::table::Family;
    use crate::tuning::Tuning;

    fn state() -> GameState {
        GameState::new(3, Playfield::new(24, 15), Tuning::default())
    }

    #[test]
    fn test_shot_consumed_by_first_match_only() {
        let mut s = state();
        // Two terminal balls stacked on the same spot
        s.spawn_ball(Family::Gravity, 0, Vec2::new(100.0, 100.0), 1.0, 0);
        s.spawn_ball(Family::Gravity, 0, Vec2::new(100.0, 100.0), 1.0, 0);
        s.shots.push(Shot {
            id: 99,
            pos: Vec2::new(100.0, 100.0),
            vel: Vec2::ZERO,
            half: Vec2::new(2.0, 6.0),
        });
        shots_vs_entities(&mut s);
        assert!(s.shots.is_empty());
        assert_eq!(s.population.balls.len(), 1);
    }

    #[test]
    fn test_player_hit_respects_invulnerability() {
        let mut s = state();
        s.spawn_ball(Family::Gravity, 0, s.player.pos, 1.0, 0);
        player_vs_entities(&mut s);
        assert_eq!(s.player.lives, Tuning::default().starting_lives - 1);
        // Still overlapping next frame: no second hit
        player_vs_entities(&mut s);
        assert_eq!(s.player.lives, Tuning::default().starting_lives - 1);
        let hits = s
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlayerHit { .. }))
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_player_touch_launches_stunned_walker() {
        let mut s = state();
        let id = s.spawn_walker(s.player.pos, 1.0);
        s.population.get_mut(id).unwrap().stun(0);
        player_vs_entities(&mut s);
        let e = s.population.get(id).unwrap();
        assert!(matches!(
            e.kind,
            EntityKind::Walker {
                phase: WalkerPhase::Flying { grace: true }
            }
        ));
        assert!(e.body.velocity().y < 0.0);
    }

    #[test]
    fn test_sweep_is_silent() {
        let mut s = state();
        let id = s.spawn_flyer(Vec2::new(-200.0, 50.0), -1.0);
        sweep_out_of_bounds(&mut s);
        assert!(s.population.get(id).is_none());
        assert!(
            !s.events
                .iter()
                .any(|e| matches!(e, GameEvent::Score { .. }))
        );
    }

    #[test]
    fn test_shot_chips_breakable_cell() {
        let mut s = state();
        s.tuning.drop_chance_percent = 0;
        s.field.set_cell(6, 6, Cell::Breakable { hp: 1 });
        // Shot just below the cell, moving up
        s.shots.push(Shot {
            id: 1,
            pos: Vec2::new(104.0, 114.0),
            vel: Vec2::new(0.0, -360.0),
            half: Vec2::new(2.0, 6.0),
        });
        for _ in 0..10 {
            advance_shots(&mut s, SIM_DT);
        }
        assert!(s.shots.is_empty());
        assert!(!s.field.is_solid(6, 6));
        assert!(
            s.events
                .iter()
                .any(|e| matches!(e, GameEvent::CellBroken { col: 6, row: 6 }))
        );
    }

    #[test]
    fn test_destroyed_cell_can_roll_a_drop() {
        let mut s = state();
        s.tuning.drop_chance_percent = 100;
        s.field.set_cell(6, 6, Cell::Breakable { hp: 1 });
        chip_cell(&mut s, 6, 6);
        assert_eq!(s.population.balls.len(), 1);
        assert!(matches!(
            s.population.balls[0].kind,
            EntityKind::Special { .. }
        ));
    }
}
