//! Game state and event plumbing
//!
//! All state that must be persisted for determinism lives here. The three
//! per-category collections exclusively own their entities; everything else
//! refers to entities by ID and tolerates the ID being gone.
//!
//! Spawning and destruction are centralized in `GameState` so the
//! cross-cutting rules hold in one place: newcomers inherit any active time
//! effect, fragmentation children of burst-marked parents join the burst
//! queue, and a destroyed entity is destroyed exactly once.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::burst::BurstClear;
use super::effects::TimeEffects;
use super::entity::{Category, Entity, EntityId, EntityKind, SpecialMode};
use super::field::Playfield;
use super::table::Family;
use crate::consts::*;
use crate::tuning::Tuning;

/// Signals the core exposes to game logic/UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Signed score change
    Score { delta: i64 },
    /// Ball-family bookkeeping; the level is clear when the outstanding
    /// count reaches zero
    BallSpawned { id: EntityId },
    BallDestroyed { id: EntityId },
    /// Generic destruction notice (drop-spawning hook)
    EntityDestroyed {
        id: EntityId,
        category: Category,
        pos: Vec2,
    },
    PlayerHit { lives_left: u8 },
    /// A breakable cell was destroyed
    CellBroken { col: usize, row: usize },
    /// Burst-clear consumed an entity (feedback hook)
    BurstFeedback { id: EntityId },
    LevelCleared,
}

/// The player's avatar: enough body for overlap checks, nothing more
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub half: Vec2,
    pub invuln_ticks: u32,
    pub lives: u8,
}

impl Player {
    pub fn aabb(&self) -> (Vec2, Vec2) {
        (self.pos - self.half, self.pos + self.half)
    }
}

/// A player-fired harpoon shot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub half: Vec2,
}

impl Shot {
    pub fn aabb(&self) -> (Vec2, Vec2) {
        (self.pos - self.half, self.pos + self.half)
    }
}

/// The active-entity collections, one flat set per category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    pub balls: Vec<Entity>,
    pub flyers: Vec<Entity>,
    pub walkers: Vec<Entity>,
}

impl Population {
    pub fn iter_all(&self) -> impl Iterator<Item = &Entity> {
        self.balls
            .iter()
            .chain(self.flyers.iter())
            .chain(self.walkers.iter())
    }

    pub fn iter_mut_all(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.balls
            .iter_mut()
            .chain(self.flyers.iter_mut())
            .chain(self.walkers.iter_mut())
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.iter_all().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.iter_mut_all().find(|e| e.id == id)
    }

    pub fn push(&mut self, e: Entity) {
        match e.category() {
            Category::Ball => self.balls.push(e),
            Category::Flyer => self.flyers.push(e),
            Category::Walker => self.walkers.push(e),
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        for list in [&mut self.balls, &mut self.flyers, &mut self.walkers] {
            if let Some(idx) = list.iter().position(|e| e.id == id) {
                return Some(list.remove(idx));
            }
        }
        None
    }

    pub fn total(&self) -> usize {
        self.balls.len() + self.flyers.len() + self.walkers.len()
    }

    /// Ensure stable iteration order (by entity ID) after mutation
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|e| e.id);
        self.flyers.sort_by_key(|e| e.id);
        self.walkers.sort_by_key(|e| e.id);
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Simulation tick counter
    pub now: u64,
    pub field: Playfield,
    pub tuning: Tuning,
    pub player: Player,
    pub shots: Vec<Shot>,
    pub population: Population,
    pub effects: TimeEffects,
    pub burst: BurstClear,
    pub score: i64,
    pub level_cleared: bool,
    /// Events raised this frame; drained by the caller
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, field: Playfield, tuning: Tuning) -> Self {
        let player = Player {
            pos: Vec2::new(
                field.width() / 2.0,
                field.height() - PLAYER_HALF_HEIGHT - TILE_SIZE,
            ),
            half: Vec2::new(PLAYER_HALF_WIDTH, PLAYER_HALF_HEIGHT),
            invuln_ticks: 0,
            lives: tuning.starting_lives,
        };
        Self {
            seed,
            now: 0,
            field,
            tuning,
            player,
            shots: Vec::new(),
            population: Population::default(),
            effects: TimeEffects::default(),
            burst: BurstClear::default(),
            score: 0,
            level_cleared: true, // armed by level population
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand the frame's events to the caller
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Insert an entity into its collection. Newcomers pick up any active
    /// time effect so the population stays uniform.
    pub fn spawn(&mut self, mut e: Entity) -> EntityId {
        let id = e.id;
        self.effects.apply_to_newcomer(self.now, &mut e);
        if e.category() == Category::Ball {
            self.emit(GameEvent::BallSpawned { id });
            self.level_cleared = false;
        }
        self.population.push(e);
        id
    }

    pub fn spawn_ball(
        &mut self,
        family: Family,
        tier: u8,
        pos: Vec2,
        dir: f32,
        color_tag: u32,
    ) -> EntityId {
        let id = self.next_entity_id();
        self.spawn(Entity::ball(id, family, tier, pos, dir, color_tag))
    }

    pub fn spawn_special(&mut self, mode: SpecialMode, pos: Vec2, dir: f32) -> EntityId {
        let id = self.next_entity_id();
        self.spawn(Entity::special(id, mode, pos, dir))
    }

    pub fn spawn_flyer(&mut self, pos: Vec2, dir: f32) -> EntityId {
        let id = self.next_entity_id();
        let now = self.now;
        self.spawn(Entity::flyer(id, pos, dir, now))
    }

    pub fn spawn_walker(&mut self, pos: Vec2, dir: f32) -> EntityId {
        let id = self.next_entity_id();
        self.spawn(Entity::walker(id, pos, dir))
    }

    /// Lethal impact entry point. Idempotent: a second call on an entity
    /// that is already gone is a no-op. Returns whether a kill happened.
    ///
    /// Side-effect order: score event, fragmentation children (already in
    /// the active set when this returns), removal, then any global effect
    /// the entity triggers.
    pub fn damage_entity(&mut self, id: EntityId) -> bool {
        let Some(e) = self.population.get_mut(id) else {
            log::debug!("damage on missing entity {id}");
            return false;
        };
        if !e.alive {
            log::debug!("damage on dead entity {id}");
            return false;
        }
        e.alive = false;
        let kind = e.kind;
        let family = e.family;
        let tier = e.tier;
        let pos = e.body.pos;
        let color_tag = e.color_tag;
        let delta = e.score_value;
        let category = e.category();
        let marked = self.burst.is_marked(id);

        self.score += delta;
        self.emit(GameEvent::Score { delta });

        // Fragmentation: two children, left-up and right-up, same spot
        if matches!(kind, EntityKind::GravityBall | EntityKind::OrbitBall) {
            if let Some(next) = family.next_tier(tier) {
                let mut child_ids = [0u32; 2];
                for (i, dir) in [-1.0f32, 1.0].into_iter().enumerate() {
                    let cid = self.next_entity_id();
                    self.spawn(Entity::ball(cid, family, next, pos, dir, color_tag));
                    child_ids[i] = cid;
                }
                if self.burst.is_active() && marked {
                    self.burst.fold_children(&child_ids);
                }
            }
        }

        self.population.remove(id);
        self.emit(GameEvent::EntityDestroyed { id, category, pos });
        if category == Category::Ball {
            self.emit(GameEvent::BallDestroyed { id });
        }

        // Special balls trade fragmentation for one global effect
        if let EntityKind::Special { mode, .. } = kind {
            match mode {
                SpecialMode::Freeze => {
                    let ticks = self.tuning.freeze_ticks;
                    self.effects
                        .request_freeze(self.now, ticks, &mut self.population);
                }
                SpecialMode::Burst => {
                    self.burst.activate(self.now, id, &self.population);
                }
            }
        }
        true
    }

    /// Out-of-bounds sweep removal: no score, no drop hook, but the ball
    /// bookkeeping still runs so level completion stays accurate.
    pub fn despawn_silent(&mut self, id: EntityId) {
        if let Some(e) = self.population.remove(id) {
            log::debug!("entity {id} swept out of bounds");
            if e.category() == Category::Ball {
                self.emit(GameEvent::BallDestroyed { id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> GameState {
        GameState::new(7, Playfield::new(24, 15), Tuning::default())
    }

    fn score_total(events: &[GameEvent]) -> i64 {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Score { delta } => Some(*delta),
                _ => None,
            })
            .sum()
    }

    #[test]
    fn test_damage_is_idempotent() {
        let mut s = state();
        let id = s.spawn_ball(Family::Gravity, 0, Vec2::new(100.0, 100.0), 1.0, 0);
        assert!(s.damage_entity(id));
        assert!(!s.damage_entity(id));
        let scores = s
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Score { .. }))
            .count();
        assert_eq!(scores, 1);
    }

    #[test]
    fn test_fragmentation_children_exist_immediately() {
        let mut s = state();
        let id = s.spawn_ball(Family::Gravity, 3, Vec2::new(100.0, 100.0), 1.0, 42);
        s.damage_entity(id);
        assert_eq!(s.population.balls.len(), 2);
        for child in &s.population.balls {
            assert_eq!(child.tier, 2);
            assert_eq!(child.color_tag, 42);
            assert_eq!(child.body.pos, Vec2::new(100.0, 100.0));
        }
        // One goes left-up, the other right-up
        let xs: Vec<f32> = s
            .population
            .balls
            .iter()
            .map(|e| e.body.velocity().x)
            .collect();
        assert!(xs[0] * xs[1] < 0.0);
        assert!(s.population.balls.iter().all(|e| e.body.velocity().y < 0.0));
    }

    #[test]
    fn test_terminal_tier_spawns_nothing() {
        let mut s = state();
        let id = s.spawn_ball(Family::Gravity, 0, Vec2::new(100.0, 100.0), 1.0, 0);
        s.damage_entity(id);
        assert!(s.population.balls.is_empty());
        assert_eq!(score_total(&s.events), 40);
    }

    #[test]
    fn test_special_freeze_trigger() {
        let mut s = state();
        let ball = s.spawn_ball(Family::Gravity, 2, Vec2::new(60.0, 60.0), 1.0, 0);
        let special = s.spawn_special(SpecialMode::Freeze, Vec2::new(100.0, 100.0), 1.0);
        s.damage_entity(special);
        assert!(s.effects.freeze_active());
        let ball = s.population.get(ball).unwrap();
        assert!(ball.frozen.is_some());
        // A special never fragments
        assert_eq!(s.population.balls.len(), 1);
    }

    #[test]
    fn test_special_burst_excludes_trigger() {
        let mut s = state();
        s.spawn_ball(Family::Gravity, 1, Vec2::new(60.0, 60.0), 1.0, 0);
        s.spawn_walker(Vec2::new(200.0, 100.0), 1.0);
        let special = s.spawn_special(SpecialMode::Burst, Vec2::new(100.0, 100.0), 1.0);
        s.damage_entity(special);
        assert!(s.burst.is_active());
        assert_eq!(s.burst.pending_len(), 2);
        assert!(!s.burst.is_marked(special));
    }

    #[test]
    fn test_spawn_during_freeze_is_frozen() {
        let mut s = state();
        s.spawn_ball(Family::Gravity, 1, Vec2::new(60.0, 60.0), 1.0, 0);
        let ticks = s.tuning.freeze_ticks;
        s.effects.request_freeze(s.now, ticks, &mut s.population);
        let id = s.spawn_ball(Family::Gravity, 2, Vec2::new(80.0, 80.0), 1.0, 0);
        let e = s.population.get(id).unwrap();
        assert!(e.frozen.is_some());
        assert_eq!(e.body.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_silent_despawn_awards_no_score() {
        let mut s = state();
        let id = s.spawn_ball(Family::Gravity, 2, Vec2::new(60.0, 60.0), 1.0, 0);
        s.despawn_silent(id);
        assert_eq!(score_total(&s.events), 0);
        assert!(
            s.events
                .iter()
                .any(|e| matches!(e, GameEvent::BallDestroyed { id: d } if *d == id))
        );
        assert!(
            !s.events
                .iter()
                .any(|e| matches!(e, GameEvent::EntityDestroyed { .. }))
        );
    }

    proptest! {
        /// Destroying a tier-N ball and every descendant emits exactly the
        /// table-driven cascade total, regardless of destruction order.
        #[test]
        fn prop_score_conservation_under_fragmentation(tier in 0u8..4, from_front in any::<bool>()) {
            let mut s = state();
            s.spawn_ball(Family::Gravity, tier, Vec2::new(100.0, 100.0), 1.0, 0);
            while let Some(id) = {
                let list = &s.population.balls;
                if from_front { list.first().map(|e| e.id) } else { list.last().map(|e| e.id) }
            } {
                s.damage_entity(id);
            }
            prop_assert_eq!(score_total(&s.events), Family::Gravity.cascade_score(tier));
            prop_assert_eq!(s.score, Family::Gravity.cascade_score(tier));
        }
    }
}
