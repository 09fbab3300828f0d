//! Dynamic entities
//!
//! Every enemy in the game is one `Entity` with a closed set of kind tags:
//! gravity balls, orbit balls, special balls, flyers, and walkers. The kind
//! selects behavior at the three seams the orchestrator cares about -
//! per-tick housekeeping, geometry-contact response, and damage - so the
//! rest of the sim treats the population uniformly.
//!
//! Freeze and slow state are explicit optional fields, not ad-hoc flags:
//! a snapshot either exists or it does not, and restore consumes it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, FaceFlags};
use super::table::Family;
use crate::consts::*;

pub type EntityId = u32;

/// Coarse population category (one flat collection per category)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Ball,
    Flyer,
    Walker,
}

/// Which global effect a special ball triggers when destroyed.
/// The mode toggles on every landing, so timing the kill is the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialMode {
    Freeze,
    Burst,
}

impl SpecialMode {
    pub fn toggled(self) -> Self {
        match self {
            SpecialMode::Freeze => SpecialMode::Burst,
            SpecialMode::Burst => SpecialMode::Freeze,
        }
    }
}

/// Walker behavior states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WalkerPhase {
    Patrol,
    Stunned { until_tick: u64, facing: f32 },
    /// Launched by player contact; `grace` swallows the grounded flag the
    /// body still reports on the launch tick itself.
    Flying { grace: bool },
}

/// Closed variant set for all dynamic entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    GravityBall,
    OrbitBall,
    Special { mode: SpecialMode, was_grounded: bool },
    /// Flyers bob on a clock anchored at `origin_tick`; freezing shifts the
    /// anchor so the path resumes where it stopped.
    Flyer { origin_tick: u64, base_y: f32 },
    Walker { phase: WalkerPhase },
}

impl EntityKind {
    pub fn category(&self) -> Category {
        match self {
            EntityKind::GravityBall | EntityKind::OrbitBall | EntityKind::Special { .. } => {
                Category::Ball
            }
            EntityKind::Flyer { .. } => Category::Flyer,
            EntityKind::Walker { .. } => Category::Walker,
        }
    }
}

/// Velocity/gravity snapshot taken when an entity freezes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrozenSnapshot {
    pub vel: Vec2,
    pub allow_gravity: bool,
    pub since_tick: u64,
}

/// Record of an applied slow-motion multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowMark {
    pub multiplier: f32,
}

/// A single dynamic entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub body: Body,
    pub family: Family,
    pub tier: u8,
    /// Conserved speed magnitude; only a slow multiplier may replace it
    pub constant_speed: f32,
    /// Floor applied to vertical rebound speed
    pub min_bounce_speed: f32,
    pub score_value: i64,
    /// Opaque marker inherited by fragmentation children
    pub color_tag: u32,
    /// Ticks left before the next geometry contact is processed
    pub contact_cooldown: u32,
    pub alive: bool,
    pub frozen: Option<FrozenSnapshot>,
    pub slowed: Option<SlowMark>,
}

impl Entity {
    /// A ball of the given family and tier, launched toward `dir` (±1).
    /// Unknown tiers clamp to the family's largest.
    pub fn ball(id: EntityId, family: Family, tier: u8, pos: Vec2, dir: f32, color_tag: u32) -> Self {
        let tier = tier.min(family.top_tier());
        let params = family.params_for(tier).copied().unwrap_or_default();
        let mut body = Body::new(pos, Vec2::splat(params.radius));
        if family == Family::Gravity {
            body.set_gravity(BALL_GRAVITY);
            body.set_allow_gravity(true);
        }
        // 3-4-5 launch split keeps |v| equal to the conserved speed
        body.set_velocity(Vec2::new(0.6 * dir.signum(), -0.8) * params.speed);
        Self {
            id,
            kind: match family {
                Family::Gravity => EntityKind::GravityBall,
                Family::Orbit => EntityKind::OrbitBall,
            },
            body,
            family,
            tier,
            constant_speed: params.speed,
            min_bounce_speed: params.bounce_floor,
            score_value: params.score,
            color_tag,
            contact_cooldown: 0,
            alive: true,
            frozen: None,
            slowed: None,
        }
    }

    /// A special ball. Moves like a small gravity ball but never fragments;
    /// its destruction triggers the effect its current mode names.
    pub fn special(id: EntityId, mode: SpecialMode, pos: Vec2, dir: f32) -> Self {
        let mut e = Self::ball(id, Family::Gravity, 1, pos, dir, 0);
        e.kind = EntityKind::Special {
            mode,
            was_grounded: false,
        };
        e.score_value = SPECIAL_SCORE;
        e
    }

    /// A flying enemy drifting toward `dir`, bobbing around its spawn height.
    pub fn flyer(id: EntityId, pos: Vec2, dir: f32, now: u64) -> Self {
        let mut body = Body::new(pos, Vec2::splat(FLYER_HALF));
        body.collides = false;
        body.set_velocity(Vec2::new(dir.signum() * FLYER_SPEED, 0.0));
        Self {
            id,
            kind: EntityKind::Flyer {
                origin_tick: now,
                base_y: pos.y,
            },
            body,
            family: Family::Gravity,
            tier: 0,
            constant_speed: FLYER_SPEED,
            min_bounce_speed: 0.0,
            score_value: FLYER_SCORE,
            color_tag: 0,
            contact_cooldown: 0,
            alive: true,
            frozen: None,
            slowed: None,
        }
    }

    /// A ground enemy patrolling toward `dir`.
    pub fn walker(id: EntityId, pos: Vec2, dir: f32) -> Self {
        let mut body = Body::new(pos, Vec2::splat(WALKER_HALF));
        body.set_gravity(BALL_GRAVITY);
        body.set_allow_gravity(true);
        body.set_velocity(Vec2::new(dir.signum() * WALKER_SPEED, 0.0));
        Self {
            id,
            kind: EntityKind::Walker {
                phase: WalkerPhase::Patrol,
            },
            body,
            family: Family::Gravity,
            tier: 0,
            constant_speed: WALKER_SPEED,
            min_bounce_speed: 0.0,
            score_value: WALKER_SCORE,
            color_tag: 0,
            contact_cooldown: 0,
            alive: true,
            frozen: None,
            slowed: None,
        }
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.body.half.x
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.body.blocked.down || self.body.touching.down
    }

    pub fn is_stunned(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Walker {
                phase: WalkerPhase::Stunned { .. }
            }
        )
    }

    /// Respond to the faces the body reported blocked this step. Reflection
    /// restores the conserved speed; a cooldown keeps a contact the engine
    /// reports across several frames from reflecting twice.
    pub fn on_geometry_contact(&mut self) {
        let faces = self.body.blocked;
        if !faces.any() || self.frozen.is_some() {
            return;
        }
        match self.kind {
            EntityKind::GravityBall | EntityKind::OrbitBall | EntityKind::Special { .. } => {
                if self.contact_cooldown > 0 {
                    return;
                }
                self.reflect_conserving(faces);
                self.contact_cooldown = CONTACT_COOLDOWN_TICKS;
            }
            EntityKind::Walker { phase } => {
                let mut vel = self.body.velocity();
                match phase {
                    WalkerPhase::Patrol => {
                        if faces.down {
                            vel.y = 0.0;
                        }
                        if faces.horizontal() && self.contact_cooldown == 0 {
                            let speed = vel.x.abs().max(self.constant_speed);
                            vel.x = if faces.left { speed } else { -speed };
                            self.contact_cooldown = CONTACT_COOLDOWN_TICKS;
                        }
                        self.body.set_velocity(vel);
                    }
                    WalkerPhase::Stunned { .. } => {}
                    // Landing response for flying walkers is the
                    // orchestrator's call (it may be an explosion)
                    WalkerPhase::Flying { .. } => {}
                }
            }
            EntityKind::Flyer { .. } => {}
        }
    }

    /// Flip blocked components away from their faces, renormalize to the
    /// conserved speed, then clamp the vertical rebound to the bounce floor,
    /// trading the excess into the horizontal component so the magnitude
    /// stays exact.
    fn reflect_conserving(&mut self, faces: FaceFlags) {
        let speed = self.constant_speed;
        let mut v = self.body.velocity();
        if faces.left {
            v.x = away(v.x, true);
        }
        if faces.right {
            v.x = away(v.x, false);
        }
        if faces.up {
            v.y = away(v.y, true);
        }
        if faces.down {
            v.y = away(v.y, false);
        }
        if v.length_squared() <= f32::EPSILON {
            v = Vec2::new(0.0, -1.0);
        }
        v = v.normalize() * speed;
        if faces.vertical() && v.y.abs() < self.min_bounce_speed {
            let vy = self.min_bounce_speed.min(speed);
            let vx = (speed * speed - vy * vy).max(0.0).sqrt();
            v = Vec2::new(
                if v.x < 0.0 { -vx } else { vx },
                if v.y < 0.0 { -vy } else { vy },
            );
        }
        self.body.set_velocity(v);
    }

    /// Per-tick housekeeping for the entity's kind
    pub fn on_tick(&mut self, now: u64) {
        if self.contact_cooldown > 0 {
            self.contact_cooldown -= 1;
        }
        if self.frozen.is_some() {
            return;
        }
        match &mut self.kind {
            EntityKind::GravityBall => {}
            EntityKind::OrbitBall => {
                // Edge-bounded regime: renormalized every tick, not just on
                // contact
                let v = self.body.velocity();
                if v.length_squared() > f32::EPSILON {
                    self.body.set_velocity(v.normalize() * self.constant_speed);
                }
            }
            EntityKind::Special { mode, was_grounded } => {
                let grounded = self.body.blocked.down || self.body.touching.down;
                if grounded && !*was_grounded {
                    *mode = mode.toggled();
                }
                *was_grounded = grounded;
            }
            EntityKind::Flyer { origin_tick, base_y } => {
                let t = now.saturating_sub(*origin_tick) as f32 * SIM_DT;
                self.body.pos.y = *base_y + FLYER_BOB_AMPLITUDE * (FLYER_BOB_RATE * t).sin();
            }
            EntityKind::Walker { phase } => {
                if let WalkerPhase::Stunned { until_tick, facing } = *phase {
                    if now >= until_tick {
                        *phase = WalkerPhase::Patrol;
                        self.body
                            .set_velocity(Vec2::new(facing * self.constant_speed, 0.0));
                    }
                }
            }
        }
    }

    /// Stun a patrolling walker (weapon hit). Refreshes the timer if
    /// already stunned; airborne walkers are unaffected.
    pub fn stun(&mut self, now: u64) {
        let vx = self.body.velocity().x;
        if let EntityKind::Walker { phase } = &mut self.kind {
            let facing = match *phase {
                WalkerPhase::Patrol => {
                    if vx < 0.0 {
                        -1.0
                    } else {
                        1.0
                    }
                }
                WalkerPhase::Stunned { facing, .. } => facing,
                WalkerPhase::Flying { .. } => return,
            };
            *phase = WalkerPhase::Stunned {
                until_tick: now + WALKER_STUN_TICKS,
                facing,
            };
            self.body.set_velocity(Vec2::ZERO);
        }
    }

    /// Kick a stunned walker airborne. Returns true when the launch
    /// happened (the walker was stunned).
    pub fn launch(&mut self) -> bool {
        if let EntityKind::Walker { phase } = &mut self.kind {
            if let WalkerPhase::Stunned { facing, .. } = *phase {
                *phase = WalkerPhase::Flying { grace: true };
                self.body.set_velocity(Vec2::new(
                    facing * self.constant_speed,
                    -WALKER_LAUNCH_SPEED,
                ));
                return true;
            }
        }
        false
    }

    /// Snapshot and halt. A second call while frozen keeps the first
    /// snapshot; a zeroed velocity must never overwrite it.
    pub fn freeze(&mut self, now: u64) {
        if self.frozen.is_some() {
            return;
        }
        self.frozen = Some(FrozenSnapshot {
            vel: self.body.velocity(),
            allow_gravity: self.body.allow_gravity(),
            since_tick: now,
        });
        self.body.set_velocity(Vec2::ZERO);
        self.body.set_allow_gravity(false);
        self.body.set_moves(false);
    }

    /// Restore from the freeze snapshot. Clock-driven paths shift their
    /// anchor by the frozen span so motion resumes in place.
    pub fn unfreeze(&mut self, now: u64) {
        let Some(snap) = self.frozen.take() else {
            return;
        };
        self.body.set_velocity(snap.vel);
        self.body.set_allow_gravity(snap.allow_gravity);
        self.body.set_moves(true);
        if let EntityKind::Flyer { origin_tick, .. } = &mut self.kind {
            *origin_tick += now.saturating_sub(snap.since_tick);
        }
    }

    /// Scale velocity and the conserved speed once. While frozen the live
    /// velocity is zero, so the freeze snapshot is scaled instead - the two
    /// effects never corrupt each other's state.
    pub fn apply_slow(&mut self, multiplier: f32) {
        if self.slowed.is_some() {
            return;
        }
        if let Some(snap) = &mut self.frozen {
            snap.vel *= multiplier;
        } else {
            let v = self.body.velocity();
            self.body.set_velocity(v * multiplier);
        }
        self.constant_speed *= multiplier;
        self.min_bounce_speed *= multiplier;
        self.slowed = Some(SlowMark { multiplier });
    }

    /// Divide out the applied multiplier. Heading changes made while slowed
    /// survive the restore; only the magnitude scales back.
    pub fn remove_slow(&mut self) {
        let Some(mark) = self.slowed.take() else {
            return;
        };
        if let Some(snap) = &mut self.frozen {
            snap.vel /= mark.multiplier;
        } else {
            let v = self.body.velocity();
            self.body.set_velocity(v / mark.multiplier);
        }
        self.constant_speed /= mark.multiplier;
        self.min_bounce_speed /= mark.multiplier;
    }
}

/// Component magnitude pushed away from a contact face; a dead-zero
/// component gets a nudge so normalization has a direction to work with.
#[inline]
fn away(value: f32, toward_positive: bool) -> f32 {
    let mag = value.abs().max(1e-3);
    if toward_positive { mag } else { -mag }
}
