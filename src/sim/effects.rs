//! Global time effects
//!
//! Freeze and slow-motion apply to every dynamic entity category at once -
//! balls, flyers, and walkers - stack by extending the deadline, and
//! restore exactly once. Each effect kind owns a single pending record
//! carrying a generation counter; a request bumps the generation and
//! rewrites the record, so a deadline captured before an extension can
//! never fire an early restore.

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::state::Population;

/// Scheduled expiry for one effect kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Pending {
    fire_at: u64,
    generation: u64,
}

/// Scheduled expiry for slow-motion, which also remembers its multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SlowPending {
    fire_at: u64,
    generation: u64,
    multiplier: f32,
}

/// Controller for the global freeze and slow-motion effects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEffects {
    freeze: Option<Pending>,
    slow: Option<SlowPending>,
    freeze_generation: u64,
    slow_generation: u64,
}

impl TimeEffects {
    #[inline]
    pub fn freeze_active(&self) -> bool {
        self.freeze.is_some()
    }

    #[inline]
    pub fn slow_active(&self) -> bool {
        self.slow.is_some()
    }

    /// Absolute tick the freeze expires at, if active
    pub fn freeze_until(&self) -> Option<u64> {
        self.freeze.map(|p| p.fire_at)
    }

    pub fn slow_until(&self) -> Option<u64> {
        self.slow.map(|p| p.fire_at)
    }

    pub fn slow_multiplier(&self) -> Option<f32> {
        self.slow.map(|p| p.multiplier)
    }

    /// Freeze the whole population for `duration` ticks. Re-requesting
    /// while active extends the deadline to `max(current, now + duration)`
    /// and snapshots nothing - per-entity freeze keeps its first snapshot.
    pub fn request_freeze(&mut self, now: u64, duration: u64, population: &mut Population) {
        let fire_at = match self.freeze {
            Some(p) => p.fire_at.max(now + duration),
            None => now + duration,
        };
        self.freeze_generation += 1;
        self.freeze = Some(Pending {
            fire_at,
            generation: self.freeze_generation,
        });
        let mut affected = 0usize;
        for e in population.iter_mut_all().filter(|e| e.alive) {
            e.freeze(now);
            affected += 1;
        }
        log::info!("freeze until tick {fire_at} ({affected} entities)");
    }

    /// Slow the whole population. The multiplier is applied once per
    /// entity; re-requesting extends the deadline but keeps the multiplier
    /// already in force.
    pub fn request_slow(&mut self, now: u64, duration: u64, multiplier: f32, population: &mut Population) {
        let (fire_at, multiplier) = match self.slow {
            Some(p) => {
                if (p.multiplier - multiplier).abs() > f32::EPSILON {
                    log::debug!(
                        "slow re-request with multiplier {multiplier}, keeping {}",
                        p.multiplier
                    );
                }
                (p.fire_at.max(now + duration), p.multiplier)
            }
            None => (now + duration, multiplier),
        };
        self.slow_generation += 1;
        self.slow = Some(SlowPending {
            fire_at,
            generation: self.slow_generation,
            multiplier,
        });
        let mut affected = 0usize;
        for e in population.iter_mut_all().filter(|e| e.alive) {
            e.apply_slow(multiplier);
            affected += 1;
        }
        log::info!("slow x{multiplier} until tick {fire_at} ({affected} entities)");
    }

    /// Entities entering play mid-effect pick the effect up immediately so
    /// the population stays uniform.
    pub fn apply_to_newcomer(&self, now: u64, e: &mut Entity) {
        if let Some(p) = self.slow {
            e.apply_slow(p.multiplier);
        }
        if self.freeze.is_some() {
            e.freeze(now);
        }
    }

    /// Fire due expiries. A record whose generation predates the latest
    /// request is stale and is dropped without restoring anything.
    pub fn step(&mut self, now: u64, population: &mut Population) {
        if let Some(p) = self.freeze {
            if now >= p.fire_at {
                self.freeze = None;
                if p.generation == self.freeze_generation {
                    for e in population.iter_mut_all() {
                        e.unfreeze(now);
                    }
                    log::info!("freeze expired at tick {now}");
                } else {
                    log::debug!("dropped stale freeze expiry (gen {})", p.generation);
                }
            }
        }
        if let Some(p) = self.slow {
            if now >= p.fire_at {
                self.slow = None;
                if p.generation == self.slow_generation {
                    for e in population.iter_mut_all() {
                        e.remove_slow();
                    }
                    log::info!("slow expired at tick {now}");
                } else {
                    log::debug!("dropped stale slow expiry (gen {})", p.generation);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::table::Family;
    use glam::Vec2;

    fn population() -> Population {
        let mut p = Population::default();
        p.push(Entity::ball(1, Family::Gravity, 2, Vec2::new(50.0, 50.0), 1.0, 0));
        p.push(Entity::flyer(2, Vec2::new(80.0, 40.0), -1.0, 0));
        p.push(Entity::walker(3, Vec2::new(120.0, 100.0), 1.0));
        p
    }

    #[test]
    fn test_freeze_covers_every_category() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        fx.request_freeze(10, 300, &mut pop);
        assert!(pop.iter_all().all(|e| e.frozen.is_some()));
        assert!(pop.iter_all().all(|e| e.body.velocity() == Vec2::ZERO));
    }

    #[test]
    fn test_freeze_idempotence() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        let before: Vec<Vec2> = pop.iter_all().map(|e| e.body.velocity()).collect();
        fx.request_freeze(10, 3000, &mut pop);
        fx.request_freeze(10, 3000, &mut pop);
        // One snapshot per entity, holding the pre-freeze velocity
        for (e, v) in pop.iter_all().zip(before) {
            assert_eq!(e.frozen.unwrap().vel, v);
        }
        // Deadline is now+duration, not doubled
        assert_eq!(fx.freeze_until(), Some(3010));
    }

    #[test]
    fn test_extension_is_max_of_deadlines() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        fx.request_freeze(0, 300, &mut pop);
        fx.request_freeze(100, 300, &mut pop);
        assert_eq!(fx.freeze_until(), Some(400));
        // A long deadline is never shortened by a short re-request
        fx.request_freeze(110, 10, &mut pop);
        assert_eq!(fx.freeze_until(), Some(400));
    }

    #[test]
    fn test_stale_deadline_does_not_restore_early() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        fx.request_freeze(0, 300, &mut pop);
        fx.request_freeze(100, 300, &mut pop); // extends to 400
        // The old deadline passes: nothing restores
        fx.step(300, &mut pop);
        assert!(fx.freeze_active());
        assert!(pop.iter_all().all(|e| e.frozen.is_some()));
        // The real deadline fires
        fx.step(400, &mut pop);
        assert!(!fx.freeze_active());
        assert!(pop.iter_all().all(|e| e.frozen.is_none()));
    }

    #[test]
    fn test_slow_never_compounds() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        let vx = pop.balls[0].body.velocity().x;
        fx.request_slow(0, 300, 0.4, &mut pop);
        fx.request_slow(50, 300, 0.4, &mut pop);
        assert!((pop.balls[0].body.velocity().x - vx * 0.4).abs() < 1e-3);
        assert_eq!(fx.slow_until(), Some(350));
        fx.step(350, &mut pop);
        assert!((pop.balls[0].body.velocity().x - vx).abs() < 1e-3);
    }

    #[test]
    fn test_slow_re_request_keeps_original_multiplier() {
        let mut pop = population();
        let mut fx = TimeEffects::default();
        fx.request_slow(0, 300, 0.4, &mut pop);
        fx.request_slow(10, 300, 0.9, &mut pop);
        assert_eq!(fx.slow_multiplier(), Some(0.4));
    }

    #[test]
    fn test_empty_population_is_fine() {
        let mut pop = Population::default();
        let mut fx = TimeEffects::default();
        fx.request_freeze(0, 100, &mut pop);
        fx.request_slow(0, 100, 0.5, &mut pop);
        fx.step(100, &mut pop);
        assert!(!fx.freeze_active());
        assert!(!fx.slow_active());
    }
}
