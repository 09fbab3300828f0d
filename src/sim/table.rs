//! Fragmentation tables
//!
//! Static size/score/speed lookup: an entity of tier N produces two children
//! of tier N-1 when destroyed, down to tier 0 which is terminal. Two
//! families share the contract but live in different physical regimes:
//! gravity balls arc under gravity and clamp their vertical rebound, orbit
//! balls ignore gravity, reflect on every playfield edge, and renormalize
//! their speed every tick.

use serde::{Deserialize, Serialize};

/// Per-tier parameters. `bounce_floor` is the minimum vertical rebound
/// speed; it is zero for the orbit family, which never needs it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TierParams {
    /// Conserved speed magnitude (px/s)
    pub speed: f32,
    /// Score emitted when an entity of this tier is destroyed
    pub score: i64,
    /// Minimum vertical rebound speed (px/s)
    pub bounce_floor: f32,
    /// Collision radius (px)
    pub radius: f32,
    /// Visual scale relative to the largest tier
    pub scale: f32,
}

/// Which table a ball entity draws its parameters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    Gravity,
    Orbit,
}

/// Gravity ball family: huge -> big -> mid -> small. Smaller tiers are
/// faster; higher tiers rebound higher.
const GRAVITY_TIERS: [TierParams; 4] = [
    // tier 0 (terminal)
    TierParams {
        speed: 380.0,
        score: 40,
        bounce_floor: 180.0,
        radius: 6.0,
        scale: 0.25,
    },
    TierParams {
        speed: 340.0,
        score: 30,
        bounce_floor: 200.0,
        radius: 10.0,
        scale: 0.42,
    },
    TierParams {
        speed: 300.0,
        score: 20,
        bounce_floor: 220.0,
        radius: 16.0,
        scale: 0.67,
    },
    // tier 3
    TierParams {
        speed: 260.0,
        score: 10,
        bounce_floor: 240.0,
        radius: 24.0,
        scale: 1.0,
    },
];

/// Orbit ball family: edge-bounded hexagon balls, three tiers.
const ORBIT_TIERS: [TierParams; 3] = [
    TierParams {
        speed: 320.0,
        score: 35,
        bounce_floor: 0.0,
        radius: 7.0,
        scale: 0.4,
    },
    TierParams {
        speed: 280.0,
        score: 25,
        bounce_floor: 0.0,
        radius: 12.0,
        scale: 0.67,
    },
    TierParams {
        speed: 240.0,
        score: 15,
        bounce_floor: 0.0,
        radius: 18.0,
        scale: 1.0,
    },
];

impl Family {
    fn tiers(self) -> &'static [TierParams] {
        match self {
            Family::Gravity => &GRAVITY_TIERS,
            Family::Orbit => &ORBIT_TIERS,
        }
    }

    /// Largest tier in this family
    pub fn top_tier(self) -> u8 {
        (self.tiers().len() - 1) as u8
    }

    /// Parameters for a tier; None for tiers the table does not know
    pub fn params_for(self, tier: u8) -> Option<&'static TierParams> {
        self.tiers().get(tier as usize)
    }

    /// The tier a destroyed entity fragments into. None means terminal:
    /// tier 0 by rule, and unknown tiers are treated as terminal too.
    pub fn next_tier(self, tier: u8) -> Option<u8> {
        if tier == 0 || tier as usize >= self.tiers().len() {
            None
        } else {
            Some(tier - 1)
        }
    }

    /// Total score a full destruction cascade starting at `tier` emits:
    /// the tier itself once plus two full cascades of the next tier.
    pub fn cascade_score(self, tier: u8) -> i64 {
        let Some(params) = self.params_for(tier) else {
            return 0;
        };
        match self.next_tier(tier) {
            Some(next) => params.score + 2 * self.cascade_score(next),
            None => params.score,
        }
    }
}
