//! Data-driven game balance
//!
//! Balance knobs that levels may override without a rebuild. Loaded from
//! JSON; any missing field falls back to its default.

use serde::{Deserialize, Serialize};

/// Tunable gameplay parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Freeze effect duration in ticks
    pub freeze_ticks: u64,
    /// Slow-motion effect duration in ticks
    pub slow_ticks: u64,
    /// Velocity multiplier while slow-motion is active
    pub slow_multiplier: f32,
    /// Percent chance a destroyed breakable cell rolls a drop
    pub drop_chance_percent: u32,
    /// Maximum simultaneous player shots
    pub max_shots: usize,
    pub starting_lives: u8,
    /// Size tiers of the gravity balls placed at level start
    pub initial_ball_tiers: Vec<u8>,
    /// Size tiers of the orbit balls placed at level start
    pub initial_orbit_tiers: Vec<u8>,
    pub initial_flyers: u32,
    pub initial_walkers: u32,
    /// Grid row holding the breakable platform band (0 = top)
    pub breakable_row: usize,
    /// Hit points per breakable cell
    pub breakable_hp: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            freeze_ticks: 600,
            slow_ticks: 720,
            slow_multiplier: 0.4,
            drop_chance_percent: 20,
            max_shots: 2,
            starting_lives: 3,
            initial_ball_tiers: vec![3, 2],
            initial_orbit_tiers: vec![2],
            initial_flyers: 1,
            initial_walkers: 2,
            breakable_row: 9,
            breakable_hp: 2,
        }
    }
}

impl Tuning {
    /// Parse tuning from a JSON document; missing fields keep defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let t = Tuning::default();
        let json = serde_json::to_string(&t).unwrap();
        let back = Tuning::from_json(&json).unwrap();
        assert_eq!(back.freeze_ticks, t.freeze_ticks);
        assert_eq!(back.initial_ball_tiers, t.initial_ball_tiers);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let t = Tuning::from_json(r#"{"slow_multiplier": 0.5}"#).unwrap();
        assert_eq!(t.slow_multiplier, 0.5);
        assert_eq!(t.max_shots, Tuning::default().max_shots);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(Tuning::from_json("{nope").is_err());
    }
}
