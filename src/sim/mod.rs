//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod burst;
pub mod collide;
pub mod effects;
pub mod entity;
pub mod field;
pub mod state;
pub mod table;
pub mod tick;

pub use body::{Body, FaceFlags};
pub use burst::BurstClear;
pub use effects::TimeEffects;
pub use entity::{Category, Entity, EntityId, EntityKind, SpecialMode, WalkerPhase};
pub use field::{Cell, Playfield};
pub use state::{GameEvent, GameState, Player, Population, Shot};
pub use table::{Family, TierParams};
pub use tick::{TickInput, populate_level, tick};
