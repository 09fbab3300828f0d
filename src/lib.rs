//! Bubble Blitz - deterministic physics core for an arcade bubble-bouncer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, fragmentation, time effects)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// Playfield dimensions (pixels)
    pub const FIELD_WIDTH: f32 = 384.0;
    pub const FIELD_HEIGHT: f32 = 240.0;
    /// Tile grid cell size
    pub const TILE_SIZE: f32 = 16.0;
    /// How far past the playfield an entity may drift before it is despawned
    pub const DESPAWN_MARGIN: f32 = 64.0;

    /// Downward gravity for gravity-family balls (px/s²)
    pub const BALL_GRAVITY: f32 = 420.0;
    /// Cooldown ticks after a bounce so one wall contact reflects once (~60 ms)
    pub const CONTACT_COOLDOWN_TICKS: u32 = 8;

    /// Burst-clear consumption interval (~80 ms)
    pub const BURST_INTERVAL_TICKS: u64 = 10;

    /// Player defaults
    pub const PLAYER_HALF_WIDTH: f32 = 8.0;
    pub const PLAYER_HALF_HEIGHT: f32 = 14.0;
    pub const PLAYER_SPEED: f32 = 140.0;
    /// Invulnerability window after taking a hit (2 s)
    pub const INVULN_TICKS: u32 = 240;

    /// Shot (harpoon) defaults
    pub const SHOT_SPEED: f32 = 360.0;
    pub const SHOT_HALF_WIDTH: f32 = 2.0;
    pub const SHOT_HALF_HEIGHT: f32 = 6.0;

    /// Ground enemy (walker) defaults
    pub const WALKER_SPEED: f32 = 55.0;
    pub const WALKER_HALF: f32 = 9.0;
    pub const WALKER_SCORE: i64 = 50;
    pub const WALKER_STUN_TICKS: u64 = 600;
    pub const WALKER_LAUNCH_SPEED: f32 = 340.0;

    /// Flying enemy (flyer) defaults
    pub const FLYER_SPEED: f32 = 90.0;
    pub const FLYER_HALF: f32 = 8.0;
    pub const FLYER_SCORE: i64 = 60;
    pub const FLYER_BOB_AMPLITUDE: f32 = 28.0;
    /// Bob cycle angular velocity (rad/s)
    pub const FLYER_BOB_RATE: f32 = 2.2;

    /// Special ball score
    pub const SPECIAL_SCORE: i64 = 100;
}
