//! Neon Drive - endless and open-world arcade driving
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (vehicle, world streaming, hazards, camera, session)
//! - `platform`: Collaborator seams (scene, renderer, audio, score store) and their adapters
//! - `renderer`: Uniform packing for the page-side renderer
//! - `tuning`: Data-driven game balance per variant
//! - `settings` / `best_score`: Player preferences and the persisted record

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod best_score;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use best_score::BestScore;
pub use settings::{QualityPreset, Settings};
pub use tuning::{Tuning, Variant};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Largest frame delta the simulation will integrate (seconds)
    pub const MAX_FRAME_DT: f32 = 0.05;
    /// Delta used for the very first frame, before a previous timestamp exists
    pub const NOMINAL_FRAME_DT: f32 = 1.0 / 60.0;

    /// Lane centers for the lane-based variants
    pub const LANES: [f32; 3] = [-3.0, 0.0, 3.0];
    /// Half width of the paved road strip in chunk regions
    pub const ROAD_HALF_WIDTH: f32 = 6.0;
    /// Half width of the ground plane in chunk regions
    pub const GROUND_HALF_WIDTH: f32 = 120.0;
    /// Half width of the cross roads in tile regions
    pub const TILE_ROAD_HALF_WIDTH: f32 = 5.0;

    /// Seconds between the game-over freeze and the results screen
    pub const REVEAL_DELAY: f32 = 1.2;

    /// Maximum cosmetic roll (radians) applied while steering
    pub const MAX_ROLL: f32 = 0.12;
    /// Maximum cosmetic yaw (radians) applied while steering in lane mode
    pub const MAX_YAW: f32 = 0.25;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit forward vector for a heading. Heading 0 faces -Z, positive turns toward +X.
#[inline]
pub fn forward(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, -heading.cos())
}

/// Speed divided by max speed, clamped to [0, 1]
#[inline]
pub fn speed_fraction(speed: f32, max_speed: f32) -> f32 {
    if max_speed <= 0.0 {
        return 0.0;
    }
    (speed / max_speed).clamp(0.0, 1.0)
}

/// Move `current` toward `target` by `rate * dt` of the remaining gap (never overshoots)
#[inline]
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (rate * dt).clamp(0.0, 1.0)
}

/// Format a distance in meters for the free-drive HUD
pub fn format_distance(meters: f32) -> String {
    let meters = meters.max(0.0);
    if meters < 1000.0 {
        format!("{} m", meters.floor() as u32)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}
