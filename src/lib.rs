//! Gear Clash - simulation core for a two-player arena brawler
//!
//! Core modules:
//! - `sim`: Fixed-step physics, collision rules, spawn placement, watchdogs
//! - `store`: The game-state container the simulation reads and mutates
//! - `config`: Data-driven tuning loaded from JSON
//! - `error`: Startup and configuration failures

pub mod config;
pub mod error;
pub mod sim;
pub mod store;

pub use config::SimConfig;
pub use error::{ConfigError, StartupError};
pub use sim::Simulation;
pub use store::{GameStore, Item, ItemId, ItemKind, MatchState, Player, PlayerId};

use glam::Vec2;
use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz)
    pub const TICK_MS: f64 = 1000.0 / 60.0;
    /// Maximum fixed ticks per `advance` call to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Every spawned pickup stays this far inside each wall
    pub const SPAWN_MARGIN: f32 = 30.0;
    /// A velocity component smaller than this counts as axis-aligned travel
    pub const AXIS_EPSILON: f32 = 0.5;

    /// Replacement gear after a successful hit (ms, uniform)
    pub const GEAR_RESPAWN_DELAY_MS: std::ops::Range<f64> = 1000.0..2000.0;
    /// Replacement heart after one is eaten (ms, uniform)
    pub const HEART_RESPAWN_DELAY_MS: std::ops::Range<f64> = 2000.0..4000.0;
    /// First gear of a match (ms, uniform)
    pub const FIRST_GEAR_DELAY_MS: std::ops::Range<f64> = 1000.0..2000.0;
    /// First heart of a match (ms, uniform)
    pub const FIRST_HEART_DELAY_MS: std::ops::Range<f64> = 3000.0..5000.0;
    /// Delay before a player's velocity is cleaned up after a contact
    pub const VELOCITY_CORRECTION_DELAY_MS: f64 = 100.0;
    /// An uncollected gear is moved after this long
    pub const GEAR_RELOCATE_AFTER_MS: f64 = 7000.0;
    /// Period of the gear watchdog and the stalemate check
    pub const WATCHDOG_INTERVAL_MS: f64 = 2000.0;
    /// Delay before a gear pulled by the stalemate breaker reappears
    pub const STALEMATE_RESPAWN_DELAY_MS: f64 = 300.0;
}

/// Unit vector pointing along `angle` (radians)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Direction of a vector in radians, `0.0` for the zero vector
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// True when travel is (nearly) purely horizontal or vertical
#[inline]
pub fn is_near_axis(v: Vec2) -> bool {
    v.x.abs() < consts::AXIS_EPSILON || v.y.abs() < consts::AXIS_EPSILON
}

/// Uniform random direction in `[0, 2π)`
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.random_range(0.0..std::f32::consts::TAU)
}

/// Random launch direction that is neither close to an axis nor a diagonal
/// hugging one: both `|cos|` and `|sin|` stay within `[0.3, 0.95]`.
pub fn launch_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    loop {
        let angle = random_angle(rng);
        let (sin, cos) = angle.sin_cos();
        if (0.3..=0.95).contains(&cos.abs()) && (0.3..=0.95).contains(&sin.abs()) {
            return angle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_is_near_axis() {
        assert!(is_near_axis(Vec2::new(4.0, 0.2)));
        assert!(is_near_axis(Vec2::new(-0.4, -3.0)));
        assert!(!is_near_axis(Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn test_launch_angle_avoids_axes() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let dir = heading(launch_angle(&mut rng));
            assert!(dir.x.abs() >= 0.3 - 1e-4 && dir.x.abs() <= 0.95 + 1e-4);
            assert!(dir.y.abs() >= 0.3 - 1e-4 && dir.y.abs() <= 0.95 + 1e-4);
        }
    }

    #[test]
    fn test_angle_of_zero_vector() {
        assert_eq!(angle_of(Vec2::ZERO), 0.0);
        assert!((angle_of(Vec2::new(0.0, 2.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
