//! Simulation tuning
//!
//! Loaded from a JSON file; any field left out falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Arena ===
    /// Arena width in units (0 means "not sized yet")
    pub arena_width: f32,
    /// Arena height in units (0 means "not sized yet")
    pub arena_height: f32,
    /// Restitution of the four walls (>= 1 keeps play lively)
    pub wall_restitution: f32,

    // === Players ===
    /// Speed at factor 1.0, in units per tick
    pub base_speed: f32,
    /// Allowed drift from the target speed before it is re-issued
    pub speed_tolerance: f32,
    pub player_radius: f32,
    pub player_mass: f32,
    pub player_restitution: f32,

    // === Items ===
    pub item_radius: f32,
    pub item_restitution: f32,

    // === Match ===
    pub max_hp: u32,
    /// Match length in seconds
    pub match_duration_secs: f32,

    /// Fixed RNG seed; a fresh one is drawn when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 600.0,
            arena_height: 500.0,
            wall_restitution: 1.1,

            base_speed: 7.0,
            speed_tolerance: 0.5,
            player_radius: 30.0,
            player_mass: 5.0,
            player_restitution: 1.05,

            item_radius: 15.0,
            item_restitution: 1.0,

            max_hp: 5,
            match_duration_secs: 90.0,

            seed: None,
        }
    }
}

impl SimConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load a config file, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("Using default config ({}): {err}", path.display());
                Self::default()
            }
        }
    }

    /// Check values that would make the physics meaningless.
    ///
    /// Arena size is not checked here: an unsized arena is a
    /// startup precondition reported by [`Simulation::new`](crate::Simulation::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("base_speed", self.base_speed)?;
        positive("speed_tolerance", self.speed_tolerance)?;
        positive("player_radius", self.player_radius)?;
        positive("player_mass", self.player_mass)?;
        positive("item_radius", self.item_radius)?;
        positive("match_duration_secs", self.match_duration_secs)?;
        at_least_one("wall_restitution", self.wall_restitution)?;
        at_least_one("player_restitution", self.player_restitution)?;
        at_least_one("item_restitution", self.item_restitution)?;
        if self.max_hp == 0 {
            return Err(ConfigError::Invalid {
                field: "max_hp",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Target speed magnitude for a player with the given factor
    #[inline]
    pub fn target_speed(&self, speed_factor: f32) -> f32 {
        self.base_speed * speed_factor
    }

    /// Match length in milliseconds
    pub fn match_duration_ms(&self) -> f64 {
        f64::from(self.match_duration_secs) * 1000.0
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number, got {value}"),
        })
    }
}

fn at_least_one(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("collisions must stay elastic (>= 1.0), got {value}"),
        })
    }
}
