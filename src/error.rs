//! Error types
//!
//! Only initialization can fail. Everything that happens once the simulation
//! is running degrades to a logged no-op instead of an error.

/// Failure loading or validating a [`SimConfig`](crate::SimConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Precondition failure that keeps the simulation from starting
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("arena has not been sized yet ({width}x{height})")]
    ArenaNotSized { width: f32, height: f32 },

    #[error("arena {width}x{height} is too small, both sides must exceed {min}")]
    ArenaTooSmall { width: f32, height: f32, min: f32 },

    #[error("expected 2 player records, found {found}")]
    PlayerCount { found: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
