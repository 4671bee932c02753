//! Spawn errors.

use thiserror::Error;

/// Why a spawn request was rejected. A rejected spawn registers nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidDimension { name: &'static str, value: f32 },

    #[error("spawn position must be finite")]
    NonFinitePosition,

    #[error("entity limit of {limit} reached")]
    CapacityReached { limit: usize },
}
