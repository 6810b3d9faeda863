use std::fmt;

/// Why a [`GameConfig`](crate::GameConfig) or preset grid was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    EmptyGrid,
    RaggedGrid { row: usize, expected: usize },
    GridMismatch { rows: usize, cols: usize },
    EmptySpawnSet,
    SpawnValueNotPowerOfTwo { value: u64 },
    EmptyScript,
    InvalidFallRate { rows_per_second: f64 },
    ZeroTickInterval,
    ZeroMaxStep,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid needs at least one row and one column"),
            Self::RaggedGrid { row, expected } => {
                write!(f, "grid line {row} is not {expected} cells wide")
            }
            Self::GridMismatch { rows, cols } => {
                write!(f, "preset grid does not match configured size {rows}x{cols}")
            }
            Self::EmptySpawnSet => write!(f, "spawn set is empty"),
            Self::SpawnValueNotPowerOfTwo { value } => {
                write!(f, "spawn value {value} is not a power of two")
            }
            Self::EmptyScript => write!(f, "scripted tile generator has no values"),
            Self::InvalidFallRate { rows_per_second } => {
                write!(f, "fall rate must be finite and positive, got {rows_per_second}")
            }
            Self::ZeroTickInterval => write!(f, "fixed tick interval must be non-zero"),
            Self::ZeroMaxStep => write!(f, "maximum time step must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}
