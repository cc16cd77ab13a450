//! Error type shared by the micelle, preference and soup layers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GardError>;

/// Everything that can go wrong while building or advancing a soup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GardError {
    /// Construction parameters are unusable (N, G, standard deviations, retry bound).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An injected matrix does not have the G x G shape of the soup.
    #[error("matrix shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A composition vector does not have one entry per amphiphile type.
    #[error("composition has {found} entries, expected {expected}")]
    CompositionLength { expected: usize, found: usize },

    /// `add_unit` was asked for an amphiphile type outside `[0, G)`.
    #[error("amphiphile type {index} out of range for {types} types")]
    TypeIndexOutOfRange { index: usize, types: usize },

    /// A micelle with no units cannot produce a non-empty daughter.
    #[error("cannot split an empty micelle")]
    EmptyMicelle,

    /// The bounded split retry never produced a non-empty first daughter.
    #[error("split gave an empty first daughter on all {attempts} attempts")]
    SplitAttemptsExhausted { attempts: u32 },
}
