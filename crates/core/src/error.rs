//! Error taxonomy shared by every engine.

use thiserror::Error;

/// Failures surfaced before or instead of a digest.
///
/// Hashing itself is infallible once inputs are validated, so every variant
/// is either a rejected precondition or a failed cache/dataset allocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidInputLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported {algorithm} variant {id}")]
    UnsupportedVariant { algorithm: &'static str, id: u64 },

    #[error("unsupported epoch {epoch} (max {max})")]
    UnsupportedEpoch { epoch: u64, max: u64 },

    #[error("failed to allocate {bytes} bytes")]
    ResourceExhaustion { bytes: usize },

    #[error("argon2 cache fill failed: {0}")]
    Argon2(String),
}

impl Error {
    pub(crate) fn length(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidInputLength {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn variant(algorithm: &'static str, id: impl Into<u64>) -> Self {
        Self::UnsupportedVariant {
            algorithm,
            id: id.into(),
        }
    }
}

impl From<argon2::Error> for Error {
    fn from(err: argon2::Error) -> Self {
        Self::Argon2(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = core::result::Result<T, Error>;
