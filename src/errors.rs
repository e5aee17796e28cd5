use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::NBack;

/// Error type for configuration, generation, and artifact failures.
#[derive(Debug, Error)]
pub enum NBackError {
    /// The requested lure mix could not be placed with this random draw sequence.
    #[error(
        "could not insert all lures: {remaining} of {requested} left unplaced; it might work with a different seed, otherwise the parameters have to be changed"
    )]
    MissingLures {
        /// Pool entries still unplaced.
        remaining: usize,
        /// Pool size at the start of the build.
        requested: usize,
    },
    /// The exclusion rules left fewer candidate symbols than needed.
    #[error(
        "alphabet exhausted at position {position}: {available} candidate symbols available, {required} required"
    )]
    ExhaustedCandidates {
        /// Sequence position being filled.
        position: usize,
        /// Candidates left after exclusions.
        available: usize,
        /// Candidates needed.
        required: usize,
    },
    /// Missing or out-of-range parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The protocol runner hit its seed limit before producing every block.
    #[error("gave up on {n}-back after {attempts} seeds with {produced} blocks produced")]
    AttemptsExhausted {
        /// Look-back distance of the failing run.
        n: NBack,
        /// Seeds tried.
        attempts: usize,
        /// Blocks produced before giving up.
        produced: usize,
    },
    /// A block or seed file could not be parsed or encoded.
    #[error("malformed artifact '{}': {reason}", path.display())]
    Artifact {
        /// File being read or written.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl NBackError {
    /// True when rebuilding with a different seed may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NBackError::MissingLures { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_lures_is_retryable() {
        assert!(
            NBackError::MissingLures {
                remaining: 1,
                requested: 4
            }
            .is_retryable()
        );
        assert!(
            !NBackError::ExhaustedCandidates {
                position: 3,
                available: 0,
                required: 1
            }
            .is_retryable()
        );
        assert!(!NBackError::Configuration("n is not set".into()).is_retryable());
    }

    #[test]
    fn missing_lures_message_suggests_reseeding() {
        let err = NBackError::MissingLures {
            remaining: 2,
            requested: 5,
        };
        let message = err.to_string();
        assert!(message.contains("2 of 5"));
        assert!(message.contains("different seed"));
    }
}
