#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Two-line artifact writer and reader.
pub mod artifact;
/// Alphabet, fluent builder, and validated block parameters.
pub mod config;
/// Centralized defaults, condition codes, and file names.
pub mod constants;
/// Sequence and condition types.
pub mod data;
mod errors;
/// Command runners behind the `nbackgen` and `nback_protocol` binaries.
pub mod example_apps;
mod generator;
/// Per-condition counts and label consistency checks.
pub mod metrics;
/// Multi-block generation with reseeding.
pub mod protocol;
/// Seedable random source used for reproducible builds.
pub mod rng;
/// Shared type aliases.
pub mod types;

pub use config::{Alphabet, NBackBuilder, NBackConfig};
pub use data::{Condition, NBackSequence, TrialKind};
pub use errors::NBackError;
pub use metrics::{SequenceStats, Violation, check_block, check_invariants, sequence_stats};
pub use protocol::{GeneratedBlock, ProtocolConfig, ProtocolRun, generate_blocks, generate_protocol};
pub use rng::DeterministicRng;
pub use types::{LureOffset, NBack, Seed, Symbol};
