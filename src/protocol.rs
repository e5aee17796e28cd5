use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NBackBuilder;
use crate::constants::config::{DEFAULT_ALPHABET, DEFAULT_HORIZON};
use crate::constants::protocol::{
    DEFAULT_BLOCKS, DEFAULT_FIRST_SEED, DEFAULT_MATCH_TRIALS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_TRIALS,
};
use crate::data::NBackSequence;
use crate::errors::NBackError;
use crate::rng::DeterministicRng;
use crate::types::{LureOffset, NBack, Seed};

/// Parameters for generating a set of blocks for several values of n.
///
/// Deserialized from JSON; every field is optional:
///
/// ```json
/// {
///   "blocks": 20,
///   "alphabet": "BCDFGHJKLMNPQRSTVWXYZ",
///   "trials": 45,
///   "match_trials": 0.333,
///   "horizon": 3,
///   "ns": [1, 2, 3],
///   "lure_rates": { "2": [[1, 0.1], [-1, 0.05]] }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Blocks to produce per n.
    pub blocks: usize,
    /// Symbols trial content is drawn from; duplicates are dropped.
    pub alphabet: String,
    /// Classified trials per block.
    pub trials: usize,
    /// Proportion of match trials.
    pub match_trials: f64,
    /// Lure horizon.
    pub horizon: usize,
    /// Values of n to generate blocks for.
    pub ns: Vec<NBack>,
    /// `(offset, rate)` lure requests per n; missing entries mean no lures.
    pub lure_rates: BTreeMap<NBack, Vec<(LureOffset, f64)>>,
    /// Seeds tried per n before giving up.
    pub max_attempts: usize,
    /// First seed tried for each n; later attempts count up from here.
    pub first_seed: Seed,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            blocks: DEFAULT_BLOCKS,
            alphabet: DEFAULT_ALPHABET.to_string(),
            trials: DEFAULT_TRIALS,
            match_trials: DEFAULT_MATCH_TRIALS,
            horizon: DEFAULT_HORIZON,
            ns: vec![1, 2, 3],
            lure_rates: BTreeMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            first_seed: DEFAULT_FIRST_SEED,
        }
    }
}

impl ProtocolConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, NBackError> {
        serde_json::from_str(raw)
            .map_err(|err| NBackError::Configuration(format!("invalid protocol config: {err}")))
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NBackError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Builder for the blocks of one n.
    pub fn builder_for(&self, n: NBack) -> NBackBuilder {
        let mut builder = NBackBuilder::new()
            .alphabet(self.alphabet.as_str())
            .n(n)
            .trials(self.trials)
            .match_trials(self.match_trials)
            .horizon(self.horizon);
        for &(offset, rate) in self.lure_rates.get(&n).into_iter().flatten() {
            builder = builder.lure_rate(offset, rate);
        }
        builder
    }
}

/// A successfully built block and the seed that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBlock {
    /// Seed of the [`DeterministicRng`] that built the block.
    pub seed: Seed,
    /// The block itself.
    pub sequence: NBackSequence,
}

/// All blocks produced for one n.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRun {
    /// Look-back distance.
    pub n: NBack,
    /// Blocks in seed order.
    pub blocks: Vec<GeneratedBlock>,
}

impl ProtocolRun {
    /// Seeds of the blocks, in block order.
    pub fn seeds(&self) -> Vec<Seed> {
        self.blocks.iter().map(|block| block.seed).collect()
    }
}

/// Build `config.blocks` blocks for `n`, moving to the next seed whenever the
/// lure mix could not be placed.
///
/// Non-retryable failures are returned immediately.
pub fn generate_blocks(config: &ProtocolConfig, n: NBack) -> Result<Vec<GeneratedBlock>, NBackError> {
    let nback = config.builder_for(n).build()?;
    let mut blocks = Vec::with_capacity(config.blocks);
    let mut seed = config.first_seed;
    let mut attempts = 0usize;
    while blocks.len() < config.blocks {
        if attempts >= config.max_attempts {
            warn!(
                n,
                attempts,
                produced = blocks.len(),
                "lure mix could not be placed within the attempt limit"
            );
            return Err(NBackError::AttemptsExhausted {
                n,
                attempts,
                produced: blocks.len(),
            });
        }
        attempts += 1;
        let mut rng = DeterministicRng::new(seed);
        match nback.generate(&mut rng) {
            Ok(sequence) => blocks.push(GeneratedBlock { seed, sequence }),
            Err(err) if err.is_retryable() => {
                debug!(n, seed, error = %err, "reseeding after failed build");
            }
            Err(err) => return Err(err),
        }
        seed = seed.wrapping_add(1);
    }
    debug!(n, attempts, blocks = blocks.len(), "protocol blocks generated");
    Ok(blocks)
}

/// Run [`generate_blocks`] for every configured n in parallel.
///
/// Each n derives its own generators from the seeds, so the result does not
/// depend on scheduling. Runs are returned in the order of `config.ns`.
pub fn generate_protocol(config: &ProtocolConfig) -> Result<Vec<ProtocolRun>, NBackError> {
    config
        .ns
        .par_iter()
        .map(|&n| generate_blocks(config, n).map(|blocks| ProtocolRun { n, blocks }))
        .collect()
}
