/// Constants used by builder defaults.
pub mod config {
    /// Consonants used when no alphabet is configured.
    pub const DEFAULT_ALPHABET: &str = "BCDFGHJKLMNPQRSTVWXYZ";
    /// Number of most recent symbols excluded from mismatch trials by default.
    pub const DEFAULT_HORIZON: usize = 3;
}

/// Single-character condition codes used in the two-line artifact.
pub mod conditions {
    /// Code for match trials.
    pub const MATCH_CODE: char = 'm';
    /// Code for lure trials.
    pub const LURE_CODE: char = 'l';
    /// Code for genuine mismatch trials (and, in the reference encoding, seed trials).
    pub const MISMATCH_CODE: char = '-';
    /// Optional code for seed trials when the seed marker encoding is requested.
    pub const SEED_CODE: char = 's';
}

/// Constants used by the multi-block protocol runner.
pub mod protocol {
    /// Upper bound on seeds tried per n before giving up.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;
    /// First seed tried for each n.
    pub const DEFAULT_FIRST_SEED: u64 = 1;
    /// Blocks generated per n when the config does not say otherwise.
    pub const DEFAULT_BLOCKS: usize = 10;
    /// Trials per block when the config does not say otherwise.
    pub const DEFAULT_TRIALS: usize = 45;
    /// Proportion of match trials when the config does not say otherwise.
    pub const DEFAULT_MATCH_TRIALS: f64 = 1.0 / 3.0;
}

/// Constants used by the artifact writer and reader.
pub mod artifact {
    /// Extension of block files.
    pub const BLOCK_EXTENSION: &str = "txt";
    /// File name of the per-n seed listing.
    pub const SEEDS_FILENAME: &str = "seeds.json";
    /// Suffix of per-n output directories (`1back`, `2back`, ...).
    pub const NBACK_DIR_SUFFIX: &str = "back";
}
