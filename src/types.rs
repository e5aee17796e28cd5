/// A single stimulus symbol shown on one trial.
/// Examples: `B`, `k`, `7`
pub type Symbol = char;
/// Alternate look-back distance of a lure, relative to the n-back reference.
/// A lure at offset `d` repeats the symbol `n + d` trials back.
/// Examples: `1`, `-1`, `2`
pub type LureOffset = i64;
/// Seed for [`crate::rng::DeterministicRng`].
/// Examples: `1`, `42`
pub type Seed = u64;
/// Look-back distance of the task.
/// Examples: `1`, `2`, `3`
pub type NBack = usize;
