use indexmap::{IndexMap, IndexSet};
use rand::Rng;

use crate::constants::config::{DEFAULT_ALPHABET, DEFAULT_HORIZON};
use crate::data::NBackSequence;
use crate::errors::NBackError;
use crate::generator;
use crate::types::{LureOffset, NBack, Symbol};

/// Ordered, deduplicated set of symbols trial content is drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<Symbol>,
}

impl Alphabet {
    /// Build from the characters of `symbols`, keeping first occurrences.
    pub fn new(symbols: &str) -> Self {
        Self::from_symbols(symbols.chars())
    }

    /// Build from any symbol iterator, keeping first occurrences.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let unique: IndexSet<Symbol> = symbols.into_iter().collect();
        Self {
            symbols: unique.into_iter().collect(),
        }
    }

    /// Symbols in configured order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbol is configured.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// True when `symbol` belongs to the alphabet.
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHABET)
    }
}

impl From<&str> for Alphabet {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Fluent builder for n-back block parameters.
///
/// Setters perform no validation; [`NBackBuilder::build`] checks the complete
/// parameter set and yields an immutable [`NBackConfig`].
///
/// ```
/// use nback::{DeterministicRng, NBackBuilder};
///
/// let mut rng = DeterministicRng::new(7);
/// let block = NBackBuilder::default()
///     .n(2)
///     .trials(30)
///     .match_trials(0.2)
///     .lure_rate(1, 0.1)
///     .build()?
///     .generate(&mut rng);
/// // Lure placement is opportunistic; a failed draw asks for a new seed.
/// assert!(block.is_ok() || block.is_err_and(|err| err.is_retryable()));
/// # Ok::<(), nback::NBackError>(())
/// ```
#[derive(Clone, Debug)]
pub struct NBackBuilder {
    alphabet: Alphabet,
    n: Option<NBack>,
    trials: Option<usize>,
    match_trials: Option<f64>,
    horizon: usize,
    lure_rates: IndexMap<LureOffset, f64>,
}

impl Default for NBackBuilder {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            n: None,
            trials: None,
            match_trials: None,
            horizon: DEFAULT_HORIZON,
            lure_rates: IndexMap::new(),
        }
    }
}

impl NBackBuilder {
    /// Builder with the default alphabet and horizon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols trial content is drawn from.
    pub fn alphabet(mut self, alphabet: impl Into<Alphabet>) -> Self {
        self.alphabet = alphabet.into();
        self
    }

    /// How many trials back a match repeats.
    pub fn n(mut self, n: NBack) -> Self {
        self.n = Some(n);
        self
    }

    /// Absolute number of classified trials (seed region excluded).
    pub fn trials(mut self, trials: usize) -> Self {
        self.trials = Some(trials);
        self
    }

    /// Relative amount of match trials.
    pub fn match_trials(mut self, proportion: f64) -> Self {
        self.match_trials = Some(proportion);
        self
    }

    /// How many preceding symbols are disallowed in a mismatch trial because
    /// they would read as a lure.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Request `rate` of all mismatch trials to be lures at `n + offset`.
    /// A repeated offset overwrites the earlier rate.
    pub fn lure_rate(mut self, offset: LureOffset, rate: f64) -> Self {
        self.lure_rates.insert(offset, rate);
        self
    }

    /// Drop every lure request.
    pub fn clear_lure_rates(mut self) -> Self {
        self.lure_rates.clear();
        self
    }

    /// Validate the parameters and freeze them into an [`NBackConfig`].
    pub fn build(&self) -> Result<NBackConfig, NBackError> {
        let n = self
            .n
            .ok_or_else(|| NBackError::Configuration("n is not set".to_string()))?;
        let trials = self
            .trials
            .ok_or_else(|| NBackError::Configuration("trials is not set".to_string()))?;
        let match_trials = self.match_trials.ok_or_else(|| {
            NBackError::Configuration("match trial proportion is not set".to_string())
        })?;
        if n == 0 {
            return Err(NBackError::Configuration(
                "n must be greater than zero".to_string(),
            ));
        }
        if !is_unit_rate(match_trials) {
            return Err(NBackError::Configuration(format!(
                "match trial proportion {match_trials} must be within [0, 1]"
            )));
        }
        for (&offset, &rate) in &self.lure_rates {
            if offset == 0 {
                return Err(NBackError::Configuration(
                    "lure offset 0 would be a match; offsets must be nonzero".to_string(),
                ));
            }
            if !is_unit_rate(rate) {
                return Err(NBackError::Configuration(format!(
                    "lure rate {rate} at offset {offset} must be within [0, 1]"
                )));
            }
        }
        if self.alphabet.len() < n {
            return Err(NBackError::ExhaustedCandidates {
                position: 0,
                available: self.alphabet.len(),
                required: n,
            });
        }
        Ok(NBackConfig {
            alphabet: self.alphabet.clone(),
            n,
            trials,
            match_trials,
            horizon: self.horizon,
            lure_rates: self.lure_rates.clone(),
        })
    }

    /// Shorthand for `build()?.generate(rng)`.
    pub fn build_sequence<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NBackSequence, NBackError> {
        self.build()?.generate(rng)
    }
}

fn is_unit_rate(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Share of `total` rounded to the nearest count.
pub(crate) fn rounded_share(rate: f64, total: usize) -> usize {
    (rate * total as f64).round() as usize
}

/// Validated, immutable parameters of one n-back block.
#[derive(Clone, Debug)]
pub struct NBackConfig {
    alphabet: Alphabet,
    n: NBack,
    trials: usize,
    match_trials: f64,
    horizon: usize,
    lure_rates: IndexMap<LureOffset, f64>,
}

impl NBackConfig {
    /// Symbols trial content is drawn from.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Look-back distance.
    pub fn n(&self) -> NBack {
        self.n
    }

    /// Classified trials per block (seed region excluded).
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Requested proportion of match trials.
    pub fn match_trials(&self) -> f64 {
        self.match_trials
    }

    /// Number of recent symbols excluded from mismatches and lure collisions.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Requested lure rates in the order offsets were first configured.
    pub fn lure_rates(&self) -> &IndexMap<LureOffset, f64> {
        &self.lure_rates
    }

    /// Match trials per block: the rounded share of `trials`.
    pub fn num_match_trials(&self) -> usize {
        rounded_share(self.match_trials, self.trials).min(self.trials)
    }

    /// Trials left for mismatches and lures.
    pub fn num_mismatch_trials(&self) -> usize {
        self.trials - self.num_match_trials()
    }

    /// Lures requested at `offset`, as a count of mismatch trials.
    pub fn requested_lures_at(&self, offset: LureOffset) -> usize {
        self.lure_rates
            .get(&offset)
            .map(|&rate| rounded_share(rate, self.num_mismatch_trials()))
            .unwrap_or(0)
    }

    /// Expanded lure quota pool: each offset repeated by its requested count.
    pub fn lure_quota(&self) -> Vec<LureOffset> {
        let num_mismatch = self.num_mismatch_trials();
        self.lure_rates
            .iter()
            .flat_map(|(&offset, &rate)| {
                std::iter::repeat_n(offset, rounded_share(rate, num_mismatch))
            })
            .collect()
    }

    /// Run one build pass drawing from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NBackSequence, NBackError> {
        generator::generate(self, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NBackBuilder {
        NBackBuilder::new().n(2).trials(30).match_trials(0.2)
    }

    #[test]
    fn alphabet_drops_duplicates_in_order() {
        let alphabet = Alphabet::new("abcabd");
        assert_eq!(alphabet.symbols(), &['a', 'b', 'c', 'd']);
        assert!(alphabet.contains('d'));
        assert_eq!(Alphabet::default().len(), DEFAULT_ALPHABET.len());
    }

    #[test]
    fn build_requires_core_parameters() {
        for builder in [
            NBackBuilder::new().trials(10).match_trials(0.2),
            NBackBuilder::new().n(1).match_trials(0.2),
            NBackBuilder::new().n(1).trials(10),
        ] {
            assert!(matches!(
                builder.build(),
                Err(NBackError::Configuration(_))
            ));
        }
    }

    #[test]
    fn build_rejects_out_of_range_values() {
        assert!(NBackBuilder::new().n(0).trials(10).match_trials(0.2).build().is_err());
        assert!(base().match_trials(1.5).build().is_err());
        assert!(base().match_trials(f64::NAN).build().is_err());
        assert!(base().lure_rate(0, 0.1).build().is_err());
        assert!(base().lure_rate(1, -0.1).build().is_err());
    }

    #[test]
    fn alphabet_smaller_than_n_is_exhaustion() {
        let err = NBackBuilder::new()
            .alphabet("ab")
            .n(3)
            .trials(10)
            .match_trials(0.2)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            NBackError::ExhaustedCandidates {
                available: 2,
                required: 3,
                ..
            }
        ));
    }

    #[test]
    fn repeated_offset_overwrites_rate() {
        let config = base().lure_rate(1, 0.5).lure_rate(1, 0.1).build().unwrap();
        assert_eq!(config.lure_rates().len(), 1);
        assert_eq!(config.requested_lures_at(1), 2);
    }

    #[test]
    fn counts_use_rounding() {
        let config = base().lure_rate(1, 0.1).lure_rate(-1, 0.05).build().unwrap();
        assert_eq!(config.num_match_trials(), 6);
        assert_eq!(config.num_mismatch_trials(), 24);
        assert_eq!(config.lure_quota(), vec![1, 1, -1]);

        let rounded_up = NBackBuilder::new().n(1).trials(10).match_trials(0.25).build().unwrap();
        assert_eq!(rounded_up.num_match_trials(), 3);
    }

    #[test]
    fn clear_lure_rates_resets_requests() {
        let config = base().lure_rate(1, 0.1).clear_lure_rates().build().unwrap();
        assert!(config.lure_quota().is_empty());
    }

    #[test]
    fn default_horizon_is_three() {
        assert_eq!(base().build().unwrap().horizon(), DEFAULT_HORIZON);
    }
}
