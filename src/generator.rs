use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::debug;

use crate::config::NBackConfig;
use crate::data::{Condition, NBackSequence, TrialKind, lure_source_index};
use crate::errors::NBackError;
use crate::types::{LureOffset, NBack, Symbol};

/// One build pass over `config`.
///
/// Draw order: schedule shuffle, seed sample, then per trial an optional lure
/// coin and choice, or a mismatch choice. All state lives in this call.
pub(crate) fn generate<R: Rng + ?Sized>(
    config: &NBackConfig,
    rng: &mut R,
) -> Result<NBackSequence, NBackError> {
    let matches = std::iter::repeat_n(TrialKind::Match, config.num_match_trials());
    let mismatches = std::iter::repeat_n(TrialKind::Mismatch, config.num_mismatch_trials());
    let mut schedule: Vec<TrialKind> = matches.chain(mismatches).collect();
    schedule.shuffle(rng);

    let mut pass = BuildPass::new(config);
    pass.seed(rng)?;
    for kind in schedule {
        match kind {
            TrialKind::Match => pass.match_trial(),
            TrialKind::Mismatch => pass.mismatch_or_lure_trial(rng)?,
        }
    }
    pass.finish()
}

struct BuildPass<'a> {
    config: &'a NBackConfig,
    n: NBack,
    sequence: NBackSequence,
    lures: Vec<LureOffset>,
    requested_lures: usize,
    remaining_mismatches: usize,
}

impl<'a> BuildPass<'a> {
    fn new(config: &'a NBackConfig) -> Self {
        let n = config.n();
        let lures = config.lure_quota();
        Self {
            config,
            n,
            sequence: NBackSequence::with_capacity(n, n + config.trials()),
            requested_lures: lures.len(),
            lures,
            remaining_mismatches: config.num_mismatch_trials(),
        }
    }

    /// Warm-up history: `n` distinct symbols sampled without replacement.
    fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), NBackError> {
        let mut pool = self.config.alphabet().symbols().to_vec();
        if pool.len() < self.n {
            return Err(NBackError::ExhaustedCandidates {
                position: 0,
                available: pool.len(),
                required: self.n,
            });
        }
        let (chosen, _) = pool.partial_shuffle(rng, self.n);
        for &symbol in chosen.iter() {
            self.sequence.push(symbol, Condition::Seed);
        }
        Ok(())
    }

    fn symbols(&self) -> &[Symbol] {
        self.sequence.symbols()
    }

    fn nback_symbol(&self) -> Symbol {
        let symbols = self.symbols();
        symbols[symbols.len() - self.n]
    }

    /// Symbols inside the lure horizon, oldest first.
    fn horizon_window(&self) -> (usize, &[Symbol]) {
        let symbols = self.symbols();
        let start = symbols.len().saturating_sub(self.config.horizon());
        (start, &symbols[start..])
    }

    fn match_trial(&mut self) {
        let symbol = self.nback_symbol();
        self.sequence.push(symbol, Condition::Match);
    }

    fn mismatch_or_lure_trial<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), NBackError> {
        if let Some((symbol, offset)) = self.try_lure(rng) {
            self.sequence.push(
                symbol,
                Condition::Lure {
                    offset: Some(offset),
                },
            );
        } else {
            let symbol = self.mismatch_symbol(rng)?;
            self.sequence.push(symbol, Condition::Mismatch);
        }
        self.remaining_mismatches -= 1;
        Ok(())
    }

    /// Index the symbol of a lure at `offset` would be copied from, if such a
    /// lure is allowed at the current position.
    ///
    /// The source must already exist, must not hold the n-back symbol, and
    /// its symbol must not occur anywhere else in the horizon window.
    fn lure_source(&self, offset: LureOffset) -> Option<usize> {
        let source = lure_source_index(self.symbols().len(), self.n, offset)?;
        let candidate = self.symbols()[source];
        if candidate == self.nback_symbol() {
            return None;
        }
        let (start, window) = self.horizon_window();
        let collides = window
            .iter()
            .enumerate()
            .any(|(idx, &symbol)| start + idx != source && symbol == candidate);
        if collides { None } else { Some(source) }
    }

    /// Place one pool entry with probability `pool / remaining mismatches`.
    ///
    /// The coin is only drawn when some entry is eligible, so the rate rises
    /// as mismatch trials run out.
    fn try_lure<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(Symbol, LureOffset)> {
        let eligible: Vec<(usize, usize)> = self
            .lures
            .iter()
            .enumerate()
            .filter_map(|(idx, &offset)| self.lure_source(offset).map(|source| (idx, source)))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        let probability = self.lures.len() as f64 / self.remaining_mismatches as f64;
        if rng.random::<f64>() >= probability {
            return None;
        }
        let &(idx, source) = eligible.choose(rng)?;
        let offset = self.lures.remove(idx);
        Some((self.symbols()[source], offset))
    }

    /// Uniform choice among symbols outside the horizon and unequal to the
    /// n-back symbol.
    fn mismatch_symbol<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Symbol, NBackError> {
        let (_, window) = self.horizon_window();
        let nback = self.nback_symbol();
        let valid: Vec<Symbol> = self
            .config
            .alphabet()
            .symbols()
            .iter()
            .copied()
            .filter(|symbol| *symbol != nback && !window.contains(symbol))
            .collect();
        valid
            .choose(rng)
            .copied()
            .ok_or(NBackError::ExhaustedCandidates {
                position: self.symbols().len(),
                available: 0,
                required: 1,
            })
    }

    fn finish(self) -> Result<NBackSequence, NBackError> {
        if !self.lures.is_empty() {
            debug!(
                n = self.n,
                remaining = self.lures.len(),
                requested = self.requested_lures,
                "lure quota not exhausted"
            );
            return Err(NBackError::MissingLures {
                remaining: self.lures.len(),
                requested: self.requested_lures,
            });
        }
        debug!(
            n = self.n,
            trials = self.config.trials(),
            lures = self.requested_lures,
            "n-back block generated"
        );
        Ok(self.sequence)
    }
}
