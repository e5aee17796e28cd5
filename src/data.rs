use serde::{Deserialize, Serialize};

use crate::constants::conditions::{LURE_CODE, MATCH_CODE, MISMATCH_CODE, SEED_CODE};
use crate::types::{LureOffset, NBack, Symbol};

/// Classification of one position of a generated sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Warm-up history preceding the first classified trial.
    Seed,
    /// Symbol equals the symbol `n` positions back.
    Match,
    /// Symbol differs from the n-back symbol and from the recent horizon.
    Mismatch,
    /// Mismatch that repeats the symbol `n + offset` positions back.
    ///
    /// `offset` is `None` when the sequence was decoded from an artifact,
    /// which does not carry lure offsets.
    Lure {
        /// Offset relative to the n-back position.
        offset: Option<LureOffset>,
    },
}

impl Condition {
    /// Reference single-character code (`-` for seed and mismatch).
    pub fn code(self) -> char {
        match self {
            Condition::Seed | Condition::Mismatch => MISMATCH_CODE,
            Condition::Match => MATCH_CODE,
            Condition::Lure { .. } => LURE_CODE,
        }
    }

    /// Code with seed positions written as `s`.
    pub fn code_with_seed_marker(self) -> char {
        match self {
            Condition::Seed => SEED_CODE,
            other => other.code(),
        }
    }

    /// True for every condition except [`Condition::Seed`].
    pub fn is_classified(self) -> bool {
        !matches!(self, Condition::Seed)
    }

    /// Lure offset, when this is a lure with a recorded offset.
    pub fn lure_offset(self) -> Option<LureOffset> {
        match self {
            Condition::Lure { offset } => offset,
            _ => None,
        }
    }
}

/// Position `n + offset` trials before `position`, if that lies strictly
/// before `position` and not before the start of the sequence.
pub fn lure_source_index(position: usize, n: NBack, offset: LureOffset) -> Option<usize> {
    let back = i64::try_from(n).ok()?.checked_add(offset)?;
    if back <= 0 {
        return None;
    }
    position.checked_sub(usize::try_from(back).ok()?)
}

/// Trial category drawn from the shuffled schedule before content is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialKind {
    /// Repeat the n-back symbol.
    Match,
    /// Place a lure if one fires, otherwise a genuine mismatch.
    Mismatch,
}

/// A generated n-back block: symbols and aligned condition labels.
///
/// The first `n` positions are the seed region. Both vectors always have the
/// same length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NBackSequence {
    n: NBack,
    symbols: Vec<Symbol>,
    conditions: Vec<Condition>,
}

impl NBackSequence {
    pub(crate) fn with_capacity(n: NBack, capacity: usize) -> Self {
        Self {
            n,
            symbols: Vec::with_capacity(capacity),
            conditions: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, symbol: Symbol, condition: Condition) {
        self.symbols.push(symbol);
        self.conditions.push(condition);
    }

    /// Look-back distance the sequence was generated for.
    pub fn n(&self) -> NBack {
        self.n
    }

    /// Number of positions, seed region included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbol has been placed.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in presentation order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Condition labels aligned with [`NBackSequence::symbols`].
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Iterate `(symbol, condition)` pairs in presentation order.
    pub fn trials(&self) -> impl Iterator<Item = (Symbol, Condition)> + '_ {
        self.symbols
            .iter()
            .copied()
            .zip(self.conditions.iter().copied())
    }

    /// Symbols joined into one string.
    pub fn symbol_string(&self) -> String {
        self.symbols.iter().collect()
    }

    /// Condition codes in the reference encoding (`-`, `m`, `l`).
    pub fn condition_string(&self) -> String {
        self.conditions.iter().map(|c| c.code()).collect()
    }

    /// Condition codes with the seed region marked `s`.
    ///
    /// Consumers that read the first `n` characters as warm-up by position are
    /// unaffected; consumers that count `-` characters see fewer of them.
    pub fn condition_string_with_seed_marker(&self) -> String {
        self.conditions
            .iter()
            .map(|c| c.code_with_seed_marker())
            .collect()
    }

    /// Two newline-terminated lines: symbols, then condition codes.
    pub fn to_artifact_string(&self, seed_marker: bool) -> String {
        let conditions = if seed_marker {
            self.condition_string_with_seed_marker()
        } else {
            self.condition_string()
        };
        format!("{}\n{}\n", self.symbol_string(), conditions)
    }

    /// Decode the two artifact lines for an `n`-back block.
    ///
    /// The first `n` positions decode as [`Condition::Seed`] whatever their
    /// code. Lures decode without an offset.
    pub fn from_lines(symbols: &str, conditions: &str, n: NBack) -> Result<Self, String> {
        let symbols: Vec<Symbol> = symbols.chars().collect();
        let codes: Vec<char> = conditions.chars().collect();
        if symbols.len() != codes.len() {
            return Err(format!(
                "symbol line has {} characters but condition line has {}",
                symbols.len(),
                codes.len()
            ));
        }
        if symbols.len() < n {
            return Err(format!(
                "sequence of length {} is shorter than the {n}-symbol seed region",
                symbols.len()
            ));
        }
        let mut decoded = Vec::with_capacity(codes.len());
        for (idx, code) in codes.into_iter().enumerate() {
            let condition = if idx < n {
                Condition::Seed
            } else {
                match code {
                    MATCH_CODE => Condition::Match,
                    LURE_CODE => Condition::Lure { offset: None },
                    MISMATCH_CODE => Condition::Mismatch,
                    other => {
                        return Err(format!(
                            "unexpected condition code '{other}' at position {idx}"
                        ));
                    }
                }
            };
            decoded.push(condition);
        }
        Ok(Self {
            n,
            symbols,
            conditions: decoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NBackSequence {
        let mut seq = NBackSequence::with_capacity(1, 5);
        seq.push('B', Condition::Seed);
        seq.push('B', Condition::Match);
        seq.push('C', Condition::Mismatch);
        seq.push('B', Condition::Lure { offset: Some(1) });
        seq.push('D', Condition::Mismatch);
        seq
    }

    #[test]
    fn reference_encoding_shares_dash_for_seed_and_mismatch() {
        let seq = sample();
        assert_eq!(seq.symbol_string(), "BBCBD");
        assert_eq!(seq.condition_string(), "-m-l-");
        assert_eq!(seq.condition_string_with_seed_marker(), "sm-l-");
    }

    #[test]
    fn artifact_string_has_two_terminated_lines() {
        assert_eq!(sample().to_artifact_string(false), "BBCBD\n-m-l-\n");
        assert_eq!(sample().to_artifact_string(true), "BBCBD\nsm-l-\n");
    }

    #[test]
    fn from_lines_treats_leading_positions_as_seed() {
        let seq = NBackSequence::from_lines("BBCBD", "sm-l-", 1).unwrap();
        assert_eq!(
            seq.conditions(),
            &[
                Condition::Seed,
                Condition::Match,
                Condition::Mismatch,
                Condition::Lure { offset: None },
                Condition::Mismatch,
            ]
        );
        let plain = NBackSequence::from_lines("BBCBD", "-m-l-", 1).unwrap();
        assert_eq!(plain.conditions(), seq.conditions());
    }

    #[test]
    fn from_lines_rejects_malformed_input() {
        assert!(NBackSequence::from_lines("BBC", "-m", 1).is_err());
        assert!(NBackSequence::from_lines("BBC", "-mx", 1).is_err());
        assert!(NBackSequence::from_lines("B", "-", 2).is_err());
        assert!(NBackSequence::from_lines("BBC", "-ms", 1).is_err());
    }

    #[test]
    fn lure_offset_is_exposed_only_for_lures() {
        assert_eq!(Condition::Lure { offset: Some(-1) }.lure_offset(), Some(-1));
        assert_eq!(Condition::Match.lure_offset(), None);
        assert!(!Condition::Seed.is_classified());
        assert!(Condition::Mismatch.is_classified());
    }
}
