use indexmap::IndexMap;
use thiserror::Error;

use crate::config::NBackConfig;
use crate::data::{Condition, NBackSequence, lure_source_index};
use crate::types::LureOffset;

/// Per-condition counts of one generated block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceStats {
    /// Warm-up positions.
    pub seed: usize,
    /// Match trials.
    pub matches: usize,
    /// Genuine mismatch trials.
    pub mismatches: usize,
    /// Lure trials, attributed or not.
    pub lures: usize,
    /// Lures with a recorded offset, keyed by offset in order of first appearance.
    pub lures_by_offset: IndexMap<LureOffset, usize>,
    /// Lures decoded from an artifact, which carries no offsets.
    pub unattributed_lures: usize,
}

impl SequenceStats {
    /// Classified trials (seed region excluded).
    pub fn trials(&self) -> usize {
        self.matches + self.mismatches + self.lures
    }

    /// Lures recorded at `offset`.
    pub fn lures_at(&self, offset: LureOffset) -> usize {
        self.lures_by_offset.get(&offset).copied().unwrap_or(0)
    }
}

/// Count conditions of `sequence`.
pub fn sequence_stats(sequence: &NBackSequence) -> SequenceStats {
    let mut stats = SequenceStats::default();
    for condition in sequence.conditions() {
        match *condition {
            Condition::Seed => stats.seed += 1,
            Condition::Match => stats.matches += 1,
            Condition::Mismatch => stats.mismatches += 1,
            Condition::Lure { offset } => {
                stats.lures += 1;
                match offset {
                    Some(offset) => *stats.lures_by_offset.entry(offset).or_insert(0) += 1,
                    None => stats.unattributed_lures += 1,
                }
            }
        }
    }
    stats
}

/// Count positions that read as a lure at `offset` from content alone:
/// unequal to the n-back symbol but equal to the symbol `n + offset` back.
///
/// Works on decoded artifacts and also catches accidental lures.
pub fn count_structural_lures(sequence: &NBackSequence, offset: LureOffset) -> usize {
    let n = sequence.n();
    let symbols = sequence.symbols();
    (n..symbols.len())
        .filter(|&idx| {
            lure_source_index(idx, n, offset).is_some_and(|source| {
                symbols[idx] != symbols[idx - n] && symbols[idx] == symbols[source]
            })
        })
        .count()
}

/// A position whose content contradicts its condition label.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// Symbol and condition lists differ in length.
    #[error("{symbols} symbols but {conditions} conditions")]
    LengthMismatch {
        /// Number of symbols.
        symbols: usize,
        /// Number of condition labels.
        conditions: usize,
    },
    /// Seed label after the seed region.
    #[error("seed label outside the seed region at position {position}")]
    MisplacedSeed {
        /// Offending position.
        position: usize,
    },
    /// Non-seed label inside the seed region.
    #[error("unlabelled seed position {position}")]
    MissingSeed {
        /// Offending position.
        position: usize,
    },
    /// Match whose symbol differs from the n-back symbol.
    #[error("match at position {position} does not repeat the n-back symbol")]
    MatchNotRepeated {
        /// Offending position.
        position: usize,
    },
    /// Mismatch equal to the n-back symbol.
    #[error("mismatch at position {position} repeats the n-back symbol")]
    MismatchRepeatsNBack {
        /// Offending position.
        position: usize,
    },
    /// Mismatch repeating a symbol inside the horizon.
    #[error("mismatch at position {position} repeats a symbol inside the horizon")]
    MismatchInHorizon {
        /// Offending position.
        position: usize,
    },
    /// Lure equal to the n-back symbol, i.e. a true match.
    #[error("lure at position {position} repeats the n-back symbol")]
    LureRepeatsNBack {
        /// Offending position.
        position: usize,
    },
    /// Lure symbol found in the horizon at a position other than its source.
    #[error("lure at position {position} repeats a horizon symbol other than its source")]
    LureInHorizon {
        /// Offending position.
        position: usize,
    },
    /// Lure that does not copy the symbol at its recorded offset.
    #[error("lure at position {position} does not repeat the symbol at offset {offset}")]
    LureSourceMismatch {
        /// Offending position.
        position: usize,
        /// Recorded lure offset.
        offset: LureOffset,
    },
    /// Match trial count differs from the configured count.
    #[error("{found} match trials where {expected} were requested")]
    MatchCount {
        /// Configured count.
        expected: usize,
        /// Count found in the block.
        found: usize,
    },
    /// Lure count at an offset differs from the requested count.
    #[error("{found} lures at offset {offset} where {expected} were requested")]
    LureCount {
        /// Offset being counted.
        offset: LureOffset,
        /// Requested count.
        expected: usize,
        /// Count found in the block.
        found: usize,
    },
}

/// Check every label of `sequence` against its content.
pub fn check_invariants(sequence: &NBackSequence, horizon: usize) -> Vec<Violation> {
    let symbols = sequence.symbols();
    let conditions = sequence.conditions();
    if symbols.len() != conditions.len() {
        return vec![Violation::LengthMismatch {
            symbols: symbols.len(),
            conditions: conditions.len(),
        }];
    }
    let n = sequence.n();
    let mut violations = Vec::new();
    for (position, (&symbol, &condition)) in symbols.iter().zip(conditions).enumerate() {
        if position < n {
            if condition != Condition::Seed {
                violations.push(Violation::MissingSeed { position });
            }
            continue;
        }
        let nback = symbols[position - n];
        match condition {
            Condition::Seed => violations.push(Violation::MisplacedSeed { position }),
            Condition::Match => {
                if symbol != nback {
                    violations.push(Violation::MatchNotRepeated { position });
                }
            }
            Condition::Mismatch => {
                if symbol == nback {
                    violations.push(Violation::MismatchRepeatsNBack { position });
                }
                if symbols[position.saturating_sub(horizon)..position].contains(&symbol) {
                    violations.push(Violation::MismatchInHorizon { position });
                }
            }
            Condition::Lure { offset } => {
                if symbol == nback {
                    violations.push(Violation::LureRepeatsNBack { position });
                }
                let window_start = position.saturating_sub(horizon);
                match offset {
                    Some(offset) => match lure_source_index(position, n, offset) {
                        Some(source) if symbols[source] == symbol => {
                            let collides = (window_start..position)
                                .any(|idx| idx != source && symbols[idx] == symbol);
                            if collides {
                                violations.push(Violation::LureInHorizon { position });
                            }
                        }
                        _ => violations.push(Violation::LureSourceMismatch { position, offset }),
                    },
                    // Without an offset the source is unknown, but it is the
                    // only horizon position allowed to hold the lure symbol.
                    None => {
                        let occurrences = symbols[window_start..position]
                            .iter()
                            .filter(|&&s| s == symbol)
                            .count();
                        if occurrences > 1 {
                            violations.push(Violation::LureInHorizon { position });
                        }
                    }
                }
            }
        }
    }
    violations
}

/// [`check_invariants`] plus the exact match and lure counts `config` asks for.
pub fn check_block(sequence: &NBackSequence, config: &NBackConfig) -> Vec<Violation> {
    let mut violations = check_invariants(sequence, config.horizon());
    let stats = sequence_stats(sequence);
    if stats.matches != config.num_match_trials() {
        violations.push(Violation::MatchCount {
            expected: config.num_match_trials(),
            found: stats.matches,
        });
    }
    for &offset in config.lure_rates().keys() {
        let expected = config.requested_lures_at(offset);
        let found = stats.lures_at(offset);
        if expected != found {
            violations.push(Violation::LureCount {
                offset,
                expected,
                found,
            });
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(symbols: &str, conditions: &str, n: usize) -> NBackSequence {
        NBackSequence::from_lines(symbols, conditions, n).unwrap()
    }

    #[test]
    fn stats_count_each_condition() {
        let seq = decoded("BCBDCD", "--m-l-", 2);
        let stats = sequence_stats(&seq);
        assert_eq!(stats.seed, 2);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.mismatches, 2);
        assert_eq!(stats.lures, 1);
        assert_eq!(stats.unattributed_lures, 1);
        assert_eq!(stats.trials(), 4);
    }

    #[test]
    fn structural_lures_follow_content() {
        // position 4 ('C') repeats position 1, i.e. n + 1 back for n = 2
        let seq = decoded("BCBDCD", "--m-l-", 2);
        assert_eq!(count_structural_lures(&seq, 1), 1);
        assert_eq!(count_structural_lures(&seq, -1), 0);
    }

    #[test]
    fn consistent_labels_have_no_violations() {
        let seq = decoded("BCBDCF", "--m-l-", 2);
        assert!(check_invariants(&seq, 1).is_empty());
    }

    #[test]
    fn lure_repeating_a_second_horizon_symbol_is_flagged() {
        // 'C' at position 5 copies position 1 (offset 2) but also repeats position 2
        let mut seq = NBackSequence::with_capacity(2, 6);
        for (symbol, condition) in [
            ('B', Condition::Seed),
            ('C', Condition::Seed),
            ('C', Condition::Mismatch),
            ('D', Condition::Mismatch),
            ('F', Condition::Mismatch),
            ('C', Condition::Lure { offset: Some(2) }),
        ] {
            seq.push(symbol, condition);
        }
        let wide = check_invariants(&seq, 4);
        assert!(wide.contains(&Violation::LureInHorizon { position: 5 }));
        assert!(!wide.contains(&Violation::LureRepeatsNBack { position: 5 }));
        assert!(!check_invariants(&seq, 1).contains(&Violation::LureInHorizon { position: 5 }));

        let decoded = decoded("BCCDFC", "-----l", 2);
        assert!(check_invariants(&decoded, 4).contains(&Violation::LureInHorizon { position: 5 }));
        assert!(!check_invariants(&decoded, 1).contains(&Violation::LureInHorizon { position: 5 }));
    }

    #[test]
    fn extreme_offsets_do_not_overflow() {
        let seq = decoded("BCBDCD", "--m-l-", 2);
        assert_eq!(count_structural_lures(&seq, i64::MIN), 0);
        assert_eq!(count_structural_lures(&seq, i64::MAX), 0);

        let mut labelled = NBackSequence::with_capacity(1, 2);
        labelled.push('B', Condition::Seed);
        labelled.push('C', Condition::Lure { offset: Some(i64::MIN) });
        assert_eq!(
            check_invariants(&labelled, 3),
            vec![Violation::LureSourceMismatch {
                position: 1,
                offset: i64::MIN
            }]
        );
    }

    #[test]
    fn violations_point_at_offending_positions() {
        let seq = decoded("BCDCB", "--mm-", 2);
        let violations = check_invariants(&seq, 4);
        assert!(violations.contains(&Violation::MatchNotRepeated { position: 2 }));
        assert!(!violations.contains(&Violation::MatchNotRepeated { position: 3 }));
        assert!(violations.contains(&Violation::MismatchInHorizon { position: 4 }));
    }
}
