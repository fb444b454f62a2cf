//! Winner selection over ranked candidates.

use crate::rank::{target_prompt, COMPANY_LOGO_PROMPT};
use crate::types::{RankedCandidate, SelectionOutcome};

/// Default top-score bar that alone confirms a name match.
pub const CONFIDENCE_THRESHOLD: f64 = 0.87;

/// How one candidate fared against the decision rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner,
    Backup,
    Rejected,
}

/// Applies the ordered tie-break rules.
#[derive(Debug, Clone)]
pub struct Disambiguator {
    target: String,
    confidence_threshold: f64,
}

impl Disambiguator {
    pub fn new(entity_name: &str, prefix: &str) -> Self {
        Self {
            target: target_prompt(prefix, entity_name),
            confidence_threshold: CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// The prompt a candidate's top match must equal.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn verdict(&self, candidate: &RankedCandidate) -> Verdict {
        let top = candidate.top();
        if top.prompt_text != self.target {
            return Verdict::Rejected;
        }
        if candidate.second().prompt_text == COMPANY_LOGO_PROMPT
            || top.similarity_score > self.confidence_threshold
        {
            Verdict::Winner
        } else {
            Verdict::Backup
        }
    }

    /// Scan `ranked` in order and stop at the first winner.
    ///
    /// Once a winner is found every other input candidate goes to disposal,
    /// including ones never evaluated. Disposal never names the winner's
    /// address and lists each address once. Backups are kept most recent first.
    pub fn select(&self, ranked: &[RankedCandidate]) -> SelectionOutcome {
        let mut outcome = SelectionOutcome::default();

        for candidate in ranked {
            match self.verdict(candidate) {
                Verdict::Winner => {
                    tracing::info!(
                        "Winner {} (score {:.3}, runner-up {:?})",
                        candidate.address,
                        candidate.top().similarity_score,
                        candidate.second().prompt_text
                    );
                    outcome.winner = Some(candidate.address.clone());
                    for other in ranked {
                        if other.address != candidate.address
                            && !outcome.disposal.contains(&other.address)
                        {
                            outcome.disposal.push(other.address.clone());
                        }
                    }
                    return outcome;
                }
                Verdict::Backup => {
                    tracing::debug!("Backup {}", candidate.address);
                    outcome.backups.insert(0, candidate.address.clone());
                }
                Verdict::Rejected => {}
            }
        }

        if outcome.is_empty() {
            tracing::info!("No usable candidate among {} ranked", ranked.len());
        }
        outcome
    }
}

/// Convenience wrapper using the default threshold.
pub fn select(ranked: &[RankedCandidate], entity_name: &str, prefix: &str) -> SelectionOutcome {
    Disambiguator::new(entity_name, prefix).select(ranked)
}
