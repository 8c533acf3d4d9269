//! Run summary reported to operators at the end of a batch.

use serde::{Deserialize, Serialize};

/// Counters an operator needs to judge match quality without opening the
/// full dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Canonical products published into the registry.
    pub registry_products: usize,
    /// Validity intervals before and after consolidation.
    pub intervals_before: usize,
    pub intervals_after: usize,
    /// Transactions read, including malformed ones.
    pub transactions_total: usize,
    /// Rows skipped at ingestion (wrong column count, unparseable).
    pub malformed_skipped: usize,
    pub resolved_tier1: usize,
    pub resolved_tier2: usize,
    pub resolved_tier3: usize,
    /// Tier-2 lookups that hit more than one candidate and fell through.
    pub tier2_ambiguous: usize,
    pub unresolved: usize,
    /// Transactions never attempted because the wall-clock budget expired.
    pub unattempted: usize,
    /// Mean composite score over accepted tier-3 matches.
    pub mean_tier3_score: Option<f64>,
    pub duration_secs: f64,
    /// True when the wall-clock budget cut the run short; partial results
    /// are persisted with this marker rather than silently truncated.
    pub incomplete_run: bool,
}

impl RunSummary {
    pub fn resolved_total(&self) -> usize {
        self.resolved_tier1 + self.resolved_tier2 + self.resolved_tier3
    }

    pub fn resolution_rate(&self) -> f64 {
        let attempted = self.resolved_total() + self.unresolved;
        if attempted == 0 {
            0.0
        } else {
            self.resolved_total() as f64 / attempted as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_rate_ignores_unattempted() {
        let summary = RunSummary {
            resolved_tier1: 6,
            resolved_tier2: 2,
            resolved_tier3: 1,
            unresolved: 1,
            unattempted: 90,
            ..RunSummary::default()
        };
        assert_eq!(summary.resolved_total(), 9);
        assert!((summary.resolution_rate() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn summary_serializes() {
        let summary = RunSummary::default();
        let json = serde_json::to_string(&summary).expect("serialize summary");
        let round: RunSummary = serde_json::from_str(&json).expect("deserialize summary");
        assert_eq!(round.transactions_total, 0);
    }
}
