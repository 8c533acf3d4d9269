//! Run-summary construction from the per-stage counters.

use cmed_model::{MatchResult, MatchTier, RunSummary};

/// Counters the report layer cannot derive from the results themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryInputs {
    pub registry_products: usize,
    pub intervals_before: usize,
    pub intervals_after: usize,
    pub transactions_total: usize,
    pub malformed_skipped: usize,
    pub tier2_ambiguous: usize,
    pub duration_secs: f64,
    pub incomplete_run: bool,
}

/// Fold the match results into a [`RunSummary`].
pub fn build_summary(results: &[MatchResult], inputs: SummaryInputs) -> RunSummary {
    let mut summary = RunSummary {
        registry_products: inputs.registry_products,
        intervals_before: inputs.intervals_before,
        intervals_after: inputs.intervals_after,
        transactions_total: inputs.transactions_total,
        malformed_skipped: inputs.malformed_skipped,
        tier2_ambiguous: inputs.tier2_ambiguous,
        duration_secs: inputs.duration_secs,
        incomplete_run: inputs.incomplete_run,
        ..RunSummary::default()
    };

    let mut tier3_sum = 0.0;
    let mut tier3_count = 0usize;
    for result in results {
        if !result.attempted {
            summary.unattempted += 1;
            continue;
        }
        match (result.is_resolved(), result.tier) {
            (true, MatchTier::Barcode) => summary.resolved_tier1 += 1,
            (true, MatchTier::UniqueDescription) => summary.resolved_tier2 += 1,
            (true, MatchTier::Fuzzy) => {
                summary.resolved_tier3 += 1;
                if let Some(score) = result.score {
                    tier3_sum += score;
                    tier3_count += 1;
                }
            }
            (false, _) => summary.unresolved += 1,
        }
    }
    if tier3_count > 0 {
        summary.mean_tier3_score = Some(tier3_sum / tier3_count as f64);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmed_model::{MatchedVia, ProductId, TransactionId};

    fn id(seed: u8) -> TransactionId {
        TransactionId::from_first_16_bytes_of_sha256([seed; 32])
    }

    fn resolved(seed: u8, tier: MatchTier, score: Option<f64>) -> MatchResult {
        MatchResult {
            transaction: id(seed),
            product: Some(ProductId::new("P000001").unwrap()),
            tier,
            score,
            matched_via: (tier == MatchTier::Barcode).then_some(MatchedVia::Ean1),
            nearest: Vec::new(),
            attempted: true,
        }
    }

    #[test]
    fn summary_counts_per_tier_and_averages_tier3() {
        let results = vec![
            resolved(1, MatchTier::Barcode, None),
            resolved(2, MatchTier::Barcode, None),
            resolved(3, MatchTier::UniqueDescription, None),
            resolved(4, MatchTier::Fuzzy, Some(0.8)),
            resolved(5, MatchTier::Fuzzy, Some(0.9)),
            MatchResult::unresolved(id(6)),
            MatchResult::unattempted(id(7)),
        ];
        let summary = build_summary(
            &results,
            SummaryInputs {
                transactions_total: 7,
                ..SummaryInputs::default()
            },
        );
        assert_eq!(summary.resolved_tier1, 2);
        assert_eq!(summary.resolved_tier2, 1);
        assert_eq!(summary.resolved_tier3, 2);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.unattempted, 1);
        assert_eq!(summary.resolved_total(), 5);
        let mean = summary.mean_tier3_score.unwrap();
        assert!((mean - 0.85).abs() < 1e-9);
    }
}
