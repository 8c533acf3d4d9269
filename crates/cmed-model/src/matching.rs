//! Matcher cascade output types.

use serde::{Deserialize, Serialize};

use crate::{ProductId, TransactionId};

/// Resolution strategy that produced a match, in strict priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Exact barcode (or registration number) index hit.
    Barcode,
    /// Normalized description mapping to exactly one canonical product.
    UniqueDescription,
    /// Composite weighted fuzzy score above the acceptance threshold.
    Fuzzy,
}

impl MatchTier {
    /// Numeric tier as reported in the output dataset (1 strongest).
    pub fn as_number(self) -> u8 {
        match self {
            MatchTier::Barcode => 1,
            MatchTier::UniqueDescription => 2,
            MatchTier::Fuzzy => 3,
        }
    }
}

/// Which key produced a tier-1 hit. EAN columns are tried in order, the
/// registration number last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchedVia {
    Ean1,
    Ean2,
    Ean3,
    Registration,
}

impl MatchedVia {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchedVia::Ean1 => "ean1",
            MatchedVia::Ean2 => "ean2",
            MatchedVia::Ean3 => "ean3",
            MatchedVia::Registration => "reg",
        }
    }
}

/// A tier-3 candidate with its composite score, kept for triage of
/// unresolved transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product: ProductId,
    pub score: f64,
    /// Ingredient token overlap, the first tie-break signal.
    pub ingredient_overlap: f64,
}

/// Outcome of the cascade for one transaction.
///
/// Created once per transaction per run and never mutated afterwards.
/// `product == None` means unresolved, a valid terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub transaction: TransactionId,
    pub product: Option<ProductId>,
    pub tier: MatchTier,
    /// Composite similarity score; only tier 3 produces one, and it is
    /// recorded even for rejected (unresolved) outcomes.
    pub score: Option<f64>,
    /// Tier-1 key provenance.
    pub matched_via: Option<MatchedVia>,
    /// Best rejected candidates, for the unresolved audit trail.
    pub nearest: Vec<ScoredCandidate>,
    /// False when the run's wall-clock budget expired before this
    /// transaction was attempted.
    pub attempted: bool,
}

impl MatchResult {
    pub fn is_resolved(&self) -> bool {
        self.product.is_some()
    }

    /// An unresolved result that never went through scoring (empty
    /// description, budget expiry).
    pub fn unresolved(transaction: TransactionId) -> Self {
        Self {
            transaction,
            product: None,
            tier: MatchTier::Fuzzy,
            score: None,
            matched_via: None,
            nearest: Vec::new(),
            attempted: true,
        }
    }

    pub fn unattempted(transaction: TransactionId) -> Self {
        Self {
            attempted: false,
            ..Self::unresolved(transaction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_numbers_are_stable() {
        assert_eq!(MatchTier::Barcode.as_number(), 1);
        assert_eq!(MatchTier::UniqueDescription.as_number(), 2);
        assert_eq!(MatchTier::Fuzzy.as_number(), 3);
    }

    #[test]
    fn result_serializes() {
        let result = MatchResult::unresolved(TransactionId::from_first_16_bytes_of_sha256(
            [7u8; 32],
        ));
        let json = serde_json::to_string(&result).expect("serialize match result");
        let round: MatchResult = serde_json::from_str(&json).expect("deserialize match result");
        assert!(!round.is_resolved());
        assert!(round.attempted);
    }
}
