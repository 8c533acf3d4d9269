//! Configuration surface for matching and interval consolidation.

use serde::{Deserialize, Serialize};

/// Weights of the tier-3 composite score. Each signal is in `[0, 1]`;
/// weights should sum to 1 but are not renormalized, so callers can bias
/// the score deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Product-name string similarity, the dominant factor.
    pub name: f64,
    /// Active-ingredient token-set overlap.
    pub ingredient: f64,
    /// Laboratory-name similarity, a tie-breaking signal.
    pub laboratory: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name: 0.60,
            ingredient: 0.30,
            laboratory: 0.10,
        }
    }
}

/// Options for the matcher cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    pub weights: MatchWeights,
    /// Minimum composite score for a tier-3 match to be accepted.
    pub acceptance_threshold: f64,
    /// Minimum token Jaccard similarity for a registry entry to enter the
    /// tier-3 candidate pool.
    pub jaccard_prefilter: f64,
    /// Bonus added when the cleaned description equals the product name
    /// almost exactly.
    pub precision_bonus: f64,
    /// How many rejected candidates to keep on unresolved results.
    pub max_nearest: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            acceptance_threshold: 0.65,
            jaccard_prefilter: 0.175,
            precision_bonus: 0.15,
            max_nearest: 3,
        }
    }
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: MatchWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Options for the vigency consolidator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidateOptions {
    /// Maximum gap, in days, between one interval's end and the next
    /// interval's start for them to still count as contiguous. Zero means
    /// strictly back-to-back.
    pub gap_tolerance_days: i64,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            gap_tolerance_days: 0,
        }
    }
}
