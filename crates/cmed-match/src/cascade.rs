//! The three-tier matcher cascade.
//!
//! Tier 1 is an exact 13-digit key hit and is authoritative. Tier 2
//! resolves a normalized description that maps to exactly one canonical
//! product. Tier 3 scores a token-prefiltered candidate pool with the
//! weighted composite and accepts only above the configured threshold.
//! No tier errors out for an individual transaction; everything degrades
//! to an unresolved result.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use cmed_model::{
    MatchOptions, MatchResult, MatchTier, ProductId, ScoredCandidate, TransactionRecord,
};
use cmed_normalize::{FieldKind, NOT_SPECIFIED, Normalizer, RuleError};
use cmed_registry::{Registry, jaccard, tokenize};
use tracing::trace;

use crate::score::{
    NEAR_EXACT, composite, laboratory_score, name_score, token_sort_similarity,
};
use crate::synonyms::SynonymSet;

/// Outcome of the cascade for one transaction, with the flags the run
/// summary needs beyond the result itself.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub result: MatchResult,
    /// Tier 2 found several candidates and deferred to tier 3.
    pub tier2_ambiguous: bool,
}

/// Precomputed scoring material for one registry product.
#[derive(Debug, Clone)]
struct Candidate {
    id: ProductId,
    name_full: String,
    name_specific: String,
    laboratory: String,
    ingredient_tokens: BTreeSet<String>,
    pool_tokens: BTreeSet<String>,
}

/// The matcher: read-only registry plus per-product scoring material,
/// safe to share across worker threads.
#[derive(Debug)]
pub struct Matcher<'r> {
    registry: &'r Registry,
    normalizer: &'r Normalizer,
    synonyms: SynonymSet,
    options: MatchOptions,
    candidates: Vec<Candidate>,
}

impl<'r> Matcher<'r> {
    pub fn new(
        registry: &'r Registry,
        normalizer: &'r Normalizer,
        options: MatchOptions,
    ) -> Result<Self, RuleError> {
        let synonyms = SynonymSet::builtin()?;
        let candidates = registry
            .products()
            .iter()
            .map(|product| {
                let name_full = synonyms.apply(&product.name);
                let mut pool_tokens = tokenize(&name_full);
                pool_tokens.extend(tokenize(&product.ingredient));
                Candidate {
                    id: product.id.clone(),
                    name_specific: synonyms.strip_stopwords(&name_full),
                    name_full,
                    laboratory: product.laboratory.clone(),
                    ingredient_tokens: tokenize(&product.ingredient),
                    pool_tokens,
                }
            })
            .collect();
        Ok(Self {
            registry,
            normalizer,
            synonyms,
            options,
            candidates,
        })
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Resolve one transaction. Pure with respect to the shared registry;
    /// carries no cross-transaction state.
    pub fn resolve(&self, transaction: &TransactionRecord) -> Resolution {
        // Tier 1: exact key. Authoritative, nothing below it runs.
        if let Some(barcode) = &transaction.barcode {
            if let Some(hit) = self.registry.lookup_key(barcode) {
                trace!(transaction = %transaction.id, via = hit.via.as_str(), "tier-1 hit");
                return Resolution {
                    result: MatchResult {
                        transaction: transaction.id,
                        product: Some(hit.product.clone()),
                        tier: MatchTier::Barcode,
                        score: None,
                        matched_via: Some(hit.via),
                        nearest: Vec::new(),
                        attempted: true,
                    },
                    tier2_ambiguous: false,
                };
            }
        }

        let normalized = self
            .normalizer
            .normalize(&transaction.description_raw, FieldKind::Description);
        if normalized == NOT_SPECIFIED {
            return Resolution {
                result: MatchResult {
                    score: Some(0.0),
                    ..MatchResult::unresolved(transaction.id)
                },
                tier2_ambiguous: false,
            };
        }
        // Tier 2: the description is empirically unambiguous. Keyed on
        // the normalized form; synonyms only matter for fuzzy scoring.
        let mut tier2_ambiguous = false;
        match self.registry.lookup_description(&normalized) {
            [only] => {
                return Resolution {
                    result: MatchResult {
                        transaction: transaction.id,
                        product: Some(only.clone()),
                        tier: MatchTier::UniqueDescription,
                        score: None,
                        matched_via: None,
                        nearest: Vec::new(),
                        attempted: true,
                    },
                    tier2_ambiguous: false,
                };
            }
            [] => {}
            _ => tier2_ambiguous = true,
        }

        let cleaned = self.synonyms.apply(&normalized);
        Resolution {
            result: self.resolve_fuzzy(transaction, &cleaned),
            tier2_ambiguous,
        }
    }

    /// Tier 3: weighted composite over the prefiltered pool.
    fn resolve_fuzzy(&self, transaction: &TransactionRecord, cleaned: &str) -> MatchResult {
        let tokens = tokenize(cleaned);
        let specific = self.synonyms.strip_stopwords(cleaned);

        let mut scored: Vec<ScoredCandidate> = self
            .registry
            .candidates_sharing_tokens(&tokens)
            .into_iter()
            .filter_map(|idx| {
                let candidate = &self.candidates[idx];
                if jaccard(&tokens, &candidate.pool_tokens) < self.options.jaccard_prefilter {
                    return None;
                }
                let name = name_score(
                    cleaned,
                    &specific,
                    &candidate.name_full,
                    &candidate.name_specific,
                );
                let overlap = jaccard(&tokens, &candidate.ingredient_tokens);
                let laboratory = laboratory_score(cleaned, &candidate.laboratory);
                let bonus = if token_sort_similarity(cleaned, &candidate.name_full) > NEAR_EXACT
                {
                    self.options.precision_bonus
                } else {
                    0.0
                };
                Some(ScoredCandidate {
                    product: candidate.id.clone(),
                    score: composite(&self.options.weights, name, overlap, laboratory, bonus),
                    ingredient_overlap: overlap,
                })
            })
            .collect();

        // Best first: score, then ingredient overlap, then smaller id.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.ingredient_overlap
                        .partial_cmp(&a.ingredient_overlap)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.product.cmp(&b.product))
        });

        let best = scored.first().cloned();
        match best {
            Some(best) if best.score >= self.options.acceptance_threshold => MatchResult {
                transaction: transaction.id,
                product: Some(best.product),
                tier: MatchTier::Fuzzy,
                score: Some(best.score),
                matched_via: None,
                nearest: Vec::new(),
                attempted: true,
            },
            _ => {
                let top_score = best.as_ref().map_or(0.0, |c| c.score);
                scored.truncate(self.options.max_nearest);
                MatchResult {
                    transaction: transaction.id,
                    product: None,
                    tier: MatchTier::Fuzzy,
                    score: Some(top_score),
                    matched_via: None,
                    nearest: scored,
                    attempted: true,
                }
            }
        }
    }
}
