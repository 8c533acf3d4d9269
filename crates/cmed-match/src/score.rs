//! Tier-3 similarity primitives.
//!
//! Jaro-Winkler is the base string metric; token-sort and token-set
//! variants make it robust to the word-order and packaging noise of
//! invoice descriptions. All scores are in `[0, 1]`.

use std::collections::BTreeSet;

use cmed_model::MatchWeights;
use rapidfuzz::distance::jaro_winkler;

/// Share of the name score taken by the full-string token-set comparison;
/// the rest comes from the stopword-stripped token-sort comparison.
pub const NAME_BLEND_FULL: f64 = 0.4;
pub const NAME_BLEND_SPECIFIC: f64 = 0.6;

/// Token-sort similarity above which two strings count as a near-exact
/// match for the precision bonus.
pub const NEAR_EXACT: f64 = 0.98;

fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    jaro_winkler::similarity(a.chars(), b.chars())
}

fn sorted_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

/// Similarity after sorting the tokens of both sides, removing word-order
/// differences.
pub fn token_sort_similarity(a: &str, b: &str) -> f64 {
    similarity(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

/// Token-set similarity: compares the shared token core against each
/// side's remainder, so extra packaging tokens on one side cost little.
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let core = common.join(" ");
    let full_a = join_nonempty(&core, &only_a.join(" "));
    let full_b = join_nonempty(&core, &only_b.join(" "));

    similarity(&core, &full_a)
        .max(similarity(&core, &full_b))
        .max(similarity(&full_a, &full_b))
}

fn join_nonempty(core: &str, rest: &str) -> String {
    match (core.is_empty(), rest.is_empty()) {
        (_, true) => core.to_string(),
        (true, false) => rest.to_string(),
        (false, false) => format!("{core} {rest}"),
    }
}

/// The product-name similarity signal: token-set over the full cleaned
/// strings blended with token-sort over the stopword-stripped ones.
pub fn name_score(
    description_full: &str,
    description_specific: &str,
    name_full: &str,
    name_specific: &str,
) -> f64 {
    let full = token_set_similarity(description_full, name_full);
    let specific = token_sort_similarity(description_specific, name_specific);
    NAME_BLEND_FULL * full + NAME_BLEND_SPECIFIC * specific
}

/// Laboratory similarity; lab names appear inside descriptions, so the
/// token-set form is used rather than plain string similarity.
pub fn laboratory_score(description: &str, laboratory: &str) -> f64 {
    token_set_similarity(description, laboratory)
}

/// Weighted composite of the three signals plus an optional precision
/// bonus, clamped to `[0, 1]`.
pub fn composite(
    weights: &MatchWeights,
    name: f64,
    ingredient_overlap: f64,
    laboratory: f64,
    bonus: f64,
) -> f64 {
    let raw = weights.name * name
        + weights.ingredient * ingredient_overlap
        + weights.laboratory * laboratory
        + bonus;
    raw.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_sort_ignores_word_order() {
        let forward = token_sort_similarity("DIPIRONA SODICA", "SODICA DIPIRONA");
        assert!((forward - 1.0).abs() < 1e-9);
    }

    #[test]
    fn token_set_tolerates_extra_tokens_on_one_side() {
        let with_noise = token_set_similarity("DIPIRONA 500MG 20 COMPRIMIDOS", "DIPIRONA");
        let unrelated = token_set_similarity("PARACETAMOL", "DIPIRONA");
        assert!(with_noise > 0.9);
        assert!(with_noise > unrelated);
    }

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(token_sort_similarity("", ""), 0.0);
        assert_eq!(token_set_similarity("", "DIPIRONA"), 0.0);
    }

    #[test]
    fn composite_is_clamped() {
        let weights = MatchWeights::default();
        assert_eq!(composite(&weights, 1.0, 1.0, 1.0, 0.15), 1.0);
        assert_eq!(composite(&weights, 0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn composite_weighs_name_most() {
        let weights = MatchWeights::default();
        let name_only = composite(&weights, 1.0, 0.0, 0.0, 0.0);
        let lab_only = composite(&weights, 0.0, 0.0, 1.0, 0.0);
        assert!(name_only > lab_only);
        assert!((name_only - 0.60).abs() < 1e-9);
    }
}
