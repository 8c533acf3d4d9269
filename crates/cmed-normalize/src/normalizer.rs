//! The six-stage canonicalization pipeline.
//!
//! `normalize` is a pure function of its input and the injected rule
//! table. Stages run in fixed order and each stage is idempotent on its
//! own output, so re-normalizing canonical text is a no-op:
//!
//! 1. Uppercase fold, trim, collapse internal whitespace.
//! 2. Diacritic stripping (NFD decomposition, combining marks dropped).
//! 3. Ordered correction rules, applied to a fixed point.
//! 4. Combination canonicalization (ingredient fields only): split on
//!    `+`, trim, dedupe, sort, rejoin — unless the bypass set applies.
//! 5. Targeted substring corrections (salt suffixes, misspellings).
//! 6. Delimiter and whitespace cleanup.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::rules::{RuleError, RuleTable};

/// Canonical sentinel for empty or placeholder input. Join keys are never
/// the empty string.
pub const NOT_SPECIFIED: &str = "NAO ESPECIFICADO";

/// Values that mean "nothing was filled in" in source data.
const UNSPECIFIED_VALUES: &[&str] = &["NAO ESPECIFICADO", "NAN", "NONE", "NULL", "NA", "NI", "NC"];

/// Markers of administrative test/placeholder rows. Such rows are flagged
/// for exclusion upstream of the registry build, not normalized.
const EXCLUSION_MARKERS: &[&str] = &["PROCEDIMENTO MEDICO TABELADO"];

/// Rule passes repeat until stable; a handful of passes is always enough
/// for the built-in table, the cap only guards against pathological
/// custom rules.
const MAX_RULE_PASSES: usize = 4;

/// The kind of field being normalized. Scopes stage 4 and the per-rule
/// scope filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Ingredient,
    ProductName,
    Presentation,
    Laboratory,
    /// Free-text transaction description; gets product-name and
    /// ingredient rules but no combination reordering.
    Description,
}

/// Deterministic text canonicalizer over an immutable rule table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    table: RuleTable,
    plus_spacing: Regex,
    plus_duplicate: Regex,
    plus_leading: Regex,
    plus_trailing: Regex,
    double_space: Regex,
}

impl Normalizer {
    pub fn new(table: RuleTable) -> Result<Self, RuleError> {
        Ok(Self {
            table,
            plus_spacing: cleanup_regex(r"\s*\+\s*")?,
            plus_duplicate: cleanup_regex(r"\+(?:\s*\+)+")?,
            plus_leading: cleanup_regex(r"^\s*\+\s*")?,
            plus_trailing: cleanup_regex(r"\s*\+\s*$")?,
            double_space: cleanup_regex(r"\s{2,}")?,
        })
    }

    /// The normalizer with the built-in rule table.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::new(RuleTable::builtin()?)
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Canonicalize one raw text field.
    pub fn normalize(&self, text: &str, kind: FieldKind) -> String {
        let folded = fold_case_and_whitespace(text);
        if is_unspecified(&folded) {
            return NOT_SPECIFIED.to_string();
        }
        let stripped = strip_diacritics(&folded);
        let corrected = self.apply_rules(&stripped, kind);
        let combined = if kind == FieldKind::Ingredient {
            self.canonicalize_combination(&corrected)
        } else {
            corrected
        };
        let substituted = self.apply_substrings(&combined, kind);
        let cleaned = self.final_cleanup(&substituted);
        if cleaned.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            cleaned
        }
    }

    /// Whether a raw field marks an administrative test/placeholder row
    /// that must be excluded from the registry build.
    pub fn should_exclude(&self, text: &str) -> bool {
        let folded = strip_diacritics(&fold_case_and_whitespace(text));
        EXCLUSION_MARKERS
            .iter()
            .any(|marker| folded.contains(marker))
    }

    /// Stage 3: ordered correction rules, repeated to a fixed point so
    /// the stage is idempotent even when one rule's output feeds another.
    fn apply_rules(&self, text: &str, kind: FieldKind) -> String {
        let mut current = text.to_string();
        for pass in 0..MAX_RULE_PASSES {
            let mut next = current.clone();
            for rule in self.table.rules() {
                if rule.scope().matches(kind) {
                    next = rule.apply(&next);
                }
            }
            if next == current {
                return current;
            }
            if pass == MAX_RULE_PASSES - 1 {
                debug!(input = text, "correction rules did not reach a fixed point");
            }
            current = next;
        }
        current
    }

    /// Stage 4: combination canonicalization. Resolves the ordering
    /// inconsistency between sources ("A + B" vs "B + A") without
    /// altering chemical meaning.
    fn canonicalize_combination(&self, text: &str) -> String {
        if self.table.is_bypassed(text) {
            return text.to_string();
        }
        let unified = text.replace(';', " + ");
        if !unified.contains('+') {
            return unified;
        }
        let components: BTreeSet<&str> = unified
            .split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        components.into_iter().collect::<Vec<_>>().join(" + ")
    }

    /// Stage 5: fixed substring corrections, repeated to a fixed point.
    fn apply_substrings(&self, text: &str, kind: FieldKind) -> String {
        if !matches!(
            kind,
            FieldKind::Ingredient | FieldKind::ProductName | FieldKind::Description
        ) {
            return text.to_string();
        }
        let mut current = text.to_string();
        for _ in 0..MAX_RULE_PASSES {
            let mut next = current.clone();
            for rule in self.table.substrings() {
                next = next.replace(rule.find.as_str(), rule.replace.as_str());
            }
            if next == current {
                return current;
            }
            current = next;
        }
        current
    }

    /// Stage 6: delimiter artifact cleanup.
    fn final_cleanup(&self, text: &str) -> String {
        let spaced = self.plus_spacing.replace_all(text, " + ");
        let deduped = self.plus_duplicate.replace_all(&spaced, "+");
        let respaced = self.plus_spacing.replace_all(&deduped, " + ");
        let no_lead = self.plus_leading.replace_all(&respaced, "");
        let no_trail = self.plus_trailing.replace_all(&no_lead, "");
        let collapsed = self.double_space.replace_all(&no_trail, " ");
        collapsed.trim().to_string()
    }
}

fn cleanup_regex(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Stage 1: uppercase fold, trim, collapse internal whitespace.
fn fold_case_and_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Stage 2: NFD decomposition with combining marks and remaining
/// non-ASCII dropped, so "ÁCIDO FÓLICO" and "ACIDO FOLICO" compare equal.
fn strip_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect()
}

fn is_unspecified(folded: &str) -> bool {
    folded.is_empty() || UNSPECIFIED_VALUES.contains(&folded)
}
