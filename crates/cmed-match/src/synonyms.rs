//! Commercial-name synonyms and pharma stopwords for tier-3 scoring.
//!
//! Invoice descriptions use trade vocabulary ("VITAMINA C") where the
//! registry uses the chemical name; the synonym pass folds one onto the
//! other before any similarity is computed. Stopwords are dosage and
//! packaging tokens that dominate token counts without identifying the
//! product; they are stripped only for the "specific" half of the name
//! score, never from the text used for the full-string comparison.

use std::collections::BTreeSet;

use cmed_normalize::{CorrectionRule, RuleError, RuleScope};

const SYNONYM_PAIRS: &[(&str, &str)] = &[
    ("VITAMINA C", "ACIDO ASCORBICO"),
    ("VITAMINA D3", "COLECALCIFEROL"),
    ("VITAMINA D", "COLECALCIFEROL"),
    ("VITAMINA B12", "CIANOCOBALAMINA"),
    ("VITAMINA B6", "PIRIDOXINA"),
    ("VITAMINA B1", "TIAMINA"),
    ("VITAMINA A", "RETINOL"),
    ("VITAMINA E", "TOCOFEROL"),
    ("VITAMINA K", "FITOMENADIONA"),
    ("AAS", "ACIDO ACETILSALICILICO"),
    ("SORO FISIOLOGICO", "CLORETO DE SODIO"),
    ("AGUA OXIGENADA", "PEROXIDO DE HIDROGENIO"),
    ("BICARBONATO", "BICARBONATO DE SODIO"),
];

const STOPWORDS: &[&str] = &[
    "MG", "ML", "MCG", "UI", "GR", "KG", "CP", "CPR", "COMP", "COMPR", "COMPRIMIDO",
    "COMPRIMIDOS", "CAP", "CAPS", "CAPSULA", "CAPSULAS", "DRG", "DRAGEA", "DRAGEAS", "AMP",
    "AMPOLA", "AMPOLAS", "FR", "FRASCO", "FRASCOS", "FA", "VD", "BL", "BLISTER", "CX", "CAIXA",
    "ENV", "ENVELOPE", "SACHE", "TB", "TUBO", "BG", "BISNAGA", "SOL", "SOLUCAO", "SUS",
    "SUSPENSAO", "SUSP", "XPE", "XAROPE", "POM", "POMADA", "CR", "CREME", "GEL", "INJ",
    "INJETAVEL", "ORAL", "GTS", "GOTAS", "SPRAY", "AER", "AEROSOL", "REV", "REVESTIDO",
    "REVESTIDOS", "LIB", "PROLONGADA", "GEN", "GENERICO", "SIMILAR", "UN", "UND", "UNID",
    "COM", "C/", "X",
];

/// Immutable synonym table plus the stopword set.
#[derive(Debug, Clone)]
pub struct SynonymSet {
    rules: Vec<CorrectionRule>,
    stopwords: BTreeSet<&'static str>,
}

impl SynonymSet {
    pub fn builtin() -> Result<Self, RuleError> {
        let mut rules = Vec::with_capacity(SYNONYM_PAIRS.len());
        for (find, replace) in SYNONYM_PAIRS {
            rules.push(CorrectionRule::word(find, *replace, RuleScope::All)?);
        }
        Ok(Self {
            rules,
            stopwords: STOPWORDS.iter().copied().collect(),
        })
    }

    /// Apply the synonym substitutions in list order.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            current = rule.apply(&current);
        }
        current
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Drop stopword and pure-numeric tokens, keeping the rest in order.
    pub fn strip_stopwords(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|token| {
                !self.is_stopword(token) && !token.chars().all(|c| c.is_ascii_digit())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_fold_trade_names_onto_chemical_names() {
        let synonyms = SynonymSet::builtin().unwrap();
        assert_eq!(
            synonyms.apply("VITAMINA C 500MG"),
            "ACIDO ASCORBICO 500MG"
        );
        assert_eq!(synonyms.apply("AAS INFANTIL"), "ACIDO ACETILSALICILICO INFANTIL");
    }

    #[test]
    fn synonym_match_requires_word_boundaries() {
        let synonyms = SynonymSet::builtin().unwrap();
        assert_eq!(synonyms.apply("AASX"), "AASX");
    }

    #[test]
    fn stopwords_and_numbers_are_stripped() {
        let synonyms = SynonymSet::builtin().unwrap();
        assert_eq!(
            synonyms.strip_stopwords("DIPIRONA 500 MG 20 COMPRIMIDOS REV"),
            "DIPIRONA"
        );
    }
}
