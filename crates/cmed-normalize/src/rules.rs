//! Immutable, versioned correction-rule tables.
//!
//! A [`RuleTable`] is built once, injected into the
//! [`Normalizer`](crate::Normalizer) at construction time, and never
//! mutated afterwards. Rules are applied strictly in list order and later
//! rules see the output of earlier ones, so the order is a
//! correctness-relevant contract covered by tests.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::FieldKind;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Which field kinds a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    #[default]
    All,
    Ingredient,
    ProductName,
    Laboratory,
}

impl RuleScope {
    pub fn matches(self, kind: FieldKind) -> bool {
        match self {
            RuleScope::All => true,
            RuleScope::Ingredient => {
                matches!(kind, FieldKind::Ingredient | FieldKind::Description)
            }
            RuleScope::ProductName => {
                matches!(kind, FieldKind::ProductName | FieldKind::Description)
            }
            RuleScope::Laboratory => matches!(kind, FieldKind::Laboratory),
        }
    }
}

/// One pattern-to-replacement correction, compiled at table construction.
#[derive(Debug, Clone)]
pub struct CorrectionRule {
    pattern: String,
    regex: Regex,
    replacement: String,
    scope: RuleScope,
}

impl CorrectionRule {
    /// A literal word replacement, anchored on word boundaries.
    pub fn word(
        find: &str,
        replace: impl Into<String>,
        scope: RuleScope,
    ) -> Result<Self, RuleError> {
        Self::pattern(&format!(r"\b{}\b", regex::escape(find)), replace, scope)
    }

    /// A raw regex rule. Replacements may reference capture groups.
    pub fn pattern(
        pattern: &str,
        replace: impl Into<String>,
        scope: RuleScope,
    ) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            replacement: replace.into(),
            scope,
        })
    }

    pub fn pattern_str(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// A fixed substring correction (no regex, no word boundaries). Used for
/// chemical-name misspellings and salt-nomenclature unification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringRule {
    pub find: String,
    pub replace: String,
}

impl SubstringRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

/// Serializable form of one correction rule, for table overrides loaded
/// from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub scope: RuleScope,
    /// When false, `pattern` is a literal word match; when true, a raw
    /// regex.
    #[serde(default)]
    pub regex: bool,
}

/// Serializable form of a whole rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTableSpec {
    pub version: u32,
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub substrings: Vec<SubstringRule>,
    #[serde(default)]
    pub bypass: Vec<String>,
}

/// An immutable, versioned, ordered set of correction rules plus the
/// combination-canonicalization bypass terms.
#[derive(Debug, Clone)]
pub struct RuleTable {
    version: u32,
    rules: Vec<CorrectionRule>,
    substrings: Vec<SubstringRule>,
    bypass: Vec<String>,
}

impl RuleTable {
    pub fn from_spec(spec: &RuleTableSpec) -> Result<Self, RuleError> {
        let mut rules = Vec::with_capacity(spec.rules.len());
        for rule in &spec.rules {
            let compiled = if rule.regex {
                CorrectionRule::pattern(&rule.pattern, rule.replacement.clone(), rule.scope)?
            } else {
                CorrectionRule::word(&rule.pattern, rule.replacement.clone(), rule.scope)?
            };
            rules.push(compiled);
        }
        Ok(Self {
            version: spec.version,
            rules,
            substrings: spec.substrings.clone(),
            bypass: spec.bypass.clone(),
        })
    }

    /// The built-in table distilled from the CMED/NF-e correction
    /// dictionaries. Order matters: boilerplate stripping runs first so
    /// spelling rules see clean text, delimiter repairs run last so they
    /// see corrected names.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_spec(&builtin_spec())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    pub fn substrings(&self) -> &[SubstringRule] {
        &self.substrings
    }

    pub fn bypass_terms(&self) -> &[String] {
        &self.bypass
    }

    /// Whether combination canonicalization must leave `text` untouched.
    pub fn is_bypassed(&self, text: &str) -> bool {
        self.bypass.iter().any(|term| text.contains(term.as_str()))
    }
}

fn word(pattern: &str, replacement: &str, scope: RuleScope) -> RuleSpec {
    RuleSpec {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
        scope,
        regex: false,
    }
}

fn pat(pattern: &str, replacement: &str, scope: RuleScope) -> RuleSpec {
    RuleSpec {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
        scope,
        regex: true,
    }
}

fn builtin_spec() -> RuleTableSpec {
    use RuleScope::{All, Ingredient, ProductName};

    RuleTableSpec {
        version: 1,
        rules: vec![
            // Administrative boilerplate, stripped before anything else.
            pat(r"\s+PORT\s+344\s*/?\s*98\s+LISTA\s+[A-Z]\s*\d+", "", All),
            pat(r"\s+A EXCLUIR$", "", All),
            pat(r"^\d+\s+", "", All),
            // Spelling corrections.
            word("GETAMICINA", "GENTAMICINA", All),
            word("AZITRIMICINA", "AZITROMICINA", All),
            word("SIDENAFILA", "SILDENAFILA", All),
            word("PROPANOLOL", "PROPRANOLOL", All),
            word("DIPROPRIONATO", "DIPROPIONATO", All),
            word("DICLOFENATO", "DICLOFENACO", All),
            word("PARACETOMOL", "PARACETAMOL", All),
            pat(r"^AC ACETILSALIC$", "ACIDO ACETILSALICILICO", All),
            pat(
                r"^SOLUCAO(?:\sFISIOLOGICA\sDE)?\sRINGER\sCOM\sLACTATO(?:\sDE\sSODIO)?$",
                "SOLUCAO RINGER COM LACTATO",
                ProductName,
            ),
            // Hydration suffixes never distinguish products.
            pat(r"\s*\+\s*TRI\s*HIDRATADA\b", "", Ingredient),
            pat(r"\s*\+\s*DI\s*HIDRATADA\b", "", Ingredient),
            // Missing conjunction delimiter between known co-formulations.
            pat(
                r"\bAMOXICILINA\s+CLAVULANATO\b",
                "AMOXICILINA + CLAVULANATO",
                Ingredient,
            ),
            pat(
                r"\b(CALCIO)\s(COLECALCIFEROL)\b",
                "$1 + $2",
                Ingredient,
            ),
            pat(
                r"\b(ISONIAZIDA)\s(RIFAMPICINA)\b",
                "$1 + $2",
                Ingredient,
            ),
            pat(
                r"\b(RIFAMPICINA)\s(ISONIAZIDA)\s(PIRAZINAMIDA)\s(ETAMBUTOL)\b",
                "$1 + $2 + $3 + $4",
                Ingredient,
            ),
            pat(
                r"\bSULFATO DE GENTAMICINA\s+FOSFATO DISSODICO DE BETAMETASONA\b",
                "SULFATO DE GENTAMICINA + FOSFATO DISSODICO DE BETAMETASONA",
                Ingredient,
            ),
            pat(
                r"\bBENZILPENICILINA\s+PROCAINA\s+BENZILPENICILINA\s+POTASSICA\b",
                "BENZILPENICILINA PROCAINA + BENZILPENICILINA POTASSICA",
                Ingredient,
            ),
            // Spurious delimiter inside single-substance names.
            pat(
                r"\bALGESTONA\s*\+\s*ACETOFENIDA\b",
                "ALGESTONA ACETOFENIDA",
                Ingredient,
            ),
            pat(
                r"^VALERATO\s*\+\s*BETAMETASONA$",
                "VALERATO DE BETAMETASONA",
                Ingredient,
            ),
            pat(
                r"\bCANDESARTANA\s*\+\s*CILEXETILA\b",
                "CANDESARTANA CILEXETILA",
                Ingredient,
            ),
            // Dangling delimiter artifacts left by upstream truncation.
            pat(r"\s\+\s?G$", "", All),
        ],
        substrings: vec![
            // Salt-nomenclature unification: either one canonical suffix
            // form or, for the exception list, no suffix at all.
            SubstringRule::new("MONTELUCASTE SODICO", "MONTELUCASTE DE SODIO"),
            SubstringRule::new("TAZOBACTAM SODICO", "TAZOBACTAM"),
            SubstringRule::new("RABEPRAZOL SODICO", "RABEPRAZOL"),
            SubstringRule::new("ACICLOVIR SODICO", "ACICLOVIR"),
            SubstringRule::new("AVIBACTAM SODICO", "AVIBACTAM"),
            SubstringRule::new("NAPROXENO SODICO", "NAPROXENO"),
            SubstringRule::new("PANTOPRAZOL SODICO", "PANTOPRAZOL"),
            SubstringRule::new("CROMOGLICATO DISSODICO", "CROMOGLICATO"),
        ],
        // Manufacturer/source tags whose component order is meaningful and
        // must be preserved verbatim.
        bypass: vec![
            "FURP".to_string(),
            "LQFEX".to_string(),
            "ISOFARMA".to_string(),
            "FRACAO".to_string(),
        ],
    }
}
