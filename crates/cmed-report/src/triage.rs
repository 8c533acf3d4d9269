//! Unresolved triage export.
//!
//! Groups unresolved transactions by (normalized description, barcode)
//! so an analyst triages each distinct failing description once, ordered
//! by the money at stake.

use std::collections::BTreeMap;
use std::path::Path;

use cmed_model::{MatchResult, TransactionRecord};
use cmed_normalize::{FieldKind, Normalizer};
use tracing::info;

use crate::error::Result;
use crate::output::MISSING;

/// One triage group: a distinct unresolved description/barcode pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageGroup {
    pub description_normalized: String,
    pub barcode: Option<String>,
    pub occurrences: usize,
    pub total_value: f64,
    /// Best composite score any member reached, when tier 3 ran.
    pub best_score: Option<f64>,
}

/// Build triage groups from unresolved, attempted results. Ordered by
/// total value descending, then description, for a stable export.
pub fn triage_groups(
    transactions: &[TransactionRecord],
    results: &[MatchResult],
    normalizer: &Normalizer,
) -> Vec<TriageGroup> {
    let mut groups: BTreeMap<(String, Option<String>), TriageGroup> = BTreeMap::new();
    for (transaction, result) in transactions.iter().zip(results) {
        if result.is_resolved() || !result.attempted {
            continue;
        }
        let description =
            normalizer.normalize(&transaction.description_raw, FieldKind::Description);
        let barcode = transaction.barcode.as_ref().map(|b| b.as_str().to_string());
        let group = groups
            .entry((description.clone(), barcode.clone()))
            .or_insert_with(|| TriageGroup {
                description_normalized: description,
                barcode,
                occurrences: 0,
                total_value: 0.0,
                best_score: None,
            });
        group.occurrences += 1;
        group.total_value += transaction.total_value;
        group.best_score = match (group.best_score, result.score) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let mut out: Vec<TriageGroup> = groups.into_values().collect();
    out.sort_by(|a, b| {
        b.total_value
            .partial_cmp(&a.total_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.description_normalized.cmp(&b.description_normalized))
    });
    out
}

/// Write the triage export as CSV.
pub fn write_triage_csv(path: &Path, groups: &[TriageGroup]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "descricao_normalizada",
        "codigo_ean",
        "ocorrencias",
        "valor_total",
        "melhor_score",
    ])?;
    for group in groups {
        writer.write_record([
            group.description_normalized.as_str(),
            group.barcode.as_deref().unwrap_or(MISSING),
            &group.occurrences.to_string(),
            &format!("{:.2}", group.total_value),
            &group
                .best_score
                .map_or_else(|| MISSING.to_string(), |s| format!("{s:.4}")),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), groups = groups.len(), "triage export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmed_model::{MatchResult, MatchTier, TransactionId};
    use std::collections::BTreeMap as Context;

    fn transaction(seed: u8, description: &str, value: f64) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::from_first_16_bytes_of_sha256([seed; 32]),
            barcode: None,
            description_raw: description.to_string(),
            quantity: 1.0,
            total_value: value,
            emission_date: None,
            context: Context::new(),
        }
    }

    fn unresolved(transaction: TransactionId, score: f64) -> MatchResult {
        MatchResult {
            score: Some(score),
            tier: MatchTier::Fuzzy,
            ..MatchResult::unresolved(transaction)
        }
    }

    #[test]
    fn groups_aggregate_by_normalized_description() {
        let normalizer = Normalizer::builtin().unwrap();
        let transactions = vec![
            transaction(1, "produto misterioso", 10.0),
            transaction(2, "PRODUTO  MISTERIOSO", 15.0),
            transaction(3, "OUTRA COISA", 100.0),
        ];
        let results = vec![
            unresolved(transactions[0].id, 0.30),
            unresolved(transactions[1].id, 0.45),
            unresolved(transactions[2].id, 0.10),
        ];
        let groups = triage_groups(&transactions, &results, &normalizer);

        assert_eq!(groups.len(), 2);
        // Highest value first.
        assert_eq!(groups[0].description_normalized, "OUTRA COISA");
        let misterioso = &groups[1];
        assert_eq!(misterioso.occurrences, 2);
        assert!((misterioso.total_value - 25.0).abs() < 1e-9);
        assert_eq!(misterioso.best_score, Some(0.45));
    }

    #[test]
    fn resolved_and_unattempted_rows_are_not_triaged() {
        let normalizer = Normalizer::builtin().unwrap();
        let transactions = vec![
            transaction(1, "RESOLVIDO", 10.0),
            transaction(2, "NUNCA TENTADO", 10.0),
        ];
        let mut resolved = MatchResult::unresolved(transactions[0].id);
        resolved.product = Some(cmed_model::ProductId::new("P000001").unwrap());
        let results = vec![resolved, MatchResult::unattempted(transactions[1].id)];
        let groups = triage_groups(&transactions, &results, &normalizer);
        assert!(groups.is_empty());
    }
}
