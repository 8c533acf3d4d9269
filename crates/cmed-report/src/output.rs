//! The output consolidator.
//!
//! Joins each transaction with its match result and the canonical
//! attributes of the matched product, under a fixed, ordered column
//! schema. Missing attributes are filled with an explicit marker, never
//! silently omitted, and duplicate transaction ids are reported rather
//! than dropped.

use std::collections::{BTreeSet, HashSet};

use cmed_model::{MatchResult, TransactionId, TransactionRecord};
use cmed_registry::Registry;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ReportError, Result};

/// Marker written where a canonical attribute is absent for a resolved
/// (or unresolved) transaction.
pub const MISSING: &str = "NAO INFORMADO";

/// Declared type of one output column, persisted in the sidecar manifest
/// so downstream consumers never re-infer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

impl ColumnSpec {
    fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// The consolidated dataset: ordered columns, rendered rows, and the
/// anomalies found while joining.
#[derive(Debug)]
pub struct OutputTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<String>>,
    /// Transaction ids that appeared more than once in the input.
    pub duplicate_transactions: Vec<TransactionId>,
}

/// The fixed core schema, in output order. Pass-through context columns
/// follow, sorted by name.
fn core_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id_transacao", ColumnKind::Text),
        ColumnSpec::new("codigo_ean", ColumnKind::Text),
        ColumnSpec::new("descricao_produto", ColumnKind::Text),
        ColumnSpec::new("quantidade", ColumnKind::Float),
        ColumnSpec::new("valor_total", ColumnKind::Float),
        ColumnSpec::new("data_emissao", ColumnKind::Date),
        ColumnSpec::new("match_tier", ColumnKind::Integer),
        ColumnSpec::new("match_via", ColumnKind::Text),
        ColumnSpec::new("match_score", ColumnKind::Float),
        ColumnSpec::new("id_produto", ColumnKind::Text),
        ColumnSpec::new("principio_ativo", ColumnKind::Text),
        ColumnSpec::new("produto", ColumnKind::Text),
        ColumnSpec::new("apresentacao", ColumnKind::Text),
        ColumnSpec::new("laboratorio", ColumnKind::Text),
        ColumnSpec::new("classe_terapeutica", ColumnKind::Text),
        ColumnSpec::new("registro", ColumnKind::Text),
        ColumnSpec::new("preco_teto", ColumnKind::Float),
    ]
}

/// Build the consolidated output. `results` must be index-aligned with
/// `transactions`, which is how the batch resolver produces them.
pub fn consolidate_output(
    transactions: &[TransactionRecord],
    results: &[MatchResult],
    registry: &Registry,
) -> Result<OutputTable> {
    if transactions.len() != results.len() {
        return Err(ReportError::Misaligned {
            results: results.len(),
            transactions: transactions.len(),
        });
    }

    let context_keys: BTreeSet<&str> = transactions
        .iter()
        .flat_map(|t| t.context.keys().map(String::as_str))
        .collect();

    let mut columns = core_columns();
    for key in &context_keys {
        columns.push(ColumnSpec::new(key, ColumnKind::Text));
    }

    let mut seen: HashSet<TransactionId> = HashSet::with_capacity(transactions.len());
    let mut duplicate_transactions = Vec::new();
    let mut rows = Vec::with_capacity(transactions.len());

    for (transaction, result) in transactions.iter().zip(results) {
        if !seen.insert(transaction.id) {
            duplicate_transactions.push(transaction.id);
        }

        let product = result
            .product
            .as_ref()
            .and_then(|id| registry.get(id));
        let ceiling = product.and_then(|p| {
            transaction
                .emission_date
                .and_then(|date| p.interval_at(date))
                .and_then(|interval| interval.snapshot.ceiling_price())
        });

        let mut row = Vec::with_capacity(columns.len());
        row.push(transaction.id.to_hex());
        row.push(
            transaction
                .barcode
                .as_ref()
                .map_or_else(|| MISSING.to_string(), |b| b.as_str().to_string()),
        );
        row.push(transaction.description_raw.clone());
        row.push(format_float(transaction.quantity));
        row.push(format_float(transaction.total_value));
        row.push(
            transaction
                .emission_date
                .map_or_else(|| MISSING.to_string(), |d| d.to_string()),
        );
        row.push(result.tier.as_number().to_string());
        row.push(
            result
                .matched_via
                .map_or_else(|| MISSING.to_string(), |via| via.as_str().to_string()),
        );
        row.push(
            result
                .score
                .map_or_else(|| MISSING.to_string(), |score| format!("{score:.4}")),
        );
        row.push(
            result
                .product
                .as_ref()
                .map_or_else(|| MISSING.to_string(), |id| id.as_str().to_string()),
        );
        row.push(text_or_missing(product.map(|p| p.ingredient.as_str())));
        row.push(text_or_missing(product.map(|p| p.name.as_str())));
        row.push(text_or_missing(product.map(|p| p.presentation.as_str())));
        row.push(text_or_missing(product.map(|p| p.laboratory.as_str())));
        row.push(text_or_missing(product.map(|p| p.therapeutic_class.as_str())));
        row.push(
            product
                .and_then(|p| p.registration.as_ref())
                .map_or_else(|| MISSING.to_string(), |r| r.as_str().to_string()),
        );
        row.push(ceiling.map_or_else(|| MISSING.to_string(), format_float));
        for key in &context_keys {
            row.push(
                transaction
                    .context
                    .get(*key)
                    .cloned()
                    .unwrap_or_else(|| MISSING.to_string()),
            );
        }
        rows.push(row);
    }

    if !duplicate_transactions.is_empty() {
        warn!(
            duplicates = duplicate_transactions.len(),
            "duplicate transaction ids in consolidated output"
        );
    }

    Ok(OutputTable {
        columns,
        rows,
        duplicate_transactions,
    })
}

fn text_or_missing(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => MISSING.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
