//! Ingestion of invoice line items (the transaction source).

use std::collections::BTreeMap;
use std::path::Path;

use cmed_model::{Barcode, TransactionId, TransactionRecord};
use csv::StringRecord;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::parse::{parse_date, parse_number};
use crate::{IngestError, IngestStats, Result};

/// Options for one transaction ingestion pass.
#[derive(Debug, Clone)]
pub struct TransactionCsvOptions {
    /// Stable identifier for the source file, folded into every row id.
    /// Re-ingesting the same file yields the same transaction ids.
    pub source_id: String,
}

impl TransactionCsvOptions {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
        }
    }
}

const BARCODE_HEADERS: &[&str] = &["CODIGO_EAN", "CÓDIGO_EAN", "EAN", "CODIGO EAN"];
const DESCRIPTION_HEADERS: &[&str] = &["DESCRICAO_PRODUTO", "DESCRIÇÃO_PRODUTO", "DESCRICAO"];
const QUANTITY_HEADERS: &[&str] = &["QUANTIDADE", "QTD"];
const VALUE_HEADERS: &[&str] = &["VALOR_TOTAL", "VALOR"];
const DATE_HEADERS: &[&str] = &["DATA_EMISSAO", "DATA_EMISSÃO", "DATA EMISSAO"];

fn find_column(headers: &StringRecord, variants: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let trimmed = h.trim();
        variants.iter().any(|v| trimmed.eq_ignore_ascii_case(v))
    })
}

/// Deterministic row id: sha256 over the source id and the record number,
/// separated by a NUL so neither can masquerade as the other.
fn derive_transaction_id(source_id: &str, record_number: u64) -> TransactionId {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(record_number.to_be_bytes());
    TransactionId::from_first_16_bytes_of_sha256(hasher.finalize().into())
}

/// Read an invoice line-item CSV. The description column is required;
/// rows with an empty description are skipped and counted. Columns that
/// are not part of the core schema are preserved verbatim in the row's
/// context map and travel through to the consolidated output.
pub fn read_transaction_csv(
    path: &Path,
    options: &TransactionCsvOptions,
) -> Result<(Vec<TransactionRecord>, IngestStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let barcode_col = find_column(&headers, BARCODE_HEADERS);
    let Some(description_col) = find_column(&headers, DESCRIPTION_HEADERS) else {
        return Err(IngestError::MissingColumn {
            name: "descricao_produto",
        });
    };
    let quantity_col = find_column(&headers, QUANTITY_HEADERS);
    let value_col = find_column(&headers, VALUE_HEADERS);
    let date_col = find_column(&headers, DATE_HEADERS);

    let core_cols = [
        barcode_col,
        Some(description_col),
        quantity_col,
        value_col,
        date_col,
    ];

    let mut rows = Vec::new();
    let mut stats = IngestStats::default();
    let mut record_number: u64 = 0;

    for record in reader.records() {
        record_number += 1;
        stats.rows_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                debug!(%error, record_number, "skipping malformed transaction row");
                stats.malformed_skipped += 1;
                continue;
            }
        };

        let description_raw = record
            .get(description_col)
            .map(str::trim)
            .unwrap_or("")
            .to_string();
        if description_raw.is_empty() {
            stats.malformed_skipped += 1;
            continue;
        }

        let barcode = barcode_col
            .and_then(|idx| record.get(idx))
            .and_then(Barcode::parse);
        let quantity = quantity_col
            .and_then(|idx| record.get(idx))
            .and_then(parse_number)
            .unwrap_or(0.0);
        let total_value = value_col
            .and_then(|idx| record.get(idx))
            .and_then(parse_number)
            .unwrap_or(0.0);
        let emission_date = date_col
            .and_then(|idx| record.get(idx))
            .and_then(parse_date);

        let mut context = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            if core_cols.contains(&Some(idx)) {
                continue;
            }
            if let Some(name) = headers.get(idx) {
                let value = value.trim();
                if !value.is_empty() {
                    context.insert(name.trim().to_string(), value.to_string());
                }
            }
        }

        rows.push(TransactionRecord {
            id: derive_transaction_id(&options.source_id, record_number),
            barcode,
            description_raw,
            quantity,
            total_value,
            emission_date,
            context,
        });
    }

    if stats.malformed_skipped > 0 {
        warn!(
            skipped = stats.malformed_skipped,
            read = stats.rows_read,
            "transaction rows skipped during ingestion"
        );
    }
    Ok((rows, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_core_columns_and_context() {
        let file = write_csv(
            "codigo_ean,descricao_produto,quantidade,valor_total,data_emissao,cnpj_emitente\n\
             7891058001407,DIPIRONA 500MG 20CP,\"2,0\",\"25,80\",2023-03-15,11222333000144\n",
        );
        let (rows, stats) = read_transaction_csv(
            file.path(),
            &TransactionCsvOptions::new("nfe-2023-03"),
        )
        .unwrap();
        assert_eq!(stats.rows_read, 1);
        assert_eq!(stats.malformed_skipped, 0);
        let row = &rows[0];
        assert_eq!(row.description_raw, "DIPIRONA 500MG 20CP");
        assert_eq!(
            row.barcode,
            Barcode::parse("7891058001407")
        );
        assert_eq!(row.quantity, 2.0);
        assert_eq!(row.total_value, 25.8);
        assert_eq!(
            row.context.get("cnpj_emitente").map(String::as_str),
            Some("11222333000144")
        );
    }

    #[test]
    fn row_ids_are_deterministic_per_source() {
        let content = "descricao_produto\nDIPIRONA\nPARACETAMOL\n";
        let file = write_csv(content);
        let options = TransactionCsvOptions::new("batch-a");
        let (first, _) = read_transaction_csv(file.path(), &options).unwrap();
        let (second, _) = read_transaction_csv(file.path(), &options).unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[0].id, first[1].id);

        let other = TransactionCsvOptions::new("batch-b");
        let (third, _) = read_transaction_csv(file.path(), &other).unwrap();
        assert_ne!(first[0].id, third[0].id);
    }

    #[test]
    fn empty_description_is_skipped() {
        let file = write_csv(
            "codigo_ean,descricao_produto\n7891058001407,\n7891058001407,DIPIRONA\n",
        );
        let (rows, stats) =
            read_transaction_csv(file.path(), &TransactionCsvOptions::new("x")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.malformed_skipped, 1);
    }

    #[test]
    fn placeholder_barcode_becomes_none() {
        let file = write_csv("codigo_ean,descricao_produto\nSEM GTIN,DIPIRONA\n");
        let (rows, _) =
            read_transaction_csv(file.path(), &TransactionCsvOptions::new("x")).unwrap();
        assert_eq!(rows[0].barcode, None);
    }

    #[test]
    fn missing_description_column_is_an_error() {
        let file = write_csv("codigo_ean\n789\n");
        let error = read_transaction_csv(file.path(), &TransactionCsvOptions::new("x"))
            .unwrap_err();
        assert!(matches!(error, IngestError::MissingColumn { .. }));
    }
}
