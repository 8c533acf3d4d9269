//! Ingestion of the government price-table export (the registry source).
//!
//! The export changes header accents between publications, so column
//! lookup tolerates the known variants instead of requiring one spelling.

use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::parse::{parse_date, parse_flag, parse_number};
use crate::{IngestError, IngestStats, Result};

/// One raw registry row, text fields untouched. Normalization happens in
/// the registry build, not at ingestion.
#[derive(Debug, Clone)]
pub struct RegistryRowRaw {
    pub ingredient: String,
    pub product: String,
    pub presentation: String,
    pub laboratory: String,
    pub therapeutic_class: String,
    pub ean1: Option<String>,
    pub ean2: Option<String>,
    pub ean3: Option<String>,
    pub registration: Option<String>,
    pub vig_start: NaiveDate,
    pub vig_end: Option<NaiveDate>,
    pub pf_0: Option<f64>,
    pub pf_20: Option<f64>,
    pub pmvg_0: Option<f64>,
    pub pmvg_20: Option<f64>,
    pub cap: bool,
    pub icms_zero: bool,
}

/// Header variants per logical column; publications flip accents and
/// qualifiers between editions.
const COLUMNS: &[(&str, &[&str])] = &[
    ("ingredient", &["PRINCIPIO ATIVO", "PRINCÍPIO ATIVO"]),
    ("product", &["PRODUTO"]),
    ("presentation", &["APRESENTACAO", "APRESENTAÇÃO"]),
    ("laboratory", &["LABORATORIO", "LABORATÓRIO"]),
    (
        "therapeutic_class",
        &["CLASSE TERAPEUTICA", "CLASSE TERAPÊUTICA"],
    ),
    ("ean1", &["EAN 1", "EAN_1", "EAN"]),
    ("ean2", &["EAN 2", "EAN_2"]),
    ("ean3", &["EAN 3", "EAN_3"]),
    ("registration", &["REGISTRO"]),
    ("vig_start", &["VIG_INICIO", "VIGENCIA INICIO"]),
    ("vig_end", &["VIG_FIM", "VIGENCIA FIM"]),
    ("pf_0", &["PF 0%", "PF 0"]),
    ("pf_20", &["PF 20%", "PF 20"]),
    ("pmvg_0", &["PMVG 0%", "PMVG 0"]),
    ("pmvg_20", &["PMVG 20%", "PMVG 20"]),
    ("cap", &["CAP"]),
    ("icms_zero", &["ICMS 0%", "ICMS 0"]),
];

/// Required columns: without these a registry cannot be built at all.
const REQUIRED: &[&str] = &["ingredient", "product", "vig_start"];

struct ColumnMap {
    indices: Vec<Option<usize>>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let mut indices = Vec::with_capacity(COLUMNS.len());
        for (logical, variants) in COLUMNS {
            let found = headers.iter().position(|h| {
                let trimmed = h.trim();
                variants.iter().any(|v| trimmed.eq_ignore_ascii_case(v))
            });
            if found.is_none() && REQUIRED.contains(logical) {
                return Err(IngestError::MissingColumn { name: logical });
            }
            indices.push(found);
        }
        Ok(Self { indices })
    }

    fn get<'r>(&self, record: &'r StringRecord, logical: &str) -> Option<&'r str> {
        let position = COLUMNS.iter().position(|(name, _)| *name == logical)?;
        self.indices[position].and_then(|idx| record.get(idx)).map(str::trim)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Read the registry CSV. Rows with a missing/unparseable validity start
/// are skipped and counted; everything else degrades to `None` fields.
pub fn read_registry_csv(path: &Path) -> Result<(Vec<RegistryRowRaw>, IngestStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut rows = Vec::new();
    let mut stats = IngestStats::default();

    for record in reader.records() {
        stats.rows_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                debug!(%error, "skipping malformed registry row");
                stats.malformed_skipped += 1;
                continue;
            }
        };
        let Some(vig_start) = columns.get(&record, "vig_start").and_then(parse_date) else {
            stats.malformed_skipped += 1;
            continue;
        };
        rows.push(RegistryRowRaw {
            ingredient: columns.get(&record, "ingredient").unwrap_or("").to_string(),
            product: columns.get(&record, "product").unwrap_or("").to_string(),
            presentation: columns
                .get(&record, "presentation")
                .unwrap_or("")
                .to_string(),
            laboratory: columns.get(&record, "laboratory").unwrap_or("").to_string(),
            therapeutic_class: columns
                .get(&record, "therapeutic_class")
                .unwrap_or("")
                .to_string(),
            ean1: non_empty(columns.get(&record, "ean1")),
            ean2: non_empty(columns.get(&record, "ean2")),
            ean3: non_empty(columns.get(&record, "ean3")),
            registration: non_empty(columns.get(&record, "registration")),
            vig_start,
            vig_end: columns.get(&record, "vig_end").and_then(parse_date),
            pf_0: columns.get(&record, "pf_0").and_then(parse_number),
            pf_20: columns.get(&record, "pf_20").and_then(parse_number),
            pmvg_0: columns.get(&record, "pmvg_0").and_then(parse_number),
            pmvg_20: columns.get(&record, "pmvg_20").and_then(parse_number),
            cap: columns.get(&record, "cap").map(parse_flag).unwrap_or(false),
            icms_zero: columns
                .get(&record, "icms_zero")
                .map(parse_flag)
                .unwrap_or(false),
        });
    }

    if stats.malformed_skipped > 0 {
        warn!(
            skipped = stats.malformed_skipped,
            read = stats.rows_read,
            "registry rows skipped during ingestion"
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
    fn reads_rows_with_accented_headers() {
        let file = write_csv(
            "PRINCÍPIO ATIVO,PRODUTO,APRESENTAÇÃO,LABORATÓRIO,CLASSE TERAPEUTICA,EAN 1,REGISTRO,VIG_INICIO,VIG_FIM,PF 0%,PF 20%,CAP,ICMS 0%\n\
             DIPIRONA,NOVALGINA,20 COMPRIMIDOS,SANOFI,N02B,7891058001407,1130060110011,2023-01-01,2023-06-30,\"10,50\",\"12,00\",NAO,SIM\n",
        );
        let (rows, stats) = read_registry_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.rows_read, 1);
        assert_eq!(stats.malformed_skipped, 0);
        let row = &rows[0];
        assert_eq!(row.ingredient, "DIPIRONA");
        assert_eq!(row.ean1.as_deref(), Some("7891058001407"));
        assert_eq!(row.pf_0, Some(10.5));
        assert!(!row.cap);
        assert!(row.icms_zero);
        assert_eq!(
            row.vig_end,
            Some(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap())
        );
    }

    #[test]
    fn rows_without_validity_start_are_skipped_and_counted() {
        let file = write_csv(
            "PRINCIPIO ATIVO,PRODUTO,VIG_INICIO\n\
             DIPIRONA,NOVALGINA,2023-01-01\n\
             PARACETAMOL,TYLENOL,not-a-date\n",
        );
        let (rows, stats) = read_registry_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(stats.rows_read, 2);
        assert_eq!(stats.malformed_skipped, 1);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let file = write_csv("PRODUTO,VIG_INICIO\nNOVALGINA,2023-01-01\n");
        let error = read_registry_csv(file.path()).unwrap_err();
        assert!(matches!(
            error,
            IngestError::MissingColumn {
                name: "ingredient"
            }
        ));
    }
}
