//! Persistence of the consolidated dataset and its sidecar manifest.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::output::{ColumnSpec, OutputTable};

/// Sidecar manifest persisted next to the resolved CSV. Declares column
/// types so downstream consumers never re-infer them, and carries the
/// incomplete-run marker when a wall-clock budget cut the batch short.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub columns: &'a [ColumnSpec],
    pub rows: usize,
    pub incomplete_run: bool,
}

/// Write the resolved dataset as UTF-8 CSV with a header row.
pub fn write_resolved_csv(path: &Path, table: &OutputTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = table.rows.len(), "resolved dataset written");
    Ok(())
}

/// Write the sidecar type manifest as pretty-printed JSON.
pub fn write_manifest(path: &Path, table: &OutputTable, incomplete_run: bool) -> Result<()> {
    let manifest = Manifest {
        columns: &table.columns,
        rows: table.rows.len(),
        incomplete_run,
    };
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &manifest)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ColumnKind, OutputTable};

    fn sample_table() -> OutputTable {
        OutputTable {
            columns: vec![
                ColumnSpec {
                    name: "id_transacao".to_string(),
                    kind: ColumnKind::Text,
                },
                ColumnSpec {
                    name: "valor_total".to_string(),
                    kind: ColumnKind::Float,
                },
            ],
            rows: vec![vec!["abc".to_string(), "25.0".to_string()]],
            duplicate_transactions: Vec::new(),
        }
    }

    #[test]
    fn csv_round_trips_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.csv");
        write_resolved_csv(&path, &sample_table()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id_transacao,valor_total\nabc,25.0\n");
    }

    #[test]
    fn manifest_declares_types_and_run_state() {
        let table = sample_table();
        let manifest = Manifest {
            columns: &table.columns,
            rows: table.rows.len(),
            incomplete_run: true,
        };
        insta::assert_json_snapshot!(manifest, @r#"
        {
          "columns": [
            {
              "name": "id_transacao",
              "type": "text"
            },
            {
              "name": "valor_total",
              "type": "float"
            }
          ],
          "rows": 1,
          "incomplete_run": true
        }
        "#);
    }
}
