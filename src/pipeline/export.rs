//! Stage 3: render the aggregate table to CSV.
//!
//! Uses atomic write (temp file + rename) so a crashed run never leaves a
//! half-written spreadsheet behind.

use crate::error::FundsheetError;
use crate::table::AggregateTable;
use std::path::Path;
use tracing::info;

/// Render the table as a CSV string: one header row in schema order, one
/// row per record. An empty run still produces the header.
pub fn to_csv_string(table: &AggregateTable) -> Result<String, FundsheetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(table.columns.iter().map(|c| c.name))
        .map_err(|e| FundsheetError::Internal(format!("csv header: {e}")))?;

    for record in &table.records {
        writer
            .write_record(table.row(record))
            .map_err(|e| FundsheetError::Internal(format!("csv row: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FundsheetError::Internal(format!("csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| FundsheetError::Internal(format!("csv utf-8: {e}")))
}

/// Write the table to `path` atomically (temp file in the same directory,
/// then rename).
pub async fn write_csv(table: &AggregateTable, path: &Path) -> Result<(), FundsheetError> {
    let content = to_csv_string(table)?;

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, &content)
        .await
        .map_err(|e| FundsheetError::OutputWriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| FundsheetError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(rows = table.len(), path = %path.display(), "wrote spreadsheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawValue;
    use crate::schema::schema;
    use crate::table::TableBuilder;
    use crate::validate::validate;
    use std::collections::HashMap;

    fn table_with_one_record() -> AggregateTable {
        let raw: HashMap<String, RawValue> = [
            (
                "Nome_Fondo_Target".to_string(),
                RawValue::Text("Fondo, Alpha".to_string()),
            ),
            ("NAV_Date".to_string(), RawValue::Text("Q2 2025".to_string())),
        ]
        .into();
        let mut builder = TableBuilder::new(schema());
        builder.add(validate(&raw, schema(), "doc.pdf"));
        builder.finalize()
    }

    #[test]
    fn header_matches_schema_order_even_when_empty() {
        let table = TableBuilder::new(schema()).finalize();
        let csv = to_csv_string(&table).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("NAV_Date,Valuation_Date,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn values_are_rendered_and_quoted() {
        let table = table_with_one_record();
        let csv = to_csv_string(&table).unwrap();
        let row = csv.lines().nth(1).unwrap();
        // Embedded comma forces quoting.
        assert!(row.contains("\"Fondo, Alpha\""));
        assert!(row.contains("2025-06-30"));
    }

    #[test]
    fn missing_fields_render_the_marker() {
        let table = table_with_one_record();
        let csv = to_csv_string(&table).unwrap();
        assert!(csv.contains(crate::record::MISSING_MARKER));
    }

    #[tokio::test]
    async fn write_is_atomic_no_tmp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exposures.csv");

        write_csv(&table_with_one_record(), &out).await.unwrap();

        assert!(out.exists());
        assert!(!dir.path().join("exposures.csv.tmp").exists());
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with("NAV_Date,"));
    }
}
