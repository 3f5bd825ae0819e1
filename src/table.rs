//! Aggregation: validated records from many documents into one table.
//!
//! The column set is fixed by the schema at build time and never inferred
//! from the records, so two runs over the same documents produce the same
//! header even when every value differs.

use crate::record::{TypedValue, ValidatedRecord};
use crate::schema::{Category, FieldSpec, SemanticType};
use serde::Serialize;

/// One output column: a schema field plus its rendering hints.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub semantic_type: SemanticType,
    pub category: Category,
}

impl Column {
    /// Background fill for spreadsheet-style renderers, as `RRGGBB` hex.
    pub fn fill_color(&self) -> &'static str {
        self.category.fill_color()
    }
}

/// The final cross-document table.
///
/// Rows keep insertion order (document processing order); columns keep
/// schema order. An empty run still has the full header.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateTable {
    pub columns: Vec<Column>,
    pub records: Vec<ValidatedRecord>,
}

impl AggregateTable {
    /// Render one row in column order, [`TypedValue::render`] per cell.
    pub fn row(&self, record: &ValidatedRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| record.value(c.name).render())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records carrying at least one non-informational field error.
    pub fn flawed_records(&self) -> usize {
        self.records.iter().filter(|r| r.error_count() > 0).count()
    }
}

/// Accumulates validated records; [`finalize`](TableBuilder::finalize)
/// freezes them into an [`AggregateTable`].
#[derive(Debug)]
pub struct TableBuilder {
    columns: Vec<Column>,
    records: Vec<ValidatedRecord>,
}

impl TableBuilder {
    pub fn new(schema: &[FieldSpec]) -> Self {
        let columns = schema
            .iter()
            .map(|spec| Column {
                name: spec.name,
                semantic_type: spec.semantic_type,
                category: spec.category,
            })
            .collect();
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn add(&mut self, record: ValidatedRecord) {
        self.records.push(record);
    }

    pub fn finalize(self) -> AggregateTable {
        AggregateTable {
            columns: self.columns,
            records: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawValue;
    use crate::schema::schema;
    use crate::validate::validate;
    use std::collections::HashMap;

    fn record_named(name: &str) -> ValidatedRecord {
        let raw: HashMap<String, RawValue> = [(
            "Nome_Fondo_Target".to_string(),
            RawValue::Text(name.to_string()),
        )]
        .into();
        validate(&raw, schema(), name)
    }

    #[test]
    fn empty_table_still_has_full_header() {
        let table = TableBuilder::new(schema()).finalize();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), schema().len());
        assert_eq!(table.columns[0].name, "NAV_Date");
    }

    #[test]
    fn rows_keep_insertion_order() {
        let mut builder = TableBuilder::new(schema());
        builder.add(record_named("alpha"));
        builder.add(record_named("beta"));
        builder.add(record_named("gamma"));
        let table = builder.finalize();

        let names: Vec<&str> = table
            .records
            .iter()
            .map(|r| r.source_ref.as_str())
            .collect();
        assert_eq!(names, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn row_rendering_follows_column_order() {
        let mut builder = TableBuilder::new(schema());
        builder.add(record_named("alpha"));
        let table = builder.finalize();

        let row = table.row(&table.records[0]);
        assert_eq!(row.len(), table.columns.len());
        let name_idx = table
            .columns
            .iter()
            .position(|c| c.name == "Nome_Fondo_Target")
            .unwrap();
        assert_eq!(row[name_idx], "alpha");
    }

    #[test]
    fn flawed_record_tally_ignores_informational_errors() {
        let mut builder = TableBuilder::new(schema());
        // Missing required fields are hard errors.
        builder.add(validate(&HashMap::new(), schema(), "empty"));
        let table = builder.finalize();
        assert_eq!(table.flawed_records(), 1);
    }

    #[test]
    fn fill_colors_come_from_the_category() {
        let table = TableBuilder::new(schema()).finalize();
        let nav = table.columns.iter().find(|c| c.name == "NAV_Date").unwrap();
        assert_eq!(nav.fill_color(), nav.category.fill_color());
    }
}
