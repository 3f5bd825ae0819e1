//! Output types for an extraction run.
//!
//! A run never loses a document silently: every input shows up in
//! [`RunOutput::documents`] with either its validated records or the
//! [`DocumentError`](crate::error::DocumentError) that stopped it.

use crate::error::DocumentError;
use crate::record::ValidatedRecord;
use crate::table::AggregateTable;
use serde::Serialize;

/// The outcome of one document, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    /// 0-indexed position in the run's processing order.
    pub index: usize,
    /// Path or URL the document came from.
    pub source: String,
    /// Validated records extracted from this document. Empty on failure, and
    /// legitimately empty when a report simply lists no exposures.
    pub records: Vec<ValidatedRecord>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Model-call retries that were needed (0 = first attempt worked).
    pub retries: u8,
    /// Set when the document failed; `records` is empty in that case.
    pub error: Option<DocumentError>,
}

impl DocumentResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub total_documents: usize,
    pub successful_documents: usize,
    pub failed_documents: usize,
    pub total_records: usize,
    /// Records carrying at least one non-informational field error.
    pub flawed_records: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub duration_ms: u64,
}

/// Everything a run produces: the cross-document table, the per-document
/// outcomes, and the stats.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub table: AggregateTable,
    pub documents: Vec<DocumentResult>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeded_reflects_error_presence() {
        let ok = DocumentResult {
            index: 0,
            source: "a.pdf".into(),
            records: vec![],
            input_tokens: 10,
            output_tokens: 5,
            duration_ms: 100,
            retries: 0,
            error: None,
        };
        assert!(ok.succeeded());

        let failed = DocumentResult {
            error: Some(DocumentError::EmptyDocument {
                doc: "a.pdf".into(),
            }),
            ..ok
        };
        assert!(!failed.succeeded());
    }
}
