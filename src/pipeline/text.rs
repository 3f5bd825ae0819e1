//! Stage 1: document to plain text.
//!
//! PDFs go through `pdf_extract`; Markdown and plain-text files are read
//! as-is so pre-converted reports can re-enter the pipeline without another
//! PDF pass. Extraction failures are per-document ([`DocumentError`]), never
//! fatal to the run.

use crate::error::DocumentError;
use std::path::Path;
use tracing::debug;

/// Extract the text of one document.
///
/// An empty (or whitespace-only) result is an error: sending an empty
/// prompt to the model would only fabricate records.
pub async fn document_text(path: &Path) -> Result<String, DocumentError> {
    let doc = path.display().to_string();

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        pdf_text(path).await?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DocumentError::TextExtractionFailed {
                doc: doc.clone(),
                detail: e.to_string(),
            })?
    };

    if text.trim().is_empty() {
        return Err(DocumentError::EmptyDocument { doc });
    }

    debug!(doc, bytes = text.len(), "extracted document text");
    Ok(text)
}

/// `pdf_extract` is synchronous and CPU-bound; run it off the async runtime.
async fn pdf_text(path: &Path) -> Result<String, DocumentError> {
    let doc = path.display().to_string();
    let owned = path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned)).await;

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(DocumentError::TextExtractionFailed {
            doc,
            detail: e.to_string(),
        }),
        Err(join_err) => Err(DocumentError::TextExtractionFailed {
            doc,
            detail: format!("extraction task panicked: {join_err}"),
        }),
    }
}
