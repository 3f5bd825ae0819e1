//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through each document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database
//! record, or a terminal progress bar without the library knowing anything
//! about how the host application communicates. The trait is `Send + Sync`
//! so it works correctly when documents are processed concurrently.

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each document.
///
/// Implementations must be `Send + Sync` (documents are processed
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
///
/// # Thread safety
///
/// `on_document_start`, `on_document_complete`, and `on_document_error` may
/// be called concurrently from different tasks. Implementations must guard
/// shared mutable state (e.g. `Mutex`, `AtomicUsize`).
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after input resolution, before any document is read.
    ///
    /// # Arguments
    /// * `total_docs` — number of documents that will be processed
    fn on_run_start(&self, total_docs: usize) {
        let _ = total_docs;
    }

    /// Called just before a document's text is sent to the model.
    ///
    /// # Arguments
    /// * `doc_num`    — 1-indexed document number
    /// * `total_docs` — total documents in the run
    fn on_document_start(&self, doc_num: usize, total_docs: usize) {
        let _ = (doc_num, total_docs);
    }

    /// Called when a document has been extracted and validated.
    ///
    /// # Arguments
    /// * `doc_num`      — 1-indexed document number
    /// * `total_docs`   — total documents
    /// * `record_count` — validated records produced from this document
    fn on_document_complete(&self, doc_num: usize, total_docs: usize, record_count: usize) {
        let _ = (doc_num, total_docs, record_count);
    }

    /// Called when a document fails after all retries are exhausted.
    ///
    /// # Arguments
    /// * `doc_num`    — 1-indexed document number
    /// * `total_docs` — total documents
    /// * `error`      — human-readable error description
    fn on_document_error(&self, doc_num: usize, total_docs: usize, error: &str) {
        let _ = (doc_num, total_docs, error);
    }

    /// Called once after all documents have been attempted.
    ///
    /// # Arguments
    /// * `total_docs`    — total documents in the run
    /// * `success_count` — documents that produced records without error
    fn on_run_complete(&self, total_docs: usize, success_count: usize) {
        let _ = (total_docs, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
