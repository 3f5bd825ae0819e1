//! Error types for the fundsheet library.
//!
//! Three distinct error types reflect three distinct failure granularities:
//!
//! * [`FundsheetError`] — **Fatal**: the run cannot proceed at all (no input
//!   documents, provider not configured, output not writable). Returned as
//!   `Err(FundsheetError)` from the top-level `extract*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (unreadable
//!   PDF, transient API error, unparseable model payload) but all other
//!   documents are fine. Stored inside [`crate::output::DocumentResult`] so
//!   callers can inspect partial success rather than losing the whole batch
//!   to one bad report.
//!
//! * [`CoercionError`] — **Field-level**: one field of one record could not
//!   be coerced to its declared type. Captured as a [`FieldError`] on the
//!   [`crate::record::ValidatedRecord`]; the rest of the row is unaffected.
//!   A report with 87 of 88 good fields is still usable.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! document failure, log and continue, or collect everything for a post-run
//! report.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fundsheet library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum FundsheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path was not found.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the input.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid path or URL.
    #[error("Invalid input '{input}': not a file, directory, or HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// A directory was given but contains no processable documents.
    #[error("No PDF or Markdown documents found in '{path}'")]
    NoDocumentsFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every document failed after all retries; the run produced no rows.
    #[error("All {total} documents failed after {retries} retries each.\nFirst error: {first_error}")]
    AllDocumentsFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored alongside [`crate::output::DocumentResult`] when a document fails.
/// The overall run continues unless ALL documents fail.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DocumentError {
    /// Text could not be extracted from the source file.
    #[error("'{doc}': text extraction failed: {detail}")]
    TextExtractionFailed { doc: String, detail: String },

    /// The document produced no usable text to send to the model.
    #[error("'{doc}': document is empty after text extraction")]
    EmptyDocument { doc: String },

    /// LLM call failed after retries.
    #[error("'{doc}': LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        doc: String,
        retries: u8,
        detail: String,
    },

    /// The model replied, but the payload was not the expected JSON shape.
    #[error("'{doc}': unparseable model payload: {detail}")]
    BadPayload { doc: String, detail: String },
}

/// Why one field of one record could not be coerced to its declared type.
///
/// Every variant is non-fatal: the validator records the reason and stores
/// [`crate::record::TypedValue::Missing`] for the field, with one exception —
/// [`CoercionError::CurrencyUnknown`] is informational and the parsed amount
/// is kept (tagged `unknown`), because a value without a detectable currency
/// is still a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum CoercionError {
    /// A required field had no raw value.
    #[error("required field is missing")]
    MissingRequired,

    /// No numeric token could be isolated from the raw value.
    #[error("not a numeric value")]
    NotNumeric,

    /// No known date pattern matched the raw value.
    #[error("unparseable date")]
    UnparseableDate,

    /// Neither exact nor fuzzy matching found a domain value.
    #[error("no match in enum domain")]
    NoEnumMatch,

    /// The raw value is not a recognisable boolean.
    #[error("not a boolean value")]
    NotBoolean,

    /// The raw value has the wrong shape for the target type
    /// (e.g. a boolean where a date is declared).
    #[error("wrong value shape, expected {expected}")]
    WrongShape { expected: &'static str },

    /// No currency symbol or ISO code was detectable. Informational: the
    /// amount is stored with an explicit `unknown` tag, never a guessed
    /// default currency.
    #[error("no detectable currency, tagged unknown")]
    CurrencyUnknown,
}

impl CoercionError {
    /// Informational reasons annotate the record but keep the typed value.
    pub fn is_informational(&self) -> bool {
        matches!(self, CoercionError::CurrencyUnknown)
    }
}

/// One field-level failure attached to a [`crate::record::ValidatedRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Schema name of the field that failed.
    pub field: String,
    /// Why coercion (or lookup) failed.
    pub reason: CoercionError,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: CoercionError) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}
