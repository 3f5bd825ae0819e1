//! Pipeline stages for report-to-spreadsheet extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the text-extraction backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──────▶ text ─────▶ llm ─────▶ (validate) ─────▶ export
//! (URL/path/dir) (pdf-extract) (extraction)  (schema)      (CSV)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path, directory, or URL to
//!    local document paths
//! 2. [`text`]   — extract plain text; runs in `spawn_blocking` because
//!    `pdf_extract` is not async-safe
//! 3. [`llm`]    — drive the extraction call with retry/backoff and parse the
//!    JSON payload; the only stage with model I/O
//! 4. validation and aggregation live in [`crate::validate`] and
//!    [`crate::table`] — pure rules with no I/O
//! 5. [`export`] — render the aggregate table to CSV

pub mod export;
pub mod input;
pub mod llm;
pub mod text;
