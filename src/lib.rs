//! # fundsheet
//!
//! Turn fund-of-funds quarterly reports (PDFs) into one typed, validated
//! spreadsheet using LLM extraction.
//!
//! ## Why this crate?
//!
//! Quarterly investor reports have no standard layout: every manager
//! arranges commitments, NAVs, and per-asset metrics differently. An LLM is
//! good at finding those values but sloppy about their form — `"$350K"`,
//! `"Q2 2025"`, `"buyout"`. This crate pairs the model with a fixed 88-field
//! schema and a set of deterministic coercers, so whatever the model emits
//! is normalised, validated, and aggregated into rows a spreadsheet (or a
//! database) can trust.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reports (PDF/MD/TXT)
//!  │
//!  ├─ 1. Input     resolve file, directory, or URL
//!  ├─ 2. Text      extract plain text (pdf-extract, spawn_blocking)
//!  ├─ 3. Extract   concurrent LLM calls, JSON-array payloads
//!  ├─ 4. Validate  coerce every field against the schema; collect errors
//!  └─ 5. Export    one aggregate table, rendered to CSV
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fundsheet::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("reports/", &config).await?;
//!     eprintln!("{} records from {} documents ({} flawed)",
//!         output.stats.total_records,
//!         output.stats.successful_documents,
//!         output.stats.flawed_records);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fundsheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! fundsheet = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod coerce;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;
pub mod table;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{CoercionError, DocumentError, FieldError, FundsheetError};
pub use extract::{extract, extract_sync, extract_to_csv};
pub use output::{DocumentResult, RunOutput, RunStats};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback};
pub use record::{CurrencyTag, RawValue, TypedValue, ValidatedRecord, MISSING_MARKER};
pub use schema::{schema, Category, FieldSpec, SemanticType};
pub use table::{AggregateTable, Column, TableBuilder};
