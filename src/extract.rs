//! Run orchestration: the full report-to-spreadsheet pass.
//!
//! This module wires the pipeline stages together: resolve input, extract
//! each document's text, call the model, validate every record against the
//! schema, and aggregate into one table. Documents are processed
//! concurrently; per-document failures are collected, never fatal.

use crate::config::ExtractionConfig;
use crate::error::FundsheetError;
use crate::output::{DocumentResult, RunOutput, RunStats};
use crate::pipeline::{export, input, llm, text};
use crate::schema::schema;
use crate::table::TableBuilder;
use crate::validate::validate;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Extract fund exposures from a file, directory, or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file, directory of reports, or HTTP/HTTPS URL
/// * `config` — Extraction configuration
///
/// # Returns
/// `Ok(RunOutput)` on success, even if some documents failed
/// (check `output.stats.failed_documents`).
///
/// # Errors
/// Returns `Err(FundsheetError)` only for fatal errors:
/// - Input not found / permission denied / empty directory
/// - No LLM provider configured
/// - Every document failed and no rows were produced
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<RunOutput, FundsheetError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let documents: Vec<_> = resolved
        .documents()
        .into_iter()
        .map(Path::to_path_buf)
        .collect();
    debug!("Resolved {} documents", documents.len());

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(documents.len());
    }

    // ── Step 3: Process documents concurrently ──────────────────────────
    let total_docs = documents.len();
    let mut results: Vec<DocumentResult> =
        stream::iter(documents.into_iter().enumerate().map(|(index, path)| {
            let provider = Arc::clone(&provider);
            let config_clone = config.clone();
            async move {
                let doc_num = index + 1;
                if let Some(ref cb) = config_clone.progress_callback {
                    cb.on_document_start(doc_num, total_docs);
                }
                let result = process_document(&provider, index, &path, &config_clone).await;
                if let Some(ref cb) = config_clone.progress_callback {
                    match &result.error {
                        None => cb.on_document_complete(doc_num, total_docs, result.records.len()),
                        Some(e) => cb.on_document_error(doc_num, total_docs, &e.to_string()),
                    }
                }
                result
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    // Sort by document index for consistent output
    results.sort_by_key(|r| r.index);

    // ── Step 4: Aggregate into one table ─────────────────────────────────
    let mut builder = TableBuilder::new(schema());
    for result in &results {
        for record in &result.records {
            builder.add(record.clone());
        }
    }
    let table = builder.finalize();

    // ── Step 5: Compute stats ────────────────────────────────────────────
    let successful = results.iter().filter(|r| r.succeeded()).count();
    let failed = results.len() - successful;

    if successful == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());

        return Err(FundsheetError::AllDocumentsFailed {
            total: results.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    let stats = RunStats {
        total_documents: results.len(),
        successful_documents: successful,
        failed_documents: failed,
        total_records: table.len(),
        flawed_records: table.flawed_records(),
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
        duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete: {}/{} documents, {} records, {}ms total",
        successful, stats.total_documents, stats.total_records, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.total_documents, successful);
    }

    Ok(RunOutput {
        table,
        documents: results,
        stats,
    })
}

/// Extract and write the spreadsheet directly to a CSV file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_csv(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunOutput, FundsheetError> {
    let output = extract(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FundsheetError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    export::write_csv(&output.table, path).await?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<RunOutput, FundsheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FundsheetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// One document, end to end: text, model call, validation.
///
/// Always returns a `DocumentResult` — failures stay attached to the
/// document so one bad report doesn't abort the run.
async fn process_document(
    provider: &Arc<dyn LLMProvider>,
    index: usize,
    path: &Path,
    config: &ExtractionConfig,
) -> DocumentResult {
    let source = path.display().to_string();
    let start = Instant::now();

    let document_text = match text::document_text(path).await {
        Ok(t) => t,
        Err(e) => {
            return DocumentResult {
                index,
                source,
                records: Vec::new(),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                retries: 0,
                error: Some(e),
            }
        }
    };

    let call = llm::extract_records(provider, &source, &document_text, config).await;

    let records = call
        .raw_records
        .iter()
        .map(|raw| validate(raw, schema(), &source))
        .collect();

    DocumentResult {
        index,
        source,
        records,
        input_tokens: call.input_tokens,
        output_tokens: call.output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: call.retries,
        error: call.error,
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, FundsheetError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FundsheetError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; we use it as-is. Useful in tests or
///    when the caller needs custom middleware (caching, rate-limiting).
///
/// 2. **Named provider + model** (`config.provider_name`) — the caller named
///    a provider (e.g. `"openai"`) and optional model. We call
///    [`ProviderFactory::create_llm_provider`] which reads the corresponding
///    API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`FUNDSHEET_LLM_PROVIDER` + `FUNDSHEET_MODEL`) —
///    both env vars set means the caller chose a provider and model at the
///    execution environment level (Makefile, shell script, CI). Checked
///    before full auto-detection so the model choice is honoured even when
///    multiple API keys are present.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider. OpenAI is preferred when its key is present so users with
///    several keys get a predictable default.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, FundsheetError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("FUNDSHEET_LLM_PROVIDER"),
        std::env::var("FUNDSHEET_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| FundsheetError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
