//! Stage 2: model interaction and payload parsing.
//!
//! This module turns one document's text into raw key/value records. It is
//! intentionally thin: all prompt engineering lives in [`crate::prompts`] so
//! it can be changed without touching retry or error-handling logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s. A syntactically broken payload is retried the same
//! way — a second sample usually parses. Each call is also bounded by
//! `api_timeout_secs`; a timed-out call consumes a retry like any other
//! transient failure.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::prompts::{extraction_user_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::record::RawValue;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// One document's model call, after retries.
///
/// Never propagates the error upward so a single bad document doesn't abort
/// the entire run. Callers check `error` to decide whether to keep or skip
/// the document.
pub struct ExtractionCall {
    pub raw_records: Vec<HashMap<String, RawValue>>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<DocumentError>,
}

/// Extract raw records for one document.
///
/// The request contains a system message (the schema-derived extraction
/// prompt or a user-supplied override) and one user message wrapping the
/// document text.
pub async fn extract_records(
    provider: &Arc<dyn LLMProvider>,
    source: &str,
    document_text: &str,
    config: &ExtractionConfig,
) -> ExtractionCall {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(&EXTRACTION_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(extraction_user_prompt(document_text)),
    ];

    let options = build_options(config);

    let mut last_err: Option<DocumentError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                source, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = bounded(
            config.api_timeout_secs,
            provider.chat(&messages, Some(&options)),
        )
        .await;

        match call {
            None => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    source,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(DocumentError::LlmFailed {
                    doc: source.to_string(),
                    retries: config.max_retries as u8,
                    detail: format!("timed out after {}s", config.api_timeout_secs),
                });
            }
            Some(Ok(response)) => {
                match parse_records(&response.content, source) {
                    Ok(raw_records) => {
                        let duration = start.elapsed();
                        debug!(
                            "{}: {} records, {} input tokens, {} output tokens, {:?}",
                            source,
                            raw_records.len(),
                            response.prompt_tokens,
                            response.completion_tokens,
                            duration
                        );

                        return ExtractionCall {
                            raw_records,
                            input_tokens: response.prompt_tokens,
                            output_tokens: response.completion_tokens,
                            duration_ms: duration.as_millis() as u64,
                            retries: attempt as u8,
                            error: None,
                        };
                    }
                    Err(e) => {
                        warn!("{}: attempt {} returned a bad payload — {}", source, attempt + 1, e);
                        last_err = Some(e);
                    }
                }
            }
            Some(Err(e)) => {
                warn!("{}: attempt {} failed — {}", source, attempt + 1, e);
                last_err = Some(DocumentError::LlmFailed {
                    doc: source.to_string(),
                    retries: config.max_retries as u8,
                    detail: e.to_string(),
                });
            }
        }
    }

    ExtractionCall {
        raw_records: Vec::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: config.max_retries as u8,
        error: Some(last_err.unwrap_or_else(|| DocumentError::LlmFailed {
            doc: source.to_string(),
            retries: config.max_retries as u8,
            detail: "Unknown error".to_string(),
        })),
    }
}

/// Bound one model call by the configured API timeout.
///
/// `None` means the call did not finish in time; the caller treats it like
/// any other transient failure and retries.
async fn bounded<T>(secs: u64, fut: impl Future<Output = T>) -> Option<T> {
    timeout(Duration::from_secs(secs), fut).await.ok()
}

fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Parse the model's reply into flat raw records.
///
/// Accepts the three shapes models actually produce: a JSON array, a
/// `{"items": [...]}` wrapper, and a single bare object. Markdown code
/// fences around the payload are stripped first.
pub fn parse_records(
    content: &str,
    source: &str,
) -> Result<Vec<HashMap<String, RawValue>>, DocumentError> {
    let body = strip_code_fences(content);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| DocumentError::BadPayload {
            doc: source.to_string(),
            detail: format!("invalid JSON: {e}"),
        })?;

    let items: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("items") {
            Some(serde_json::Value::Array(items)) => items,
            Some(other) => {
                return Err(DocumentError::BadPayload {
                    doc: source.to_string(),
                    detail: format!("\"items\" is not an array (got {})", type_name(&other)),
                })
            }
            // A single bare record.
            None => vec![serde_json::Value::Object(map)],
        },
        other => {
            return Err(DocumentError::BadPayload {
                doc: source.to_string(),
                detail: format!("expected array or object, got {}", type_name(&other)),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            serde_json::Value::Object(map) => Ok(flatten_record(map)),
            other => Err(DocumentError::BadPayload {
                doc: source.to_string(),
                detail: format!("record {i} is not an object (got {})", type_name(&other)),
            }),
        })
        .collect()
}

/// Flatten one record object, merging nested `asset_snapshots` entries.
///
/// The wire contract asks for flat objects, but models following older
/// report layouts sometimes nest per-asset metrics under `asset_snapshots`.
/// The first snapshot overlays the top level; a snapshot value wins whenever
/// it is non-null.
pub fn flatten_record(mut map: serde_json::Map<String, serde_json::Value>) -> HashMap<String, RawValue> {
    let snapshot = match map.remove("asset_snapshots") {
        Some(serde_json::Value::Array(mut items)) if !items.is_empty() => {
            match items.swap_remove(0) {
                serde_json::Value::Object(snap) => Some(snap),
                _ => None,
            }
        }
        _ => None,
    };

    let mut out: HashMap<String, RawValue> = map
        .iter()
        .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
        .collect();

    if let Some(snap) = snapshot {
        for (k, v) in &snap {
            let raw = RawValue::from_json(v);
            if !raw.is_absent() || !out.contains_key(k) {
                out.insert(k.clone(), raw);
            }
        }
    }

    out
}

/// Strip a leading/trailing markdown code fence, with or without a language
/// tag.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line ("json", "JSON", or empty).
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
