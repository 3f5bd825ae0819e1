//! CLI binary for fundsheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use fundsheet::{
    extract, extract_to_csv, pipeline::export, ExtractionConfig, ExtractionProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-document
/// log lines using [indicatif]. Works correctly when documents complete
/// out-of-order (concurrent mode).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-document wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of documents that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_run_start` (called once the input has been resolved).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} reports  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_docs: usize) {
        self.activate_bar(total_docs);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting extraction of {total_docs} reports…"))
        ));
    }

    fn on_document_start(&self, doc_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(doc_num, Instant::now());
        self.bar.set_message(format!("report {doc_num}"));
    }

    fn on_document_complete(&self, doc_num: usize, total: usize, record_count: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&doc_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Report {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            doc_num,
            total,
            dim(&format!("{record_count:>3} records")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, doc_num: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&doc_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Report {:>3}/{:<3}  {}  {}",
            red("✗"),
            doc_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_docs: usize, success_count: usize) {
        let failed = total_docs.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} reports extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} reports extracted  ({} failed)",
                if failed == total_docs {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_docs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one report, CSV to stdout
  fundsheet report-q2-2025.pdf

  # Extract a whole directory of reports into one spreadsheet
  fundsheet reports/ -o exposures.csv

  # Use a specific model
  fundsheet --model gpt-4.1 --provider openai reports/

  # Extract from a URL
  fundsheet https://example.com/q2-report.pdf -o q2.csv

  # Full structured output (records, per-document stats, field errors)
  fundsheet --json reports/ > run.json

  # Custom extraction prompt
  fundsheet --system-prompt prompt.txt reports/ -o exposures.csv

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI API key
  ANTHROPIC_API_KEY        Anthropic API key
  GEMINI_API_KEY           Google Gemini API key
  FUNDSHEET_LLM_PROVIDER   Override provider (openai, anthropic, gemini, ollama)
  FUNDSHEET_MODEL          Override model ID

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Extract:         fundsheet reports/ -o exposures.csv
"#;

/// Extract fund exposures from quarterly reports into one spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "fundsheet",
    version,
    about = "Extract fund-of-funds exposures from quarterly reports into a typed spreadsheet",
    long_about = "Extract underlying-fund and asset exposures from quarterly investor reports \
(local PDFs, directories, or URLs) into one schema-validated CSV. Supports OpenAI, Anthropic, \
Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Report file, directory of reports, or HTTP/HTTPS URL.
    input: String,

    /// Write the CSV to this file instead of stdout.
    #[arg(short, long, env = "FUNDSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(
        long,
        env = "FUNDSHEET_MODEL",
        long_help = "Extraction model to use. Default: gpt-4.1-mini.\n\
          Smaller models are cheaper but miss more fields on dense reports."
    )]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "FUNDSHEET_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Number of concurrent model calls.
    #[arg(short, long, env = "FUNDSHEET_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "FUNDSHEET_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per document.
    #[arg(long, env = "FUNDSHEET_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "FUNDSHEET_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per document on LLM failure.
    #[arg(long, env = "FUNDSHEET_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output structured JSON (RunOutput) instead of CSV.
    #[arg(long, env = "FUNDSHEET_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FUNDSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FUNDSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FUNDSHEET_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FUNDSHEET_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-document LLM call timeout in seconds.
    #[arg(long, env = "FUNDSHEET_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar starts as a spinner (no document count yet);
    // `on_run_start` resizes it once the input has been resolved.
    let progress_cb = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let output = extract_to_csv(&cli.input, output_path, &config)
            .await
            .context("Extraction failed")?;

        // Summary line (callback already printed the per-document log).
        if !cli.quiet {
            eprintln!(
                "{}  {} records from {}/{} reports  {}ms  →  {}",
                if output.stats.failed_documents == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.total_records,
                output.stats.successful_documents,
                output.stats.total_documents,
                output.stats.duration_ms,
                bold(&output_path.display().to_string()),
            );
            if output.stats.flawed_records > 0 {
                eprintln!(
                    "   {} records carry field errors — inspect with --json",
                    output.stats.flawed_records
                );
            }
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
            );
        }
    } else {
        let output = extract(&cli.input, &config)
            .await
            .context("Extraction failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let csv = export::to_csv_string(&output.table).context("Failed to render CSV")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(csv.as_bytes())
                .context("Failed to write to stdout")?;
        }

        // Summary (the callback already printed the final green/red tick).
        if !cli.quiet && !show_progress && !cli.json {
            eprintln!(
                "Extracted {} records from {}/{} reports in {}ms",
                output.stats.total_records,
                output.stats.successful_documents,
                output.stats.total_documents,
                output.stats.duration_ms
            );
            if output.stats.failed_documents > 0 {
                eprintln!("  {} reports failed", output.stats.failed_documents);
            }
        } else if !cli.quiet && !cli.json {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
                output.stats.duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(
    cli: &Cli,
    progress: Option<Arc<dyn ExtractionProgressCallback>>,
) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields that need special handling
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.system_prompt = system_prompt;

    Ok(config)
}
