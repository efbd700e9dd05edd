//! CLI binary for scan2ledger.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, renders progress, and writes the export.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2ledger::pipeline::input;
use scan2ledger::{
    export_csv, write_export, CancellationToken, ExtractionConfig, ExtractionDispatcher,
    ExtractionProgressCallback, ExtractionStatus, LedgerStore, ProgressCallback,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

// ── CLI arguments ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "scan2ledger",
    version,
    about = "Extract journal entries from scanned bank statements and export accounting CSV"
)]
struct Cli {
    /// Input files or URLs: raster images (png/jpg/webp/…) or multi-page PDFs
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Display name of the ledger account the entries belong to
    #[arg(short, long, default_value = "Imported")]
    account: String,

    /// Output CSV path (defaults to "<account>_journal_<date>.csv" in the
    /// current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// LLM provider name (openai, anthropic, gemini, …); auto-detected from
    /// API-key environment variables when omitted
    #[arg(long)]
    provider: Option<String>,

    /// Model identifier, e.g. gpt-4.1-nano
    #[arg(long, env = "SCAN2LEDGER_MODEL")]
    model: Option<String>,

    /// Page render scale factor
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality for rendered pages (1–100)
    #[arg(long, default_value_t = 80)]
    quality: u8,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// Custom extraction instruction replacing the built-in default
    #[arg(long)]
    instruction: Option<String>,

    /// Download timeout for URL inputs in seconds
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while inputs are prepared, then a
/// bar with one tick per processed image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_extract_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the full progress-bar style once we know the image count.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_prepare_start(&self, file_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Preparing {file_count} input file(s)…"))
        ));
    }

    fn on_page_render(&self, file_name: &str, page: usize, page_count: usize) {
        self.bar
            .set_message(format!("rendering {file_name} page {page}/{page_count}"));
    }

    fn on_extract_start(&self, total_images: usize) {
        self.activate_bar(total_images);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting from {total_images} image(s)…"))
        ));
    }

    fn on_image_start(&self, _index: usize, _total: usize, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, label: &str, records: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            label,
            dim(&format!("{records} entries")),
        ));
        self.bar.inc(1);
    }

    fn on_invocation_complete(&self, _images_processed: usize, _entries_committed: usize) {
        self.bar.finish_and_clear();
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let files = input::resolve_inputs(&cli.inputs, cli.download_timeout)
        .await
        .context("failed to resolve inputs")?;

    let progress = CliProgressCallback::new_dynamic();
    let mut builder = ExtractionConfig::builder()
        .render_scale(cli.scale)
        .jpeg_quality(cli.quality)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .progress_callback(Arc::clone(&progress) as ProgressCallback);
    if let Some(provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(instruction) = cli.instruction {
        builder = builder.instruction(instruction);
    }
    let config = builder.build()?;

    let mut ledger = LedgerStore::new();
    let account = ledger.create_account(&cli.account)?;

    let dispatcher = ExtractionDispatcher::new(config);
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n{} cancelling after the current image…", yellow("⚠"));
                cancel.cancel();
            }
        });
    }

    let report = match dispatcher.run(files, account, &mut ledger, &cancel).await {
        Ok(report) => report,
        Err(e) => {
            progress.finish();
            return Err(e).context("extraction aborted");
        }
    };

    match report.status {
        ExtractionStatus::Completed => eprintln!(
            "{} {} entries from {}/{} images  {}",
            green("✔"),
            bold(&report.entries_committed.to_string()),
            report.images_processed,
            report.images_total,
            dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
        ),
        ExtractionStatus::Cancelled => eprintln!(
            "{} cancelled — kept {} entries from {} completed image(s)",
            yellow("⚠"),
            report.entries_committed,
            report.images_processed,
        ),
    }

    let entries = ledger.entries_for_account(account);
    if entries.is_empty() {
        eprintln!("{}", dim("no entries extracted; nothing to export"));
        return Ok(());
    }

    let export = export_csv(&entries, &cli.account);
    let out_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&export.file_name));
    write_export(&export, &out_path).await?;

    eprintln!(
        "{} wrote {} {}",
        green("✔"),
        bold(&out_path.display().to_string()),
        dim(&format!(
            "({}, {} bytes)",
            export.encoding.label(),
            export.bytes.len()
        )),
    );
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "scan2ledger=info",
        1 => "scan2ledger=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
