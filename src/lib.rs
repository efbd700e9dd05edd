//! # scan2ledger
//!
//! Turn scanned bank statements into double-entry bookkeeping records using
//! Vision Language Models (VLMs), and export them as accounting-software
//! ready CSV.
//!
//! ## Why this crate?
//!
//! Classic OCR on bank statements produces a stream of loose tokens that
//! still has to be segmented into transactions and mapped onto debit/credit
//! categories by hand. Instead this crate rasterises each page and lets a
//! VLM read it as a bookkeeper would, returning journal records under a
//! rigid JSON contract that is validated, coerced, and merged into a
//! per-account ledger with stable row numbering.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files (images / PDFs)
//!  │
//!  ├─ 1. Ingest    classify inputs, drop unsupported media
//!  ├─ 2. Render    rasterise PDF pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode    JPEG → base64 ImageData
//!  ├─ 4. Extract   one sequential VLM call per page image
//!  ├─ 5. Normalize coerce raw records, assign ledger numbering
//!  └─ 6. Export    per-account CSV, Shift_JIS with UTF-8-BOM fallback
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2ledger::{
//!     export_csv, CancellationToken, ExtractionConfig, ExtractionDispatcher,
//!     LedgerStore, SourceFile,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let dispatcher = ExtractionDispatcher::new(config);
//!
//!     let mut ledger = LedgerStore::new();
//!     let account = ledger.create_account("Checking")?;
//!
//!     let bytes = std::fs::read("statement.pdf")?;
//!     let files = vec![SourceFile::new("statement.pdf", "application/pdf", bytes)];
//!
//!     let cancel = CancellationToken::new();
//!     let report = dispatcher.run(files, account, &mut ledger, &cancel).await?;
//!     eprintln!("committed {} entries", report.entries_committed);
//!
//!     let export = export_csv(&ledger.entries_for_account(account), "Checking");
//!     std::fs::write(&export.file_name, &export.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2ledger` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! scan2ledger = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod ledger;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancellationToken;
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use dispatch::{ExtractionDispatcher, ExtractionReport, ExtractionStatus, InvocationState};
pub use error::Scan2LedgerError;
pub use export::{export_csv, write_export, CsvEncoding, CsvExport, CSV_HEADER};
pub use ledger::{
    Account, AccountId, EntryField, EntryId, JournalEntry, LedgerStore, DEFAULT_TAX_LABEL,
};
pub use pipeline::extract::{DocumentReader, LlmDocumentReader};
pub use pipeline::ingest::{PageImage, SourceFile};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
