//! Error types for the scan2ledger library.
//!
//! A single fatal enum covers every failure the library can surface.
//! Two failure modes deliberately do NOT appear here:
//!
//! * **Malformed optional record fields** — a missing or `null` amount or
//!   tax label in a service response is coerced to its documented default
//!   during normalization ([`crate::pipeline::normalize`]), never rejected.
//!
//! * **Skipped pages** — a page that fails to acquire a render surface is
//!   dropped with a `warn!` and the rest of the document continues.
//!
//! Cancellation is represented as [`Scan2LedgerError::Cancelled`] for
//! internal control flow only; the dispatcher converts it back into an `Ok`
//! report because a user-initiated stop is not an error.

use crate::ledger::{AccountId, EntryId};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2ledger library.
#[derive(Debug, Error)]
pub enum Scan2LedgerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The paged document could not be opened at all (truncated, encrypted,
    /// or not actually a PDF).
    #[error("cannot open document '{name}': {detail}")]
    CorruptDocument { name: String, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// A second invocation was started while one is already in flight.
    #[error("an extraction is already in progress; wait for it to finish or cancel it")]
    ExtractionInProgress,

    /// The invocation was stopped by the cancellation token.
    ///
    /// Internal only — the dispatcher maps this back to a `Cancelled` report.
    #[error("extraction cancelled")]
    Cancelled,

    /// The service call failed or returned an unusable payload.
    ///
    /// This is the single recoverable failure path of an invocation: network
    /// errors, timeouts, and responses that do not parse as a JSON array all
    /// land here. `detail` goes to the diagnostic log; the leading clause is
    /// what the user sees.
    #[error("extraction failed — unclear image or service error ({detail})")]
    ExtractionFailed { detail: String },

    /// No document-understanding backend could be resolved (missing API key
    /// etc.).
    #[error("document reader '{provider}' is not configured.\n{hint}")]
    ReaderNotConfigured { provider: String, hint: String },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// An operation referenced an account id that is not in the store.
    #[error("unknown account: {id}")]
    UnknownAccount { id: AccountId },

    /// An operation referenced an entry id that is not in the store.
    #[error("unknown entry: {id}")]
    UnknownEntry { id: EntryId },

    /// Account names must be non-empty.
    #[error("account name must not be empty")]
    InvalidAccountName,

    // ── Export errors ─────────────────────────────────────────────────────
    /// Could not create or write the CSV file. No partial file remains.
    #[error("failed to write export file '{path}': {source}")]
    ExportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
