//! The extraction dispatcher: one end-to-end invocation over a file set.
//!
//! ## Invocation state machine
//!
//! ```text
//! Idle → Preparing → Extracting(i/N) → { Completed | Cancelled | Failed }
//! ```
//!
//! Images are processed strictly sequentially — no fan-out. That bounds the
//! load we put on the external service and keeps progress reporting
//! deterministic: event *i* always refers to image *i*.
//!
//! ## Commit granularity
//!
//! Entries are committed to the ledger per successfully completed image.
//! Cancellation or failure at image *i* keeps everything committed for
//! images before *i* and discards the rest. Earlier invocations are never
//! touched.
//!
//! ## Reentrancy
//!
//! The dispatcher refuses to start a second invocation while one is in
//! flight (`ExtractionInProgress`) instead of relying on the caller to
//! disable its trigger. Queueing was rejected: a queued invocation would
//! number its entries against a max that the running one is still moving.

use crate::cancel::CancellationToken;
use crate::config::ExtractionConfig;
use crate::error::Scan2LedgerError;
use crate::ledger::{AccountId, JournalEntry, LedgerStore};
use crate::pipeline::extract::{self, DocumentReader, LlmDocumentReader};
use crate::pipeline::ingest::{self, PageImage, SourceFile};
use crate::pipeline::normalize::{self, RawRecord};
use edgequake_llm::ProviderFactory;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Model used when the caller names a provider but no model.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Where an invocation currently is, observable from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Preparing,
    Extracting { current: usize, total: usize },
    Completed,
    Cancelled,
    Failed,
}

/// How a non-failed invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    Completed,
    Cancelled,
}

/// Summary of one invocation. Failure has no report — it surfaces as an
/// error; whatever was committed before the failing image stays in the
/// ledger either way.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub status: ExtractionStatus,
    /// Flat images produced by preparation.
    pub images_total: usize,
    /// Images fully processed and committed.
    pub images_processed: usize,
    /// Entries appended to the ledger by this invocation.
    pub entries_committed: usize,
    pub duration_ms: u64,
}

/// Runs extraction invocations against an injected ledger.
///
/// The dispatcher owns no ledger state; the store is borrowed per call so
/// all mutation stays on the caller's single control flow.
pub struct ExtractionDispatcher {
    config: ExtractionConfig,
    in_flight: AtomicBool,
    state: Mutex<InvocationState>,
}

impl ExtractionDispatcher {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(InvocationState::Idle),
        }
    }

    /// Current invocation state. Terminal states persist until the next run.
    pub fn state(&self) -> InvocationState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, state: InvocationState) {
        match self.state.lock() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    /// Run one invocation: prepare the flat image list, extract each image,
    /// commit per completed image.
    ///
    /// # Returns
    /// `Ok(report)` for completed and cancelled invocations — cancellation
    /// is user-initiated, not an error.
    ///
    /// # Errors
    /// * [`Scan2LedgerError::ExtractionInProgress`] — another run is active
    /// * [`Scan2LedgerError::UnknownAccount`] — target account not in store
    /// * [`Scan2LedgerError::ExtractionFailed`] — service error, timeout, or
    ///   unparseable payload; the remainder of the invocation is discarded
    pub async fn run(
        &self,
        files: Vec<SourceFile>,
        account_id: AccountId,
        ledger: &mut LedgerStore,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport, Scan2LedgerError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Scan2LedgerError::ExtractionInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);
        self.run_guarded(files, account_id, ledger, cancel).await
    }

    async fn run_guarded(
        &self,
        files: Vec<SourceFile>,
        account_id: AccountId,
        ledger: &mut LedgerStore,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport, Scan2LedgerError> {
        let start = Instant::now();

        if ledger.account(account_id).is_none() {
            self.set_state(InvocationState::Failed);
            return Err(Scan2LedgerError::UnknownAccount { id: account_id });
        }

        let reader = match resolve_reader(&self.config) {
            Ok(reader) => reader,
            Err(e) => {
                self.set_state(InvocationState::Failed);
                return Err(e);
            }
        };

        let cb = self.config.progress_callback.clone();

        // ── Preparing ────────────────────────────────────────────────────
        self.set_state(InvocationState::Preparing);
        info!("invocation started: {} source files", files.len());
        if let Some(ref cb) = cb {
            cb.on_prepare_start(files.len());
        }

        let images = match ingest::flatten_sources(files, &self.config, cancel).await {
            Ok(images) => images,
            Err(Scan2LedgerError::Cancelled) => {
                self.set_state(InvocationState::Cancelled);
                if let Some(ref cb) = cb {
                    cb.on_invocation_complete(0, 0);
                }
                info!("invocation cancelled during preparation");
                return Ok(report(ExtractionStatus::Cancelled, 0, 0, 0, start));
            }
            Err(e) => {
                self.set_state(InvocationState::Failed);
                if let Some(ref cb) = cb {
                    cb.on_invocation_complete(0, 0);
                }
                warn!("preparation failed: {}", e);
                return Err(e);
            }
        };

        // ── Extracting ───────────────────────────────────────────────────
        let total = images.len();
        if let Some(ref cb) = cb {
            cb.on_extract_start(total);
        }

        let mut next_no = ledger.max_no(account_id) + 1;
        let mut processed = 0usize;
        let mut committed = 0usize;

        for (i, image) in images.iter().enumerate() {
            if cancel.is_cancelled() {
                self.set_state(InvocationState::Cancelled);
                if let Some(ref cb) = cb {
                    cb.on_invocation_complete(processed, committed);
                }
                info!("invocation cancelled after {}/{} images", processed, total);
                return Ok(report(
                    ExtractionStatus::Cancelled,
                    total,
                    processed,
                    committed,
                    start,
                ));
            }

            self.set_state(InvocationState::Extracting {
                current: i + 1,
                total,
            });
            if let Some(ref cb) = cb {
                cb.on_image_start(i + 1, total, &image.label);
            }

            let raws = match self.extract_one(reader.as_ref(), image).await {
                Ok(raws) => raws,
                Err(e) => {
                    self.set_state(InvocationState::Failed);
                    if let Some(ref cb) = cb {
                        cb.on_invocation_complete(processed, committed);
                    }
                    warn!(
                        "invocation failed at image {}/{} ('{}'): {}",
                        i + 1,
                        total,
                        image.label,
                        e
                    );
                    return Err(e);
                }
            };

            let count = raws.len();
            let entries: Vec<JournalEntry> = raws
                .into_iter()
                .map(|raw| {
                    let entry = normalize::normalize_record(raw, account_id, next_no);
                    next_no += 1;
                    entry
                })
                .collect();

            if let Err(e) = ledger.append(account_id, entries) {
                self.set_state(InvocationState::Failed);
                if let Some(ref cb) = cb {
                    cb.on_invocation_complete(processed, committed);
                }
                return Err(e);
            }

            processed += 1;
            committed += count;
            if let Some(ref cb) = cb {
                cb.on_image_complete(i + 1, total, &image.label, count);
            }
        }

        // ── Completed ────────────────────────────────────────────────────
        self.set_state(InvocationState::Completed);
        if let Some(ref cb) = cb {
            cb.on_invocation_complete(processed, committed);
        }
        info!(
            "invocation complete: {} entries from {}/{} images in {}ms",
            committed,
            processed,
            total,
            start.elapsed().as_millis()
        );
        Ok(report(
            ExtractionStatus::Completed,
            total,
            processed,
            committed,
            start,
        ))
    }

    /// One request, one timeout, one parse. Everything that can go wrong
    /// here folds into the single generic failure path.
    async fn extract_one(
        &self,
        reader: &dyn DocumentReader,
        image: &PageImage,
    ) -> Result<Vec<RawRecord>, Scan2LedgerError> {
        let limit = Duration::from_secs(self.config.api_timeout_secs);
        let text = match tokio::time::timeout(limit, reader.read_page(image)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Scan2LedgerError::ExtractionFailed {
                    detail: format!(
                        "'{}': no response within {}s",
                        image.label, self.config.api_timeout_secs
                    ),
                })
            }
        };
        extract::parse_records(&text)
    }
}

fn report(
    status: ExtractionStatus,
    images_total: usize,
    images_processed: usize,
    entries_committed: usize,
    start: Instant,
) -> ExtractionReport {
    ExtractionReport {
        status,
        images_total,
        images_processed,
        entries_committed,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Clears the in-flight flag when the invocation future resolves or is
/// dropped mid-run.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Reader resolution ────────────────────────────────────────────────────

fn create_reader(
    provider_name: &str,
    model: &str,
    config: &ExtractionConfig,
) -> Result<Arc<dyn DocumentReader>, Scan2LedgerError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Scan2LedgerError::ReaderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(LlmDocumentReader::new(provider, config)))
}

/// Resolve the document reader, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Pre-built reader** (`config.reader`) — the caller constructed the
///    capability entirely; used as-is. This is the seam tests and custom
///    middleware hook into.
///
/// 2. **Pre-built provider** (`config.provider`) — the caller configured an
///    LLM provider; we wrap it with the standard request layout.
///
/// 3. **Named provider + model** (`config.provider_name`) — the factory
///    reads the corresponding API key (`OPENAI_API_KEY`, etc.) from the
///    environment.
///
/// 4. **Environment pair** (`SCAN2LEDGER_LLM_PROVIDER` +
///    `SCAN2LEDGER_MODEL`) — both set means the execution environment chose;
///    checked before full auto-detection so the model choice is honoured
///    even when multiple API keys are present.
///
/// 5. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider, preferring OpenAI when its key is present.
fn resolve_reader(
    config: &ExtractionConfig,
) -> Result<Arc<dyn DocumentReader>, Scan2LedgerError> {
    if let Some(ref reader) = config.reader {
        return Ok(Arc::clone(reader));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(LlmDocumentReader::new(
            Arc::clone(provider),
            config,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_reader(name, model, config);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("SCAN2LEDGER_LLM_PROVIDER"),
        std::env::var("SCAN2LEDGER_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_reader(&prov, &model, config);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_reader("openai", model, config);
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Scan2LedgerError::ReaderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(LlmDocumentReader::new(provider, config)))
}
