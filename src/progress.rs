//! Progress-callback trait for extraction invocation events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! real-time events while an invocation runs: rasterization updates during
//! preparation, then one event per processed image.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, a status line, or a terminal
//! progress bar — without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` because rasterization
//! events are emitted from a blocking worker thread.

use std::sync::Arc;

/// Called by the dispatcher as an invocation advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Processing is strictly sequential, so per-image
/// events arrive in order; rasterization events for one document arrive in
/// page order from a `spawn_blocking` thread.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once when preparation begins, before any file is touched.
    ///
    /// # Arguments
    /// * `file_count` — number of accepted source files in this invocation
    fn on_prepare_start(&self, file_count: usize) {
        let _ = file_count;
    }

    /// Called before each page of a paged document is rendered.
    ///
    /// # Arguments
    /// * `file_name` — the source document's display name
    /// * `page`      — 1-indexed page about to be rendered
    /// * `page_count` — total pages in the document
    fn on_page_render(&self, file_name: &str, page: usize, page_count: usize) {
        let _ = (file_name, page, page_count);
    }

    /// Called once when preparation is done and extraction begins.
    ///
    /// # Arguments
    /// * `total_images` — number of flat images that will be processed
    fn on_extract_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before the service request is sent for an image.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the flat image list
    /// * `total` — flat image count
    /// * `label` — the image's display label (file name, or `"name (P.n)"`)
    fn on_image_start(&self, index: usize, total: usize, label: &str) {
        let _ = (index, total, label);
    }

    /// Called when an image's records have been committed to the ledger.
    ///
    /// # Arguments
    /// * `records` — number of entries extracted from this image
    fn on_image_complete(&self, index: usize, total: usize, label: &str, records: usize) {
        let _ = (index, total, label, records);
    }

    /// Called once when the invocation ends, whatever the outcome.
    ///
    /// # Arguments
    /// * `images_processed` — images fully processed and committed
    /// * `entries_committed` — total entries appended by this invocation
    fn on_invocation_complete(&self, images_processed: usize, entries_committed: usize) {
        let _ = (images_processed, entries_committed);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        renders: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        committed: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_page_render(&self, _file: &str, _page: usize, _count: usize) {
            self.renders.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_start(&self, _index: usize, _total: usize, _label: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _index: usize, _total: usize, _label: &str, records: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.committed.fetch_add(records, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_prepare_start(2);
        cb.on_page_render("statement.pdf", 1, 3);
        cb.on_extract_start(4);
        cb.on_image_start(1, 4, "statement.pdf (P.1)");
        cb.on_image_complete(1, 4, "statement.pdf (P.1)", 12);
        cb.on_invocation_complete(4, 30);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            renders: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            committed: AtomicUsize::new(0),
        };

        tracker.on_page_render("a.pdf", 1, 2);
        tracker.on_page_render("a.pdf", 2, 2);
        tracker.on_image_start(1, 2, "a.pdf (P.1)");
        tracker.on_image_complete(1, 2, "a.pdf (P.1)", 5);
        tracker.on_image_start(2, 2, "a.pdf (P.2)");
        tracker.on_image_complete(2, 2, "a.pdf (P.2)", 3);

        assert_eq!(tracker.renders.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.committed.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_extract_start(10);
        cb.on_image_start(1, 10, "scan.png");
    }
}
