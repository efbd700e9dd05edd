//! Document rasterisation: render every page to JPEG bytes via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Why a fixed 2.0× scale?
//!
//! Statements render small: at native viewport size the service misreads
//! digits in dense tables. Rendering at twice the page's viewport measurably
//! improves recognition; the JPEG quality cap keeps the larger surface from
//! blowing up the request payload.

use crate::error::Scan2LedgerError;
use crate::pipeline::encode;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Rasterise every page of a paged document into JPEG bytes.
///
/// This runs inside `spawn_blocking` since pdfium operations are CPU-bound.
/// A page that fails to acquire a render surface is skipped with a warning
/// and the rest of the document continues; a document that cannot be opened
/// at all is a fatal error.
///
/// # Returns
/// A vector of `(page_index_0based, jpeg_bytes)` tuples in page order.
pub async fn render_pages(
    name: &str,
    bytes: Vec<u8>,
    scale: f32,
    jpeg_quality: u8,
    progress: Option<ProgressCallback>,
) -> Result<Vec<(usize, Vec<u8>)>, Scan2LedgerError> {
    let name = name.to_string();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&name, &bytes, scale, jpeg_quality, progress)
    })
    .await
    .map_err(|e| Scan2LedgerError::Internal(format!("render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    name: &str,
    bytes: &[u8],
    scale: f32,
    jpeg_quality: u8,
    progress: Option<ProgressCallback>,
) -> Result<Vec<(usize, Vec<u8>)>, Scan2LedgerError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| Scan2LedgerError::CorruptDocument {
                name: name.to_string(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("document '{}' loaded: {} pages", name, page_count);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

    let mut results = Vec::with_capacity(page_count);

    for idx in 0..page_count {
        if let Some(ref cb) = progress {
            cb.on_page_render(name, idx + 1, page_count);
        }

        let page = match pages.get(idx as u16) {
            Ok(p) => p,
            Err(e) => {
                warn!("'{}' page {}: not retrievable, skipped: {:?}", name, idx + 1, e);
                continue;
            }
        };

        let bitmap = match page.render_with_config(&render_config) {
            Ok(b) => b,
            Err(e) => {
                warn!("'{}' page {}: no render surface, skipped: {:?}", name, idx + 1, e);
                continue;
            }
        };

        let image = bitmap.as_image();
        debug!(
            "rendered '{}' page {} → {}x{} px",
            name,
            idx + 1,
            image.width(),
            image.height()
        );

        match encode::encode_jpeg(&image, jpeg_quality) {
            Ok(jpeg) => results.push((idx, jpeg)),
            Err(e) => {
                warn!("'{}' page {}: JPEG encoding failed, skipped: {}", name, idx + 1, e);
            }
        }
    }

    Ok(results)
}
