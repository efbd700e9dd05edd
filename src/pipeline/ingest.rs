//! File ingestion: classify mixed inputs and flatten them into one ordered
//! image list.
//!
//! The upstream surface (file picker, CLI argument list) is expected to
//! pre-filter, but the ingestor tolerates anything: only `image/*` and the
//! paged-document type enter the pipeline, everything else is dropped with a
//! debug log and no error. Raster images pass through byte-identical; paged
//! documents are handed to the rasterizer and contribute one image per page.

use crate::cancel::CancellationToken;
use crate::config::ExtractionConfig;
use crate::error::Scan2LedgerError;
use crate::pipeline::render;
use tracing::debug;

/// Media type accepted as a paged document.
pub const PAGED_MEDIA_TYPE: &str = "application/pdf";

/// Media type of rasterised document pages.
const PAGE_MEDIA_TYPE: &str = "image/jpeg";

/// One user-supplied input: declared media type plus raw bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display name, usually the file name.
    pub name: String,
    /// Declared media type, e.g. `image/png` or `application/pdf`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// One flat pipeline image: a raster image ready for the service request.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Display label: the file name, or `"<file name> (P.<n>)"` for a page.
    pub label: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

enum SourceKind {
    Raster,
    Paged,
}

fn classify(media_type: &str) -> Option<SourceKind> {
    if media_type == PAGED_MEDIA_TYPE {
        Some(SourceKind::Paged)
    } else if media_type.starts_with("image/") {
        Some(SourceKind::Raster)
    } else {
        None
    }
}

/// Display label for page `page_index` (0-based) of a paged document.
pub fn page_label(name: &str, page_index: usize) -> String {
    format!("{} (P.{})", name, page_index + 1)
}

/// Flatten accepted source files into one ordered image list.
///
/// Files are processed in input order; pages within a document are emitted
/// in document order. The cancellation token is checked before each file —
/// a set flag surfaces as [`Scan2LedgerError::Cancelled`], which the
/// dispatcher maps back to a non-error cancelled report.
pub async fn flatten_sources(
    files: Vec<SourceFile>,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<Vec<PageImage>, Scan2LedgerError> {
    let mut images = Vec::with_capacity(files.len());

    for file in files {
        if cancel.is_cancelled() {
            return Err(Scan2LedgerError::Cancelled);
        }

        match classify(&file.media_type) {
            Some(SourceKind::Raster) => {
                images.push(PageImage {
                    label: file.name,
                    media_type: file.media_type,
                    bytes: file.bytes,
                });
            }
            Some(SourceKind::Paged) => {
                let pages = render::render_pages(
                    &file.name,
                    file.bytes,
                    config.render_scale,
                    config.jpeg_quality,
                    config.progress_callback.clone(),
                )
                .await?;
                for (idx, jpeg) in pages {
                    images.push(PageImage {
                        label: page_label(&file.name, idx),
                        media_type: PAGE_MEDIA_TYPE.to_string(),
                        bytes: jpeg,
                    });
                }
            }
            None => {
                debug!(
                    "dropping unsupported input '{}' ({})",
                    file.name, file.media_type
                );
            }
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> SourceFile {
        SourceFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn classify_accepts_images_and_paged_documents_only() {
        assert!(matches!(classify("image/png"), Some(SourceKind::Raster)));
        assert!(matches!(classify("image/jpeg"), Some(SourceKind::Raster)));
        assert!(matches!(
            classify("application/pdf"),
            Some(SourceKind::Paged)
        ));
        assert!(classify("text/plain").is_none());
        assert!(classify("application/zip").is_none());
        assert!(classify("").is_none());
    }

    #[test]
    fn page_labels_are_one_based() {
        assert_eq!(page_label("statement.pdf", 0), "statement.pdf (P.1)");
        assert_eq!(page_label("statement.pdf", 9), "statement.pdf (P.10)");
    }

    #[tokio::test]
    async fn raster_images_pass_through_in_order() {
        let config = ExtractionConfig::default();
        let cancel = CancellationToken::new();
        let images = flatten_sources(
            vec![png("a.png"), png("b.png"), png("c.png")],
            &config,
            &cancel,
        )
        .await
        .unwrap();

        let labels: Vec<&str> = images.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(images[0].media_type, "image/png");
        assert_eq!(images[0].bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn unsupported_media_is_dropped_silently() {
        let config = ExtractionConfig::default();
        let cancel = CancellationToken::new();
        let images = flatten_sources(
            vec![
                png("keep.png"),
                SourceFile::new("notes.txt", "text/plain", b"hello".to_vec()),
            ],
            &config,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].label, "keep.png");
    }

    #[tokio::test]
    async fn cancellation_before_first_file_stops_preparation() {
        let config = ExtractionConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = flatten_sources(vec![png("a.png")], &config, &cancel).await;
        assert!(matches!(result, Err(Scan2LedgerError::Cancelled)));
    }
}
