//! Input resolution: load a user-supplied path or URL into a `SourceFile`.
//!
//! The library pipeline itself consumes in-memory [`SourceFile`] values, so
//! this stage exists for callers that start from the file system or the
//! network — the CLI above all. Media types are declared by file extension;
//! anything unrecognised is passed through as `application/octet-stream`,
//! which the ingestor then drops, keeping "tolerate any input" in one place.

use crate::error::Scan2LedgerError;
use crate::pipeline::ingest::SourceFile;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Declared media type for a path, by extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Resolve a list of input strings (local paths or URLs) to source files,
/// preserving order.
pub async fn resolve_inputs(
    inputs: &[String],
    timeout_secs: u64,
) -> Result<Vec<SourceFile>, Scan2LedgerError> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        let file = if is_url(input) {
            download_url(input, timeout_secs).await?
        } else {
            load_local(input).await?
        };
        files.push(file);
    }
    Ok(files)
}

/// Load a local file, validating existence and (for PDFs) magic bytes.
async fn load_local(path_str: &str) -> Result<SourceFile, Scan2LedgerError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Scan2LedgerError::FileNotFound { path });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            Scan2LedgerError::PermissionDenied { path: path.clone() }
        } else {
            Scan2LedgerError::FileNotFound { path: path.clone() }
        }
    })?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path_str)
        .to_string();
    let media_type = media_type_for_path(&path);

    if media_type == "application/pdf" && !bytes.starts_with(b"%PDF") {
        return Err(Scan2LedgerError::CorruptDocument {
            name,
            detail: "missing %PDF header".to_string(),
        });
    }

    debug!("resolved local input: {} ({})", path.display(), media_type);
    Ok(SourceFile::new(name, media_type, bytes))
}

/// Download a URL into memory and wrap it as a source file.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceFile, Scan2LedgerError> {
    info!("downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Scan2LedgerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Scan2LedgerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Scan2LedgerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Scan2LedgerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Scan2LedgerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    // Extension wins when it maps to something we know; otherwise trust the
    // server's Content-Type.
    let mut media_type = media_type_for_path(Path::new(&name)).to_string();
    if media_type == "application/octet-stream" {
        if let Some(ht) = header_type {
            media_type = ht;
        }
    }

    if media_type == "application/pdf" && !bytes.starts_with(b"%PDF") {
        return Err(Scan2LedgerError::CorruptDocument {
            name,
            detail: "missing %PDF header".to_string(),
        });
    }

    info!("downloaded {} bytes from {}", bytes.len(), url);
    Ok(SourceFile::new(name, media_type, bytes))
}

/// Extract a reasonable display name from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}
