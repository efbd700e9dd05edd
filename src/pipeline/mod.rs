//! Pipeline stages for statement-to-ledger extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ingest ──▶ render ──▶ encode ──▶ extract ──▶ normalize
//! (path/URL) (classify)  (pdfium)  (base64)   (service)   (coerce)
//! ```
//!
//! 1. [`input`]     — load a user-supplied path or URL into a `SourceFile`
//! 2. [`ingest`]    — accept raster images and paged documents, drop the
//!    rest, flatten everything into one ordered labeled image list
//! 3. [`render`]    — rasterise document pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`encode`]    — JPEG-encode rendered pages and base64-wrap request
//!    payloads for the multimodal API body
//! 5. [`extract`]   — drive the document-understanding call and parse its
//!    JSON-array payload; the only stage with network I/O
//! 6. [`normalize`] — coerce raw wire records into well-formed journal
//!    entries with documented defaults

pub mod encode;
pub mod extract;
pub mod ingest;
pub mod input;
pub mod normalize;
pub mod render;
