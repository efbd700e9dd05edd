//! Configuration types for an extraction invocation.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across invocations, log them, and diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::Scan2LedgerError;
use crate::pipeline::extract::DocumentReader;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one extraction invocation.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2ledger::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4.1-nano")
///     .max_tokens(8192)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Upscaling factor applied when rasterising each document page. Default: 2.0.
    ///
    /// Rendering at twice the native viewport size measurably improves the
    /// service's recognition of small statement print. Values above ~3.0 blow
    /// up payload size for no further accuracy gain.
    pub render_scale: f32,

    /// JPEG quality for rendered pages, 1–100. Default: 80.
    ///
    /// Statements are text on flat backgrounds; quality 80 keeps digits
    /// legible while bounding the request payload. PNG would be lossless but
    /// 3–5× the bytes per page.
    pub jpeg_quality: u8,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.0-flash".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed document reader. Takes precedence over every provider
    /// field; the seam tests and middleware hook into.
    pub reader: Option<Arc<dyn DocumentReader>>,

    /// Sampling temperature for the completion. Default: 0.0.
    ///
    /// Transcription wants the model deterministic and faithful to the page;
    /// any creativity shows up as invented amounts.
    pub temperature: f32,

    /// Maximum tokens the service may generate per image. Default: 8192.
    ///
    /// A dense statement page can exceed sixty transaction rows; setting this
    /// too low truncates the JSON array mid-record, which fails the whole
    /// invocation.
    pub max_tokens: usize,

    /// Custom extraction instruction. If None, uses the built-in default.
    /// The output schema is appended either way.
    pub instruction: Option<String>,

    /// Observer for preparation and per-image events.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-service-call timeout in seconds. Default: 120.
    ///
    /// A hung call is indistinguishable from a slow one until this elapses;
    /// on expiry the invocation fails through the single generic failure
    /// path, exactly like a transport error.
    pub api_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            jpeg_quality: 80,
            model: None,
            provider_name: None,
            provider: None,
            reader: None,
            temperature: 0.0,
            max_tokens: 8192,
            instruction: None,
            progress_callback: None,
            download_timeout_secs: 120,
            api_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("render_scale", &self.render_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("reader", &self.reader.as_ref().map(|_| "<dyn DocumentReader>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(1.0, 4.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.config.reader = Some(reader);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Scan2LedgerError> {
        let c = &self.config;
        if !c.render_scale.is_finite() || c.render_scale <= 0.0 {
            return Err(Scan2LedgerError::InvalidConfig(format!(
                "render scale must be positive, got {}",
                c.render_scale
            )));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(Scan2LedgerError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_tokens == 0 {
            return Err(Scan2LedgerError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
