//! Service interaction: one extraction request per page image.
//!
//! The document-understanding service is a consumed capability, so it sits
//! behind the [`DocumentReader`] trait: the production implementation drives
//! an `edgequake-llm` provider, tests script a stub, and middleware (caching,
//! rate-limiting) can wrap either. The module is intentionally thin — the
//! request text lives in [`crate::prompts`], coercion in
//! [`crate::pipeline::normalize`], so transport can change without touching
//! either.
//!
//! ## Message Layout
//!
//! The request contains (in order):
//! 1. **System message** — the extraction instruction plus the output schema
//! 2. **User message** — the page image as a base64 attachment (empty text)
//!
//! The empty user text is intentional: the APIs require at least one user
//! turn to respond to, but the image carries all the actual content.

use crate::config::ExtractionConfig;
use crate::error::Scan2LedgerError;
use crate::pipeline::encode;
use crate::pipeline::ingest::PageImage;
use crate::pipeline::normalize::RawRecord;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// The document-understanding capability: image in, text payload out.
///
/// Exactly one call is made per image; retries, timeouts, and parsing are
/// the dispatcher's concern. Implementations map their own transport errors
/// to [`Scan2LedgerError::ExtractionFailed`].
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read_page(&self, image: &PageImage) -> Result<String, Scan2LedgerError>;
}

/// Production reader backed by an `edgequake-llm` vision provider.
pub struct LlmDocumentReader {
    provider: Arc<dyn LLMProvider>,
    instruction: String,
    options: CompletionOptions,
}

impl LlmDocumentReader {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            instruction: prompts::build_instruction(config.instruction.as_deref()),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl DocumentReader for LlmDocumentReader {
    async fn read_page(&self, image: &PageImage) -> Result<String, Scan2LedgerError> {
        let messages = vec![
            ChatMessage::system(self.instruction.as_str()),
            ChatMessage::user_with_images(
                "",
                vec![encode::to_image_data(&image.bytes, &image.media_type)],
            ),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| Scan2LedgerError::ExtractionFailed {
                detail: format!("'{}': {}", image.label, e),
            })?;

        debug!(
            "'{}': {} input tokens, {} output tokens",
            image.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(response.content)
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Models sometimes wrap the array in markdown fences despite the prompt
/// saying not to; strip one outer fence pair before parsing.
fn strip_response_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

/// Parse the service payload as a JSON record array.
///
/// This is the single hard-failure path of an invocation: a payload that is
/// not a JSON array fails the whole run, there is no per-record skipping.
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, Scan2LedgerError> {
    let cleaned = strip_response_fences(text);
    serde_json::from_str::<Vec<RawRecord>>(cleaned.trim()).map_err(|e| {
        Scan2LedgerError::ExtractionFailed {
            detail: format!("response is not a JSON record array: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_array_parses() {
        let records = parse_records(
            r#"[{"date": "2024/01/15", "description": "coffee",
                 "debitAccount": "Supplies", "creditAccount": "Bank"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.as_deref(), Some("2024/01/15"));
    }

    #[test]
    fn empty_array_is_valid() {
        assert!(parse_records("[]").unwrap().is_empty());
        assert!(parse_records("  [] \n").unwrap().is_empty());
    }

    #[test]
    fn fenced_array_is_unwrapped() {
        let fenced = "```json\n[{\"date\": \"2024/01/15\"}]\n```";
        let records = parse_records(fenced).unwrap();
        assert_eq!(records.len(), 1);

        let bare_fence = "```\n[]\n```";
        assert!(parse_records(bare_fence).unwrap().is_empty());
    }

    #[test]
    fn non_array_payload_is_the_hard_failure_path() {
        for bad in [
            "I could not read the image.",
            r#"{"date": "2024/01/15"}"#,
            "[{\"date\": \"2024/01/15\"",
            "",
        ] {
            let err = parse_records(bad).unwrap_err();
            assert!(
                matches!(err, Scan2LedgerError::ExtractionFailed { .. }),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let records = parse_records(
            r#"[{"date": "2024/01/15", "description": "x",
                 "debitAccount": "a", "creditAccount": "b",
                 "confidence": 0.93}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
    }
}
