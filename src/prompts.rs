//! The fixed extraction instruction and its rigid output schema.
//!
//! Centralising both here serves two purposes:
//!
//! 1. **Single source of truth** — the wire contract with the
//!    document-understanding service (field names, nullability, defaults)
//!    lives in exactly one place, next to the prose that asks for it.
//!
//! 2. **Testability** — unit tests can parse [`OUTPUT_SCHEMA_JSON`] and
//!    assert the instruction embeds it, without spinning up a live service.
//!
//! Callers can override the instruction via
//! [`crate::config::ExtractionConfig::instruction`]; the schema is always
//! appended so the response stays parseable.

/// JSON Schema the service must follow: an array of journal-entry objects.
///
/// `date`, `description`, `debitAccount`, and `creditAccount` are required;
/// the amount and tax fields are optional and nullable — normalization
/// coerces their absence to documented defaults.
pub const OUTPUT_SCHEMA_JSON: &str = r#"{
  "type": "array",
  "items": {
    "type": "object",
    "properties": {
      "date": { "type": "string", "description": "Transaction date, formatted YYYY/MM/DD" },
      "description": { "type": "string", "description": "Narrative of the transaction" },
      "debitAccount": { "type": "string", "description": "Debit-side category label" },
      "debitAmount": { "type": ["number", "null"], "description": "Debit amount, omitted when there is none" },
      "debitTax": { "type": ["string", "null"], "description": "Debit-side tax category" },
      "creditAccount": { "type": "string", "description": "Credit-side category label" },
      "creditAmount": { "type": ["number", "null"], "description": "Credit amount, omitted when there is none" },
      "creditTax": { "type": ["string", "null"], "description": "Credit-side tax category" }
    },
    "required": ["date", "description", "debitAccount", "creditAccount"]
  }
}"#;

/// Natural-language half of the request, used when no override is configured.
pub const DEFAULT_INSTRUCTION: &str = r#"You are an expert bookkeeper. The image is one page of a scanned bank statement. Transcribe every transaction on the page into double-entry journal records.

Follow these rules precisely:

1. RECORDS
   - One record per transaction line, in the order printed on the page
   - Dates formatted YYYY/MM/DD; keep the year shown on the statement
   - Withdrawals debit an expense category and credit the bank account;
     deposits debit the bank account and credit a revenue category
   - Amounts are plain non-negative numbers without currency symbols,
     thousands separators, or quotes
   - Use null for an amount that does not apply to a side
   - Use null for a tax category you cannot determine

2. WHAT TO IGNORE
   - Running-balance columns, page totals, and carried-forward rows
   - Headers, footers, and decorative rules

3. OUTPUT FORMAT
   - Output ONLY a JSON array conforming to the schema below
   - Do NOT wrap the array in markdown fences
   - Do NOT add commentary or explanations
   - Output [] if the page contains no transactions"#;

/// The complete request text: instruction plus the schema it references.
pub fn build_instruction(override_text: Option<&str>) -> String {
    format!(
        "{}\n\nOutput schema:\n{}",
        override_text.unwrap_or(DEFAULT_INSTRUCTION),
        OUTPUT_SCHEMA_JSON
    )
}
