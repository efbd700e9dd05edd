//! Coercive normalization: raw wire records → well-formed journal entries.
//!
//! The service's output contract marks the amount and tax fields optional
//! and nullable, and models routinely take it up on that. Nothing here is an
//! error: a missing or `null` amount becomes absent, a missing tax label
//! becomes the documented default, a missing string becomes empty. This is a
//! pure function over parsed data, independent of the transport, so it is
//! unit-testable without a live service.

use crate::ledger::{AccountId, JournalEntry, DEFAULT_TAX_LABEL};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One record as returned by the document-understanding service.
///
/// Field names mirror the wire schema (camelCase). Every field is optional
/// at this layer; required-ness is the service's obligation, coercion is
/// ours. Amounts are parsed leniently: JSON numbers, numeric strings, and
/// `null` are all accepted, anything else is treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub date: Option<String>,
    pub description: Option<String>,
    pub debit_account: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    pub debit_amount: Option<f64>,
    pub debit_tax: Option<String>,
    pub credit_account: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    pub credit_amount: Option<f64>,
    pub credit_tax: Option<String>,
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

/// Amounts must end up non-negative or absent; everything else coerces to
/// absent rather than failing the record.
fn coerce_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Build a journal entry from a raw record, filling documented defaults.
///
/// The caller assigns `no`; this function never renumbers.
pub fn normalize_record(raw: RawRecord, account_id: AccountId, no: u32) -> JournalEntry {
    let mut entry = JournalEntry::blank(account_id, no);
    entry.date = raw.date.unwrap_or_default();
    entry.description = raw.description.unwrap_or_default();
    entry.debit_account = raw.debit_account.unwrap_or_default();
    entry.debit_amount = raw.debit_amount;
    entry.debit_tax = raw
        .debit_tax
        .unwrap_or_else(|| DEFAULT_TAX_LABEL.to_string());
    entry.credit_account = raw.credit_account.unwrap_or_default();
    entry.credit_amount = raw.credit_amount;
    entry.credit_tax = raw
        .credit_tax
        .unwrap_or_else(|| DEFAULT_TAX_LABEL.to_string());
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerStore;

    fn account() -> AccountId {
        let mut store = LedgerStore::new();
        store.create_account("test").unwrap()
    }

    #[test]
    fn missing_optionals_coerce_to_defaults() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"date": "2024/01/15", "description": "coffee",
                "debitAccount": "Supplies", "creditAccount": "Bank"}"#,
        )
        .unwrap();
        let entry = normalize_record(raw, account(), 3);

        assert_eq!(entry.no, 3);
        assert_eq!(entry.date, "2024/01/15");
        assert_eq!(entry.debit_amount, None);
        assert_eq!(entry.credit_amount, None);
        assert_eq!(entry.debit_tax, "out of scope");
        assert_eq!(entry.credit_tax, "out of scope");
    }

    #[test]
    fn explicit_nulls_coerce_like_missing_fields() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"date": null, "description": null, "debitAccount": null,
                "debitAmount": null, "debitTax": null, "creditAccount": null,
                "creditAmount": null, "creditTax": null}"#,
        )
        .unwrap();
        let entry = normalize_record(raw, account(), 1);

        assert_eq!(entry.date, "");
        assert_eq!(entry.description, "");
        assert_eq!(entry.debit_account, "");
        assert_eq!(entry.credit_account, "");
        assert_eq!(entry.debit_amount, None);
        assert_eq!(entry.credit_amount, None);
        assert_eq!(entry.debit_tax, "out of scope");
    }

    #[test]
    fn fully_populated_record_passes_through() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"date": "2024/02/01", "description": "stationery",
                "debitAccount": "Supplies", "debitAmount": 1200.5,
                "debitTax": "taxable purchases 10%",
                "creditAccount": "Bank", "creditAmount": 1200.5,
                "creditTax": "out of scope"}"#,
        )
        .unwrap();
        let entry = normalize_record(raw, account(), 8);

        assert_eq!(entry.debit_amount, Some(1200.5));
        assert_eq!(entry.credit_amount, Some(1200.5));
        assert_eq!(entry.debit_tax, "taxable purchases 10%");
        assert_eq!(entry.description, "stationery");
    }

    #[test]
    fn string_amounts_are_parsed() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"debitAmount": "980", "creditAmount": " 45.5 "}"#).unwrap();
        assert_eq!(raw.debit_amount, Some(980.0));
        assert_eq!(raw.credit_amount, Some(45.5));
    }

    #[test]
    fn unusable_amounts_become_absent() {
        for json in [
            r#"{"debitAmount": "n/a"}"#,
            r#"{"debitAmount": -12}"#,
            r#"{"debitAmount": true}"#,
            r#"{"debitAmount": {"v": 1}}"#,
            r#"{"debitAmount": ""}"#,
        ] {
            let raw: RawRecord = serde_json::from_str(json).unwrap();
            assert_eq!(raw.debit_amount, None, "input {json}");
        }
    }
}
