//! CSV export: serialize one account's entries into the import format the
//! target accounting software reads.
//!
//! The layout is byte-exact by contract: a fixed 9-column header, CRLF line
//! endings, text fields always double-quoted with embedded quotes doubled,
//! numeric fields as bare decimal text, absent amounts as empty fields. A
//! generic CSV writer cannot express the mixed per-column quoting, so the
//! serializer is written out here and pinned by tests.
//!
//! ## Encoding policy
//!
//! Two tiers. The primary target is Shift_JIS — the legacy double-byte
//! encoding the accounting software requires for import. When the text
//! contains anything Shift_JIS cannot represent, the whole file falls back
//! to UTF-8 with a BOM prefix so spreadsheet tools still auto-detect it.
//! The UTF-8 tier cannot fail, which leaves file I/O as the only terminal
//! error; the atomic write below guarantees no partial file either way.

use crate::error::Scan2LedgerError;
use crate::ledger::JournalEntry;
use chrono::NaiveDate;
use encoding_rs::SHIFT_JIS;
use std::path::Path;
use tracing::{debug, info};

/// Export header, in column order.
pub const CSV_HEADER: [&str; 9] = [
    "No.",
    "Date",
    "Debit Category",
    "Debit Amount",
    "Debit Tax Category",
    "Credit Category",
    "Credit Amount",
    "Credit Tax Category",
    "Description",
];

/// UTF-8 BOM: EF BB BF
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Which encoding tier produced the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvEncoding {
    ShiftJis,
    Utf8Bom,
}

impl CsvEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            CsvEncoding::ShiftJis => "Shift_JIS",
            CsvEncoding::Utf8Bom => "UTF-8 (BOM)",
        }
    }
}

/// A finished export: the bytes to hand to the user, plus the name and
/// encoding they were produced under.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub encoding: CsvEncoding,
}

/// Serialize an account's ordered entries to CSV bytes.
///
/// `entries` is expected in display order, i.e. straight from
/// [`crate::ledger::LedgerStore::entries_for_account`]. The file name embeds
/// the account's display name and today's local date.
pub fn export_csv(entries: &[&JournalEntry], account_name: &str) -> CsvExport {
    let text = render_csv(entries);
    let (bytes, encoding) = encode_with_fallback(&text);
    let file_name = export_file_name(account_name, chrono::Local::now().date_naive());
    info!(
        "exported {} entries as '{}' ({}, {} bytes)",
        entries.len(),
        file_name,
        encoding.label(),
        bytes.len()
    );
    CsvExport {
        file_name,
        bytes,
        encoding,
    }
}

/// Write an export to disk via temp file + rename so no partial file can be
/// observed, the failure mode included.
pub async fn write_export(export: &CsvExport, path: &Path) -> Result<(), Scan2LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Scan2LedgerError::ExportWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, &export.bytes)
        .await
        .map_err(|e| Scan2LedgerError::ExportWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Scan2LedgerError::ExportWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

// ── Serialization ────────────────────────────────────────────────────────

fn render_csv(entries: &[&JournalEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(
        CSV_HEADER
            .iter()
            .map(|h| quote(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for entry in entries {
        let fields = [
            entry.no.to_string(),
            quote(&entry.date),
            quote(&entry.debit_account),
            fmt_amount(entry.debit_amount),
            quote(&entry.debit_tax),
            quote(&entry.credit_account),
            fmt_amount(entry.credit_amount),
            quote(&entry.credit_tax),
            quote(&entry.description),
        ];
        lines.push(fields.join(","));
    }
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Plain decimal text; whole amounts without a trailing `.0`, absent as
/// empty string (never `0`).
fn fmt_amount(amount: Option<f64>) -> String {
    match amount {
        None => String::new(),
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
    }
}

// ── Encoding ─────────────────────────────────────────────────────────────

fn encode_with_fallback(text: &str) -> (Vec<u8>, CsvEncoding) {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    if !had_errors {
        return (bytes.into_owned(), CsvEncoding::ShiftJis);
    }

    debug!("text not representable in Shift_JIS, falling back to UTF-8 with BOM");
    let mut out = Vec::with_capacity(UTF8_BOM.len() + text.len());
    out.extend_from_slice(UTF8_BOM);
    out.extend_from_slice(text.as_bytes());
    (out, CsvEncoding::Utf8Bom)
}

// ── File naming ──────────────────────────────────────────────────────────

fn export_file_name(account_name: &str, date: NaiveDate) -> String {
    format!(
        "{}_journal_{}.csv",
        sanitize_component(account_name),
        date.format("%Y%m%d")
    )
}

/// Keep the account name recognisable but safe as a file-name component.
fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountId, LedgerStore};

    fn account() -> AccountId {
        let mut store = LedgerStore::new();
        store.create_account("test").unwrap()
    }

    fn entry(no: u32) -> JournalEntry {
        let mut e = JournalEntry::blank(account(), no);
        e.date = "2024/01/15".into();
        e.debit_account = "Supplies".into();
        e.debit_amount = Some(1200.0);
        e.credit_account = "Bank".into();
        e.credit_amount = Some(1200.0);
        e.description = "pens".into();
        e
    }

    #[test]
    fn layout_is_byte_exact() {
        let e = entry(1);
        let text = render_csv(&[&e]);
        let expected = concat!(
            "\"No.\",\"Date\",\"Debit Category\",\"Debit Amount\",",
            "\"Debit Tax Category\",\"Credit Category\",\"Credit Amount\",",
            "\"Credit Tax Category\",\"Description\"\r\n",
            "1,\"2024/01/15\",\"Supplies\",1200,\"out of scope\",",
            "\"Bank\",1200,\"out of scope\",\"pens\"\r\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_account_exports_header_only() {
        let text = render_csv(&[]);
        assert!(text.starts_with("\"No.\""));
        assert!(text.ends_with("\"Description\"\r\n"));
        assert_eq!(text.matches("\r\n").count(), 1);
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let mut e = entry(1);
        e.description = r#"He said "hi""#.into();
        let text = render_csv(&[&e]);
        assert!(text.contains(r#""He said ""hi""""#));
    }

    #[test]
    fn absent_amounts_render_empty_not_zero() {
        let mut e = entry(2);
        e.debit_amount = None;
        e.credit_amount = None;
        let text = render_csv(&[&e]);
        assert!(text.contains("\"Supplies\",,\"out of scope\""));
        assert!(text.contains("\"Bank\",,\"out of scope\""));
    }

    #[test]
    fn amounts_render_as_plain_decimals() {
        assert_eq!(fmt_amount(None), "");
        assert_eq!(fmt_amount(Some(1200.0)), "1200");
        assert_eq!(fmt_amount(Some(1200.5)), "1200.5");
        assert_eq!(fmt_amount(Some(0.0)), "0");
    }

    #[test]
    fn ascii_text_encodes_as_shift_jis() {
        let e = entry(1);
        let export_text = render_csv(&[&e]);
        let (bytes, encoding) = encode_with_fallback(&export_text);
        assert_eq!(encoding, CsvEncoding::ShiftJis);
        // Shift_JIS is ASCII-compatible, so pure-ASCII text is unchanged.
        assert_eq!(bytes, export_text.as_bytes());
    }

    #[test]
    fn japanese_text_stays_in_shift_jis() {
        let text = "\"消耗品費\",\"現金\"\r\n";
        let (bytes, encoding) = encode_with_fallback(text);
        assert_eq!(encoding, CsvEncoding::ShiftJis);
        assert_ne!(bytes, text.as_bytes());
        let (decoded, _, had_errors) = SHIFT_JIS.decode(&bytes);
        assert!(!had_errors);
        assert_eq!(decoded, text);
    }

    #[test]
    fn unmappable_text_falls_back_to_utf8_bom() {
        let text = "\"coffee ☕ break\"\r\n";
        let (bytes, encoding) = encode_with_fallback(text);
        assert_eq!(encoding, CsvEncoding::Utf8Bom);
        assert_eq!(&bytes[..3], UTF8_BOM);
        assert_eq!(&bytes[3..], text.as_bytes());
    }

    #[test]
    fn file_name_embeds_account_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert_eq!(
            export_file_name("Checking", date),
            "Checking_journal_20260807.csv"
        );
        assert_eq!(
            export_file_name("My/Main: Account?", date),
            "My_Main_ Account__journal_20260807.csv"
        );
    }

    #[tokio::test]
    async fn write_export_leaves_no_temp_file() {
        let e = entry(1);
        let export = CsvExport {
            file_name: "t.csv".into(),
            bytes: render_csv(&[&e]).into_bytes(),
            encoding: CsvEncoding::ShiftJis,
        };
        let dir = std::env::temp_dir().join(format!("scan2ledger-{}", uuid::Uuid::new_v4()));
        let path = dir.join("t.csv");

        write_export(&export, &path).await.unwrap();

        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written, export.bytes);
        assert!(!path.with_extension("csv.tmp").exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
