//! In-memory ledger: accounts, journal entries, and the session store.
//!
//! The store is an explicit object owned by the top-level session and
//! injected into the dispatcher and the exporter — never an ambient global.
//! It lives for the session and is dropped with it; there is no persistence.
//!
//! ## Numbering
//!
//! `no` defines display and export order within one account. The store and
//! the dispatcher always hand out `max(no) + 1, +2, …` for new entries, so
//! pipeline batches never collide with existing numbers. The user may edit
//! `no` freely afterwards; duplicates and gaps created that way are kept
//! as-is, not auto-corrected.

use crate::error::Scan2LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, session-stable identifier of an [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque, immutable identifier of a [`JournalEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named grouping bucket for journal entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
}

/// Default tax-category label applied when the service leaves one out.
pub const DEFAULT_TAX_LABEL: &str = "out of scope";

/// One double-entry bookkeeping line.
///
/// `date` is free-form (canonically `YYYY/MM/DD`) and deliberately not
/// validated — scanned statements carry whatever the bank printed, and the
/// user corrects rows in place. Amounts are either a non-negative value or
/// absent; absence on either side is permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub no: u32,
    pub date: String,
    pub debit_account: String,
    pub debit_amount: Option<f64>,
    pub debit_tax: String,
    pub credit_account: String,
    pub credit_amount: Option<f64>,
    pub credit_tax: String,
    pub description: String,
}

impl JournalEntry {
    /// A fresh entry with every field at its empty/absent default.
    pub fn blank(account_id: AccountId, no: u32) -> Self {
        Self {
            id: EntryId::new(),
            account_id,
            no,
            date: String::new(),
            debit_account: String::new(),
            debit_amount: None,
            debit_tax: DEFAULT_TAX_LABEL.to_string(),
            credit_account: String::new(),
            credit_amount: None,
            credit_tax: DEFAULT_TAX_LABEL.to_string(),
            description: String::new(),
        }
    }
}

/// Addressable fields for [`LedgerStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    No,
    Date,
    DebitAccount,
    DebitAmount,
    DebitTax,
    CreditAccount,
    CreditAmount,
    CreditTax,
    Description,
}

/// The session's record store.
///
/// All mutation goes through the methods below; the dispatcher appends
/// batches, the presentation layer edits rows, the exporter only reads.
#[derive(Debug, Default)]
pub struct LedgerStore {
    accounts: Vec<Account>,
    entries: Vec<JournalEntry>,
    active: Option<AccountId>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accounts ──────────────────────────────────────────────────────────

    /// Create an account. The first account created becomes active.
    pub fn create_account(&mut self, name: &str) -> Result<AccountId, Scan2LedgerError> {
        if name.is_empty() {
            return Err(Scan2LedgerError::InvalidAccountName);
        }
        let account = Account {
            id: AccountId::new(),
            name: name.to_string(),
        };
        let id = account.id;
        self.accounts.push(account);
        if self.active.is_none() {
            self.active = Some(id);
        }
        Ok(id)
    }

    pub fn rename_account(&mut self, id: AccountId, name: &str) -> Result<(), Scan2LedgerError> {
        if name.is_empty() {
            return Err(Scan2LedgerError::InvalidAccountName);
        }
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Scan2LedgerError::UnknownAccount { id })?;
        account.name = name.to_string();
        Ok(())
    }

    pub fn set_active(&mut self, id: AccountId) -> Result<(), Scan2LedgerError> {
        if !self.accounts.iter().any(|a| a.id == id) {
            return Err(Scan2LedgerError::UnknownAccount { id });
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn active_account(&self) -> Option<AccountId> {
        self.active
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    // ── Entries ───────────────────────────────────────────────────────────

    /// Append pre-numbered records verbatim. No de-duplication.
    pub fn append(
        &mut self,
        account_id: AccountId,
        records: Vec<JournalEntry>,
    ) -> Result<(), Scan2LedgerError> {
        if self.account(account_id).is_none() {
            return Err(Scan2LedgerError::UnknownAccount { id: account_id });
        }
        if let Some(stray) = records.iter().find(|e| e.account_id != account_id) {
            return Err(Scan2LedgerError::Internal(format!(
                "batch entry {} addressed to a different account",
                stray.id
            )));
        }
        self.entries.extend(records);
        Ok(())
    }

    /// Create one empty row numbered `max(no) + 1` for the account.
    pub fn add_blank(&mut self, account_id: AccountId) -> Result<EntryId, Scan2LedgerError> {
        if self.account(account_id).is_none() {
            return Err(Scan2LedgerError::UnknownAccount { id: account_id });
        }
        let entry = JournalEntry::blank(account_id, self.max_no(account_id) + 1);
        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }

    /// Field-level edit with coercive numeric parsing.
    ///
    /// Amount fields: empty, non-numeric, or negative input maps to absent —
    /// never an error. `no` cannot be absent (it defines ordering), so input
    /// that does not parse as a positive integer leaves it unchanged. Text
    /// fields take any string verbatim, including the empty string.
    pub fn update(
        &mut self,
        entry_id: EntryId,
        field: EntryField,
        raw: &str,
    ) -> Result<(), Scan2LedgerError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or(Scan2LedgerError::UnknownEntry { id: entry_id })?;

        match field {
            EntryField::No => {
                if let Some(no) = parse_no(raw) {
                    entry.no = no;
                }
            }
            EntryField::Date => entry.date = raw.to_string(),
            EntryField::DebitAccount => entry.debit_account = raw.to_string(),
            EntryField::DebitAmount => entry.debit_amount = parse_amount(raw),
            EntryField::DebitTax => entry.debit_tax = raw.to_string(),
            EntryField::CreditAccount => entry.credit_account = raw.to_string(),
            EntryField::CreditAmount => entry.credit_amount = parse_amount(raw),
            EntryField::CreditTax => entry.credit_tax = raw.to_string(),
            EntryField::Description => entry.description = raw.to_string(),
        }
        Ok(())
    }

    /// Delete exactly one entry.
    pub fn remove(&mut self, entry_id: EntryId) -> Result<(), Scan2LedgerError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or(Scan2LedgerError::UnknownEntry { id: entry_id })?;
        self.entries.remove(idx);
        Ok(())
    }

    /// Delete every entry for the account. The account itself remains.
    pub fn clear(&mut self, account_id: AccountId) -> Result<(), Scan2LedgerError> {
        if self.account(account_id).is_none() {
            return Err(Scan2LedgerError::UnknownAccount { id: account_id });
        }
        self.entries.retain(|e| e.account_id != account_id);
        Ok(())
    }

    /// The account's entries sorted ascending by `no`.
    ///
    /// `sort_by_key` on `Vec` is stable, so ties (user-edited duplicate
    /// numbers) keep insertion order.
    pub fn entries_for_account(&self, account_id: AccountId) -> Vec<&JournalEntry> {
        let mut entries: Vec<&JournalEntry> = self
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .collect();
        entries.sort_by_key(|e| e.no);
        entries
    }

    /// Highest `no` currently present for the account, 0 when it has none.
    pub fn max_no(&self, account_id: AccountId) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .map(|e| e.no)
            .max()
            .unwrap_or(0)
    }

    pub fn entry(&self, entry_id: EntryId) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_no(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n >= 1)
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_account() -> (LedgerStore, AccountId) {
        let mut store = LedgerStore::new();
        let id = store.create_account("Checking").unwrap();
        (store, id)
    }

    #[test]
    fn first_account_becomes_active() {
        let (mut store, a) = store_with_account();
        assert_eq!(store.active_account(), Some(a));
        let b = store.create_account("Savings").unwrap();
        assert_eq!(store.active_account(), Some(a));
        store.set_active(b).unwrap();
        assert_eq!(store.active_account(), Some(b));
    }

    #[test]
    fn empty_account_name_rejected() {
        let mut store = LedgerStore::new();
        assert!(matches!(
            store.create_account(""),
            Err(Scan2LedgerError::InvalidAccountName)
        ));
        let id = store.create_account("ok").unwrap();
        assert!(matches!(
            store.rename_account(id, ""),
            Err(Scan2LedgerError::InvalidAccountName)
        ));
    }

    #[test]
    fn add_blank_numbers_from_max() {
        let (mut store, a) = store_with_account();
        store.add_blank(a).unwrap();
        store.add_blank(a).unwrap();
        let nos: Vec<u32> = store.entries_for_account(a).iter().map(|e| e.no).collect();
        assert_eq!(nos, vec![1, 2]);

        // A manual edit to a high number moves the next blank past it.
        let id = store.add_blank(a).unwrap();
        store.update(id, EntryField::No, "10").unwrap();
        let next = store.add_blank(a).unwrap();
        assert_eq!(store.entry(next).unwrap().no, 11);
    }

    #[test]
    fn listing_is_sorted_and_scoped() {
        let (mut store, a) = store_with_account();
        let b = store.create_account("Savings").unwrap();

        let mut e1 = JournalEntry::blank(a, 2);
        e1.description = "second".into();
        let e2 = JournalEntry::blank(b, 1);
        let mut e3 = JournalEntry::blank(a, 1);
        e3.description = "first".into();
        store.append(a, vec![e1]).unwrap();
        store.append(b, vec![e2]).unwrap();
        store.append(a, vec![e3]).unwrap();

        let listed = store.entries_for_account(a);
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.account_id == a));
        assert_eq!(listed[0].description, "first");
        assert_eq!(listed[1].description, "second");
    }

    #[test]
    fn duplicate_no_keeps_insertion_order() {
        let (mut store, a) = store_with_account();
        let mut e1 = JournalEntry::blank(a, 5);
        e1.description = "earlier".into();
        let mut e2 = JournalEntry::blank(a, 5);
        e2.description = "later".into();
        store.append(a, vec![e1, e2]).unwrap();

        let listed = store.entries_for_account(a);
        assert_eq!(listed[0].description, "earlier");
        assert_eq!(listed[1].description, "later");
    }

    #[test]
    fn amount_update_empty_is_absent_not_zero() {
        let (mut store, a) = store_with_account();
        let id = store.add_blank(a).unwrap();
        store.update(id, EntryField::DebitAmount, "1200.50").unwrap();
        assert_eq!(store.entry(id).unwrap().debit_amount, Some(1200.50));

        store.update(id, EntryField::DebitAmount, "").unwrap();
        assert_eq!(store.entry(id).unwrap().debit_amount, None);
    }

    #[test]
    fn amount_update_non_numeric_is_absent_never_error() {
        let (mut store, a) = store_with_account();
        let id = store.add_blank(a).unwrap();
        for raw in ["abc", "12,00", "¥100", "-3", "NaN", "inf"] {
            store.update(id, EntryField::CreditAmount, raw).unwrap();
            assert_eq!(store.entry(id).unwrap().credit_amount, None, "input {raw:?}");
        }
    }

    #[test]
    fn no_update_ignores_unparseable_input() {
        let (mut store, a) = store_with_account();
        let id = store.add_blank(a).unwrap();
        store.update(id, EntryField::No, "7").unwrap();
        assert_eq!(store.entry(id).unwrap().no, 7);
        store.update(id, EntryField::No, "").unwrap();
        assert_eq!(store.entry(id).unwrap().no, 7);
        store.update(id, EntryField::No, "zero").unwrap();
        assert_eq!(store.entry(id).unwrap().no, 7);
        store.update(id, EntryField::No, "0").unwrap();
        assert_eq!(store.entry(id).unwrap().no, 7);
    }

    #[test]
    fn text_update_accepts_empty_string() {
        let (mut store, a) = store_with_account();
        let id = store.add_blank(a).unwrap();
        store.update(id, EntryField::Description, "lunch").unwrap();
        store.update(id, EntryField::Description, "").unwrap();
        assert_eq!(store.entry(id).unwrap().description, "");
    }

    #[test]
    fn clear_removes_only_that_account() {
        let (mut store, a) = store_with_account();
        let b = store.create_account("Savings").unwrap();
        store.add_blank(a).unwrap();
        store.add_blank(a).unwrap();
        let kept = store.add_blank(b).unwrap();
        store.update(kept, EntryField::Description, "untouched").unwrap();

        store.clear(a).unwrap();
        assert!(store.entries_for_account(a).is_empty());
        let remaining = store.entries_for_account(b);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description, "untouched");
        assert_eq!(remaining[0].no, 1);
    }

    #[test]
    fn remove_deletes_exactly_one() {
        let (mut store, a) = store_with_account();
        let first = store.add_blank(a).unwrap();
        store.add_blank(a).unwrap();
        store.remove(first).unwrap();
        assert_eq!(store.entries_for_account(a).len(), 1);
        assert!(matches!(
            store.remove(first),
            Err(Scan2LedgerError::UnknownEntry { .. })
        ));
    }

    #[test]
    fn append_rejects_unknown_account() {
        let mut store = LedgerStore::new();
        let (other_store, foreign) = {
            let mut s = LedgerStore::new();
            let id = s.create_account("elsewhere").unwrap();
            (s, id)
        };
        drop(other_store);
        assert!(matches!(
            store.append(foreign, vec![]),
            Err(Scan2LedgerError::UnknownAccount { .. })
        ));
    }
}
