/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Owner of the canonical [`LedgerState`].

use crate::ledger::form::normalize_amount;
use crate::types::{
    basic::Amount,
    entries::{MainEntry, OutPartyEntry},
    ledger_state::LedgerState,
};

/// Append-only store of the two transaction streams, plus the carried-forward balance.
///
/// Entry ids are unique within each stream, and every stored amount is finite and non-negative:
/// amounts that are not are coerced to zero on insert, the same way
/// [`form`](crate::ledger::form) coerces typed input. Whether a caller may mutate at all is decided
/// by the [sync engine](crate::sync_engine::SyncEngine).
#[derive(Clone, Debug, Default)]
pub struct LedgerStore {
    state: LedgerState,
}

impl LedgerStore {
    pub fn new(state: LedgerState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Append an out-party entry. Returns `false`, leaving the state untouched, if an out-party
    /// entry with the same id already exists.
    pub fn add_out_party(&mut self, mut entry: OutPartyEntry) -> bool {
        if self.state.out_party_entries.iter().any(|e| e.id == entry.id) {
            return false;
        }
        entry.cash = normalize_amount(entry.cash);
        entry.card = normalize_amount(entry.card);
        entry.paypal = normalize_amount(entry.paypal);
        self.state.out_party_entries.push(entry);
        true
    }

    /// Append a main entry. Returns `false`, leaving the state untouched, if a main entry with the
    /// same id already exists.
    pub fn add_main(&mut self, mut entry: MainEntry) -> bool {
        if self.state.main_entries.iter().any(|e| e.id == entry.id) {
            return false;
        }
        entry.cash_in = normalize_amount(entry.cash_in);
        entry.cash_out = normalize_amount(entry.cash_out);
        self.state.main_entries.push(entry);
        true
    }

    /// Remove the out-party entry with the given `id`. Returns whether an entry was removed.
    pub fn delete_out_party(&mut self, id: &str) -> bool {
        match self.state.out_party_entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.state.out_party_entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the main entry with the given `id`. Returns whether an entry was removed.
    pub fn delete_main(&mut self, id: &str) -> bool {
        match self.state.main_entries.iter().position(|e| e.id == id) {
            Some(index) => {
                self.state.main_entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Close the day: clear both streams and carry `drawer_balance` forward as the next day's
    /// initial balance.
    ///
    /// `drawer_balance` must be the balance computed *before* this call.
    pub fn end_day(&mut self, drawer_balance: Amount) {
        self.state = LedgerState {
            out_party_entries: Vec::new(),
            main_entries: Vec::new(),
            initial_balance: drawer_balance,
        }
    }

    /// Replace the whole state with a snapshot.
    pub fn replace_all(&mut self, state: LedgerState) {
        self.state = state
    }
}
