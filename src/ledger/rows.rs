/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Display rows of the main ledger.

use crate::types::{basic::Amount, entries::MainEntry, ledger_state::LedgerState};

/// A row of the main ledger as shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerRow<'a> {
    /// The synthetic "BFWD" row: the balance carried forward from the previous day.
    BalanceForward(Amount),
    Entry(&'a MainEntry),
}

/// The rows of the main ledger, oldest first. A leading [`LedgerRow::BalanceForward`] row is included
/// whenever the carried-forward balance is non-zero.
pub fn ledger_rows(state: &LedgerState) -> Vec<LedgerRow<'_>> {
    let balance_forward =
        (state.initial_balance != 0.0).then_some(LedgerRow::BalanceForward(state.initial_balance));

    balance_forward
        .into_iter()
        .chain(state.main_entries.iter().map(LedgerRow::Entry))
        .collect()
}
