/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Derived totals of a [`LedgerState`].
//!
//! Totals are never stored. Every terminal recomputes them from its current state with
//! [`compute_totals`], so two terminals holding the same snapshot always display the same numbers.
//!
//! ## Non-cash revenue
//!
//! Card and PayPal revenue never touches the till. It is therefore counted twice: once in
//! `total_cash_in` as revenue, and once in `total_cash_out` as a balancing payout. The two cancel, so
//! only cash amounts and the carried-forward balance move the drawer balance.

use crate::types::{basic::Amount, ledger_state::LedgerState};

/// Per-method sums over the out-party stream.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutPartyTotals {
    pub cash: Amount,
    pub card: Amount,
    pub paypal: Amount,
}

/// Everything a view displays about a ledger day.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub out_party: OutPartyTotals,
    pub total_cash_in: Amount,
    pub total_cash_out: Amount,
    pub drawer_balance: Amount,
    pub ledger_card_total: Amount,
    pub ledger_paypal_total: Amount,
    pub final_card_total: Amount,
    pub final_paypal_total: Amount,
}

/// Derive the totals of `state`. Sums are accumulated in insertion order, starting from zero.
pub fn compute_totals(state: &LedgerState) -> Totals {
    let out_party = state.out_party_entries.iter().fold(
        OutPartyTotals::default(),
        |acc, entry| OutPartyTotals {
            cash: acc.cash + entry.cash,
            card: acc.card + entry.card,
            paypal: acc.paypal + entry.paypal,
        },
    );

    let mains = &state.main_entries;
    let manual_cash_in = mains.iter().fold(0.0, |sum, e| sum + e.cash_in);
    let manual_cash_out = mains.iter().fold(0.0, |sum, e| sum + e.cash_out);
    let balancing_cash_out = mains
        .iter()
        .filter(|e| e.is_non_cash())
        .fold(0.0, |sum, e| sum + e.cash_in);
    let ledger_card_total = mains
        .iter()
        .filter(|e| e.is_card)
        .fold(0.0, |sum, e| sum + e.cash_in);
    let ledger_paypal_total = mains
        .iter()
        .filter(|e| e.is_paypal)
        .fold(0.0, |sum, e| sum + e.cash_in);

    let total_cash_in = state.initial_balance
        + manual_cash_in
        + out_party.cash
        + out_party.card
        + out_party.paypal;
    let total_cash_out = manual_cash_out + balancing_cash_out + out_party.card + out_party.paypal;

    Totals {
        out_party,
        total_cash_in,
        total_cash_out,
        drawer_balance: total_cash_in - total_cash_out,
        ledger_card_total,
        ledger_paypal_total,
        final_card_total: ledger_card_total + out_party.card,
        final_paypal_total: ledger_paypal_total + out_party.paypal,
    }
}
