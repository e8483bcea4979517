/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ledger itself: the mutable store, the derived totals, and the helpers that turn raw form input
//! into entries and entries into display rows.
//!
//! Nothing in this module knows about roles, persistence or the network. Those concerns are layered on
//! top by the [sync engine](crate::sync_engine).

pub mod form;

pub mod rows;

pub mod store;

pub mod totals;

pub use store::LedgerStore;
pub use totals::{compute_totals, OutPartyTotals, Totals};
