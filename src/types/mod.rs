/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The types defined in [`crate::types`] are shared by every component of a ledger terminal: the
//! entries posted to the two transaction streams, the [`LedgerState`](ledger_state::LedgerState)
//! aggregate that is the unit of persistence and replication, and a handful of "inert" newtypes that
//! are passed around and inspected but have no active behavior.

pub mod basic;

pub mod entries;

pub mod ledger_state;
