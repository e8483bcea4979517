/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A point-of-sale cash ledger with single-writer snapshot replication.
//!
//! One device, the editor, records transactions in two streams: the on-site main ledger and external
//! "out-party" transactions. Every accepted change is saved locally and published, as a whole snapshot,
//! to a best-effort publish/subscribe relay. Any number of viewers on the same channel mirror the
//! editor's ledger by replacing theirs with each snapshot they receive.
//!
//! Start a terminal with [`terminal::TerminalSpec`]. The relay, the key-value store, the exchange rate
//! source and the end-of-day prompt are provided by the library user through the [`networking::Relay`],
//! [`persistence::KVStore`], [`rates::RateProvider`] and [`sync_engine::Confirm`] traits.

pub mod camera;

pub mod config;

pub(crate) mod driver;

pub(crate) mod event_bus;

pub mod events;

pub mod ledger;

pub mod logging;

pub mod networking;

pub mod persistence;

pub mod rates;

pub mod roles;

pub mod sync_engine;

pub mod terminal;

pub mod types;
