/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only view into a running terminal.
//!
//! The [`SyncEngine`] lives on the driver thread, so the rest of the program cannot borrow it. Instead,
//! the driver copies what a presentation layer needs into a [`LedgerCamera`] after every trigger, and
//! any number of threads can take a [`LedgerView`] from it.

use std::{
    sync::{Arc, RwLock},
    time::Instant,
};

use crate::{
    ledger::{compute_totals, rows::{ledger_rows, LedgerRow}, Totals},
    networking::{status::ConnectivityStatus, Relay},
    persistence::KVStore,
    rates::ExchangeRates,
    roles::Role,
    sync_engine::{Confirm, SyncEngine},
    types::{basic::ChannelKey, ledger_state::LedgerState},
};

/// Everything a presentation layer renders, as of one instant.
#[derive(Clone, Debug)]
pub struct LedgerView {
    pub state: LedgerState,
    pub totals: Totals,
    pub status: ConnectivityStatus,
    pub last_message_at: Option<Instant>,
    pub role: Role,
    pub channel: ChannelKey,
    pub rates: Option<ExchangeRates>,
}

impl LedgerView {
    fn new(state: LedgerState, role: Role, channel: ChannelKey) -> Self {
        let totals = compute_totals(&state);
        Self {
            state,
            totals,
            status: ConnectivityStatus::Offline,
            last_message_at: None,
            role,
            channel,
            rates: None,
        }
    }

    /// The rows of the main ledger table, including the balance brought forward.
    pub fn rows(&self) -> Vec<LedgerRow<'_>> {
        ledger_rows(&self.state)
    }
}

#[derive(Clone)]
pub struct LedgerCamera(Arc<RwLock<LedgerView>>);

impl LedgerCamera {
    pub(crate) fn new(state: LedgerState, role: Role, channel: ChannelKey) -> Self {
        Self(Arc::new(RwLock::new(LedgerView::new(state, role, channel))))
    }

    /// Get a copy of the current view.
    pub fn snapshot(&self) -> LedgerView {
        // A poisoned lock still holds the last complete view.
        match self.0.read() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> LedgerState {
        self.snapshot().state
    }

    pub fn totals(&self) -> Totals {
        self.snapshot().totals
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.snapshot().status
    }

    pub fn role(&self) -> Role {
        self.snapshot().role
    }

    pub fn channel(&self) -> ChannelKey {
        self.snapshot().channel
    }

    pub fn rates(&self) -> Option<ExchangeRates> {
        self.snapshot().rates
    }

    pub(crate) fn update<K: KVStore, R: Relay + 'static, C: Confirm>(
        &self,
        engine: &SyncEngine<K, R, C>,
    ) {
        let view = LedgerView {
            state: engine.state().clone(),
            totals: engine.totals(),
            status: engine.status(),
            last_message_at: engine.last_message_at(),
            role: engine.role(),
            channel: engine.channel().clone(),
            rates: engine.rates(),
        };
        match self.0.write() {
            Ok(mut guard) => *guard = view,
            Err(poisoned) => *poisoned.into_inner() = view,
        }
    }
}
