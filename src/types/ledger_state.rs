/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The root aggregate of a ledger terminal.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    basic::Amount,
    entries::{MainEntry, OutPartyEntry},
};

/// The complete state of a ledger day.
///
/// `LedgerState` as a whole is the unit of persistence and of replication: there is no field-level
/// merge, a terminal either keeps its state or replaces it wholesale with a snapshot.
///
/// Both collections are kept in insertion order, which is also chronological order. `initial_balance`
/// is the balance carried forward from the previous day, and only changes when the day ends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub out_party_entries: Vec<OutPartyEntry>,
    pub main_entries: Vec<MainEntry>,
    pub initial_balance: Amount,
}

impl LedgerState {
    /// An empty ledger with nothing carried forward.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize into the JSON text used both for the persisted snapshot and for the replication
    /// payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<LedgerState, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// SHA256 digest of a serialized snapshot. Used to recognize a snapshot that has already been
/// applied, and to identify snapshots in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotDigest([u8; 32]);

impl SnapshotDigest {
    pub fn of(payload: &str) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(payload.as_bytes()));
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}
