/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Load-on-start, save-on-every-change persistence of the ledger.

use crate::types::{basic::ChannelKey, ledger_state::LedgerState};

use super::pluggables::{KVGet, KVStore, KVStoreError, WriteBatch};

/// Storage key of the current snapshot schema. A breaking schema change gets a new key; data under old
/// keys is simply orphaned.
pub const DEFAULT_SNAPSHOT_SLOT: &str = "shivas_beach_cabanas_data_v1";

/// Storage key of the last channel key used on this device.
pub const DEFAULT_CHANNEL_KEY_SLOT: &str = "shivas_beach_cabanas_sync_id";

/// Reads and writes the snapshot slot and the channel-key slot of a [`KVStore`].
#[derive(Clone)]
pub struct SnapshotStore<K: KVStore> {
    kv_store: K,
    snapshot_slot: String,
    channel_key_slot: String,
}

impl<K: KVStore> SnapshotStore<K> {
    pub fn new(kv_store: K, snapshot_slot: &str, channel_key_slot: &str) -> Self {
        Self {
            kv_store,
            snapshot_slot: snapshot_slot.to_string(),
            channel_key_slot: channel_key_slot.to_string(),
        }
    }

    /// Load the persisted ledger. An absent or unreadable snapshot yields an empty ledger; the error is
    /// logged and otherwise swallowed.
    pub fn load(&self) -> LedgerState {
        match self.kv_store.ledger_snapshot(&self.snapshot_slot) {
            Ok(Some(state)) => state,
            Ok(None) => LedgerState::new(),
            Err(err) => {
                log::warn!("Discarding persisted snapshot: {}", err);
                LedgerState::new()
            }
        }
    }

    /// Overwrite the snapshot slot with `state`. Not retried on failure.
    pub fn save(&mut self, state: &LedgerState) -> Result<(), KVStoreError> {
        let mut wb = K::WriteBatch::new();
        wb.set_ledger_snapshot(&self.snapshot_slot, state)?;
        self.kv_store.write(wb)
    }

    pub fn load_channel_key(&self) -> Option<ChannelKey> {
        match self.kv_store.last_channel_key(&self.channel_key_slot) {
            Ok(key) => key,
            Err(err) => {
                log::warn!("Discarding persisted channel key: {}", err);
                None
            }
        }
    }

    pub fn save_channel_key(&mut self, key: &ChannelKey) -> Result<(), KVStoreError> {
        let mut wb = K::WriteBatch::new();
        wb.set_last_channel_key(&self.channel_key_slot, key);
        self.kv_store.write(wb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        persistence::fs_store::FsKVStore,
        types::entries::{MainEntry, OutPartyEntry},
    };

    fn store(dir: &tempfile::TempDir) -> SnapshotStore<FsKVStore> {
        SnapshotStore::new(
            FsKVStore::open(dir.path()).unwrap(),
            DEFAULT_SNAPSHOT_SLOT,
            DEFAULT_CHANNEL_KEY_SLOT,
        )
    }

    fn sample_state() -> LedgerState {
        LedgerState {
            out_party_entries: vec![OutPartyEntry {
                id: "1700000000000".to_string(),
                timestamp: "09:30".to_string(),
                cash: 500.25,
                card: 300.0,
                paypal: 0.1,
            }],
            main_entries: vec![MainEntry {
                id: "1700000000001".to_string(),
                timestamp: "09:31".to_string(),
                is_card: true,
                is_paypal: true,
                room_number: "Cabana 3".to_string(),
                description: "Breakfast \"special\" – ünïcode".to_string(),
                cash_in: 1234.5678,
                cash_out: 0.0,
            }],
            initial_balance: -17.25,
        }
    }

    #[test]
    fn load_without_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store(&dir).load(), LedgerState::new());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshots = store(&dir);
        let state = sample_state();

        snapshots.save(&state).unwrap();
        assert_eq!(snapshots.load(), state);
    }

    #[test]
    fn malformed_snapshot_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FsKVStore::open(dir.path()).unwrap();
        let mut wb = <FsKVStore as KVStore>::WriteBatch::new();
        wb.set(DEFAULT_SNAPSHOT_SLOT.as_bytes(), b"{\"mainEntries\": [");
        kv.write(wb).unwrap();

        assert_eq!(store(&dir).load(), LedgerState::new());
    }

    #[test]
    fn channel_key_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut snapshots = store(&dir);
        assert_eq!(snapshots.load_channel_key(), None);

        let key = ChannelKey::parse("front-desk").unwrap();
        snapshots.save_channel_key(&key).unwrap();
        assert_eq!(snapshots.load_channel_key(), Some(key));
    }
}
