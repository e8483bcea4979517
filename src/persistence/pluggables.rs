/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable snapshot persistence.

use thiserror::Error;

use crate::types::{basic::ChannelKey, ledger_state::LedgerState};

pub trait KVStore: KVGet + Clone + Send + 'static {
    type WriteBatch: WriteBatch;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVStoreError>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Ledger snapshot ↓↓↓ */

    fn ledger_snapshot(&self, slot: &str) -> Result<Option<LedgerState>, KVGetError> {
        match self.get(slot.as_bytes()) {
            Some(bytes) => {
                let json = String::from_utf8(bytes).map_err(|_| KVGetError::NotUtf8 {
                    slot: slot.to_string(),
                })?;
                let state = LedgerState::from_json(&json).map_err(|err| {
                    KVGetError::DeserializeValueError {
                        slot: slot.to_string(),
                        source: err,
                    }
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /* ↓↓↓ Last used channel key ↓↓↓ */

    fn last_channel_key(&self, slot: &str) -> Result<Option<ChannelKey>, KVGetError> {
        match self.get(slot.as_bytes()) {
            Some(bytes) => {
                let key = String::from_utf8(bytes).map_err(|_| KVGetError::NotUtf8 {
                    slot: slot.to_string(),
                })?;
                Ok(ChannelKey::parse(&key))
            }
            None => Ok(None),
        }
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);

    fn set_ledger_snapshot(&mut self, slot: &str, state: &LedgerState) -> Result<(), KVStoreError> {
        let json = state.to_json().map_err(KVStoreError::Serialize)?;
        self.set(slot.as_bytes(), json.as_bytes());
        Ok(())
    }

    fn set_last_channel_key(&mut self, slot: &str, key: &ChannelKey) {
        self.set(slot.as_bytes(), key.as_str().as_bytes())
    }
}

/// Error when trying to read a value from a slot.
#[derive(Debug, Error)]
pub enum KVGetError {
    #[error("value in slot {slot} is not valid UTF-8")]
    NotUtf8 { slot: String },

    #[error("failed to deserialize value in slot {slot}: {source}")]
    DeserializeValueError {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error when trying to write to the store.
#[derive(Debug, Error)]
pub enum KVStoreError {
    #[error("failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
