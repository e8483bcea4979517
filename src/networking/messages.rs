/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The replication message.
//!
//! Every message is a JSON object of the form:
//!
//! ```text
//! {"payload": "<LedgerState as JSON text>", "updatedAt": 1701329264123, "sender": "9f0c...", "epoch": 1701329000000}
//! ```
//!
//! `payload` is absent on payload-less heartbeats. `sender` and `epoch` are optional so that messages
//! from publishers that do not set them are still accepted.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    basic::{millis_since_unix_epoch, Epoch, SenderTag},
    ledger_state::{LedgerState, SnapshotDigest},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, alias = "timestamp")]
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<Epoch>,
}

impl SyncMessage {
    /// A message carrying the whole of `state`.
    pub fn snapshot(
        state: &LedgerState,
        sender: SenderTag,
        epoch: Option<Epoch>,
    ) -> Result<SyncMessage, serde_json::Error> {
        Ok(SyncMessage {
            payload: Some(state.to_json()?),
            updated_at: millis_since_unix_epoch(SystemTime::now()),
            sender: Some(sender),
            epoch,
        })
    }

    /// A message that only proves the publisher is alive.
    pub fn heartbeat(sender: SenderTag, epoch: Option<Epoch>) -> SyncMessage {
        SyncMessage {
            payload: None,
            updated_at: millis_since_unix_epoch(SystemTime::now()),
            sender: Some(sender),
            epoch,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<SyncMessage, DecodeError> {
        serde_json::from_str(raw).map_err(DecodeError::Envelope)
    }

    /// Decode the carried snapshot, if any, together with the digest of its payload text.
    pub fn ledger_state(&self) -> Result<Option<(LedgerState, SnapshotDigest)>, DecodeError> {
        match &self.payload {
            Some(payload) => {
                let state = LedgerState::from_json(payload).map_err(DecodeError::Payload)?;
                Ok(Some((state, SnapshotDigest::of(payload))))
            }
            None => Ok(None),
        }
    }
}

/// Error when decoding a message received from the relay.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("malformed snapshot payload: {0}")]
    Payload(#[source] serde_json::Error),
}
