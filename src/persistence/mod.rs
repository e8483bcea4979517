/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Durable local snapshot of the ledger.
//!
//! The library user provides the storage by implementing the [`KVStore`] trait (or by using the
//! bundled [`FsKVStore`]). On top of it, [`SnapshotStore`] keeps exactly one slot per schema version
//! holding the serialized [`LedgerState`](crate::types::ledger_state::LedgerState), plus one slot
//! holding the last channel key this device used.

pub mod fs_store;

pub mod pluggables;

pub mod snapshot_store;

pub use fs_store::FsKVStore;
pub use pluggables::{KVGet, KVGetError, KVStore, KVStoreError, WriteBatch};
pub use snapshot_store::SnapshotStore;
