/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A [`KVStore`] that keeps one file per key in a directory.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use super::pluggables::{KVGet, KVStore, KVStoreError, WriteBatch};

/// Directory-backed key-value store.
///
/// File names are the hex encoding of the key, so arbitrary keys are safe. Values are written to a
/// temporary file first and then renamed over the old value, so a crash mid-write leaves either the
/// old or the new value in place.
#[derive(Clone, Debug)]
pub struct FsKVStore {
    dir: PathBuf,
}

impl FsKVStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<FsKVStore, KVStoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FsKVStore { dir })
    }

    fn path_of(&self, key: &[u8]) -> PathBuf {
        let mut name = String::with_capacity(key.len() * 2);
        for byte in key {
            // Safety: writing into a String cannot fail.
            let _ = write!(name, "{:02x}", byte);
        }
        self.dir.join(name)
    }
}

impl KVStore for FsKVStore {
    type WriteBatch = FsWriteBatch;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVStoreError> {
        for op in wb.ops {
            match op {
                FsWriteOp::Set(key, value) => {
                    let path = self.path_of(&key);
                    let tmp = path.with_extension("tmp");
                    fs::write(&tmp, value)?;
                    fs::rename(&tmp, &path)?;
                }
                FsWriteOp::Delete(key) => match fs::remove_file(self.path_of(&key)) {
                    Ok(()) => (),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => (),
                    Err(err) => return Err(err.into()),
                },
            }
        }
        Ok(())
    }
}

impl KVGet for FsKVStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match fs::read(self.path_of(key)) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("Failed to read {:?}: {}", self.path_of(key), err);
                None
            }
        }
    }
}

enum FsWriteOp {
    Set(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Write batch of [`FsKVStore`]. Operations are applied in the order they were added.
pub struct FsWriteBatch {
    ops: Vec<FsWriteOp>,
}

impl WriteBatch for FsWriteBatch {
    fn new() -> Self {
        FsWriteBatch { ops: Vec::new() }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(FsWriteOp::Set(key.to_vec(), value.to_vec()))
    }

    fn delete(&mut self, key: &[u8]) {
        self.ops.push(FsWriteOp::Delete(key.to_vec()))
    }
}
