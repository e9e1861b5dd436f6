//! Staged writes committed as a single atomic batch.
//!
//! Every write of a call goes into a [`StagedState`] first. Reads through the
//! staged state see the pending writes layered over committed storage. On
//! success the whole set is applied with one `sled` batch; on failure it is
//! dropped and committed storage is untouched.

use crate::db::{BatchOp, Result, StateRead, Storage};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Pending writes layered over committed storage.
pub struct StagedState<'a> {
    storage: &'a Storage,
    /// `None` marks a staged deletion.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// Position in a [`StagedState`] that can be restored with [`StagedState::rollback_to`].
#[derive(Debug, Clone)]
pub struct Savepoint {
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StagedState<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            writes: BTreeMap::new(),
        }
    }

    /// Stage a serializable value under `key`.
    pub fn put<V: Serialize>(&mut self, key: Vec<u8>, value: &V) -> Result<()> {
        let encoded = bincode::serialize(value)?;
        self.writes.insert(key, Some(encoded));
        Ok(())
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    /// Number of distinct keys touched.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn savepoint(&self) -> Savepoint {
        Savepoint {
            writes: self.writes.clone(),
        }
    }

    /// Drop every write staged after `savepoint` was taken.
    pub fn rollback_to(&mut self, savepoint: Savepoint) {
        self.writes = savepoint.writes;
    }

    /// Apply all staged writes atomically. Returns the number of keys written.
    pub fn commit(self) -> Result<usize> {
        let count = self.writes.len();
        let ops = self
            .writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOp::Insert { key, value },
                None => BatchOp::Remove { key },
            })
            .collect();
        self.storage.batch(ops)?;
        debug!(keys = count, "committed staged writes");
        Ok(count)
    }

    /// Discard all staged writes. Returns the number of keys dropped.
    pub fn discard(self) -> usize {
        let count = self.writes.len();
        debug!(keys = count, "discarded staged writes");
        count
    }
}

impl StateRead for StagedState<'_> {
    fn read_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.storage.read_raw(key),
        }
    }
}
