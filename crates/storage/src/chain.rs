//! Block, receipt and idempotency storage.

use crate::db::{Result, StateRead, Storage, StorageError};
use crate::staged::StagedState;
use carbonchain_core::{Block, Hash, IdempotencyKey, Receipt};
use serde::{Deserialize, Serialize};

/// Keys for chain metadata.
const CHAIN_HEAD_KEY: &[u8] = b"chain:head";

/// Latest sealed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub height: u64,
    pub hash: Hash,
}

impl ChainHead {
    /// Head of a chain with no committed calls.
    pub const EMPTY: Self = Self {
        height: 0,
        hash: Hash::ZERO,
    };
}

/// Idempotency index entry: the call first committed under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct IdempotencyRecord {
    call_hash: Hash,
    block_height: u64,
}

/// Manages sealed blocks, receipts and the chain head.
pub struct ChainStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChainStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Reads (committed state)
    // =========================================================================

    pub fn head(&self) -> Result<ChainHead> {
        Ok(self
            .storage
            .read::<ChainHead>(CHAIN_HEAD_KEY)?
            .unwrap_or(ChainHead::EMPTY))
    }

    pub fn height(&self) -> Result<u64> {
        Ok(self.head()?.height)
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>> {
        self.storage.read(&Storage::block_height_key(height))
    }

    /// Receipt of the call sealed at `height`.
    pub fn receipt(&self, height: u64) -> Result<Option<Receipt>> {
        self.storage.read(&Storage::receipt_key(height))
    }

    fn idempotency_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        self.storage.read(&Storage::idempotency_key(key))
    }

    /// Call hash first committed under `key`, if any.
    pub fn call_for_key(&self, key: &IdempotencyKey) -> Result<Option<Hash>> {
        Ok(self.idempotency_record(key)?.map(|record| record.call_hash))
    }

    /// Receipt of the call committed under `key`.
    ///
    /// An index entry without its receipt means the store is damaged.
    pub fn receipt_for_key(&self, key: &IdempotencyKey) -> Result<Option<Receipt>> {
        match self.idempotency_record(key)? {
            Some(record) => self.receipt(record.block_height)?.map(Some).ok_or_else(|| {
                StorageError::Corrupted(format!(
                    "idempotency key {} points at missing receipt at height {}",
                    key, record.block_height
                ))
            }),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Staged writes
    // =========================================================================

    /// Stage a sealed block with its receipt and advance the head.
    ///
    /// Validates that `block` extends `head`; the caller commits `staged`.
    pub fn stage_block(
        staged: &mut StagedState<'_>,
        head: &ChainHead,
        block: &Block,
        receipt: &Receipt,
        key: Option<&IdempotencyKey>,
    ) -> Result<ChainHead> {
        if block.height != head.height + 1 {
            return Err(StorageError::Corrupted(format!(
                "expected block height {}, got {}",
                head.height + 1,
                block.height
            )));
        }
        if block.prev_hash != head.hash {
            return Err(StorageError::Corrupted(format!(
                "block prev_hash {} doesn't match chain head {}",
                block.prev_hash, head.hash
            )));
        }

        let new_head = ChainHead {
            height: block.height,
            hash: block.hash(),
        };
        staged.put(Storage::block_height_key(block.height), block)?;
        staged.put(Storage::receipt_key(block.height), receipt)?;
        if let Some(key) = key {
            staged.put(
                Storage::idempotency_key(key),
                &IdempotencyRecord {
                    call_hash: receipt.call_hash,
                    block_height: block.height,
                },
            )?;
        }
        staged.put(CHAIN_HEAD_KEY.to_vec(), &new_head)?;
        Ok(new_head)
    }
}
