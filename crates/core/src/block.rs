//! Sealed blocks and call receipts.
//!
//! The ledger seals every committed call into its own block, so a block's
//! height doubles as the call's position in the global write order.

use crate::address::Address;
use crate::event::{EventLog, LedgerEvent};
use crate::hash::{hash_encoded, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height of this block; the first committed call lands at height 1.
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub prev_hash: Hash,
    /// Hash of the single call sealed in this block.
    pub call_hash: Hash,
}

impl Block {
    pub fn new(height: u64, timestamp: u64, prev_hash: Hash, call_hash: Hash) -> Self {
        Self {
            height,
            timestamp,
            prev_hash,
            call_hash,
        }
    }

    pub fn hash(&self) -> Hash {
        hash_encoded(self)
    }

    /// Get the current Unix timestamp.
    pub fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Result of a committed call: where it was sealed and what it emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub call_hash: Hash,
    pub block_height: u64,
    pub block_hash: Hash,
    pub caller: Address,
    pub target: Address,
    pub events: Vec<EventLog>,
}

impl Receipt {
    /// Number of blocks at or above this receipt's block, given the current head.
    pub fn confirmations(&self, head_height: u64) -> u64 {
        if head_height < self.block_height {
            0
        } else {
            head_height - self.block_height + 1
        }
    }

    /// First event emitted by `emitter` matching `select`.
    pub fn find_event<T>(
        &self,
        emitter: &Address,
        select: impl Fn(&LedgerEvent) -> Option<T>,
    ) -> Option<T> {
        self.events
            .iter()
            .filter(|log| &log.emitter == emitter)
            .find_map(|log| select(&log.event))
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(|log| log.event.name()).collect()
    }
}
