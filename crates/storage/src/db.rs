//! sled database wrapper with serialization helpers.

use carbonchain_core::{Address, IdempotencyKey};
use serde::de::DeserializeOwned;
use sled::Db;
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Corrupted chain state: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Database I/O failures may succeed when repeated; the rest will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Database(sled::Error::Io(_)))
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Read access to ledger state.
///
/// Implemented by [`Storage`] (committed state) and by
/// [`StagedState`](crate::StagedState) (committed state plus pending writes).
pub trait StateRead {
    /// Raw bytes stored under `key`.
    fn read_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Retrieve and deserialize a value.
    fn read<V: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<V>> {
        match self.read_raw(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.read_raw(key)?.is_some())
    }
}

/// Wrapper around sled database with serialization helpers.
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: DeserializeOwned,
    {
        self.read(key.as_ref())
    }

    /// Apply multiple operations atomically.
    ///
    /// sled's `apply_batch` makes the whole batch visible at once or not at
    /// all; readers never observe a prefix of it.
    pub fn batch(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // Key Construction Helpers
    // =========================================================================

    /// Format: prefix + scope_address + ":" + suffix
    fn scoped_key(prefix: &[u8], scope: &Address, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + 21 + suffix.len());
        key.extend_from_slice(prefix);
        key.extend_from_slice(&scope.0);
        key.push(b':');
        key.extend_from_slice(suffix);
        key
    }

    /// Directory entry for a deployed contract instance.
    pub fn contract_key(address: &Address) -> Vec<u8> {
        Self::scoped_key(b"contract:", address, &[])
    }

    /// Number of contracts deployed by `deployer`.
    pub fn deploy_nonce_key(deployer: &Address) -> Vec<u8> {
        Self::scoped_key(b"nonce:", deployer, &[])
    }

    pub fn user_key(registry: &Address, user: &Address) -> Vec<u8> {
        Self::scoped_key(b"user:", registry, &user.0)
    }

    pub fn user_count_key(registry: &Address) -> Vec<u8> {
        Self::scoped_key(b"count:user:", registry, &[])
    }

    /// Ids are big-endian so keys sort in id order.
    pub fn product_key(registry: &Address, id: u64) -> Vec<u8> {
        Self::scoped_key(b"product:", registry, &id.to_be_bytes())
    }

    pub fn product_count_key(registry: &Address) -> Vec<u8> {
        Self::scoped_key(b"count:product:", registry, &[])
    }

    pub fn operation_key(registry: &Address, id: u64) -> Vec<u8> {
        Self::scoped_key(b"operation:", registry, &id.to_be_bytes())
    }

    pub fn operation_count_key(registry: &Address) -> Vec<u8> {
        Self::scoped_key(b"count:operation:", registry, &[])
    }

    pub fn balance_key(token: &Address, holder: &Address) -> Vec<u8> {
        Self::scoped_key(b"balance:", token, &holder.0)
    }

    pub fn total_supply_key(token: &Address) -> Vec<u8> {
        Self::scoped_key(b"supply:", token, &[])
    }

    /// Registry bindings of a SupplyChain instance.
    pub fn bindings_key(orchestrator: &Address) -> Vec<u8> {
        Self::scoped_key(b"bindings:", orchestrator, &[])
    }

    /// Format: "block:height:{height}"
    pub fn block_height_key(height: u64) -> Vec<u8> {
        format!("block:height:{}", height).into_bytes()
    }

    /// Format: "receipt:height:{height}"
    pub fn receipt_key(height: u64) -> Vec<u8> {
        format!("receipt:height:{}", height).into_bytes()
    }

    /// Format: "idempotency:" + key_bytes
    pub fn idempotency_key(key: &IdempotencyKey) -> Vec<u8> {
        let mut out = b"idempotency:".to_vec();
        out.extend_from_slice(&key.0);
        out
    }
}

impl StateRead for Storage {
    fn read_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|ivec| ivec.to_vec()))
    }
}

/// Batch operation for atomic updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}
