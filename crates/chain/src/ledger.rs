//! The ledger: single-writer serialization point over the contract state.
//!
//! Writes go through [`Ledger::submit`], which holds one lock for the whole
//! execute, seal and commit sequence, so calls form a single total order.
//! Each committed call is sealed into its own block and its staged writes,
//! block, receipt and idempotency record land in one sled batch. Reads never
//! take the lock; they go straight to committed storage.

use crate::executor::{ExecutionError, Executor};
use carbonchain_contracts::{
    Bindings, CarbonToken, ContractDirectory, ContractError, ContractRecord, OperationRegistry,
    ProductRegistry, SupplyChain, TokenMetadata, UserRegistry,
};
use carbonchain_core::{
    Address, Amount, Block, Call, ContractKind, ErrorKind, Hash, IdempotencyKey, Operation,
    OperationId, Product, ProductId, Receipt, User,
};
use carbonchain_storage::{ChainHead, ChainStore, StagedState, Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("call rejected: {0}")]
    Rejected(#[from] ExecutionError),

    #[error("idempotency key {key} was already used for call {existing}")]
    IdempotencyConflict { key: IdempotencyKey, existing: Hash },
}

impl From<ContractError> for LedgerError {
    fn from(err: ContractError) -> Self {
        LedgerError::Rejected(ExecutionError::Contract(err))
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Storage(_) => ErrorKind::Infrastructure,
            LedgerError::Rejected(err) => err.kind(),
            LedgerError::IdempotencyConflict { .. } => ErrorKind::Conflict,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(err) => err.is_retryable(),
            LedgerError::Rejected(err) => err.is_retryable(),
            LedgerError::IdempotencyConflict { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// sled directory; `None` opens a temporary database.
    pub data_dir: Option<PathBuf>,
    /// Flush sled to disk after every committed call.
    pub flush_on_commit: bool,
}

impl LedgerConfig {
    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            flush_on_commit: true,
        }
    }
}

/// Single-writer ledger over sled storage.
pub struct Ledger {
    storage: Storage,
    config: LedgerConfig,
    /// Writer lock; guards the cached chain head.
    writer: Mutex<ChainHead>,
    head_tx: watch::Sender<u64>,
}

impl Ledger {
    /// Open the ledger described by `config`, restoring any committed state.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let storage = match &config.data_dir {
            Some(dir) => Storage::open(dir)?,
            None => Storage::open_temporary()?,
        };
        let head = ChainStore::new(&storage).head()?;
        let (head_tx, _) = watch::channel(head.height);
        info!(height = head.height, persistent = config.data_dir.is_some(), "ledger opened");

        Ok(Self {
            storage,
            config,
            writer: Mutex::new(head),
            head_tx,
        })
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_temporary() -> Result<Self> {
        Self::open(LedgerConfig::default())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock_writer(&self) -> MutexGuard<'_, ChainHead> {
        // A panic mid-submit leaves nothing committed, so the cached head is still valid.
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Execute, seal and commit one call.
    ///
    /// A call carrying an idempotency key that was already committed with the
    /// same call hash returns the stored receipt without executing again.
    pub fn submit(&self, call: Call) -> Result<Receipt> {
        let mut head = self.lock_writer();
        let call_hash = call.hash();

        if let Some(key) = &call.idempotency_key {
            let chain = ChainStore::new(&self.storage);
            if let Some(existing) = chain.call_for_key(key)? {
                if existing != call_hash {
                    warn!(%key, %existing, %call_hash, "idempotency key reused for a different call");
                    return Err(LedgerError::IdempotencyConflict {
                        key: *key,
                        existing,
                    });
                }
                let receipt = chain.receipt_for_key(key)?.ok_or_else(|| {
                    StorageError::Corrupted(format!("no receipt for idempotency key {}", key))
                })?;
                debug!(%key, height = receipt.block_height, "replaying committed call");
                return Ok(receipt);
            }
        }

        let timestamp = Block::current_timestamp();
        let mut staged = StagedState::new(&self.storage);
        let events = match Executor::execute(&mut staged, &call, timestamp) {
            Ok(events) => events,
            Err(err) => {
                let dropped = staged.discard();
                warn!(
                    method = call.method.name(),
                    caller = %call.caller,
                    kind = %err.kind(),
                    dropped,
                    "call rejected: {}",
                    err
                );
                return Err(err.into());
            }
        };

        let block = Block::new(head.height + 1, timestamp, head.hash, call_hash);
        let receipt = Receipt {
            call_hash,
            block_height: block.height,
            block_hash: block.hash(),
            caller: call.caller,
            target: call.target,
            events,
        };
        let new_head = ChainStore::stage_block(
            &mut staged,
            &head,
            &block,
            &receipt,
            call.idempotency_key.as_ref(),
        )?;
        let keys = staged.commit()?;
        *head = new_head;
        self.head_tx.send_replace(new_head.height);
        if self.config.flush_on_commit {
            self.storage.flush()?;
        }
        info!(
            height = new_head.height,
            method = call.method.name(),
            call = %call_hash,
            events = receipt.events.len(),
            keys,
            "committed call"
        );
        Ok(receipt)
    }

    // =========================================================================
    // Chain reads
    // =========================================================================

    pub fn head(&self) -> Result<ChainHead> {
        Ok(ChainStore::new(&self.storage).head()?)
    }

    pub fn height(&self) -> Result<u64> {
        Ok(self.head()?.height)
    }

    pub fn block(&self, height: u64) -> Result<Option<Block>> {
        Ok(ChainStore::new(&self.storage).block_by_height(height)?)
    }

    /// Receipt of the call sealed at `height`.
    pub fn receipt(&self, height: u64) -> Result<Option<Receipt>> {
        Ok(ChainStore::new(&self.storage).receipt(height)?)
    }

    /// Confirmation depth of `receipt` against the current head.
    pub fn confirmations(&self, receipt: &Receipt) -> Result<u64> {
        Ok(receipt.confirmations(self.height()?))
    }

    /// Watch the head height; it changes after every committed call.
    pub fn subscribe_head(&self) -> watch::Receiver<u64> {
        self.head_tx.subscribe()
    }

    // =========================================================================
    // Contract reads (committed state, no writer lock)
    // =========================================================================

    pub fn contract(&self, address: &Address) -> Result<Option<ContractRecord>> {
        Ok(ContractDirectory::record(&self.storage, address)?)
    }

    fn expect_kind(&self, address: &Address, kind: ContractKind) -> Result<()> {
        ContractDirectory::expect_kind(&self.storage, address, kind)?;
        Ok(())
    }

    pub fn is_user_registered(&self, registry: &Address, user: &Address) -> Result<bool> {
        self.expect_kind(registry, ContractKind::UserRegistry)?;
        Ok(UserRegistry::at(*registry).is_user_registered(&self.storage, user)?)
    }

    pub fn get_user(&self, registry: &Address, user: &Address) -> Result<Option<User>> {
        self.expect_kind(registry, ContractKind::UserRegistry)?;
        Ok(UserRegistry::at(*registry).get_user(&self.storage, user)?)
    }

    pub fn user_count(&self, registry: &Address) -> Result<u64> {
        self.expect_kind(registry, ContractKind::UserRegistry)?;
        Ok(UserRegistry::at(*registry).user_count(&self.storage)?)
    }

    pub fn get_product(&self, registry: &Address, id: ProductId) -> Result<Option<Product>> {
        self.expect_kind(registry, ContractKind::ProductRegistry)?;
        Ok(ProductRegistry::at(*registry).get_product(&self.storage, id)?)
    }

    pub fn product_count(&self, registry: &Address) -> Result<u64> {
        self.expect_kind(registry, ContractKind::ProductRegistry)?;
        Ok(ProductRegistry::at(*registry).product_count(&self.storage)?)
    }

    pub fn get_operation(&self, registry: &Address, id: OperationId) -> Result<Option<Operation>> {
        self.expect_kind(registry, ContractKind::OperationRegistry)?;
        Ok(OperationRegistry::at(*registry).get_operation(&self.storage, id)?)
    }

    pub fn operation_count(&self, registry: &Address) -> Result<u64> {
        self.expect_kind(registry, ContractKind::OperationRegistry)?;
        Ok(OperationRegistry::at(*registry).operation_count(&self.storage)?)
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> Result<Amount> {
        self.expect_kind(token, ContractKind::CarbonToken)?;
        Ok(CarbonToken::at(*token).balance_of(&self.storage, holder)?)
    }

    pub fn total_supply(&self, token: &Address) -> Result<Amount> {
        self.expect_kind(token, ContractKind::CarbonToken)?;
        Ok(CarbonToken::at(*token).total_supply(&self.storage)?)
    }

    pub fn token_metadata(&self, token: &Address) -> Result<TokenMetadata> {
        self.expect_kind(token, ContractKind::CarbonToken)?;
        Ok(CarbonToken::metadata())
    }

    pub fn bindings(&self, orchestrator: &Address) -> Result<Option<Bindings>> {
        self.expect_kind(orchestrator, ContractKind::SupplyChain)?;
        Ok(SupplyChain::at(*orchestrator).bindings(&self.storage)?)
    }
}
