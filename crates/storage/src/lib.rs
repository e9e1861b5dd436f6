//! Persistent storage layer for carbonchain.
//!
//! This crate provides the storage backend for the ledger:
//! - Contract state (registries, balances, orchestrator bindings)
//! - Staged writes committed as one atomic batch
//! - Sealed blocks, receipts and the idempotency index
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Execution Layer                       │
//! │          (Executor, contracts, ExecutionContext)         │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │ StagedState │  │ ChainStore  │  │ Storage (DB)    │  │
//! │  │  - overlay  │  │  - Blocks   │  │  - sled wrapper │  │
//! │  │  - savepoint│  │  - Receipts │  │  - serialization│  │
//! │  │  - commit   │  │  - Head     │  │  - key helpers  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use carbonchain_storage::{StagedState, StateRead, Storage};
//!
//! let storage = Storage::open("./ledger_data").unwrap();
//!
//! let mut staged = StagedState::new(&storage);
//! staged.put(b"greeting".to_vec(), &"hello").unwrap();
//! // Nothing is visible in `storage` until the batch commits.
//! staged.commit().unwrap();
//!
//! let value: Option<String> = storage.read(b"greeting").unwrap();
//! assert_eq!(value.as_deref(), Some("hello"));
//! ```

pub mod chain;
pub mod db;
pub mod staged;

// Re-export commonly used types
pub use chain::{ChainHead, ChainStore};
pub use db::{BatchOp, Result, StateRead, Storage, StorageError};
pub use staged::{Savepoint, StagedState};
