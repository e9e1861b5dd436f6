//! Core ledger primitives for carbonchain.
//!
//! This crate provides the types shared by every layer of the ledger:
//! - Addresses and blake3 hashes
//! - Users, products and supply-chain operations
//! - Contract events
//! - Write calls, sealed blocks and receipts
//! - The error taxonomy shared by all crates

pub mod address;
pub mod block;
pub mod call;
pub mod error;
pub mod event;
pub mod hash;
pub mod operation;
pub mod product;
pub mod user;

/// Token amount with 18 fractional decimals.
pub type Amount = u128;

// Re-export commonly used types at the crate root
pub use address::{Address, AddressError};
pub use block::{Block, Receipt};
pub use call::{Call, ContractKind, ContractSpec, IdempotencyKey, InvalidIdempotencyKey, Method};
pub use error::ErrorKind;
pub use event::{EventLog, LedgerEvent};
pub use hash::{hash, hash_concat, hash_encoded, Hash, H256};
pub use operation::{Operation, OperationId, Settlement};
pub use product::{NewProduct, Product, ProductId};
pub use user::{Role, UnknownRole, User};
