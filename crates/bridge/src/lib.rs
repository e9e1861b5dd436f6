//! Client facade over the carbonchain ledger.
//!
//! - [`Bridge`]: async writes that resolve to confirmed receipts, typed reads,
//!   bounded retry with idempotency keys and id recovery from events
//! - [`BlockingBridge`]: the same surface for synchronous callers
//! - [`Deployment`]: contract name to address manifest, with a bootstrap
//!   that deploys and wires every contract
//! - [`BridgeResponse`]: `{"ok": ...}` / `{"error": {...}}` JSON envelope
//!
//! # Example
//!
//! ```rust,no_run
//! use carbonchain_bridge::{Bridge, BridgeConfig, Deployment};
//! use carbonchain_chain::Ledger;
//! use carbonchain_core::{Address, NewProduct};
//! use std::sync::Arc;
//!
//! # async fn run() -> carbonchain_bridge::Result<()> {
//! let ledger = Arc::new(Ledger::open_temporary()?);
//! let admin = Address::from_bytes([0xA0; 20]);
//! let deployment = Deployment::bootstrap(&ledger, admin)?;
//!
//! let farmer = Address::from_bytes([0x01; 20]);
//! let bridge = Bridge::new(ledger, deployment, BridgeConfig::for_account(farmer));
//! bridge.register_user("Green Farm", "farm@example.com", "PRODUCER").await?;
//! let id = bridge
//!     .create_product(NewProduct::new("Apples", "desc", "fruit", "kg", ""))
//!     .await?;
//! println!("created product {}", id);
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod manifest;
pub mod response;

pub use blocking::BlockingBridge;
pub use client::Bridge;
pub use command::{
    AccountArgs, AmountArgs, BridgeCommand, BridgeRequest, EmissionArgs, OperationArgs,
    OperationOutcome, ProductArgs, TransferArgs, UserArgs, FUNCTIONS,
};
pub use config::{BridgeConfig, RetryPolicy, CONFIG_ENV};
pub use error::{BridgeError, Result};
pub use manifest::{ContractEntry, Deployment};
pub use response::{BridgeResponse, ErrorBody};
