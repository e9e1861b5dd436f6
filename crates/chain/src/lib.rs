//! Call execution and the single-writer ledger for carbonchain.
//!
//! This crate turns contract calls into committed, ordered history:
//! - **Executor**: dispatches a call to its contract over staged state
//! - **Ledger**: serializes writes, seals one block per call, commits
//!   atomically, replays idempotent calls and serves lock-free reads
//!
//! # Example
//!
//! ```rust,no_run
//! use carbonchain_chain::{Ledger, LedgerConfig};
//! use carbonchain_core::{Address, Call, ContractSpec, LedgerEvent, Method};
//!
//! let ledger = Ledger::open(LedgerConfig::persistent("./ledger_data")).unwrap();
//! let admin = Address::from_bytes([1u8; 20]);
//!
//! let receipt = ledger.submit(Call::deploy(admin, ContractSpec::CarbonToken)).unwrap();
//! let token = match receipt.events[0].event {
//!     LedgerEvent::Deployed { address, .. } => address,
//!     _ => unreachable!(),
//! };
//!
//! ledger
//!     .submit(Call::new(admin, token, Method::RewardCompensatoryAction { amount: 1000 }))
//!     .unwrap();
//! assert_eq!(ledger.balance_of(&token, &admin).unwrap(), 1000);
//! ```

pub mod executor;
pub mod ledger;

// Re-export commonly used types
pub use executor::{ExecutionError, Executor};
pub use ledger::{Ledger, LedgerConfig, LedgerError, Result};
