//! Contracts hosted by the carbonchain ledger.
//!
//! Each contract is a thin handle around its instance address; all state
//! lives in the [`StagedState`](carbonchain_storage::StagedState) reached
//! through an [`ExecutionContext`]. Writes take the context, reads take any
//! [`StateRead`](carbonchain_storage::StateRead) so they work against both
//! committed storage and a call in flight.
//!
//! ```text
//!                 ┌──────────────┐
//!                 │  SupplyChain │
//!                 └──────┬───────┘
//!      ┌──────────┬──────┴─────┬─────────────┐
//!      ▼          ▼            ▼             ▼
//! UserRegistry ProductRegistry OperationRegistry CarbonToken
//! ```

pub mod context;
pub mod directory;
pub mod error;
pub mod operations;
pub mod orchestrator;
pub mod products;
pub mod token;
pub mod users;

pub use context::ExecutionContext;
pub use directory::{ContractDirectory, ContractRecord};
pub use error::{ContractError, Result};
pub use operations::{OperationEntry, OperationRegistry};
pub use orchestrator::{Bindings, BoundRegistry, RecordedOperation, SupplyChain};
pub use products::ProductRegistry;
pub use token::{CarbonToken, TokenMetadata};
pub use users::UserRegistry;
