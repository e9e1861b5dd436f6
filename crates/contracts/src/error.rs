//! Contract errors.

use carbonchain_core::{Address, Amount, ContractKind, ErrorKind, ProductId, UnknownRole};
use carbonchain_storage::StorageError;
use thiserror::Error;

/// Errors raised by contract methods. A failing method leaves no staged writes behind.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("no contract deployed at {0}")]
    UnknownContract(Address),

    #[error("contract at {address} is a {found}, expected {expected}")]
    WrongContractKind {
        address: Address,
        expected: ContractKind,
        found: ContractKind,
    },

    #[error("user already registered: {0}")]
    AlreadyRegistered(Address),

    #[error("supply chain already initialized")]
    AlreadyInitialized,

    #[error("supply chain not initialized")]
    NotInitialized,

    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("user is deactivated: {0}")]
    InactiveUser(Address),

    #[error("product is deactivated: {0}")]
    InactiveProduct(ProductId),

    #[error("user not found: {0}")]
    UserNotFound(Address),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("insufficient balance: address {address}, required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: Amount,
        available: Amount,
    },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::InvalidInput(_)
            | ContractError::UnknownRole(_)
            | ContractError::UnknownContract(_)
            | ContractError::WrongContractKind { .. }
            | ContractError::Overflow(_) => ErrorKind::Validation,
            ContractError::AlreadyRegistered(_)
            | ContractError::AlreadyInitialized
            | ContractError::NotInitialized
            | ContractError::Unauthorized { .. }
            | ContractError::InactiveUser(_)
            | ContractError::InactiveProduct(_) => ErrorKind::Conflict,
            ContractError::UserNotFound(_) | ContractError::ProductNotFound(_) => {
                ErrorKind::NotFound
            }
            ContractError::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,
            ContractError::Storage(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ContractError::Storage(e) if e.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, ContractError>;

/// Trimmed copy of `value`, or `InvalidInput` naming `field` when it is blank.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContractError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
