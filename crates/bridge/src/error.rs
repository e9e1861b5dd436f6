//! Bridge errors.

use carbonchain_chain::LedgerError;
use carbonchain_core::{ErrorKind, IdempotencyKey};
use thiserror::Error;

/// Errors surfaced at the bridge boundary. None of them degrade to an empty value.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("no {event} event in receipt at height {height}")]
    EventNotFound { event: &'static str, height: u64 },

    #[error("timed out waiting for {wanted} confirmation(s) of block {height}")]
    ConfirmationTimeout { height: u64, wanted: u64 },

    /// A keyed write whose outcome is still open after every retry.
    /// Resubmitting under `key` replays it rather than executing it again.
    #[error("{source} (resubmit with idempotency key {key})")]
    Unsettled {
        key: IdempotencyKey,
        source: Box<BridgeError>,
    },

    #[error("ledger head channel closed")]
    LedgerClosed,

    #[error("ledger task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("deployment has no {0} contract")]
    MissingContract(&'static str),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Ledger(err) => err.kind(),
            BridgeError::Unsettled { source, .. } => source.kind(),
            BridgeError::NotFound { .. } => ErrorKind::NotFound,
            BridgeError::MissingContract(_) | BridgeError::Json(_) => ErrorKind::Validation,
            BridgeError::EventNotFound { .. }
            | BridgeError::ConfirmationTimeout { .. }
            | BridgeError::LedgerClosed
            | BridgeError::Task(_)
            | BridgeError::Io(_) => ErrorKind::Infrastructure,
        }
    }

    /// A pending write that timed out may still confirm; resubmitting the same
    /// call replays it instead of executing twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Ledger(err) => err.is_retryable(),
            BridgeError::ConfirmationTimeout { .. } | BridgeError::Unsettled { .. } => true,
            _ => false,
        }
    }

    /// Key to resubmit under, when the write may already be committed.
    pub fn idempotency_key(&self) -> Option<IdempotencyKey> {
        match self {
            BridgeError::Unsettled { key, .. } => Some(*key),
            _ => None,
        }
    }

    /// The underlying failure, looking through [`BridgeError::Unsettled`].
    pub fn cause(&self) -> &BridgeError {
        match self {
            BridgeError::Unsettled { source, .. } => source.cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
