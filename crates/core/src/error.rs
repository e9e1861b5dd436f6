//! Error taxonomy shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification every ledger error maps onto.
///
/// The bridge reports this kind alongside the message so callers can tell a
/// missing record from a rejected write or an infrastructure fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any mutation.
    Validation,
    /// Authorization failure or state conflict (double registration, double initialization).
    Conflict,
    /// A burn or transfer exceeding the available balance.
    InsufficientFunds,
    /// Lookup of a key that does not exist.
    NotFound,
    /// Storage, confirmation or event-recovery failure.
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
