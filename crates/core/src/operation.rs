//! Supply-chain operations (transport, processing, ...) and their emissions.

use crate::address::Address;
use crate::product::ProductId;
use crate::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An append-only operation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub product_id: ProductId,
    pub actor: Address,
    /// Free-form operation name, e.g. "transport" or "processing".
    pub kind: String,
    /// Measured emission.
    pub consumed_co2: Amount,
    /// Allowed emission for this operation.
    pub threshold_co2: Amount,
    pub recorded_at: u64,
}

/// Outcome of comparing a measured emission against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    /// `consumed <= threshold`: the difference is minted. Zero when equal.
    Minted(Amount),
    /// `consumed > threshold`: the excess is burned.
    Burned(Amount),
}

impl Settlement {
    pub fn compute(consumed: Amount, threshold: Amount) -> Self {
        if consumed <= threshold {
            Settlement::Minted(threshold - consumed)
        } else {
            Settlement::Burned(consumed - threshold)
        }
    }
}
