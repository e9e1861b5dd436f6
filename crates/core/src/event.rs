//! Events emitted by contracts and recorded in receipts.

use crate::address::Address;
use crate::call::ContractKind;
use crate::operation::OperationId;
use crate::product::ProductId;
use crate::user::Role;
use crate::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Deployed {
        address: Address,
        kind: ContractKind,
    },
    UserRegistered {
        user: Address,
        role: Role,
    },
    UserStatusChanged {
        user: Address,
        is_active: bool,
    },
    ProductCreated {
        product_id: ProductId,
        producer: Address,
    },
    ProductStatusChanged {
        product_id: ProductId,
        is_active: bool,
    },
    OperationRecorded {
        operation_id: OperationId,
        product_id: ProductId,
        actor: Address,
    },
    TokensMinted {
        to: Address,
        amount: Amount,
    },
    TokensBurned {
        from: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Initialized {
        user_registry: Address,
        product_registry: Address,
        operation_registry: Address,
    },
}

impl LedgerEvent {
    /// Event name as it appears in logs and bridge responses.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Deployed { .. } => "Deployed",
            LedgerEvent::UserRegistered { .. } => "UserRegistered",
            LedgerEvent::UserStatusChanged { .. } => "UserStatusChanged",
            LedgerEvent::ProductCreated { .. } => "ProductCreated",
            LedgerEvent::ProductStatusChanged { .. } => "ProductStatusChanged",
            LedgerEvent::OperationRecorded { .. } => "OperationRecorded",
            LedgerEvent::TokensMinted { .. } => "TokensMinted",
            LedgerEvent::TokensBurned { .. } => "TokensBurned",
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Initialized { .. } => "Initialized",
        }
    }
}

/// An event together with the contract instance that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub emitter: Address,
    pub event: LedgerEvent,
}

impl EventLog {
    pub fn new(emitter: Address, event: LedgerEvent) -> Self {
        Self { emitter, event }
    }
}
