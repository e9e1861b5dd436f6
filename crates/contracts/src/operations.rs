//! OperationRegistry: append-only log of supply-chain operations.

use crate::context::ExecutionContext;
use crate::error::{require_text, ContractError, Result};
use crate::orchestrator::{BoundRegistry, SupplyChain};
use carbonchain_core::{Address, Amount, LedgerEvent, Operation, OperationId, ProductId};
use carbonchain_storage::{StateRead, Storage};

/// Fields of an operation before it is assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEntry {
    pub product_id: ProductId,
    pub actor: Address,
    pub kind: String,
    pub consumed_co2: Amount,
    pub threshold_co2: Amount,
}

/// Handle to an OperationRegistry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRegistry {
    address: Address,
}

impl OperationRegistry {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Append an operation. Only a SupplyChain bound to this registry may record.
    pub fn record(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        entry: OperationEntry,
    ) -> Result<OperationId> {
        let caller = ctx.caller();
        if !SupplyChain::is_bound_to(
            ctx.state(),
            &caller,
            BoundRegistry::Operations,
            &self.address,
        )? {
            return Err(ContractError::Unauthorized {
                caller,
                action: "record operations",
            });
        }
        let kind = require_text("operation kind", &entry.kind)?;

        let id = OperationId(self.operation_count(ctx.state())? + 1);
        let operation = Operation {
            id,
            product_id: entry.product_id,
            actor: entry.actor,
            kind,
            consumed_co2: entry.consumed_co2,
            threshold_co2: entry.threshold_co2,
            recorded_at: ctx.timestamp(),
        };

        let state = ctx.state_mut();
        state.put(Storage::operation_key(&self.address, id.0), &operation)?;
        state.put(Storage::operation_count_key(&self.address), &id.0)?;

        ctx.emit(
            self.address,
            LedgerEvent::OperationRecorded {
                operation_id: id,
                product_id: entry.product_id,
                actor: entry.actor,
            },
        );
        Ok(id)
    }

    pub fn get_operation<S: StateRead>(
        &self,
        state: &S,
        id: OperationId,
    ) -> Result<Option<Operation>> {
        Ok(state.read(&Storage::operation_key(&self.address, id.0))?)
    }

    pub fn operation_count<S: StateRead>(&self, state: &S) -> Result<u64> {
        Ok(state
            .read(&Storage::operation_count_key(&self.address))?
            .unwrap_or(0))
    }
}
