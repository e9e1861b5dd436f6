//! Directory of deployed contract instances.

use crate::context::ExecutionContext;
use crate::error::{ContractError, Result};
use crate::orchestrator::SupplyChain;
use carbonchain_core::{Address, ContractKind, ContractSpec, LedgerEvent};
use carbonchain_storage::{StateRead, Storage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory entry for one contract instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub kind: ContractKind,
    pub deployer: Address,
    pub deployed_at: u64,
}

pub struct ContractDirectory;

impl ContractDirectory {
    pub fn record<S: StateRead>(state: &S, address: &Address) -> Result<Option<ContractRecord>> {
        Ok(state.read(&Storage::contract_key(address))?)
    }

    pub fn kind_of<S: StateRead>(state: &S, address: &Address) -> Result<Option<ContractKind>> {
        Ok(Self::record(state, address)?.map(|record| record.kind))
    }

    /// Fails unless a contract of `expected` kind is deployed at `address`.
    pub fn expect_kind<S: StateRead>(
        state: &S,
        address: &Address,
        expected: ContractKind,
    ) -> Result<ContractRecord> {
        let record =
            Self::record(state, address)?.ok_or(ContractError::UnknownContract(*address))?;
        if record.kind != expected {
            return Err(ContractError::WrongContractKind {
                address: *address,
                expected,
                found: record.kind,
            });
        }
        Ok(record)
    }

    /// Deploy a new instance owned by the caller and return its address.
    pub fn deploy(ctx: &mut ExecutionContext<'_, '_>, spec: ContractSpec) -> Result<Address> {
        let deployer = ctx.caller();
        let nonce_key = Storage::deploy_nonce_key(&deployer);
        let nonce: u64 = ctx.state().read(&nonce_key)?.unwrap_or(0);
        let address = Address::derive_contract(&deployer, nonce);
        if ctx.state().exists(&Storage::contract_key(&address))? {
            return Err(ContractError::InvalidInput(format!(
                "contract address {} already in use",
                address
            )));
        }

        if let ContractSpec::SupplyChain { token } = spec {
            Self::expect_kind(ctx.state(), &token, ContractKind::CarbonToken)?;
            SupplyChain::install(ctx, address, token)?;
        }

        let record = ContractRecord {
            kind: spec.kind(),
            deployer,
            deployed_at: ctx.timestamp(),
        };
        let state = ctx.state_mut();
        state.put(Storage::contract_key(&address), &record)?;
        state.put(nonce_key, &(nonce + 1))?;

        debug!(%address, kind = %record.kind, "deployed contract");
        ctx.emit(
            address,
            LedgerEvent::Deployed {
                address,
                kind: record.kind,
            },
        );
        Ok(address)
    }
}
