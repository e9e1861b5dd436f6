//! Deployment manifest: where each contract instance lives.
//!
//! Persisted as JSON mapping a contract name to its address and kind:
//!
//! ```json
//! { "contracts": { "CO2Token": { "address": "0x…", "kind": "CarbonToken" } } }
//! ```

use crate::error::{BridgeError, Result};
use carbonchain_chain::{Ledger, LedgerError};
use carbonchain_contracts::ContractError;
use carbonchain_core::{Address, Call, ContractKind, ContractSpec, LedgerEvent, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub address: Address,
    pub kind: ContractKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    contracts: BTreeMap<String, ContractEntry>,
}

impl Deployment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address` under the manifest name of `kind`.
    pub fn insert(&mut self, kind: ContractKind, address: Address) {
        self.contracts
            .insert(kind.contract_name().to_string(), ContractEntry { address, kind });
    }

    pub fn get(&self, name: &str) -> Option<&ContractEntry> {
        self.contracts.get(name)
    }

    /// Address of the contract of `kind`.
    pub fn address(&self, kind: ContractKind) -> Result<Address> {
        self.contracts
            .get(kind.contract_name())
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.address)
            .ok_or(BridgeError::MissingContract(kind.contract_name()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContractEntry)> {
        self.contracts.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Check every entry against the ledger's contract directory.
    pub fn verify(&self, ledger: &Ledger) -> Result<()> {
        for entry in self.contracts.values() {
            let record = ledger
                .contract(&entry.address)?
                .ok_or(ContractError::UnknownContract(entry.address))
                .map_err(LedgerError::from)?;
            if record.kind != entry.kind {
                let mismatch = ContractError::WrongContractKind {
                    address: entry.address,
                    expected: entry.kind,
                    found: record.kind,
                };
                return Err(LedgerError::from(mismatch).into());
            }
        }
        Ok(())
    }

    /// Deploy one instance of every contract as `admin` and initialize the supply chain.
    pub fn bootstrap(ledger: &Ledger, admin: Address) -> Result<Self> {
        let mut deployment = Self::new();
        let specs = [
            ContractSpec::UserRegistry,
            ContractSpec::ProductRegistry,
            ContractSpec::OperationRegistry,
            ContractSpec::CarbonToken,
        ];
        for spec in specs {
            deployment.insert(spec.kind(), deploy(ledger, admin, spec)?);
        }

        let token = deployment.address(ContractKind::CarbonToken)?;
        let chain = deploy(ledger, admin, ContractSpec::SupplyChain { token })?;
        deployment.insert(ContractKind::SupplyChain, chain);

        ledger.submit(Call::new(
            admin,
            chain,
            Method::Initialize {
                user_registry: deployment.address(ContractKind::UserRegistry)?,
                product_registry: deployment.address(ContractKind::ProductRegistry)?,
                operation_registry: deployment.address(ContractKind::OperationRegistry)?,
            },
        ))?;

        info!(contracts = deployment.len(), %admin, "bootstrapped deployment");
        Ok(deployment)
    }
}

fn deploy(ledger: &Ledger, admin: Address, spec: ContractSpec) -> Result<Address> {
    let receipt = ledger.submit(Call::deploy(admin, spec))?;
    receipt
        .events
        .iter()
        .find_map(|log| match log.event {
            LedgerEvent::Deployed { address, .. } => Some(address),
            _ => None,
        })
        .ok_or(BridgeError::EventNotFound {
            event: "Deployed",
            height: receipt.block_height,
        })
}
