//! Write calls submitted to the ledger.

use crate::address::Address;
use crate::hash::{hash_encoded, Hash};
use crate::product::{NewProduct, ProductId};
use crate::Amount;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid idempotency key: {0}")]
pub struct InvalidIdempotencyKey(pub String);

/// Kinds of contract instance the ledger can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    UserRegistry,
    ProductRegistry,
    OperationRegistry,
    CarbonToken,
    SupplyChain,
}

impl ContractKind {
    /// Name under which instances of this kind appear in a deployment manifest.
    pub fn contract_name(&self) -> &'static str {
        match self {
            ContractKind::UserRegistry => "UserRegistry",
            ContractKind::ProductRegistry => "ProductRegistry",
            ContractKind::OperationRegistry => "OperationRegistry",
            ContractKind::CarbonToken => "CO2Token",
            ContractKind::SupplyChain => "SupplyChain",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// Constructor arguments for a new contract instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractSpec {
    UserRegistry,
    ProductRegistry,
    OperationRegistry,
    CarbonToken,
    /// The orchestrator settles carbon against `token`.
    SupplyChain { token: Address },
}

impl ContractSpec {
    pub fn kind(&self) -> ContractKind {
        match self {
            ContractSpec::UserRegistry => ContractKind::UserRegistry,
            ContractSpec::ProductRegistry => ContractKind::ProductRegistry,
            ContractSpec::OperationRegistry => ContractKind::OperationRegistry,
            ContractSpec::CarbonToken => ContractKind::CarbonToken,
            ContractSpec::SupplyChain { .. } => ContractKind::SupplyChain,
        }
    }
}

/// Caller-chosen key identifying one logical operation across retries.
///
/// Hex string in JSON, raw bytes in bincode.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(pub [u8; 16]);

impl IdempotencyKey {
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Deterministic key for callers that already have a stable operation reference.
    pub fn from_reference(reference: &str) -> Self {
        let h = crate::hash::hash(reference.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&h.0[..16]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, InvalidIdempotencyKey> {
        let bytes = hex::decode(s.trim()).map_err(|_| InvalidIdempotencyKey(s.to_string()))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|_| InvalidIdempotencyKey(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl FromStr for IdempotencyKey {
    type Err = InvalidIdempotencyKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for IdempotencyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for IdempotencyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 16]>::deserialize(deserializer).map(Self)
        }
    }
}

impl fmt::Debug for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdempotencyKey({})", self.to_hex())
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// State-changing methods exposed by the hosted contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Deploy(ContractSpec),

    // UserRegistry
    RegisterUser {
        name: String,
        email: String,
        role: String,
    },
    SetUserActive {
        active: bool,
    },

    // ProductRegistry
    CreateProduct(NewProduct),
    SetProductActive {
        product_id: ProductId,
        active: bool,
    },

    // CarbonToken
    RewardCompensatoryAction {
        amount: Amount,
    },
    ProcessOperationCo2 {
        consumed: Amount,
        threshold: Amount,
    },
    Transfer {
        to: Address,
        amount: Amount,
    },

    // SupplyChain
    Initialize {
        user_registry: Address,
        product_registry: Address,
        operation_registry: Address,
    },
    RecordOperation {
        product_id: ProductId,
        kind: String,
        consumed: Amount,
        threshold: Amount,
    },
    SetProductActiveVia {
        product_id: ProductId,
        active: bool,
    },
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Deploy(_) => "deploy",
            Method::RegisterUser { .. } => "registerUser",
            Method::SetUserActive { .. } => "setUserActive",
            Method::CreateProduct(_) => "createProduct",
            Method::SetProductActive { .. } => "setProductActive",
            Method::RewardCompensatoryAction { .. } => "rewardCompensatoryAction",
            Method::ProcessOperationCo2 { .. } => "processOperationCO2",
            Method::Transfer { .. } => "transfer",
            Method::Initialize { .. } => "initialize",
            Method::RecordOperation { .. } => "recordOperation",
            Method::SetProductActiveVia { .. } => "setProductActiveVia",
        }
    }

    /// Contract kind that implements this method; `None` for deployments.
    pub fn target_kind(&self) -> Option<ContractKind> {
        match self {
            Method::Deploy(_) => None,
            Method::RegisterUser { .. } | Method::SetUserActive { .. } => {
                Some(ContractKind::UserRegistry)
            }
            Method::CreateProduct(_) | Method::SetProductActive { .. } => {
                Some(ContractKind::ProductRegistry)
            }
            Method::RewardCompensatoryAction { .. }
            | Method::ProcessOperationCo2 { .. }
            | Method::Transfer { .. } => Some(ContractKind::CarbonToken),
            Method::Initialize { .. }
            | Method::RecordOperation { .. }
            | Method::SetProductActiveVia { .. } => Some(ContractKind::SupplyChain),
        }
    }
}

/// A write submitted by `caller` to the contract at `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub caller: Address,
    /// Contract instance; `Address::ZERO` for deployments.
    pub target: Address,
    pub method: Method,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl Call {
    pub fn new(caller: Address, target: Address, method: Method) -> Self {
        Self {
            caller,
            target,
            method,
            idempotency_key: None,
        }
    }

    /// Create a contract deployment call.
    pub fn deploy(caller: Address, spec: ContractSpec) -> Self {
        Self::new(caller, Address::ZERO, Method::Deploy(spec))
    }

    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Hash identifying this call; receipts are indexed by it.
    pub fn hash(&self) -> Hash {
        hash_encoded(self)
    }
}
