//! JSON command dispatch.
//!
//! A command names a bridge function and its arguments:
//!
//! ```json
//! { "function": "createProduct", "args": { "name": "Apples", "description": "",
//!   "category": "fruit", "unit": "kg", "metadata": "" } }
//! ```
//!
//! Keys may appear in any order. An optional `"idempotency_key"` (32 hex
//! digits) pins the key a write is submitted under; resending a write with
//! the key from an error reply replays it instead of executing it again.
//!
//! The reply is always a [`BridgeResponse`] envelope, so failures keep their kind.

use crate::client::Bridge;
use crate::error::Result;
use crate::response::BridgeResponse;
use carbonchain_core::{
    Address, Amount, IdempotencyKey, NewProduct, OperationId, ProductId, Settlement,
};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Function names accepted in the `"function"` field.
pub const FUNCTIONS: &[&str] = &[
    "registerUser",
    "isUserRegistered",
    "getUser",
    "createProduct",
    "getProduct",
    "rewardCompensatoryAction",
    "processOperationCO2",
    "transfer",
    "balanceOf",
    "tokenInfo",
    "initialize",
    "recordOperation",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserArgs {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountArgs {
    pub address: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArgs {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountArgs {
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionArgs {
    pub consumed: Amount,
    pub threshold: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationArgs {
    pub product_id: ProductId,
    pub kind: String,
    pub consumed: Amount,
    pub threshold: Amount,
}

/// One bridge function call. Serializes as `{"function": ..., "args": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "function", content = "args", rename_all = "camelCase")]
pub enum BridgeCommand {
    RegisterUser(UserArgs),
    IsUserRegistered(AccountArgs),
    GetUser(AccountArgs),
    CreateProduct(NewProduct),
    GetProduct(ProductArgs),
    RewardCompensatoryAction(AmountArgs),
    #[serde(rename = "processOperationCO2")]
    ProcessOperationCo2(EmissionArgs),
    Transfer(TransferArgs),
    BalanceOf(AccountArgs),
    TokenInfo,
    Initialize,
    RecordOperation(OperationArgs),
}

/// A parsed command plus the key its write should be submitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub command: BridgeCommand,
    pub idempotency_key: Option<IdempotencyKey>,
}

#[derive(Deserialize)]
struct Head {
    function: String,
    #[serde(default)]
    idempotency_key: Option<IdempotencyKey>,
}

#[derive(Deserialize)]
struct Body<T> {
    args: T,
}

/// Second pass over the document: `args` streams straight into `T`, so
/// `u128` amounts survive regardless of key order.
fn args<T: DeserializeOwned>(json: &str) -> serde_json::Result<T> {
    serde_json::from_str::<Body<T>>(json).map(|body| body.args)
}

impl BridgeRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        let head: Head = serde_json::from_str(json)?;
        let command = match head.function.as_str() {
            "registerUser" => BridgeCommand::RegisterUser(args(json)?),
            "isUserRegistered" => BridgeCommand::IsUserRegistered(args(json)?),
            "getUser" => BridgeCommand::GetUser(args(json)?),
            "createProduct" => BridgeCommand::CreateProduct(args(json)?),
            "getProduct" => BridgeCommand::GetProduct(args(json)?),
            "rewardCompensatoryAction" => BridgeCommand::RewardCompensatoryAction(args(json)?),
            "processOperationCO2" => BridgeCommand::ProcessOperationCo2(args(json)?),
            "transfer" => BridgeCommand::Transfer(args(json)?),
            "balanceOf" => BridgeCommand::BalanceOf(args(json)?),
            "tokenInfo" => BridgeCommand::TokenInfo,
            "initialize" => BridgeCommand::Initialize,
            "recordOperation" => BridgeCommand::RecordOperation(args(json)?),
            other => return Err(serde_json::Error::unknown_variant(other, FUNCTIONS).into()),
        };
        Ok(Self {
            command,
            idempotency_key: head.idempotency_key,
        })
    }
}

impl BridgeCommand {
    pub fn from_json(json: &str) -> Result<Self> {
        BridgeRequest::from_json(json).map(|request| request.command)
    }
}

impl FromStr for BridgeCommand {
    type Err = crate::error::BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}

/// Result of a recorded operation as reported to JSON callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub operation_id: u64,
    pub minted: Amount,
    pub burned: Amount,
}

impl OperationOutcome {
    pub fn new(id: OperationId, settlement: Settlement) -> Self {
        let (minted, burned) = match settlement {
            Settlement::Minted(amount) => (amount, 0),
            Settlement::Burned(amount) => (0, amount),
        };
        Self {
            operation_id: id.0,
            minted,
            burned,
        }
    }
}

impl Bridge {
    /// Execute `command` and render the reply envelope as JSON.
    pub async fn dispatch(&self, command: BridgeCommand) -> String {
        match command {
            BridgeCommand::RegisterUser(UserArgs { name, email, role }) => {
                respond(self.register_user(&name, &email, &role).await.map(|_| true))
            }
            BridgeCommand::IsUserRegistered(AccountArgs { address }) => {
                respond(self.is_user_registered(address).await)
            }
            BridgeCommand::GetUser(AccountArgs { address }) => respond(self.get_user(address).await),
            BridgeCommand::CreateProduct(fields) => respond(self.create_product(fields).await),
            BridgeCommand::GetProduct(ProductArgs { product_id }) => {
                respond(self.get_product(product_id).await)
            }
            BridgeCommand::RewardCompensatoryAction(AmountArgs { amount }) => respond(
                self.reward_compensatory_action(amount)
                    .await
                    .map(|_| true),
            ),
            BridgeCommand::ProcessOperationCo2(EmissionArgs {
                consumed,
                threshold,
            }) => respond(self.process_operation_co2(consumed, threshold).await),
            BridgeCommand::Transfer(TransferArgs { to, amount }) => {
                respond(self.transfer(to, amount).await.map(|_| true))
            }
            BridgeCommand::BalanceOf(AccountArgs { address }) => {
                respond(self.balance_of(address).await)
            }
            BridgeCommand::TokenInfo => respond(self.token_info().await),
            BridgeCommand::Initialize => respond(self.initialize().await.map(|_| true)),
            BridgeCommand::RecordOperation(OperationArgs {
                product_id,
                kind,
                consumed,
                threshold,
            }) => respond(
                self.record_operation(product_id, &kind, consumed, threshold)
                    .await
                    .map(|(id, settlement)| OperationOutcome::new(id, settlement)),
            ),
        }
    }

    /// Parse a JSON command and dispatch it; malformed input yields an error envelope.
    pub async fn dispatch_json(&self, json: &str) -> String {
        match BridgeRequest::from_json(json) {
            Ok(BridgeRequest {
                command,
                idempotency_key: Some(key),
            }) => self.with_idempotency_key(key).dispatch(command).await,
            Ok(BridgeRequest { command, .. }) => self.dispatch(command).await,
            Err(err) => respond::<()>(Err(err)),
        }
    }
}

fn respond<T: Serialize>(result: Result<T>) -> String {
    let response = BridgeResponse::from(result);
    response.to_json().unwrap_or_else(|err| {
        format!(
            r#"{{"error":{{"kind":"infrastructure","message":"response encoding failed: {}","retryable":false}}}}"#,
            err
        )
    })
}
