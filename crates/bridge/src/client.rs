//! Async bridge over a [`Ledger`].
//!
//! Writes are submitted on the blocking pool, then awaited until the
//! configured confirmation depth is reached. Every write carries an
//! idempotency key, so a retry after a transient failure replays the
//! committed call instead of executing it twice. A confirmation timeout is
//! retried by waiting on the same receipt again. A keyed write still open
//! once the retries run out fails with [`BridgeError::Unsettled`]; calling
//! again through [`Bridge::with_idempotency_key`] replays it. Ids generated
//! by a write are recovered from the confirmed receipt's events.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::manifest::Deployment;
use carbonchain_chain::{Ledger, LedgerError};
use carbonchain_contracts::{Bindings, TokenMetadata};
use carbonchain_core::{
    Address, Amount, Call, ContractKind, IdempotencyKey, LedgerEvent, Method, NewProduct,
    OperationId, Product, ProductId, Receipt, Settlement, User,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Client facade bound to one account and one deployment.
#[derive(Clone)]
pub struct Bridge {
    ledger: Arc<Ledger>,
    deployment: Deployment,
    config: BridgeConfig,
    /// Pinned key for every write; a fresh random key per write when `None`.
    idempotency_key: Option<IdempotencyKey>,
}

impl Bridge {
    pub fn new(ledger: Arc<Ledger>, deployment: Deployment, config: BridgeConfig) -> Self {
        Self {
            ledger,
            deployment,
            config,
            idempotency_key: None,
        }
    }

    /// Same bridge, submitting its writes under `key`.
    ///
    /// Use it for one logical write: resending that write replays the
    /// committed call, a different write under the same key is a conflict.
    pub fn with_idempotency_key(&self, key: IdempotencyKey) -> Self {
        let mut bridge = self.clone();
        bridge.idempotency_key = Some(key);
        bridge
    }

    /// Same ledger and deployment, acting as `account`.
    pub fn with_account(&self, account: Address) -> Self {
        let mut bridge = self.clone();
        bridge.config.account = account;
        bridge
    }

    pub fn account(&self) -> Address {
        self.config.account
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn contract(&self, kind: ContractKind) -> Result<Address> {
        self.deployment.address(kind)
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Build a keyed call from this bridge's account.
    ///
    /// Keep the returned call to resubmit it after a confirmation timeout.
    pub fn prepare(&self, target: Address, method: Method) -> Call {
        let key = self.idempotency_key.unwrap_or_else(IdempotencyKey::random);
        Call::new(self.config.account, target, method).with_idempotency_key(key)
    }

    /// Submit a write and wait for its confirmation.
    pub async fn submit_write(&self, target: Address, method: Method) -> Result<Receipt> {
        self.submit_call(self.prepare(target, method)).await
    }

    /// Submit `call`, retrying retryable failures, then wait for confirmation.
    ///
    /// Only keyed calls are resubmitted, since a failed flush may follow a
    /// commit. A keyed call still unresolved at the end is [`BridgeError::Unsettled`].
    pub async fn submit_call(&self, call: Call) -> Result<Receipt> {
        let outcome = match self.submit_with_retry(&call).await {
            Ok(receipt) => self.confirm_with_retry(receipt).await,
            Err(err) => Err(err),
        };
        outcome.map_err(|err| match call.idempotency_key {
            Some(key) if err.is_retryable() => BridgeError::Unsettled {
                key,
                source: Box::new(err),
            },
            _ => err,
        })
    }

    async fn submit_with_retry(&self, call: &Call) -> Result<Receipt> {
        let policy = &self.config.retry;
        let mut attempt = 1;
        loop {
            let ledger = Arc::clone(&self.ledger);
            let pending = call.clone();
            let outcome = tokio::task::spawn_blocking(move || ledger.submit(pending)).await?;
            match outcome {
                Ok(receipt) => return Ok(receipt),
                Err(err)
                    if err.is_retryable()
                        && call.idempotency_key.is_some()
                        && attempt < policy.max_attempts =>
                {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        method = call.method.name(),
                        "write failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(policy.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// The write is committed; a timeout only means the depth is not reached yet.
    async fn confirm_with_retry(&self, receipt: Receipt) -> Result<Receipt> {
        let policy = &self.config.retry;
        let mut attempt = 1;
        loop {
            match self.await_confirmations(receipt.clone()).await {
                Err(err @ BridgeError::ConfirmationTimeout { .. })
                    if attempt < policy.max_attempts =>
                {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        height = receipt.block_height,
                        "{}, waiting again",
                        err
                    );
                    tokio::time::sleep(policy.backoff(attempt)).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Wait until `receipt` has the configured number of confirmations.
    pub async fn await_confirmations(&self, receipt: Receipt) -> Result<Receipt> {
        let wanted = self.config.confirmations.max(1);
        let target_height = receipt.block_height.saturating_add(wanted - 1);
        let mut head = self.ledger.subscribe_head();

        let reached = tokio::time::timeout(self.config.confirmation_timeout(), async {
            head.wait_for(|height| *height >= target_height)
                .await
                .map(|_| ())
        })
        .await;

        match reached {
            Ok(Ok(())) => {
                debug!(height = receipt.block_height, wanted, "write confirmed");
                Ok(receipt)
            }
            Ok(Err(_)) => Err(BridgeError::LedgerClosed),
            Err(_) => Err(BridgeError::ConfirmationTimeout {
                height: receipt.block_height,
                wanted,
            }),
        }
    }

    /// Run a read against committed state.
    pub async fn submit_read<T, F>(&self, read: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Ledger) -> std::result::Result<T, LedgerError> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        Ok(tokio::task::spawn_blocking(move || read(&ledger)).await??)
    }

    // =========================================================================
    // UserRegistry
    // =========================================================================

    pub async fn register_user(&self, name: &str, email: &str, role: &str) -> Result<Receipt> {
        let registry = self.contract(ContractKind::UserRegistry)?;
        self.submit_write(
            registry,
            Method::RegisterUser {
                name: name.to_string(),
                email: email.to_string(),
                role: role.to_string(),
            },
        )
        .await
    }

    pub async fn set_user_active(&self, active: bool) -> Result<Receipt> {
        let registry = self.contract(ContractKind::UserRegistry)?;
        self.submit_write(registry, Method::SetUserActive { active })
            .await
    }

    pub async fn is_user_registered(&self, address: Address) -> Result<bool> {
        let registry = self.contract(ContractKind::UserRegistry)?;
        self.submit_read(move |ledger| ledger.is_user_registered(&registry, &address))
            .await
    }

    /// The user at `address`; `NotFound` when it never registered.
    pub async fn get_user(&self, address: Address) -> Result<User> {
        let registry = self.contract(ContractKind::UserRegistry)?;
        self.submit_read(move |ledger| ledger.get_user(&registry, &address))
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                what: "user",
                key: address.to_hex(),
            })
    }

    // =========================================================================
    // ProductRegistry
    // =========================================================================

    /// Create a product and recover its id from the confirmed receipt.
    pub async fn create_product(&self, fields: NewProduct) -> Result<ProductId> {
        let registry = self.contract(ContractKind::ProductRegistry)?;
        let receipt = self
            .submit_write(registry, Method::CreateProduct(fields))
            .await?;
        receipt
            .find_event(&registry, |event| match event {
                LedgerEvent::ProductCreated { product_id, .. } => Some(*product_id),
                _ => None,
            })
            .ok_or(BridgeError::EventNotFound {
                event: "ProductCreated",
                height: receipt.block_height,
            })
    }

    pub async fn set_product_active(&self, product_id: ProductId, active: bool) -> Result<Receipt> {
        let registry = self.contract(ContractKind::ProductRegistry)?;
        self.submit_write(registry, Method::SetProductActive { product_id, active })
            .await
    }

    /// The product with `id`; `NotFound` when no such id was assigned.
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        let registry = self.contract(ContractKind::ProductRegistry)?;
        self.submit_read(move |ledger| ledger.get_product(&registry, id))
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                what: "product",
                key: id.to_string(),
            })
    }

    // =========================================================================
    // CO2 token
    // =========================================================================

    pub async fn reward_compensatory_action(&self, amount: Amount) -> Result<Receipt> {
        let token = self.contract(ContractKind::CarbonToken)?;
        self.submit_write(token, Method::RewardCompensatoryAction { amount })
            .await
    }

    /// Settle an emission against its threshold; the outcome comes from the receipt's events.
    pub async fn process_operation_co2(&self, consumed: Amount, threshold: Amount) -> Result<Settlement> {
        let token = self.contract(ContractKind::CarbonToken)?;
        let receipt = self
            .submit_write(token, Method::ProcessOperationCo2 { consumed, threshold })
            .await?;
        settlement_in(&receipt, &token)
    }

    pub async fn transfer(&self, to: Address, amount: Amount) -> Result<Receipt> {
        let token = self.contract(ContractKind::CarbonToken)?;
        self.submit_write(token, Method::Transfer { to, amount }).await
    }

    pub async fn balance_of(&self, address: Address) -> Result<Amount> {
        let token = self.contract(ContractKind::CarbonToken)?;
        self.submit_read(move |ledger| ledger.balance_of(&token, &address))
            .await
    }

    pub async fn total_supply(&self) -> Result<Amount> {
        let token = self.contract(ContractKind::CarbonToken)?;
        self.submit_read(move |ledger| ledger.total_supply(&token))
            .await
    }

    /// Name, symbol and decimals.
    pub async fn token_info(&self) -> Result<TokenMetadata> {
        let token = self.contract(ContractKind::CarbonToken)?;
        self.submit_read(move |ledger| ledger.token_metadata(&token))
            .await
    }

    // =========================================================================
    // SupplyChain
    // =========================================================================

    /// Bind the registries named in the deployment to its supply chain.
    pub async fn initialize(&self) -> Result<Receipt> {
        let chain = self.contract(ContractKind::SupplyChain)?;
        let method = Method::Initialize {
            user_registry: self.contract(ContractKind::UserRegistry)?,
            product_registry: self.contract(ContractKind::ProductRegistry)?,
            operation_registry: self.contract(ContractKind::OperationRegistry)?,
        };
        self.submit_write(chain, method).await
    }

    pub async fn bindings(&self) -> Result<Bindings> {
        let chain = self.contract(ContractKind::SupplyChain)?;
        self.submit_read(move |ledger| ledger.bindings(&chain))
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                what: "supply chain bindings",
                key: chain.to_hex(),
            })
    }

    /// Record an operation through the supply chain and recover its id and settlement.
    pub async fn record_operation(
        &self,
        product_id: ProductId,
        kind: &str,
        consumed: Amount,
        threshold: Amount,
    ) -> Result<(OperationId, Settlement)> {
        let chain = self.contract(ContractKind::SupplyChain)?;
        let operations = self.contract(ContractKind::OperationRegistry)?;
        let token = self.contract(ContractKind::CarbonToken)?;
        let receipt = self
            .submit_write(
                chain,
                Method::RecordOperation {
                    product_id,
                    kind: kind.to_string(),
                    consumed,
                    threshold,
                },
            )
            .await?;

        let operation_id = receipt
            .find_event(&operations, |event| match event {
                LedgerEvent::OperationRecorded { operation_id, .. } => Some(*operation_id),
                _ => None,
            })
            .ok_or(BridgeError::EventNotFound {
                event: "OperationRecorded",
                height: receipt.block_height,
            })?;
        Ok((operation_id, settlement_in(&receipt, &token)?))
    }

    pub async fn set_product_active_via(&self, product_id: ProductId, active: bool) -> Result<Receipt> {
        let chain = self.contract(ContractKind::SupplyChain)?;
        self.submit_write(chain, Method::SetProductActiveVia { product_id, active })
            .await
    }
}

/// The mint or burn the token emitted in `receipt`.
fn settlement_in(receipt: &Receipt, token: &Address) -> Result<Settlement> {
    receipt
        .find_event(token, |event| match event {
            LedgerEvent::TokensMinted { amount, .. } => Some(Settlement::Minted(*amount)),
            LedgerEvent::TokensBurned { amount, .. } => Some(Settlement::Burned(*amount)),
            _ => None,
        })
        .ok_or(BridgeError::EventNotFound {
            event: "TokensMinted/TokensBurned",
            height: receipt.block_height,
        })
}
