//! Synchronous facade: every call blocks until the async bridge finishes.

use crate::client::Bridge;
use crate::command::BridgeCommand;
use crate::error::Result;
use carbonchain_contracts::TokenMetadata;
use carbonchain_core::{
    Address, Amount, IdempotencyKey, NewProduct, OperationId, Product, ProductId, Receipt,
    Settlement, User,
};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Owns a current-thread runtime and drives a [`Bridge`] on it.
///
/// Must not be used from inside another tokio runtime.
pub struct BlockingBridge {
    inner: Bridge,
    runtime: Arc<Runtime>,
}

impl BlockingBridge {
    pub fn new(inner: Bridge) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// Same facade, submitting its writes under `key`. See [`Bridge::with_idempotency_key`].
    pub fn with_idempotency_key(&self, key: IdempotencyKey) -> Self {
        Self {
            inner: self.inner.with_idempotency_key(key),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.inner
    }

    pub fn register_user(&self, name: &str, email: &str, role: &str) -> Result<Receipt> {
        self.runtime
            .block_on(self.inner.register_user(name, email, role))
    }

    pub fn is_user_registered(&self, address: Address) -> Result<bool> {
        self.runtime.block_on(self.inner.is_user_registered(address))
    }

    pub fn get_user(&self, address: Address) -> Result<User> {
        self.runtime.block_on(self.inner.get_user(address))
    }

    pub fn create_product(&self, fields: NewProduct) -> Result<ProductId> {
        self.runtime.block_on(self.inner.create_product(fields))
    }

    pub fn get_product(&self, id: ProductId) -> Result<Product> {
        self.runtime.block_on(self.inner.get_product(id))
    }

    pub fn reward_compensatory_action(&self, amount: Amount) -> Result<Receipt> {
        self.runtime
            .block_on(self.inner.reward_compensatory_action(amount))
    }

    pub fn process_operation_co2(&self, consumed: Amount, threshold: Amount) -> Result<Settlement> {
        self.runtime
            .block_on(self.inner.process_operation_co2(consumed, threshold))
    }

    pub fn transfer(&self, to: Address, amount: Amount) -> Result<Receipt> {
        self.runtime.block_on(self.inner.transfer(to, amount))
    }

    pub fn balance_of(&self, address: Address) -> Result<Amount> {
        self.runtime.block_on(self.inner.balance_of(address))
    }

    pub fn token_info(&self) -> Result<TokenMetadata> {
        self.runtime.block_on(self.inner.token_info())
    }

    pub fn initialize(&self) -> Result<Receipt> {
        self.runtime.block_on(self.inner.initialize())
    }

    pub fn record_operation(
        &self,
        product_id: ProductId,
        kind: &str,
        consumed: Amount,
        threshold: Amount,
    ) -> Result<(OperationId, Settlement)> {
        self.runtime.block_on(
            self.inner
                .record_operation(product_id, kind, consumed, threshold),
        )
    }

    pub fn dispatch(&self, command: BridgeCommand) -> String {
        self.runtime.block_on(self.inner.dispatch(command))
    }

    pub fn dispatch_json(&self, json: &str) -> String {
        self.runtime.block_on(self.inner.dispatch_json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::error::BridgeError;
    use crate::manifest::Deployment;
    use carbonchain_chain::Ledger;
    use carbonchain_core::ErrorKind;
    use std::sync::Arc;

    const ADMIN: Address = Address([0x0A; 20]);
    const ALICE: Address = Address([0x01; 20]);

    fn blocking_bridge(account: Address) -> BlockingBridge {
        let ledger = Arc::new(Ledger::open_temporary().unwrap());
        let deployment = Deployment::bootstrap(&ledger, ADMIN).unwrap();
        let bridge = Bridge::new(ledger, deployment, BridgeConfig::for_account(account));
        BlockingBridge::new(bridge).unwrap()
    }

    #[test]
    fn test_blocking_calls() {
        let bridge = blocking_bridge(ALICE);

        bridge
            .register_user("Alice", "alice@farm.example", "PRODUCER")
            .unwrap();
        assert!(bridge.is_user_registered(ALICE).unwrap());
        assert_eq!(bridge.get_user(ALICE).unwrap().name, "Alice");

        let id = bridge
            .create_product(NewProduct::new("Apples", "desc", "fruit", "kg", ""))
            .unwrap();
        assert_eq!(id, ProductId(1));

        bridge.reward_compensatory_action(1000).unwrap();
        assert_eq!(bridge.balance_of(ALICE).unwrap(), 1000);
        assert_eq!(bridge.token_info().unwrap().decimals, 18);
    }

    #[test]
    fn test_blocking_not_found() {
        let bridge = blocking_bridge(ALICE);
        let err = bridge.get_user(Address([0x09; 20])).unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { what: "user", .. }));
        assert_eq!(
            bridge.get_product(ProductId(7)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_blocking_dispatch_json() {
        let bridge = blocking_bridge(ALICE);
        let reply = bridge.dispatch_json(r#"{"function":"rewardCompensatoryAction","args":{"amount":250}}"#);
        assert_eq!(reply, r#"{"ok":true}"#);

        let reply = bridge.dispatch_json(&format!(
            r#"{{"function":"balanceOf","args":{{"address":"{}"}}}}"#,
            ALICE
        ));
        assert_eq!(reply, r#"{"ok":250}"#);

        let reply = bridge.dispatch_json("not json");
        assert!(reply.starts_with(r#"{"error":{"kind":"validation""#));
    }

    #[test]
    fn test_blocking_keyed_write_replays() {
        let bridge = blocking_bridge(ALICE);
        let keyed = bridge.with_idempotency_key(IdempotencyKey::from_reference("reward-7"));

        let first = keyed.reward_compensatory_action(40).unwrap();
        let again = keyed.reward_compensatory_action(40).unwrap();

        assert_eq!(first, again);
        assert_eq!(bridge.balance_of(ALICE).unwrap(), 40);
        let err = keyed.reward_compensatory_action(41).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
