use carbonchain_bridge::{Bridge, BridgeConfig, BridgeError, Deployment};
use carbonchain_chain::Ledger;
use carbonchain_core::{
    Address, Amount, ContractKind, ContractSpec, ErrorKind, LedgerEvent, Method, NewProduct,
    OperationId, ProductId, Role, Settlement,
};
use std::sync::Arc;

const ADMIN: Address = Address([0x0A; 20]);
const ALICE: Address = Address([0x01; 20]);
const BOB: Address = Address([0x02; 20]);

fn setup(account: Address) -> Bridge {
    let ledger = Arc::new(Ledger::open_temporary().unwrap());
    let deployment = Deployment::bootstrap(&ledger, ADMIN).unwrap();
    Bridge::new(ledger, deployment, BridgeConfig::for_account(account))
}

/// Bridge that never sees a second confirmation unless another write lands.
fn awaiting_two_confirmations(account: Address) -> Bridge {
    let mut config = BridgeConfig::for_account(account);
    config.confirmations = 2;
    config.confirmation_timeout_ms = 50;
    let ledger = Arc::new(Ledger::open_temporary().unwrap());
    let deployment = Deployment::bootstrap(&ledger, ADMIN).unwrap();
    Bridge::new(ledger, deployment, config)
}

fn apples() -> NewProduct {
    NewProduct::new("Apples", "desc", "fruit", "kg", "")
}

#[tokio::test]
async fn test_reward_increases_balance() {
    let alice = setup(ALICE);

    let receipt = alice.reward_compensatory_action(1000).await.unwrap();

    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 1000);
    assert_eq!(receipt.event_names(), vec!["TokensMinted"]);
    assert_eq!(alice.total_supply().await.unwrap(), 1000);
}

#[tokio::test]
async fn test_transfer_moves_half() {
    let alice = setup(ALICE);
    alice.reward_compensatory_action(1000).await.unwrap();

    alice.transfer(BOB, 500).await.unwrap();

    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 500);
    assert_eq!(alice.balance_of(BOB).await.unwrap(), 500);
}

#[tokio::test]
async fn test_transfer_beyond_balance_changes_nothing() {
    let alice = setup(ALICE);
    alice.reward_compensatory_action(100).await.unwrap();

    let err = alice.transfer(BOB, 101).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 100);
    assert_eq!(alice.balance_of(BOB).await.unwrap(), 0);
}

#[tokio::test]
async fn test_settlement_under_threshold_mints() {
    let alice = setup(ALICE);

    let settlement = alice.process_operation_co2(500, 1000).await.unwrap();

    assert_eq!(settlement, Settlement::Minted(500));
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 500);
}

#[tokio::test]
async fn test_settlement_over_threshold_burns() {
    let alice = setup(ALICE);
    alice.reward_compensatory_action(1000).await.unwrap();

    let settlement = alice.process_operation_co2(800, 500).await.unwrap();

    assert_eq!(settlement, Settlement::Burned(300));
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 700);
}

#[tokio::test]
async fn test_burn_beyond_balance_fails_cleanly() {
    let alice = setup(ALICE);
    alice.reward_compensatory_action(100).await.unwrap();
    let height = alice.ledger().height().unwrap();

    let err = alice.process_operation_co2(600, 100).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 100);
    assert_eq!(alice.ledger().height().unwrap(), height);
}

#[tokio::test]
async fn test_settlement_at_threshold_is_zero_mint() {
    let alice = setup(ALICE);

    let settlement = alice.process_operation_co2(700, 700).await.unwrap();

    assert_eq!(settlement, Settlement::Minted(0));
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_product_ids_are_sequential() {
    let alice = setup(ALICE);

    let first = alice.create_product(apples()).await.unwrap();
    let second = alice
        .create_product(NewProduct::new("Pears", "", "fruit", "kg", ""))
        .await
        .unwrap();

    assert_eq!(first, ProductId(1));
    assert_eq!(second, ProductId(2));
    let product = alice.get_product(first).await.unwrap();
    assert_eq!(product.name, "Apples");
    assert_eq!(product.description, "desc");
    assert_eq!(product.producer, ALICE);
    assert!(product.is_active);
}

#[tokio::test]
async fn test_rejected_product_does_not_consume_id() {
    let alice = setup(ALICE);

    let err = alice
        .create_product(NewProduct::new("Apples", "", "", "kg", ""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(alice.create_product(apples()).await.unwrap(), ProductId(1));
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let alice = setup(ALICE);

    let err = alice.get_user(BOB).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound { what: "user", .. }));
    assert!(!alice.is_user_registered(BOB).await.unwrap());

    let err = alice.get_product(ProductId(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_register_user_once() {
    let alice = setup(ALICE);

    alice
        .register_user("Alice", "alice@farm.example", "Producer")
        .await
        .unwrap();
    let user = alice.get_user(ALICE).await.unwrap();
    assert_eq!(user.role, Role::Producer);
    assert!(user.is_active);

    let err = alice
        .register_user("Alice", "alice@farm.example", "Producer")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_initialize_succeeds_once() {
    let admin = setup(ADMIN);
    let before = admin.bindings().await.unwrap();

    // A second set of registries, deployed but never bound.
    let mut other = Deployment::new();
    for spec in [
        ContractSpec::UserRegistry,
        ContractSpec::ProductRegistry,
        ContractSpec::OperationRegistry,
    ] {
        let receipt = admin
            .submit_write(Address::ZERO, Method::Deploy(spec))
            .await
            .unwrap();
        let address = receipt
            .events
            .iter()
            .find_map(|log| match log.event {
                LedgerEvent::Deployed { address, .. } => Some(address),
                _ => None,
            })
            .unwrap();
        other.insert(spec.kind(), address);
    }

    let chain = admin.deployment().address(ContractKind::SupplyChain).unwrap();
    let err = admin
        .submit_write(
            chain,
            Method::Initialize {
                user_registry: other.address(ContractKind::UserRegistry).unwrap(),
                product_registry: other.address(ContractKind::ProductRegistry).unwrap(),
                operation_registry: other.address(ContractKind::OperationRegistry).unwrap(),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(admin.bindings().await.unwrap(), before);
    assert!(admin.initialize().await.is_err());
}

#[tokio::test]
async fn test_record_operation_through_supply_chain() {
    let alice = setup(ALICE);
    alice
        .register_user("Alice", "alice@farm.example", "PRODUCER")
        .await
        .unwrap();
    let product = alice.create_product(apples()).await.unwrap();

    let (operation, settlement) = alice
        .record_operation(product, "harvest", 100, 400)
        .await
        .unwrap();
    assert_eq!(operation, OperationId(1));
    assert_eq!(settlement, Settlement::Minted(300));

    let err = alice
        .record_operation(product, "transport", 1000, 100)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let operations = alice
        .deployment()
        .address(ContractKind::OperationRegistry)
        .unwrap();
    assert_eq!(alice.ledger().operation_count(&operations).unwrap(), 1);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 300);
}

#[tokio::test]
async fn test_unregistered_actor_cannot_record() {
    let alice = setup(ALICE);
    let product = alice.create_product(apples()).await.unwrap();

    let err = alice
        .record_operation(product, "harvest", 1, 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_certifier_deactivates_product() {
    let alice = setup(ALICE);
    let certifier = alice.with_account(BOB);
    alice
        .register_user("Alice", "alice@farm.example", "PRODUCER")
        .await
        .unwrap();
    let product = alice.create_product(apples()).await.unwrap();
    certifier
        .register_user("Bob", "bob@cert.example", "CERTIFIER")
        .await
        .unwrap();

    certifier
        .set_product_active_via(product, false)
        .await
        .unwrap();

    assert!(!alice.get_product(product).await.unwrap().is_active);
    let err = alice
        .record_operation(product, "harvest", 1, 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_resubmitted_call_is_not_executed_twice() {
    let alice = setup(ALICE);
    let token = alice.deployment().address(ContractKind::CarbonToken).unwrap();
    let call = alice.prepare(token, Method::RewardCompensatoryAction { amount: 1000 });

    let first = alice.submit_call(call.clone()).await.unwrap();
    let again = alice.submit_call(call).await.unwrap();

    assert_eq!(first, again);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 1000);
}

#[tokio::test]
async fn test_confirmation_depth() {
    let mut config = BridgeConfig::for_account(ALICE);
    config.confirmations = 2;
    config.confirmation_timeout_ms = 50;
    let ledger = Arc::new(Ledger::open_temporary().unwrap());
    let deployment = Deployment::bootstrap(&ledger, ADMIN).unwrap();
    let alice = Bridge::new(Arc::clone(&ledger), deployment, config);
    let token = alice.deployment().address(ContractKind::CarbonToken).unwrap();

    // Nothing else is written, so the second confirmation never arrives.
    let call = alice.prepare(token, Method::RewardCompensatoryAction { amount: 10 });
    let err = alice.submit_call(call.clone()).await.unwrap_err();
    assert!(matches!(
        err.cause(),
        BridgeError::ConfirmationTimeout { wanted: 2, .. }
    ));
    assert!(err.is_retryable());
    assert_eq!(err.idempotency_key(), call.idempotency_key);

    // The write itself is committed; once another block lands, a resubmit confirms it.
    let bob = alice.with_account(BOB);
    let mut relaxed = bob.config().clone();
    relaxed.confirmations = 1;
    Bridge::new(Arc::clone(&ledger), bob.deployment().clone(), relaxed)
        .reward_compensatory_action(1)
        .await
        .unwrap();

    let receipt = alice.submit_call(call).await.unwrap();
    assert_eq!(ledger.confirmations(&receipt).unwrap(), 2);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 10);
}

#[tokio::test]
async fn test_token_info() {
    let alice = setup(ALICE);
    let info = alice.token_info().await.unwrap();
    assert_eq!(info.name, "CO2 Token");
    assert_eq!(info.symbol, "CO2");
    assert_eq!(info.decimals, 18);
}

#[tokio::test]
async fn test_dispatch_reports_error_kinds() {
    let alice = setup(ALICE);

    let reply = alice
        .dispatch_json(&format!(
            r#"{{"function":"getUser","args":{{"address":"{}"}}}}"#,
            BOB
        ))
        .await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["error"]["kind"], "not_found");

    let reply = alice
        .dispatch_json(r#"{"function":"createProduct","args":{"name":"Apples","description":"desc","category":"fruit","unit":"kg","metadata":""}}"#)
        .await;
    assert_eq!(reply, r#"{"ok":1}"#);
}

#[tokio::test]
async fn test_timed_out_reward_retried_under_its_key_mints_once() {
    let alice = awaiting_two_confirmations(ALICE);
    let height = alice.ledger().height().unwrap();

    let err = alice.reward_compensatory_action(10).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    let key = err.idempotency_key().expect("unsettled write reports its key");
    assert_eq!(alice.ledger().height().unwrap(), height + 1);

    // Typed retry under the reported key replays the committed reward.
    let err = alice
        .with_idempotency_key(key)
        .reward_compensatory_action(10)
        .await
        .unwrap_err();
    assert_eq!(err.idempotency_key(), Some(key));

    // So does a JSON retry carrying the key from the error reply.
    let reply = alice
        .dispatch_json(&format!(
            r#"{{"function":"rewardCompensatoryAction","args":{{"amount":10}},"idempotency_key":"{}"}}"#,
            key
        ))
        .await;
    let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json["error"]["retryable"], true);
    assert_eq!(json["error"]["idempotency_key"], key.to_hex());

    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 10);
    assert_eq!(alice.ledger().height().unwrap(), height + 1);

    // Once the next block lands, the same retry confirms.
    let bob = alice.with_account(BOB);
    let token = bob.deployment().address(ContractKind::CarbonToken).unwrap();
    bob.ledger()
        .submit(bob.prepare(token, Method::RewardCompensatoryAction { amount: 1 }))
        .unwrap();
    let receipt = alice
        .with_idempotency_key(key)
        .reward_compensatory_action(10)
        .await
        .unwrap();
    assert_eq!(receipt.block_height, height + 1);
    assert_eq!(alice.balance_of(ALICE).await.unwrap(), 10);
}

#[tokio::test]
async fn test_large_amounts_dispatch_in_either_key_order() {
    let alice = setup(ALICE);
    let large: Amount = 100_000_000_000_000_000_000;

    let reply = alice
        .dispatch_json(&format!(
            r#"{{"function":"rewardCompensatoryAction","args":{{"amount":{}}}}}"#,
            large
        ))
        .await;
    assert_eq!(reply, r#"{"ok":true}"#);

    let reply = alice
        .dispatch_json(&format!(
            r#"{{"args":{{"amount":{}}},"function":"rewardCompensatoryAction"}}"#,
            large
        ))
        .await;
    assert_eq!(reply, r#"{"ok":true}"#);

    let reply = alice
        .dispatch_json(&format!(
            r#"{{"args":{{"address":"{}"}},"function":"balanceOf"}}"#,
            ALICE
        ))
        .await;
    assert_eq!(reply, format!(r#"{{"ok":{}}}"#, 2 * large));
}

#[tokio::test]
async fn test_unreachable_confirmation_depth_times_out() {
    let mut config = BridgeConfig::for_account(ALICE);
    config.confirmations = u64::MAX;
    config.confirmation_timeout_ms = 10;
    config.retry.max_attempts = 1;
    let ledger = Arc::new(Ledger::open_temporary().unwrap());
    let deployment = Deployment::bootstrap(&ledger, ADMIN).unwrap();
    let alice = Bridge::new(ledger, deployment, config);

    let err = alice.reward_compensatory_action(1).await.unwrap_err();

    assert!(matches!(
        err.cause(),
        BridgeError::ConfirmationTimeout {
            wanted: u64::MAX,
            ..
        }
    ));
}
