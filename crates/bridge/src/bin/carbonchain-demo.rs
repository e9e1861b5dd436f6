//! Demo driver for the carbonchain bridge.
//!
//! With no arguments, bootstraps a deployment and walks a producer through
//! registration, product creation and carbon settlement. With one argument,
//! treats it as a JSON command and prints the reply envelope.

use anyhow::Context;
use carbonchain_bridge::{Bridge, BridgeConfig, Deployment};
use carbonchain_chain::Ledger;
use carbonchain_core::{Address, ContractKind, NewProduct};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_ADMIN: Address = Address([0xA0; 20]);
const DEMO_PRODUCER: Address = Address([0x01; 20]);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carbonchain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = BridgeConfig::from_env().context("loading bridge config")?;
    if config.account.is_zero() {
        config.account = DEMO_PRODUCER;
    }

    let ledger = Arc::new(Ledger::open(config.ledger.clone()).context("opening ledger")?);
    let deployment = match &config.manifest_path {
        Some(path) if path.exists() => {
            let deployment = Deployment::load(path).context("loading deployment manifest")?;
            deployment.verify(&ledger)?;
            deployment
        }
        other => {
            let deployment = Deployment::bootstrap(&ledger, DEMO_ADMIN)?;
            if let Some(path) = other {
                deployment.save(path).context("saving deployment manifest")?;
            }
            deployment
        }
    };
    for (name, entry) in deployment.iter() {
        info!(contract = name, address = %entry.address, "deployment entry");
    }

    let bridge = Bridge::new(ledger, deployment, config);

    if let Some(command) = std::env::args().nth(1) {
        println!("{}", bridge.dispatch_json(&command).await);
        return Ok(());
    }

    run_walkthrough(&bridge).await
}

async fn run_walkthrough(bridge: &Bridge) -> anyhow::Result<()> {
    let account = bridge.account();
    if !bridge.is_user_registered(account).await? {
        bridge
            .register_user("Green Farm", "farm@example.com", "PRODUCER")
            .await?;
    }
    let user = bridge.get_user(account).await?;
    info!(name = %user.name, role = %user.role, "producer ready");

    let product = bridge
        .create_product(NewProduct::new("Apples", "Organic apples", "fruit", "kg", ""))
        .await?;
    info!(%product, "product created");

    bridge.reward_compensatory_action(1000).await?;
    let (operation, settlement) = bridge
        .record_operation(product, "transport", 800, 500)
        .await?;
    info!(%operation, ?settlement, "operation recorded");

    let token = bridge.token_info().await?;
    let balance = bridge.balance_of(account).await?;
    info!(
        token = bridge.deployment().address(ContractKind::CarbonToken)?.to_hex(),
        symbol = %token.symbol,
        balance,
        "final balance"
    );
    Ok(())
}
