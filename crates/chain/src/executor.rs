//! Call execution engine.
//!
//! Dispatches a [`Call`] to the contract it targets and runs it against a
//! [`StagedState`]. The executor never commits; the ledger decides whether
//! the staged writes become visible.

use carbonchain_contracts::{
    Bindings, CarbonToken, ContractDirectory, ContractError, ExecutionContext, ProductRegistry,
    SupplyChain, UserRegistry,
};
use carbonchain_core::{Call, ErrorKind, EventLog, Method};
use carbonchain_storage::StagedState;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("deployments must target the zero address, got {0}")]
    DeployTarget(carbonchain_core::Address),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Contract(err) => err.kind(),
            ExecutionError::DeployTarget(_) => ErrorKind::Validation,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutionError::Contract(err) => err.is_retryable(),
            ExecutionError::DeployTarget(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Stateless dispatcher from calls to contract methods.
pub struct Executor;

impl Executor {
    /// Execute `call` against `state` and return the events it emitted.
    ///
    /// On error `state` may hold partial writes; the caller must discard it.
    pub fn execute(state: &mut StagedState<'_>, call: &Call, timestamp: u64) -> Result<Vec<EventLog>> {
        debug!(
            method = call.method.name(),
            caller = %call.caller,
            target = %call.target,
            "executing call"
        );

        let mut ctx = ExecutionContext::new(state, call.caller, timestamp);

        if let Some(kind) = call.method.target_kind() {
            ContractDirectory::expect_kind(ctx.state(), &call.target, kind)?;
        }

        let target = call.target;
        match &call.method {
            Method::Deploy(spec) => {
                if !target.is_zero() {
                    return Err(ExecutionError::DeployTarget(target));
                }
                ContractDirectory::deploy(&mut ctx, *spec)?;
            }

            Method::RegisterUser { name, email, role } => {
                UserRegistry::at(target).register_user(&mut ctx, name, email, role)?;
            }
            Method::SetUserActive { active } => {
                UserRegistry::at(target).set_user_active(&mut ctx, *active)?;
            }

            Method::CreateProduct(fields) => {
                ProductRegistry::at(target).create_product(&mut ctx, fields.clone())?;
            }
            Method::SetProductActive { product_id, active } => {
                ProductRegistry::at(target).set_product_active(&mut ctx, *product_id, *active)?;
            }

            Method::RewardCompensatoryAction { amount } => {
                CarbonToken::at(target).reward_compensatory_action(&mut ctx, *amount)?;
            }
            Method::ProcessOperationCo2 {
                consumed,
                threshold,
            } => {
                CarbonToken::at(target).process_operation_co2(&mut ctx, *consumed, *threshold)?;
            }
            Method::Transfer { to, amount } => {
                CarbonToken::at(target).transfer(&mut ctx, to, *amount)?;
            }

            Method::Initialize {
                user_registry,
                product_registry,
                operation_registry,
            } => {
                let bindings = Bindings {
                    user_registry: *user_registry,
                    product_registry: *product_registry,
                    operation_registry: *operation_registry,
                };
                SupplyChain::at(target).initialize(&mut ctx, bindings)?;
            }
            Method::RecordOperation {
                product_id,
                kind,
                consumed,
                threshold,
            } => {
                SupplyChain::at(target).record_operation(
                    &mut ctx,
                    *product_id,
                    kind,
                    *consumed,
                    *threshold,
                )?;
            }
            Method::SetProductActiveVia { product_id, active } => {
                SupplyChain::at(target).set_product_active_via(&mut ctx, *product_id, *active)?;
            }
        }

        Ok(ctx.into_events())
    }
}
