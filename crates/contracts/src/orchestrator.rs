//! SupplyChain: binds the registries to a token and sequences multi-registry calls.
//!
//! The orchestrator owns no entities. Its only state is the token it settles
//! against and, once initialized, the three registry addresses. Every
//! multi-registry method runs inside [`ExecutionContext::atomic`], so a
//! failing sub-step rolls back everything the call staged before it.

use crate::context::ExecutionContext;
use crate::directory::ContractDirectory;
use crate::error::{ContractError, Result};
use crate::operations::{OperationEntry, OperationRegistry};
use crate::products::ProductRegistry;
use crate::token::CarbonToken;
use crate::users::UserRegistry;
use carbonchain_core::{
    Address, Amount, ContractKind, LedgerEvent, OperationId, ProductId, Role, Settlement,
};
use carbonchain_storage::{StateRead, Storage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Registry addresses fixed by `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pub user_registry: Address,
    pub product_registry: Address,
    pub operation_registry: Address,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct OrchestratorState {
    token: Address,
    bindings: Option<Bindings>,
}

/// Which binding to check in [`SupplyChain::is_bound_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundRegistry {
    Users,
    Products,
    Operations,
}

/// Outcome of a recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedOperation {
    pub operation_id: OperationId,
    pub settlement: Settlement,
}

/// Handle to a SupplyChain instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplyChain {
    address: Address,
}

impl SupplyChain {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Write the uninitialized state of a freshly deployed instance.
    pub(crate) fn install(
        ctx: &mut ExecutionContext<'_, '_>,
        address: Address,
        token: Address,
    ) -> Result<()> {
        let state = OrchestratorState {
            token,
            bindings: None,
        };
        ctx.state_mut().put(Storage::bindings_key(&address), &state)?;
        Ok(())
    }

    fn load<S: StateRead>(state: &S, orchestrator: &Address) -> Result<Option<OrchestratorState>> {
        Ok(state.read(&Storage::bindings_key(orchestrator))?)
    }

    fn load_own<S: StateRead>(&self, state: &S) -> Result<OrchestratorState> {
        Self::load(state, &self.address)?.ok_or(ContractError::UnknownContract(self.address))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Bind the three registries. Succeeds once; only the deployer may call it.
    pub fn initialize(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        bindings: Bindings,
    ) -> Result<()> {
        ctx.atomic(|ctx| {
            let mut current = self.load_own(ctx.state())?;
            if current.bindings.is_some() {
                return Err(ContractError::AlreadyInitialized);
            }

            let caller = ctx.caller();
            let record = ContractDirectory::expect_kind(
                ctx.state(),
                &self.address,
                ContractKind::SupplyChain,
            )?;
            if record.deployer != caller {
                return Err(ContractError::Unauthorized {
                    caller,
                    action: "initialize the supply chain",
                });
            }

            ContractDirectory::expect_kind(
                ctx.state(),
                &bindings.user_registry,
                ContractKind::UserRegistry,
            )?;
            ContractDirectory::expect_kind(
                ctx.state(),
                &bindings.product_registry,
                ContractKind::ProductRegistry,
            )?;
            ContractDirectory::expect_kind(
                ctx.state(),
                &bindings.operation_registry,
                ContractKind::OperationRegistry,
            )?;

            current.bindings = Some(bindings);
            ctx.state_mut()
                .put(Storage::bindings_key(&self.address), &current)?;

            info!(orchestrator = %self.address, "supply chain initialized");
            ctx.emit(
                self.address,
                LedgerEvent::Initialized {
                    user_registry: bindings.user_registry,
                    product_registry: bindings.product_registry,
                    operation_registry: bindings.operation_registry,
                },
            );
            Ok(())
        })
    }

    pub fn bindings<S: StateRead>(&self, state: &S) -> Result<Option<Bindings>> {
        Ok(self.load_own(state)?.bindings)
    }

    pub fn token<S: StateRead>(&self, state: &S) -> Result<Address> {
        Ok(self.load_own(state)?.token)
    }

    /// True when `orchestrator` is an initialized SupplyChain whose `which` binding is `registry`.
    pub fn is_bound_to<S: StateRead>(
        state: &S,
        orchestrator: &Address,
        which: BoundRegistry,
        registry: &Address,
    ) -> Result<bool> {
        let bindings = match Self::load(state, orchestrator)?.and_then(|s| s.bindings) {
            Some(bindings) => bindings,
            None => return Ok(false),
        };
        let bound = match which {
            BoundRegistry::Users => bindings.user_registry,
            BoundRegistry::Products => bindings.product_registry,
            BoundRegistry::Operations => bindings.operation_registry,
        };
        Ok(bound == *registry)
    }

    fn require_bindings<S: StateRead>(&self, state: &S) -> Result<Bindings> {
        self.bindings(state)?.ok_or(ContractError::NotInitialized)
    }

    // =========================================================================
    // Multi-registry operations
    // =========================================================================

    /// Record an operation on a product and settle its CO2 for the caller.
    ///
    /// The caller must be an active registered user and the product must be
    /// active. The operation record and the settlement commit together or not
    /// at all.
    pub fn record_operation(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        product_id: ProductId,
        kind: &str,
        consumed: Amount,
        threshold: Amount,
    ) -> Result<RecordedOperation> {
        ctx.atomic(|ctx| {
            let state = self.load_own(ctx.state())?;
            let bindings = state.bindings.ok_or(ContractError::NotInitialized)?;
            let actor = ctx.caller();

            let user = UserRegistry::at(bindings.user_registry)
                .get_user(ctx.state(), &actor)?
                .ok_or(ContractError::UserNotFound(actor))?;
            if !user.is_active {
                return Err(ContractError::InactiveUser(actor));
            }

            let product = ProductRegistry::at(bindings.product_registry)
                .get_product(ctx.state(), product_id)?
                .ok_or(ContractError::ProductNotFound(product_id))?;
            if !product.is_active {
                return Err(ContractError::InactiveProduct(product_id));
            }

            let entry = OperationEntry {
                product_id,
                actor,
                kind: kind.to_string(),
                consumed_co2: consumed,
                threshold_co2: threshold,
            };
            let operations = OperationRegistry::at(bindings.operation_registry);
            let operation_id = ctx.as_caller(self.address, |ctx| operations.record(ctx, entry))?;

            let settlement =
                CarbonToken::at(state.token).settle(ctx, &actor, consumed, threshold)?;

            debug!(%operation_id, %product_id, %actor, ?settlement, "recorded operation");
            Ok(RecordedOperation {
                operation_id,
                settlement,
            })
        })
    }

    /// Toggle a product on behalf of its producer or a certifier.
    pub fn set_product_active_via(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        product_id: ProductId,
        active: bool,
    ) -> Result<()> {
        ctx.atomic(|ctx| {
            let bindings = self.require_bindings(ctx.state())?;
            let caller = ctx.caller();
            let products = ProductRegistry::at(bindings.product_registry);
            let product = products
                .get_product(ctx.state(), product_id)?
                .ok_or(ContractError::ProductNotFound(product_id))?;

            if product.producer != caller {
                let certifier = UserRegistry::at(bindings.user_registry)
                    .get_user(ctx.state(), &caller)?
                    .filter(|user| user.is_active && user.role == Role::Certifier);
                if certifier.is_none() {
                    return Err(ContractError::Unauthorized {
                        caller,
                        action: "change product status",
                    });
                }
            }

            ctx.as_caller(self.address, |ctx| {
                products.set_product_active(ctx, product_id, active)
            })
        })
    }
}
