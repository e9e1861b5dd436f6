//! ProductRegistry: provenance records owned by their producers.

use crate::context::ExecutionContext;
use crate::error::{require_text, ContractError, Result};
use crate::orchestrator::{BoundRegistry, SupplyChain};
use carbonchain_core::{Address, LedgerEvent, NewProduct, Product, ProductId};
use carbonchain_storage::{StateRead, Storage};
use tracing::debug;

/// Handle to a ProductRegistry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductRegistry {
    address: Address,
}

impl ProductRegistry {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Store a new product owned by the caller.
    ///
    /// The id is announced only through the `ProductCreated` event; the
    /// return value is for in-process callers such as tests.
    pub fn create_product(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        fields: NewProduct,
    ) -> Result<ProductId> {
        let fields = NewProduct {
            name: require_text("name", &fields.name)?,
            category: require_text("category", &fields.category)?,
            unit: require_text("unit", &fields.unit)?,
            ..fields
        };

        let count = self.product_count(ctx.state())?;
        let id = ProductId(count + 1);
        let producer = ctx.caller();
        let product = Product::from_new(id, fields, producer, ctx.timestamp());

        let state = ctx.state_mut();
        state.put(Storage::product_key(&self.address, id.0), &product)?;
        state.put(Storage::product_count_key(&self.address), &id.0)?;

        debug!(product_id = %id, %producer, "created product");
        ctx.emit(
            self.address,
            LedgerEvent::ProductCreated {
                product_id: id,
                producer,
            },
        );
        Ok(id)
    }

    /// Toggle `is_active`. Allowed for the producer or a SupplyChain bound to this registry.
    pub fn set_product_active(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        product_id: ProductId,
        active: bool,
    ) -> Result<()> {
        let mut product = self
            .get_product(ctx.state(), product_id)?
            .ok_or(ContractError::ProductNotFound(product_id))?;

        let caller = ctx.caller();
        if caller != product.producer
            && !SupplyChain::is_bound_to(
                ctx.state(),
                &caller,
                BoundRegistry::Products,
                &self.address,
            )?
        {
            return Err(ContractError::Unauthorized {
                caller,
                action: "change product status",
            });
        }

        product.is_active = active;
        ctx.state_mut()
            .put(Storage::product_key(&self.address, product_id.0), &product)?;
        ctx.emit(
            self.address,
            LedgerEvent::ProductStatusChanged {
                product_id,
                is_active: active,
            },
        );
        Ok(())
    }

    pub fn get_product<S: StateRead>(&self, state: &S, id: ProductId) -> Result<Option<Product>> {
        Ok(state.read(&Storage::product_key(&self.address, id.0))?)
    }

    /// Number of products created; also the highest id assigned.
    pub fn product_count<S: StateRead>(&self, state: &S) -> Result<u64> {
        Ok(state
            .read(&Storage::product_count_key(&self.address))?
            .unwrap_or(0))
    }
}
