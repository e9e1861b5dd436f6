//! Product provenance records.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential product identifier. The first product is `ProductId(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields supplied by the producer when creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub metadata: String,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            unit: unit.into(),
            metadata: metadata.into(),
        }
    }
}

/// A stored product. Core fields are fixed at creation; only `is_active` toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub producer: Address,
    pub created_at: u64,
    pub is_active: bool,
    pub metadata: String,
}

impl Product {
    pub fn from_new(id: ProductId, fields: NewProduct, producer: Address, now: u64) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            category: fields.category,
            unit: fields.unit,
            producer,
            created_at: now,
            is_active: true,
            metadata: fields.metadata,
        }
    }
}
