//! Persistence ports for the order and inventory aggregates.
//!
//! Aggregates are saved whole with optimistic concurrency control: every
//! save compares the entity's version against the stored one and fails
//! with `VersionConflict` on a mismatch, so a lost update can never land.
//! `UnitOfWork::commit` extends the same check across one order and any
//! number of inventory rows and applies them as a single atomic unit.

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::domain::aggregates::{Inventory, Order};
use crate::domain::pricing::{ProductPricing, VariantRecord};
use crate::domain::value_objects::{InventoryId, OrderId, OrderNumber, ProductId, SupplierId, VariantId};

pub use memory::MemoryStore;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("order not found with ID: {0}")]
    OrderNotFound(OrderId),
    #[error("inventory entry not found with ID: {0}")]
    InventoryNotFound(InventoryId),
    #[error("order number already exists: {0}")]
    DuplicateOrderNumber(OrderNumber),
    #[error("stale {entity} {id}: expected version {expected}, found {current}")]
    VersionConflict { entity: &'static str, id: i64, expected: u64, current: u64 },
}

/// Catalog snapshot consulted when pricing an order line. The catalog is
/// owned by another subsystem; this is a read-only projection of it.
#[derive(Clone, Debug)]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub name: String,
    pub active: bool,
    pub pricing: ProductPricing,
}

impl CatalogProduct {
    /// Unit price for the given variant and quantity: the variant's price
    /// adjustment is folded into the base price before tier selection.
    pub fn unit_price(&self, variant: Option<&VariantRecord>, quantity: u32) -> Decimal {
        let base = match variant {
            Some(v) => self.pricing.base_price + v.price_adjustment,
            None => self.pricing.base_price,
        };
        crate::domain::pricing::unit_price(base, &self.pricing.tiers, quantity)
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;
    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, StoreError>;
    async fn save_order(&self, order: Order) -> Result<Order, StoreError>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_inventory(&self, id: InventoryId) -> Result<Option<Inventory>, StoreError>;
    /// Variant-scoped ledger row, if one exists.
    async fn find_inventory_by_variant(&self, variant_id: VariantId) -> Result<Option<Inventory>, StoreError>;
    /// Product-scoped ledger row (no variant).
    async fn find_inventory_by_product(&self, product_id: ProductId) -> Result<Option<Inventory>, StoreError>;
    /// Product-scoped ledger row, additionally checked against the owning
    /// supplier.
    async fn find_inventory_by_supplier_and_product(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, StoreError>;
    async fn save_inventory(&self, inventory: Inventory) -> Result<Inventory, StoreError>;
    /// Runs `apply` against the product-scoped row inside the store's write
    /// boundary and persists whatever it leaves behind, bumping the row
    /// version. Returns `None` when the product has no ledger row.
    ///
    /// This is the per-row serialization point for direct stock mutations:
    /// two concurrent callers observe each other's completed writes, never
    /// a torn intermediate state.
    async fn mutate_by_product<R, F>(&self, product_id: ProductId, apply: F) -> Result<Option<R>, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Inventory) -> R + Send + 'static;
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn product(&self, product_id: ProductId) -> Result<Option<CatalogProduct>, StoreError>;
    async fn variant(&self, variant_id: VariantId) -> Result<Option<VariantRecord>, StoreError>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Persists one order together with a batch of inventory rows. Either
    /// every entity is written or none is: all version checks run before
    /// the first write. Returns the saved order with its assigned id and
    /// bumped version.
    async fn commit(&self, order: Order, inventory: Vec<Inventory>) -> Result<Order, StoreError>;
}
