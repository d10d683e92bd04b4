//! In-memory store backing the bundled services and the test suites.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::aggregates::{Inventory, Order};
use crate::domain::pricing::VariantRecord;
use crate::domain::value_objects::{InventoryId, OrderId, OrderItemId, OrderNumber, ProductId, SupplierId, VariantId};

use super::{CatalogProduct, CatalogReader, InventoryStore, OrderStore, StoreError, UnitOfWork};

/// Thread-safe in-memory implementation of every store port.
///
/// All mutations run under a single write lock, so a commit is observed
/// whole or not at all. Cloning is cheap and shares the same state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

struct State {
    orders: HashMap<OrderId, Order>,
    orders_by_number: HashMap<String, OrderId>,
    inventory: HashMap<InventoryId, Inventory>,
    by_variant: HashMap<VariantId, InventoryId>,
    by_product: HashMap<ProductId, InventoryId>,
    products: HashMap<ProductId, CatalogProduct>,
    variants: HashMap<VariantId, VariantRecord>,
    next_order_id: i64,
    next_item_id: i64,
    next_inventory_id: i64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            orders: HashMap::new(),
            orders_by_number: HashMap::new(),
            inventory: HashMap::new(),
            by_variant: HashMap::new(),
            by_product: HashMap::new(),
            products: HashMap::new(),
            variants: HashMap::new(),
            next_order_id: 1,
            next_item_id: 1,
            next_inventory_id: 1,
        }
    }
}

impl State {
    fn check_order(&self, order: &Order) -> Result<(), StoreError> {
        match order.id() {
            Some(id) => {
                let current = self.orders.get(&id).ok_or(StoreError::OrderNotFound(id))?;
                if current.version() != order.version() {
                    return Err(StoreError::VersionConflict {
                        entity: "order",
                        id: id.value(),
                        expected: order.version(),
                        current: current.version(),
                    });
                }
                Ok(())
            }
            None => {
                if self.orders_by_number.contains_key(order.order_number().as_str()) {
                    return Err(StoreError::DuplicateOrderNumber(order.order_number().clone()));
                }
                Ok(())
            }
        }
    }

    fn check_inventory(&self, inventory: &Inventory) -> Result<(), StoreError> {
        let Some(id) = inventory.id() else { return Ok(()) };
        let current = self.inventory.get(&id).ok_or(StoreError::InventoryNotFound(id))?;
        if current.version() != inventory.version() {
            return Err(StoreError::VersionConflict {
                entity: "inventory",
                id: id.value(),
                expected: inventory.version(),
                current: current.version(),
            });
        }
        Ok(())
    }

    fn apply_order(&mut self, mut order: Order) -> Order {
        let id = match order.id() {
            Some(id) => id,
            None => {
                let id = OrderId(self.next_order_id);
                self.next_order_id += 1;
                order.set_id(id);
                self.orders_by_number.insert(order.order_number().as_str().to_string(), id);
                id
            }
        };
        for item in order.items_mut() {
            if item.id().is_none() {
                item.set_id(OrderItemId(self.next_item_id));
                self.next_item_id += 1;
            }
        }
        order.set_version(order.version() + 1);
        self.orders.insert(id, order.clone());
        order
    }

    fn apply_inventory(&mut self, mut inventory: Inventory) -> Inventory {
        let id = match inventory.id() {
            Some(id) => id,
            None => {
                let id = InventoryId(self.next_inventory_id);
                self.next_inventory_id += 1;
                inventory.set_id(id);
                match inventory.variant_id() {
                    Some(variant_id) => {
                        self.by_variant.insert(variant_id, id);
                    }
                    None => {
                        self.by_product.insert(inventory.product_id(), id);
                    }
                }
                id
            }
        };
        inventory.set_version(inventory.version() + 1);
        self.inventory.insert(id, inventory.clone());
        inventory
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())) }
    }

    /// Seeds the catalog projection with a product.
    pub fn put_product(&self, product: CatalogProduct) {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.products.insert(product.product_id, product);
    }

    /// Seeds the catalog projection with a variant.
    pub fn put_variant(&self, variant: VariantRecord) {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.variants.insert(variant.variant_id, variant);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.orders.get(&id).cloned())
    }

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        let order = state
            .orders_by_number
            .get(number.as_str())
            .and_then(|id| state.orders.get(id))
            .cloned();
        Ok(order)
    }

    async fn order_number_exists(&self, number: &OrderNumber) -> Result<bool, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.orders_by_number.contains_key(number.as_str()))
    }

    async fn save_order(&self, order: Order) -> Result<Order, StoreError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.check_order(&order)?;
        Ok(state.apply_order(order))
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn find_inventory(&self, id: InventoryId) -> Result<Option<Inventory>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.inventory.get(&id).cloned())
    }

    async fn find_inventory_by_variant(&self, variant_id: VariantId) -> Result<Option<Inventory>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        let entry = state.by_variant.get(&variant_id).and_then(|id| state.inventory.get(id)).cloned();
        Ok(entry)
    }

    async fn find_inventory_by_product(&self, product_id: ProductId) -> Result<Option<Inventory>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        let entry = state.by_product.get(&product_id).and_then(|id| state.inventory.get(id)).cloned();
        Ok(entry)
    }

    async fn find_inventory_by_supplier_and_product(
        &self,
        supplier_id: SupplierId,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        let entry = state
            .by_product
            .get(&product_id)
            .and_then(|id| state.inventory.get(id))
            .filter(|entry| entry.supplier_id() == supplier_id)
            .cloned();
        Ok(entry)
    }

    async fn save_inventory(&self, inventory: Inventory) -> Result<Inventory, StoreError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.check_inventory(&inventory)?;
        Ok(state.apply_inventory(inventory))
    }

    async fn mutate_by_product<R, F>(&self, product_id: ProductId, apply: F) -> Result<Option<R>, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Inventory) -> R + Send + 'static,
    {
        let mut state = self.state.write().expect("RwLock poisoned");
        let Some(id) = state.by_product.get(&product_id).copied() else {
            return Ok(None);
        };
        let Some(entry) = state.inventory.get_mut(&id) else {
            return Ok(None);
        };
        let result = apply(entry);
        let next = entry.version() + 1;
        entry.set_version(next);
        Ok(Some(result))
    }
}

#[async_trait]
impl CatalogReader for MemoryStore {
    async fn product(&self, product_id: ProductId) -> Result<Option<CatalogProduct>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.products.get(&product_id).cloned())
    }

    async fn variant(&self, variant_id: VariantId) -> Result<Option<VariantRecord>, StoreError> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.variants.get(&variant_id).cloned())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn commit(&self, order: Order, inventory: Vec<Inventory>) -> Result<Order, StoreError> {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.check_order(&order)?;
        for entry in &inventory {
            state.check_inventory(entry)?;
        }
        let saved = state.apply_order(order);
        for entry in inventory {
            state.apply_inventory(entry);
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::OrderItem;
    use crate::domain::value_objects::RetailerId;
    use rust_decimal::Decimal;

    fn sample_order(number: &str) -> Order {
        let items = vec![OrderItem::new(ProductId(1), None, 2, Decimal::from(10), "Widget").unwrap()];
        Order::create(
            OrderNumber::new(number).unwrap(),
            RetailerId(1),
            SupplierId(2),
            items,
            None,
            None,
        )
        .unwrap()
    }

    fn stocked_inventory(variant_id: Option<VariantId>) -> Inventory {
        let mut inventory = Inventory::new(ProductId(1), variant_id, SupplierId(2));
        inventory.restock(50).unwrap();
        inventory
    }

    #[tokio::test]
    async fn test_save_assigns_ids_and_bumps_version() {
        let store = MemoryStore::new();
        let saved = store.save_order(sample_order("ORD-1001")).await.unwrap();

        assert_eq!(saved.id(), Some(OrderId(1)));
        assert_eq!(saved.version(), 1);
        assert!(saved.items().iter().all(|i| i.id().is_some()));

        let found = store.find_order(OrderId(1)).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let store = MemoryStore::new();
        store.save_order(sample_order("ORD-1001")).await.unwrap();
        let err = store.save_order(sample_order("ORD-1001")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNumber(_)));
    }

    #[tokio::test]
    async fn test_stale_order_save_rejected() {
        let store = MemoryStore::new();
        let snapshot = store.save_order(sample_order("ORD-1001")).await.unwrap();

        store.save_order(snapshot.clone()).await.unwrap();
        let err = store.save_order(snapshot).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { entity: "order", expected: 1, current: 2, .. }));
    }

    #[tokio::test]
    async fn test_stale_inventory_save_rejected() {
        let store = MemoryStore::new();
        let snapshot = store.save_inventory(stocked_inventory(None)).await.unwrap();

        store.save_inventory(snapshot.clone()).await.unwrap();
        let err = store.save_inventory(snapshot).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { entity: "inventory", .. }));
    }

    #[tokio::test]
    async fn test_commit_applies_nothing_on_conflict() {
        let store = MemoryStore::new();
        let stale = store.save_inventory(stocked_inventory(None)).await.unwrap();
        store.save_inventory(stale.clone()).await.unwrap();

        let err = store.commit(sample_order("ORD-2002"), vec![stale]).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let number = OrderNumber::new("ORD-2002").unwrap();
        assert!(!store.order_number_exists(&number).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_saves_order_and_inventory_together() {
        let store = MemoryStore::new();
        let mut inventory = store.save_inventory(stocked_inventory(None)).await.unwrap();
        assert!(inventory.reserve_stock(2));

        let saved = store.commit(sample_order("ORD-3003"), vec![inventory]).await.unwrap();
        assert_eq!(saved.version(), 1);

        let reloaded = store
            .find_inventory_by_supplier_and_product(SupplierId(2), ProductId(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.reserved_quantity(), 2);
        assert_eq!(reloaded.version(), 2);
    }

    #[tokio::test]
    async fn test_mutate_by_product_runs_in_place() {
        let store = MemoryStore::new();
        store.save_inventory(stocked_inventory(None)).await.unwrap();

        let reserved = store
            .mutate_by_product(ProductId(1), |entry| entry.reserve_stock(20))
            .await
            .unwrap()
            .unwrap();
        assert!(reserved);

        let entry = store.find_inventory_by_product(ProductId(1)).await.unwrap().unwrap();
        assert_eq!(entry.reserved_quantity(), 20);
        assert_eq!(entry.version(), 2);

        let missing = store.mutate_by_product(ProductId(42), |_| ()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_variant_and_product_scoped_lookups() {
        let store = MemoryStore::new();
        store.save_inventory(stocked_inventory(Some(VariantId(7)))).await.unwrap();
        store.save_inventory(stocked_inventory(None)).await.unwrap();

        let by_variant = store.find_inventory_by_variant(VariantId(7)).await.unwrap().unwrap();
        assert_eq!(by_variant.variant_id(), Some(VariantId(7)));

        let by_product = store
            .find_inventory_by_supplier_and_product(SupplierId(2), ProductId(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_product.variant_id(), None);

        assert!(store.find_inventory_by_product(ProductId(1)).await.unwrap().is_some());
        assert!(store.find_inventory_by_variant(VariantId(99)).await.unwrap().is_none());
        // Wrong supplier never sees another supplier's row.
        assert!(store
            .find_inventory_by_supplier_and_product(SupplierId(99), ProductId(1))
            .await
            .unwrap()
            .is_none());
    }
}
