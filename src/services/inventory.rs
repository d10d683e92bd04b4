//! Direct inventory operations for supplier stock management.
//!
//! Every mutation here executes as one unit inside the store's per-row
//! write boundary (`InventoryStore::mutate_by_product`), so two callers
//! racing for the same row serialize and the loser sees the winner's
//! completed state. Nothing is retried; counters can never go negative.

use crate::domain::aggregates::inventory::{Inventory, InventoryStatus, StockError};
use crate::domain::value_objects::{ProductId, SupplierId, VariantId};
use crate::store::{InventoryStore, StoreError};

use super::log_events;

#[derive(Clone)]
pub struct InventoryService<S> {
    store: S,
}

/// Result of an availability probe. Always answers, even for products with
/// no ledger row (those report zero stock, not an error).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvailabilityReport {
    pub product_id: ProductId,
    pub requested: u32,
    pub available: u32,
    pub orderable: bool,
    pub sufficient_stock: bool,
    pub status: InventoryStatus,
}

/// Manual override of a ledger row's counters and policy fields. `None`
/// fields are left untouched.
#[derive(Clone, Debug)]
pub struct UpdateInventoryCommand {
    pub product_id: ProductId,
    pub available_quantity: Option<u32>,
    pub reorder_level: Option<u32>,
    pub reorder_quantity: Option<u32>,
    pub warehouse_location: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProvisionCommand {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub supplier_id: SupplierId,
    pub initial_quantity: u32,
    pub reorder_level: Option<u32>,
    pub reorder_quantity: Option<u32>,
    pub warehouse_location: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InventoryServiceError {
    #[error("no inventory entry for product {0}")]
    NotStocked(ProductId),
    #[error("inventory entry already exists for product {0}")]
    AlreadyProvisioned(ProductId),
    #[error("product {product_id} is not available for ordering ({status})")]
    NotOrderable { product_id: ProductId, status: InventoryStatus },
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, requested: u32, available: u32 },
    #[error("insufficient reserved stock for product {product_id}: requested {requested}, reserved {reserved}")]
    InsufficientReservedStock { product_id: ProductId, requested: u32, reserved: u32 },
    #[error("quantity must be greater than 0")]
    InvalidQuantity,
    #[error("available quantity ({available}) cannot be less than reserved quantity ({reserved})")]
    AvailableBelowReserved { available: u32, reserved: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn map_stock_error(product_id: ProductId, requested: u32, reserved: u32, error: StockError) -> InventoryServiceError {
    match error {
        StockError::InvalidQuantity => InventoryServiceError::InvalidQuantity,
        StockError::InsufficientReserved => {
            InventoryServiceError::InsufficientReservedStock { product_id, requested, reserved }
        }
        StockError::AvailableBelowReserved { available, reserved } => {
            InventoryServiceError::AvailableBelowReserved { available, reserved }
        }
    }
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read-only availability probe.
    pub async fn check_availability(
        &self,
        product_id: ProductId,
        requested: u32,
    ) -> Result<AvailabilityReport, InventoryServiceError> {
        let report = match self.store.find_inventory_by_product(product_id).await? {
            Some(entry) => AvailabilityReport {
                product_id,
                requested,
                available: entry.available_quantity(),
                orderable: entry.is_available_for_order(),
                sufficient_stock: entry.has_sufficient_stock(requested),
                status: entry.status(),
            },
            None => AvailabilityReport {
                product_id,
                requested,
                available: 0,
                orderable: false,
                sufficient_stock: false,
                status: InventoryStatus::OutOfStock,
            },
        };
        Ok(report)
    }

    /// Holds `quantity` units for a pending order. The orderable gate runs
    /// before the stock check, so a discontinued or out-of-stock product
    /// reports `NotOrderable` rather than a quantity problem.
    pub async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryServiceError> {
        if quantity == 0 {
            return Err(InventoryServiceError::InvalidQuantity);
        }
        let outcome = self
            .store
            .mutate_by_product(product_id, move |entry| {
                if !entry.is_available_for_order() {
                    return Err(InventoryServiceError::NotOrderable { product_id, status: entry.status() });
                }
                if !entry.reserve_stock(quantity) {
                    return Err(InventoryServiceError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: entry.available_quantity(),
                    });
                }
                Ok(entry.take_events())
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        let events = outcome?;
        log_events(&events);
        Ok(())
    }

    /// Returns previously reserved units to the available pool.
    pub async fn release(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryServiceError> {
        if quantity == 0 {
            return Err(InventoryServiceError::InvalidQuantity);
        }
        let outcome: Result<_, InventoryServiceError> = self
            .store
            .mutate_by_product(product_id, move |entry| {
                let reserved = entry.reserved_quantity();
                entry
                    .release_reserved_stock(quantity)
                    .map_err(|error| map_stock_error(product_id, quantity, reserved, error))?;
                Ok(entry.take_events())
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        let events = outcome?;
        log_events(&events);
        Ok(())
    }

    /// Consumes reserved units on fulfillment. Available stock is not
    /// touched; the units were already promised away.
    pub async fn deduct(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryServiceError> {
        if quantity == 0 {
            return Err(InventoryServiceError::InvalidQuantity);
        }
        let outcome = self
            .store
            .mutate_by_product(product_id, move |entry| {
                let reserved = entry.reserved_quantity();
                if !entry.deduct_stock(quantity) {
                    return Err(InventoryServiceError::InsufficientReservedStock {
                        product_id,
                        requested: quantity,
                        reserved,
                    });
                }
                Ok(entry.take_events())
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        let events = outcome?;
        log_events(&events);
        Ok(())
    }

    /// Adds received stock to the available pool.
    pub async fn restock(&self, product_id: ProductId, quantity: u32) -> Result<(), InventoryServiceError> {
        if quantity == 0 {
            return Err(InventoryServiceError::InvalidQuantity);
        }
        let outcome: Result<_, InventoryServiceError> = self
            .store
            .mutate_by_product(product_id, move |entry| {
                let reserved = entry.reserved_quantity();
                entry
                    .restock(quantity)
                    .map_err(|error| map_stock_error(product_id, quantity, reserved, error))?;
                Ok(entry.take_events())
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        let events = outcome?;
        log_events(&events);
        Ok(())
    }

    /// Marks the product's ledger row discontinued. The row keeps its
    /// counters but stops accepting orders for good.
    pub async fn discontinue(&self, product_id: ProductId) -> Result<(), InventoryServiceError> {
        let events = self
            .store
            .mutate_by_product(product_id, |entry| {
                entry.discontinue();
                entry.take_events()
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        log_events(&events);
        Ok(())
    }

    /// Applies a manual stock correction and policy update in one unit.
    pub async fn update_entry(&self, command: UpdateInventoryCommand) -> Result<(), InventoryServiceError> {
        let product_id = command.product_id;
        let outcome: Result<_, InventoryServiceError> = self
            .store
            .mutate_by_product(product_id, move |entry| {
                if let Some(available) = command.available_quantity {
                    let reserved = entry.reserved_quantity();
                    entry
                        .set_available(available)
                        .map_err(|error| map_stock_error(product_id, available, reserved, error))?;
                }
                entry.set_reorder_policy(command.reorder_level, command.reorder_quantity);
                if let Some(location) = command.warehouse_location {
                    entry.set_warehouse_location(location);
                }
                Ok(entry.take_events())
            })
            .await?
            .ok_or(InventoryServiceError::NotStocked(product_id))?;
        let events = outcome?;
        log_events(&events);
        Ok(())
    }

    /// Creates the first ledger row for a product or variant.
    pub async fn provision(&self, command: ProvisionCommand) -> Result<Inventory, InventoryServiceError> {
        let ProvisionCommand {
            product_id,
            variant_id,
            supplier_id,
            initial_quantity,
            reorder_level,
            reorder_quantity,
            warehouse_location,
        } = command;

        let existing = match variant_id {
            Some(variant_id) => self.store.find_inventory_by_variant(variant_id).await?,
            None => self.store.find_inventory_by_product(product_id).await?,
        };
        if existing.is_some() {
            return Err(InventoryServiceError::AlreadyProvisioned(product_id));
        }

        let mut entry = Inventory::new(product_id, variant_id, supplier_id);
        if initial_quantity > 0 {
            entry
                .restock(initial_quantity)
                .map_err(|error| map_stock_error(product_id, initial_quantity, 0, error))?;
        }
        entry.set_reorder_policy(reorder_level, reorder_quantity);
        if let Some(location) = warehouse_location {
            entry.set_warehouse_location(location);
        }

        let events = entry.take_events();
        let saved = self.store.save_inventory(entry).await?;
        log_events(&events);
        tracing::info!(%product_id, variant_id = ?variant_id, "inventory entry provisioned");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn provision_command(initial: u32) -> ProvisionCommand {
        ProvisionCommand {
            product_id: ProductId(1),
            variant_id: None,
            supplier_id: SupplierId(10),
            initial_quantity: initial,
            reorder_level: Some(20),
            reorder_quantity: Some(100),
            warehouse_location: Some("A-13".to_string()),
        }
    }

    async fn service_with_stock(initial: u32) -> InventoryService<MemoryStore> {
        let service = InventoryService::new(MemoryStore::new());
        service.provision(provision_command(initial)).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_provision_and_report() {
        let service = service_with_stock(100).await;
        let report = service.check_availability(ProductId(1), 40).await.unwrap();
        assert_eq!(report.available, 100);
        assert!(report.orderable);
        assert!(report.sufficient_stock);
        assert_eq!(report.status, InventoryStatus::Available);
    }

    #[tokio::test]
    async fn test_provision_rejects_duplicate() {
        let service = service_with_stock(10).await;
        let err = service.provision(provision_command(5)).await.unwrap_err();
        assert_eq!(err, InventoryServiceError::AlreadyProvisioned(ProductId(1)));
    }

    #[tokio::test]
    async fn test_missing_product_reports_unavailable() {
        let service = InventoryService::new(MemoryStore::new());
        let report = service.check_availability(ProductId(9), 1).await.unwrap();
        assert_eq!(report.available, 0);
        assert!(!report.orderable);
        assert!(!report.sufficient_stock);
    }

    #[tokio::test]
    async fn test_reserve_then_release_round_trip() {
        let service = service_with_stock(100).await;
        service.reserve(ProductId(1), 30).await.unwrap();
        let report = service.check_availability(ProductId(1), 1).await.unwrap();
        assert_eq!(report.available, 70);

        service.release(ProductId(1), 30).await.unwrap();
        let report = service.check_availability(ProductId(1), 1).await.unwrap();
        assert_eq!(report.available, 100);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_stock() {
        let service = service_with_stock(10).await;
        let err = service.reserve(ProductId(1), 11).await.unwrap_err();
        assert_eq!(
            err,
            InventoryServiceError::InsufficientStock { product_id: ProductId(1), requested: 11, available: 10 }
        );
    }

    #[tokio::test]
    async fn test_reserve_gates_on_orderable_before_stock() {
        let service = service_with_stock(100).await;
        service.discontinue(ProductId(1)).await.unwrap();
        let err = service.reserve(ProductId(1), 1).await.unwrap_err();
        assert_eq!(
            err,
            InventoryServiceError::NotOrderable { product_id: ProductId(1), status: InventoryStatus::Discontinued }
        );
    }

    #[tokio::test]
    async fn test_reserve_unknown_product() {
        let service = InventoryService::new(MemoryStore::new());
        let err = service.reserve(ProductId(9), 1).await.unwrap_err();
        assert_eq!(err, InventoryServiceError::NotStocked(ProductId(9)));
    }

    #[tokio::test]
    async fn test_release_more_than_reserved_is_hard_failure() {
        let service = service_with_stock(100).await;
        service.reserve(ProductId(1), 10).await.unwrap();
        let err = service.release(ProductId(1), 11).await.unwrap_err();
        assert_eq!(
            err,
            InventoryServiceError::InsufficientReservedStock { product_id: ProductId(1), requested: 11, reserved: 10 }
        );
    }

    #[tokio::test]
    async fn test_deduct_consumes_reserved_only() {
        let service = service_with_stock(100).await;
        service.reserve(ProductId(1), 40).await.unwrap();
        service.deduct(ProductId(1), 40).await.unwrap();

        let report = service.check_availability(ProductId(1), 1).await.unwrap();
        assert_eq!(report.available, 60);

        let err = service.deduct(ProductId(1), 1).await.unwrap_err();
        assert!(matches!(err, InventoryServiceError::InsufficientReservedStock { reserved: 0, .. }));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_everywhere() {
        let service = service_with_stock(100).await;
        for result in [
            service.reserve(ProductId(1), 0).await,
            service.release(ProductId(1), 0).await,
            service.deduct(ProductId(1), 0).await,
            service.restock(ProductId(1), 0).await,
        ] {
            assert_eq!(result.unwrap_err(), InventoryServiceError::InvalidQuantity);
        }
    }

    #[tokio::test]
    async fn test_update_entry_guards_reserved_floor() {
        let service = service_with_stock(100).await;
        service.reserve(ProductId(1), 30).await.unwrap();

        let err = service
            .update_entry(UpdateInventoryCommand {
                product_id: ProductId(1),
                available_quantity: Some(20),
                reorder_level: None,
                reorder_quantity: None,
                warehouse_location: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, InventoryServiceError::AvailableBelowReserved { available: 20, reserved: 30 });

        service
            .update_entry(UpdateInventoryCommand {
                product_id: ProductId(1),
                available_quantity: Some(45),
                reorder_level: Some(50),
                reorder_quantity: None,
                warehouse_location: Some("B-2".to_string()),
            })
            .await
            .unwrap();
        let report = service.check_availability(ProductId(1), 1).await.unwrap();
        assert_eq!(report.available, 45);
        assert_eq!(report.status, InventoryStatus::LowStock);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_serialize_cleanly() {
        let store = MemoryStore::new();
        let service = InventoryService::new(store.clone());
        service.provision(provision_command(100)).await.unwrap();

        let first = InventoryService::new(store.clone());
        let second = InventoryService::new(store);
        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.reserve(ProductId(1), 60).await }),
            tokio::spawn(async move { second.reserve(ProductId(1), 60).await }),
        );
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find(|r| r.is_err()).and_then(|r| r.as_ref().err());
        assert_eq!(
            loser,
            Some(&InventoryServiceError::InsufficientStock { product_id: ProductId(1), requested: 60, available: 40 })
        );

        let report = service.check_availability(ProductId(1), 1).await.unwrap();
        assert_eq!(report.available, 40);
    }
}
