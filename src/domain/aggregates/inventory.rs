//! Inventory Aggregate (stock ledger)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::events::{DomainEvent, StockEvent};
use crate::domain::value_objects::{InventoryId, ProductId, Quantity, SupplierId, VariantId};

/// Stock ledger entry for one product, or one product variant when the
/// supplier tracks stock per variant.
///
/// Stock moves through a three-phase protocol: `reserve_stock` holds units
/// for a placed order (available -> reserved), and the hold is later either
/// returned by `release_reserved_stock` (cancellation) or consumed by
/// `deduct_stock` (shipment). Counters are unsigned, so neither pool can
/// go negative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Inventory {
    id: Option<InventoryId>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    supplier_id: SupplierId,
    available: Quantity,
    reserved: Quantity,
    reorder_level: Option<u32>,
    reorder_quantity: Option<u32>,
    warehouse_location: Option<String>,
    status: InventoryStatus,
    last_restocked: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
    version: u64,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Available,
    LowStock,
    #[default]
    OutOfStock,
    Discontinued,
}

impl std::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::LowStock => write!(f, "LOW_STOCK"),
            Self::OutOfStock => write!(f, "OUT_OF_STOCK"),
            Self::Discontinued => write!(f, "DISCONTINUED"),
        }
    }
}

/// Status derivation rule. Discontinued is sticky: once set manually it is
/// never overridden by counter changes.
pub fn derive_status(current: InventoryStatus, available: u32, reorder_level: Option<u32>) -> InventoryStatus {
    if current == InventoryStatus::Discontinued { return InventoryStatus::Discontinued; }
    if available == 0 { return InventoryStatus::OutOfStock; }
    match reorder_level {
        Some(level) if available <= level => InventoryStatus::LowStock,
        _ => InventoryStatus::Available,
    }
}

impl Inventory {
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>, supplier_id: SupplierId) -> Self {
        Self {
            id: None, product_id, variant_id, supplier_id,
            available: Quantity::default(), reserved: Quantity::default(),
            reorder_level: None, reorder_quantity: None, warehouse_location: None,
            status: InventoryStatus::OutOfStock,
            last_restocked: None, last_updated: Utc::now(),
            version: 0, events: vec![],
        }
    }

    pub fn id(&self) -> Option<InventoryId> { self.id }
    pub fn product_id(&self) -> ProductId { self.product_id }
    pub fn variant_id(&self) -> Option<VariantId> { self.variant_id }
    pub fn supplier_id(&self) -> SupplierId { self.supplier_id }
    pub fn available_quantity(&self) -> u32 { self.available.value() }
    pub fn reserved_quantity(&self) -> u32 { self.reserved.value() }
    pub fn reorder_level(&self) -> Option<u32> { self.reorder_level }
    pub fn reorder_quantity(&self) -> Option<u32> { self.reorder_quantity }
    pub fn warehouse_location(&self) -> Option<&str> { self.warehouse_location.as_deref() }
    pub fn status(&self) -> InventoryStatus { self.status }
    pub fn last_restocked(&self) -> Option<DateTime<Utc>> { self.last_restocked }
    pub fn last_updated(&self) -> DateTime<Utc> { self.last_updated }
    pub fn version(&self) -> u64 { self.version }

    pub(crate) fn set_id(&mut self, id: InventoryId) { self.id = Some(id); }
    pub(crate) fn set_version(&mut self, version: u64) { self.version = version; }

    pub fn has_sufficient_stock(&self, quantity: u32) -> bool {
        quantity > 0 && self.available.value() >= quantity
    }

    /// Moves `quantity` from available to reserved. Fails closed: a zero
    /// quantity or insufficient available stock returns `false` with no
    /// mutation.
    pub fn reserve_stock(&mut self, quantity: u32) -> bool {
        if quantity == 0 { return false; }
        let remaining = match self.available.subtract(quantity) {
            Some(q) => q,
            None => return false,
        };
        self.available = remaining;
        self.reserved = self.reserved.add(quantity);
        self.raise_event(DomainEvent::Stock(StockEvent::Reserved {
            product_id: self.product_id, variant_id: self.variant_id, quantity,
        }));
        self.touch();
        true
    }

    /// Returns a reservation to the available pool.
    pub fn release_reserved_stock(&mut self, quantity: u32) -> Result<(), StockError> {
        if quantity == 0 { return Err(StockError::InvalidQuantity); }
        self.reserved = self.reserved.subtract(quantity).ok_or(StockError::InsufficientReserved)?;
        self.available = self.available.add(quantity);
        self.raise_event(DomainEvent::Stock(StockEvent::Released {
            product_id: self.product_id, variant_id: self.variant_id, quantity,
        }));
        self.touch();
        Ok(())
    }

    /// Permanently removes `quantity` from the reserved pool at shipment.
    /// The available pool is untouched: those units left it when they were
    /// reserved. Fails closed like `reserve_stock`.
    pub fn deduct_stock(&mut self, quantity: u32) -> bool {
        if quantity == 0 { return false; }
        let remaining = match self.reserved.subtract(quantity) {
            Some(q) => q,
            None => return false,
        };
        self.reserved = remaining;
        self.raise_event(DomainEvent::Stock(StockEvent::Deducted {
            product_id: self.product_id, variant_id: self.variant_id, quantity,
        }));
        self.touch();
        true
    }

    pub fn restock(&mut self, quantity: u32) -> Result<(), StockError> {
        if quantity == 0 { return Err(StockError::InvalidQuantity); }
        self.available = self.available.add(quantity);
        self.last_restocked = Some(Utc::now());
        self.raise_event(DomainEvent::Stock(StockEvent::Restocked {
            product_id: self.product_id, variant_id: self.variant_id, quantity,
        }));
        self.touch();
        Ok(())
    }

    /// Manual override of the available counter. Cannot drop below what is
    /// currently reserved; reservations must be released first.
    pub fn set_available(&mut self, quantity: u32) -> Result<(), StockError> {
        if quantity < self.reserved.value() {
            return Err(StockError::AvailableBelowReserved {
                available: quantity,
                reserved: self.reserved.value(),
            });
        }
        self.available = Quantity::new(quantity);
        self.touch();
        Ok(())
    }

    pub fn set_reorder_policy(&mut self, level: Option<u32>, quantity: Option<u32>) {
        if let Some(level) = level { self.reorder_level = Some(level); }
        if let Some(quantity) = quantity { self.reorder_quantity = Some(quantity); }
        self.touch();
    }

    pub fn set_warehouse_location(&mut self, location: impl Into<String>) {
        self.warehouse_location = Some(location.into());
        self.last_updated = Utc::now();
    }

    pub fn discontinue(&mut self) {
        if self.status == InventoryStatus::Discontinued { return; }
        self.status = InventoryStatus::Discontinued;
        self.raise_event(DomainEvent::Stock(StockEvent::Discontinued {
            product_id: self.product_id, variant_id: self.variant_id,
        }));
        self.last_updated = Utc::now();
    }

    pub fn needs_reorder(&self) -> bool {
        if self.status == InventoryStatus::Discontinued { return false; }
        match self.reorder_level {
            Some(level) => self.total_stock() <= level,
            None => false,
        }
    }

    pub fn total_stock(&self) -> u32 { self.available.value() + self.reserved.value() }

    pub fn is_available_for_order(&self) -> bool {
        matches!(self.status, InventoryStatus::Available | InventoryStatus::LowStock)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
        let next = derive_status(self.status, self.available.value(), self.reorder_level);
        if next != self.status {
            let from = self.status;
            self.status = next;
            self.raise_event(DomainEvent::Stock(StockEvent::StatusChanged {
                product_id: self.product_id, variant_id: self.variant_id, from, to: next,
            }));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    InvalidQuantity,
    InsufficientReserved,
    AvailableBelowReserved { available: u32, reserved: u32 },
}

impl std::error::Error for StockError {}
impl std::fmt::Display for StockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be greater than 0"),
            Self::InsufficientReserved => write!(f, "Cannot release more than reserved quantity"),
            Self::AvailableBelowReserved { available, reserved } => {
                write!(f, "Available quantity ({available}) cannot be less than reserved quantity ({reserved})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_stock(available: u32) -> Inventory {
        let mut inv = Inventory::new(ProductId(1), None, SupplierId(10));
        if available > 0 { inv.restock(available).unwrap(); }
        inv
    }

    #[test]
    fn test_reserve_moves_available_to_reserved() {
        let mut inv = entry_with_stock(100);
        assert!(inv.reserve_stock(30));
        assert_eq!(inv.available_quantity(), 70);
        assert_eq!(inv.reserved_quantity(), 30);
    }

    #[test]
    fn test_reserve_fails_closed_on_insufficient_stock() {
        let mut inv = entry_with_stock(100);
        assert!(!inv.reserve_stock(150));
        assert_eq!(inv.available_quantity(), 100);
        assert_eq!(inv.reserved_quantity(), 0);
    }

    #[test]
    fn test_reserve_rejects_zero_quantity() {
        let mut inv = entry_with_stock(100);
        assert!(!inv.reserve_stock(0));
        assert_eq!(inv.available_quantity(), 100);
    }

    #[test]
    fn test_release_round_trips_reservation() {
        let mut inv = entry_with_stock(50);
        assert!(inv.reserve_stock(20));
        inv.release_reserved_stock(20).unwrap();
        assert_eq!(inv.available_quantity(), 50);
        assert_eq!(inv.reserved_quantity(), 0);
    }

    #[test]
    fn test_release_more_than_reserved_fails() {
        let mut inv = entry_with_stock(50);
        assert!(inv.reserve_stock(10));
        assert_eq!(inv.release_reserved_stock(11), Err(StockError::InsufficientReserved));
        assert_eq!(inv.reserved_quantity(), 10);
    }

    #[test]
    fn test_deduct_consumes_reserved_only() {
        let mut inv = entry_with_stock(50);
        assert!(inv.reserve_stock(20));
        assert!(inv.deduct_stock(20));
        assert_eq!(inv.available_quantity(), 30);
        assert_eq!(inv.reserved_quantity(), 0);
        assert_eq!(inv.total_stock(), 30);
    }

    #[test]
    fn test_deduct_without_reservation_fails_closed() {
        let mut inv = entry_with_stock(50);
        assert!(!inv.deduct_stock(5));
        assert_eq!(inv.available_quantity(), 50);
    }

    #[test]
    fn test_restock_adds_available_and_stamps_time() {
        let mut inv = Inventory::new(ProductId(1), None, SupplierId(10));
        assert!(inv.last_restocked().is_none());
        inv.restock(40).unwrap();
        assert_eq!(inv.available_quantity(), 40);
        assert_eq!(inv.reserved_quantity(), 0);
        assert!(inv.last_restocked().is_some());
        assert_eq!(inv.restock(0), Err(StockError::InvalidQuantity));
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(derive_status(InventoryStatus::Available, 0, Some(10)), InventoryStatus::OutOfStock);
        assert_eq!(derive_status(InventoryStatus::Available, 10, Some(10)), InventoryStatus::LowStock);
        assert_eq!(derive_status(InventoryStatus::OutOfStock, 11, Some(10)), InventoryStatus::Available);
        assert_eq!(derive_status(InventoryStatus::Available, 5, None), InventoryStatus::Available);
        assert_eq!(derive_status(InventoryStatus::Discontinued, 500, Some(10)), InventoryStatus::Discontinued);
    }

    #[test]
    fn test_discontinued_is_sticky() {
        let mut inv = entry_with_stock(100);
        inv.discontinue();
        inv.restock(50).unwrap();
        assert_eq!(inv.status(), InventoryStatus::Discontinued);
        assert!(!inv.is_available_for_order());
        assert!(!inv.needs_reorder());
    }

    #[test]
    fn test_reserve_then_deduct_scenario() {
        let mut inv = Inventory::new(ProductId(7), None, SupplierId(10));
        inv.set_reorder_policy(Some(20), Some(100));
        inv.restock(100).unwrap();
        assert_eq!(inv.status(), InventoryStatus::Available);

        assert!(inv.reserve_stock(85));
        assert_eq!(inv.available_quantity(), 15);
        assert_eq!(inv.reserved_quantity(), 85);
        assert_eq!(inv.status(), InventoryStatus::LowStock);

        assert!(inv.deduct_stock(85));
        assert_eq!(inv.available_quantity(), 15);
        assert_eq!(inv.reserved_quantity(), 0);
        assert_eq!(inv.status(), InventoryStatus::LowStock);
        assert!(inv.needs_reorder());
    }

    #[test]
    fn test_has_sufficient_stock_boundaries() {
        let inv = entry_with_stock(10);
        assert!(inv.has_sufficient_stock(10));
        assert!(!inv.has_sufficient_stock(11));
        assert!(!inv.has_sufficient_stock(0));
    }

    #[test]
    fn test_set_available_guards_reserved() {
        let mut inv = entry_with_stock(50);
        assert!(inv.reserve_stock(30));
        assert_eq!(
            inv.set_available(29),
            Err(StockError::AvailableBelowReserved { available: 29, reserved: 30 })
        );
        inv.set_available(30).unwrap();
        assert_eq!(inv.available_quantity(), 30);
    }

    #[test]
    fn test_events_raised_and_drained() {
        let mut inv = entry_with_stock(10);
        inv.take_events();
        assert!(inv.reserve_stock(4));
        let events = inv.take_events();
        assert_eq!(events.len(), 1);
        assert!(inv.take_events().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_reserve_release_round_trip(stock in 1u32..10_000, qty in 1u32..10_000) {
                let mut inv = entry_with_stock(stock);
                let before = (inv.available_quantity(), inv.reserved_quantity());
                if inv.reserve_stock(qty) {
                    inv.release_reserved_stock(qty).unwrap();
                }
                prop_assert_eq!((inv.available_quantity(), inv.reserved_quantity()), before);
            }

            #[test]
            fn prop_reserve_deduct_reduces_total_once(stock in 1u32..10_000, qty in 1u32..10_000) {
                let mut inv = entry_with_stock(stock);
                let total_before = inv.total_stock();
                if inv.reserve_stock(qty) {
                    let available_after_reserve = inv.available_quantity();
                    prop_assert!(inv.deduct_stock(qty));
                    prop_assert_eq!(inv.available_quantity(), available_after_reserve);
                    prop_assert_eq!(inv.reserved_quantity(), 0);
                    prop_assert_eq!(inv.total_stock(), total_before - qty);
                }
            }

            #[test]
            fn prop_restock_only_touches_available(stock in 0u32..10_000, reserve in 0u32..10_000, qty in 1u32..10_000) {
                let mut inv = entry_with_stock(stock);
                inv.reserve_stock(reserve);
                let reserved_before = inv.reserved_quantity();
                let available_before = inv.available_quantity();
                inv.restock(qty).unwrap();
                prop_assert_eq!(inv.reserved_quantity(), reserved_before);
                prop_assert_eq!(inv.available_quantity(), available_before + qty);
            }

            #[test]
            fn prop_status_tracks_counters(stock in 0u32..1_000, level in proptest::option::of(0u32..1_000)) {
                let mut inv = Inventory::new(ProductId(1), None, SupplierId(1));
                inv.set_reorder_policy(level, None);
                if stock > 0 { inv.restock(stock).unwrap(); }
                let expected = if stock == 0 {
                    InventoryStatus::OutOfStock
                } else if level.is_some_and(|l| stock <= l) {
                    InventoryStatus::LowStock
                } else {
                    InventoryStatus::Available
                };
                prop_assert_eq!(inv.status(), expected);
            }
        }
    }
}
