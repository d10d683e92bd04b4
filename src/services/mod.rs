//! Application services: the write paths that load aggregates, apply
//! domain operations, and persist the outcome through the store ports.

pub mod fulfillment;
pub mod inventory;
pub mod orders;

pub use fulfillment::{FulfillmentCoordinator, FulfillmentError, ItemPriceCorrection, UpdateOrderCommand};
pub use inventory::{AvailabilityReport, InventoryService, InventoryServiceError, ProvisionCommand, UpdateInventoryCommand};
pub use orders::{OrderService, OrderServiceError, PlaceOrderCommand, PlaceOrderItem};

use crate::domain::aggregates::Inventory;
use crate::domain::events::{DomainEvent, OrderEvent, StockEvent};
use crate::store::{InventoryStore, StoreError};
use crate::domain::value_objects::{ProductId, SupplierId, VariantId};

/// Resolves the ledger row for an order line: variant-scoped first, then
/// the supplier's product-scoped row. `None` means the line has no tracked
/// inventory at all.
pub(crate) async fn resolve_ledger_entry<S: InventoryStore>(
    store: &S,
    supplier_id: SupplierId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
) -> Result<Option<Inventory>, StoreError> {
    if let Some(variant_id) = variant_id {
        if let Some(entry) = store.find_inventory_by_variant(variant_id).await? {
            return Ok(Some(entry));
        }
    }
    store.find_inventory_by_supplier_and_product(supplier_id, product_id).await
}

/// Emits one log line per drained domain event. Services call this after a
/// successful commit, so the log only ever reflects persisted state.
pub(crate) fn log_events(events: &[DomainEvent]) {
    for event in events {
        match event {
            DomainEvent::Stock(stock) => log_stock_event(stock),
            DomainEvent::Order(order) => log_order_event(order),
        }
    }
}

fn log_stock_event(event: &StockEvent) {
    match event {
        StockEvent::Reserved { product_id, variant_id, quantity } => {
            tracing::info!(%product_id, variant_id = ?variant_id, quantity, "stock reserved");
        }
        StockEvent::Released { product_id, variant_id, quantity } => {
            tracing::info!(%product_id, variant_id = ?variant_id, quantity, "reserved stock released");
        }
        StockEvent::Deducted { product_id, variant_id, quantity } => {
            tracing::info!(%product_id, variant_id = ?variant_id, quantity, "reserved stock deducted");
        }
        StockEvent::Restocked { product_id, variant_id, quantity } => {
            tracing::info!(%product_id, variant_id = ?variant_id, quantity, "stock replenished");
        }
        StockEvent::Discontinued { product_id, variant_id } => {
            tracing::info!(%product_id, variant_id = ?variant_id, "inventory discontinued");
        }
        StockEvent::StatusChanged { product_id, variant_id, from, to } => {
            tracing::debug!(%product_id, variant_id = ?variant_id, %from, %to, "inventory status changed");
        }
    }
}

fn log_order_event(event: &OrderEvent) {
    match event {
        OrderEvent::Placed { order_number, total } => {
            tracing::info!(%order_number, %total, "order placed");
        }
        OrderEvent::Confirmed { order_number } => {
            tracing::info!(%order_number, "order confirmed");
        }
        OrderEvent::Shipped { order_number } => {
            tracing::info!(%order_number, "order shipped");
        }
        OrderEvent::Delivered { order_number } => {
            tracing::info!(%order_number, "order delivered");
        }
        OrderEvent::Cancelled { order_number, from } => {
            tracing::info!(%order_number, %from, "order cancelled");
        }
        OrderEvent::Repriced { order_number, total } => {
            tracing::info!(%order_number, %total, "order repriced");
        }
    }
}
