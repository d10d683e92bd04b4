//! Fulfillment coordination: one write path that moves an order through
//! its lifecycle and keeps the stock ledger in step with every move.
//!
//! `update_order` is the only public operation. It stages the requested
//! status change, its ledger side effects, a delivery date, and any price
//! corrections entirely in memory, then persists the whole unit through
//! one commit. A failure anywhere leaves both the order and the ledger
//! exactly as they were.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::aggregates::order::{Order, OrderError, OrderStatus};
use crate::domain::aggregates::Inventory;
use crate::domain::value_objects::{OrderId, OrderItemId, ProductId};
use crate::store::{InventoryStore, OrderStore, StoreError, UnitOfWork};

use super::{log_events, resolve_ledger_entry};

#[derive(Clone)]
pub struct FulfillmentCoordinator<S> {
    store: S,
}

/// One `update_order` request. Absent fields are left untouched; price
/// corrections replace the unit price of the named line items.
#[derive(Clone, Debug, Default)]
pub struct UpdateOrderCommand {
    pub target_status: Option<OrderStatus>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub price_corrections: Vec<ItemPriceCorrection>,
}

#[derive(Clone, Copy, Debug)]
pub struct ItemPriceCorrection {
    pub order_item_id: OrderItemId,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FulfillmentError {
    #[error("order not found with ID: {0}")]
    OrderNotFound(OrderId),
    #[error("insufficient reserved stock for product {product_id}: requested {requested}, reserved {reserved}")]
    InsufficientReservedStock { product_id: ProductId, requested: u32, reserved: u32 },
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

enum StockEffect {
    Deduct,
    Release,
}

impl<S> FulfillmentCoordinator<S>
where
    S: OrderStore + InventoryStore + UnitOfWork,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies a status change, delivery date, and price corrections to an
    /// order as one atomic unit.
    ///
    /// A transition to Shipped deducts every line's reservation; a
    /// transition to Cancelled releases it. Lines without a ledger row are
    /// skipped rather than failing the order: an untracked line (a service
    /// charge, say) must not block fulfillment of the rest.
    pub async fn update_order(&self, order_id: OrderId, command: UpdateOrderCommand) -> Result<Order, FulfillmentError> {
        let UpdateOrderCommand { target_status, delivery_date, price_corrections } = command;

        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        let mut touched: Vec<Inventory> = Vec::new();

        if let Some(target) = target_status {
            if !order.status().can_transition_to(target) {
                return Err(OrderError::InvalidStatusTransition { from: order.status(), to: target }.into());
            }
            match target {
                OrderStatus::Shipped => self.apply_stock_effect(&order, StockEffect::Deduct, &mut touched).await?,
                OrderStatus::Cancelled => self.apply_stock_effect(&order, StockEffect::Release, &mut touched).await?,
                _ => {}
            }
            order.transition_to(target)?;
        }

        if let Some(date) = delivery_date {
            order.set_delivery_date(date);
        }

        for correction in &price_corrections {
            order.update_item_price(correction.order_item_id, correction.unit_price)?;
        }

        let mut events = order.take_events();
        for row in &mut touched {
            events.extend(row.take_events());
        }

        let saved = self.store.commit(order, touched).await?;
        log_events(&events);
        tracing::debug!(%order_id, "order update committed");
        Ok(saved)
    }

    async fn apply_stock_effect(
        &self,
        order: &Order,
        effect: StockEffect,
        touched: &mut Vec<Inventory>,
    ) -> Result<(), FulfillmentError> {
        for item in order.items() {
            let resolved =
                resolve_ledger_entry(&self.store, order.supplier_id(), item.product_id(), item.variant_id()).await?;
            let Some(entry) = resolved else {
                tracing::warn!(
                    product_id = %item.product_id(),
                    variant_id = ?item.variant_id(),
                    "no ledger entry for order item, skipping stock side effect"
                );
                continue;
            };
            let index = match touched.iter().position(|row| row.id() == entry.id()) {
                Some(index) => index,
                None => {
                    touched.push(entry);
                    touched.len() - 1
                }
            };
            let row = &mut touched[index];
            let reserved = row.reserved_quantity();
            let applied = match effect {
                StockEffect::Deduct => row.deduct_stock(item.quantity()),
                StockEffect::Release => row.release_reserved_stock(item.quantity()).is_ok(),
            };
            if !applied {
                return Err(FulfillmentError::InsufficientReservedStock {
                    product_id: item.product_id(),
                    requested: item.quantity(),
                    reserved,
                });
            }
        }
        Ok(())
    }
}
