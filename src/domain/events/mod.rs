//! Domain events raised by the aggregates
//!
//! Aggregates collect events as they mutate; callers drain them with
//! `take_events()` after a successful commit and decide what to do with
//! them (the bundled services log them).

use crate::domain::aggregates::inventory::InventoryStatus;
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::value_objects::{OrderNumber, ProductId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DomainEvent {
    Stock(StockEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StockEvent {
    Reserved { product_id: ProductId, variant_id: Option<VariantId>, quantity: u32 },
    Released { product_id: ProductId, variant_id: Option<VariantId>, quantity: u32 },
    Deducted { product_id: ProductId, variant_id: Option<VariantId>, quantity: u32 },
    Restocked { product_id: ProductId, variant_id: Option<VariantId>, quantity: u32 },
    Discontinued { product_id: ProductId, variant_id: Option<VariantId> },
    StatusChanged { product_id: ProductId, variant_id: Option<VariantId>, from: InventoryStatus, to: InventoryStatus },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OrderEvent {
    Placed { order_number: OrderNumber, total: Decimal },
    Confirmed { order_number: OrderNumber },
    Shipped { order_number: OrderNumber },
    Delivered { order_number: OrderNumber },
    Cancelled { order_number: OrderNumber, from: OrderStatus },
    Repriced { order_number: OrderNumber, total: Decimal },
}
