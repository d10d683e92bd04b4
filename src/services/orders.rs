//! Order placement and cancellation.
//!
//! Placement is all-or-nothing: every line must price and reserve before
//! anything is persisted, and the order plus all touched ledger rows go
//! through one unit-of-work commit. Cancellation is deliberately more
//! forgiving about the ledger (see `cancel_order`).

use chrono::{DateTime, Utc};

use crate::domain::aggregates::order::{Order, OrderError, OrderItem, OrderStatus};
use crate::domain::aggregates::Inventory;
use crate::domain::pricing::meets_minimum_order_quantity;
use crate::domain::value_objects::{OrderId, OrderNumber, OrderNumberError, ProductId, RetailerId, SupplierId, VariantId};
use crate::store::{CatalogReader, InventoryStore, OrderStore, StoreError, UnitOfWork};

use super::{log_events, resolve_ledger_entry};

#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

#[derive(Clone, Debug)]
pub struct PlaceOrderCommand {
    pub order_number: String,
    pub retailer_id: RetailerId,
    pub supplier_id: SupplierId,
    pub shipping_address: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<PlaceOrderItem>,
}

#[derive(Clone, Copy, Debug)]
pub struct PlaceOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderServiceError {
    #[error("invalid order number: {0}")]
    InvalidOrderNumber(#[from] OrderNumberError),
    #[error("order number already exists: {0}")]
    DuplicateOrderNumber(OrderNumber),
    #[error("order must contain at least one item")]
    EmptyOrder,
    #[error("quantity must be greater than 0")]
    InvalidQuantity,
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("product {0} is not active")]
    ProductNotActive(ProductId),
    #[error("variant not found: {0}")]
    VariantNotFound(VariantId),
    #[error("variant {variant_id} does not belong to product {product_id}")]
    VariantMismatch { product_id: ProductId, variant_id: VariantId },
    #[error("quantity {quantity} is below the minimum order quantity {minimum}")]
    BelowMinimumOrderQuantity { quantity: u32, minimum: u32 },
    #[error("no inventory entry for product {product_id}")]
    NotStocked { product_id: ProductId, variant_id: Option<VariantId> },
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, requested: u32, available: u32 },
    #[error("order not found with ID: {0}")]
    OrderNotFound(OrderId),
    #[error("order cannot be cancelled from status {0}")]
    CannotCancel(OrderStatus),
    #[error(transparent)]
    Domain(#[from] OrderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> OrderService<S>
where
    S: OrderStore + InventoryStore + CatalogReader + UnitOfWork,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places a new order: prices every line through the catalog, reserves
    /// stock for every line, and commits the Pending order together with
    /// all touched ledger rows. Any failure aborts the whole placement
    /// with nothing persisted.
    pub async fn place_order(&self, command: PlaceOrderCommand) -> Result<Order, OrderServiceError> {
        let PlaceOrderCommand { order_number, retailer_id, supplier_id, shipping_address, order_date, items } =
            command;

        let order_number = OrderNumber::new(order_number)?;
        if items.is_empty() {
            return Err(OrderServiceError::EmptyOrder);
        }
        if self.store.order_number_exists(&order_number).await? {
            return Err(OrderServiceError::DuplicateOrderNumber(order_number));
        }

        let mut order_items = Vec::with_capacity(items.len());
        let mut touched: Vec<Inventory> = Vec::new();

        for line in &items {
            if line.quantity == 0 {
                return Err(OrderServiceError::InvalidQuantity);
            }

            let product = self
                .store
                .product(line.product_id)
                .await?
                .ok_or(OrderServiceError::ProductNotFound(line.product_id))?;
            if !product.active {
                return Err(OrderServiceError::ProductNotActive(line.product_id));
            }

            let variant = self
                .store
                .variant(line.variant_id)
                .await?
                .ok_or(OrderServiceError::VariantNotFound(line.variant_id))?;
            if variant.product_id != line.product_id {
                return Err(OrderServiceError::VariantMismatch {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                });
            }

            let minimum = product.pricing.minimum_order_quantity;
            if !meets_minimum_order_quantity(line.quantity, minimum) {
                return Err(OrderServiceError::BelowMinimumOrderQuantity { quantity: line.quantity, minimum });
            }

            let entry = resolve_ledger_entry(&self.store, supplier_id, line.product_id, Some(line.variant_id))
                .await?
                .ok_or(OrderServiceError::NotStocked {
                    product_id: line.product_id,
                    variant_id: Some(line.variant_id),
                })?;
            // Two lines can resolve to the same row; reserve on one copy.
            let index = match touched.iter().position(|row| row.id() == entry.id()) {
                Some(index) => index,
                None => {
                    touched.push(entry);
                    touched.len() - 1
                }
            };
            let row = &mut touched[index];
            if !row.reserve_stock(line.quantity) {
                return Err(OrderServiceError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: row.available_quantity(),
                });
            }

            let unit_price = product.unit_price(Some(&variant), line.quantity);
            order_items.push(OrderItem::new(
                line.product_id,
                Some(line.variant_id),
                line.quantity,
                unit_price,
                product.name.clone(),
            )?);
        }

        let mut order = Order::create(order_number, retailer_id, supplier_id, order_items, shipping_address, order_date)?;

        let mut events = order.take_events();
        for row in &mut touched {
            events.extend(row.take_events());
        }

        let saved = match self.store.commit(order, touched).await {
            Ok(saved) => saved,
            Err(StoreError::DuplicateOrderNumber(number)) => {
                return Err(OrderServiceError::DuplicateOrderNumber(number));
            }
            Err(error) => return Err(error.into()),
        };
        log_events(&events);
        Ok(saved)
    }

    /// Cancels an order and returns its reservations to the available
    /// pool. Lines without a ledger row are skipped, and a release that no
    /// longer matches the row's bookkeeping is logged and tolerated: the
    /// cancellation itself must still go through.
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderServiceError> {
        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrderServiceError::OrderNotFound(order_id))?;
        if !order.can_be_cancelled() {
            return Err(OrderServiceError::CannotCancel(order.status()));
        }

        let mut touched: Vec<Inventory> = Vec::new();
        for item in order.items() {
            let resolved =
                resolve_ledger_entry(&self.store, order.supplier_id(), item.product_id(), item.variant_id()).await?;
            let Some(entry) = resolved else {
                tracing::warn!(
                    %order_id,
                    product_id = %item.product_id(),
                    "no ledger entry for cancelled item, skipping release"
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
            if let Err(error) = row.release_reserved_stock(item.quantity()) {
                tracing::warn!(
                    %order_id,
                    product_id = %item.product_id(),
                    %error,
                    "release failed during cancellation, continuing"
                );
            }
        }

        order.cancel()?;

        let mut events = order.take_events();
        for row in &mut touched {
            events.extend(row.take_events());
        }

        let saved = self.store.commit(order, touched).await?;
        log_events(&events);
        Ok(saved)
    }
}
