//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::round_money;
use crate::domain::value_objects::{OrderId, OrderItemId, OrderNumber, ProductId, Quantity, RetailerId, SupplierId, VariantId};

/// Purchase order placed by a retailer against a supplier.
///
/// Status moves only along the machine below; every other request fails
/// with `InvalidStatusTransition` and leaves the order untouched.
///
/// ```text
/// PENDING -> CONFIRMED -> SHIPPED -> DELIVERED
///    |           |
///    +-----------+--> CANCELLED
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    order_number: OrderNumber,
    retailer_id: RetailerId,
    supplier_id: SupplierId,
    items: Vec<OrderItem>,
    total_amount: Decimal,
    status: OrderStatus,
    shipping_address: Option<String>,
    order_date: DateTime<Utc>,
    delivery_date: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
}

/// Line item owned by exactly one order. `price` is the unit price; the
/// line total is always `quantity * price`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    id: Option<OrderItemId>,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: Quantity,
    price: Decimal,
    product_name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The transition table. `Pending` is never a valid target.
    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Shipped)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
        price: Decimal,
        product_name: impl Into<String>,
    ) -> Result<Self, OrderError> {
        if quantity == 0 { return Err(OrderError::InvalidQuantity); }
        if price < Decimal::ZERO { return Err(OrderError::InvalidPrice); }
        Ok(Self {
            id: None, product_id, variant_id,
            quantity: Quantity::new(quantity), price,
            product_name: product_name.into(),
        })
    }

    pub fn id(&self) -> Option<OrderItemId> { self.id }
    pub fn product_id(&self) -> ProductId { self.product_id }
    pub fn variant_id(&self) -> Option<VariantId> { self.variant_id }
    pub fn quantity(&self) -> u32 { self.quantity.value() }
    pub fn price(&self) -> Decimal { self.price }
    pub fn product_name(&self) -> &str { &self.product_name }

    pub fn subtotal(&self) -> Decimal {
        round_money(Decimal::from(self.quantity.value()) * self.price)
    }

    pub fn update_quantity(&mut self, quantity: u32) -> Result<(), OrderError> {
        if quantity == 0 { return Err(OrderError::InvalidQuantity); }
        self.quantity = Quantity::new(quantity);
        Ok(())
    }

    pub fn update_price(&mut self, price: Decimal) -> Result<(), OrderError> {
        if price < Decimal::ZERO { return Err(OrderError::InvalidPrice); }
        self.price = price;
        Ok(())
    }

    pub(crate) fn set_id(&mut self, id: OrderItemId) { self.id = Some(id); }
}

impl Order {
    pub fn create(
        order_number: OrderNumber,
        retailer_id: RetailerId,
        supplier_id: SupplierId,
        items: Vec<OrderItem>,
        shipping_address: Option<String>,
        order_date: Option<DateTime<Utc>>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::EmptyOrder); }
        let mut order = Self {
            id: None,
            order_number: order_number.clone(),
            retailer_id, supplier_id, items,
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            shipping_address,
            order_date: order_date.unwrap_or_else(Utc::now),
            delivery_date: None,
            version: 0,
            events: vec![],
        };
        order.total_amount = order.calculate_total_amount();
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_number, total: order.total_amount,
        }));
        Ok(order)
    }

    pub fn id(&self) -> Option<OrderId> { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn retailer_id(&self) -> RetailerId { self.retailer_id }
    pub fn supplier_id(&self) -> SupplierId { self.supplier_id }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn shipping_address(&self) -> Option<&str> { self.shipping_address.as_deref() }
    pub fn order_date(&self) -> DateTime<Utc> { self.order_date }
    pub fn delivery_date(&self) -> Option<DateTime<Utc>> { self.delivery_date }
    pub fn version(&self) -> u64 { self.version }

    pub fn is_pending(&self) -> bool { self.status == OrderStatus::Pending }
    pub fn is_delivered(&self) -> bool { self.status == OrderStatus::Delivered }
    pub fn can_be_cancelled(&self) -> bool { self.status.can_transition_to(OrderStatus::Cancelled) }

    pub(crate) fn set_id(&mut self, id: OrderId) { self.id = Some(id); }
    pub(crate) fn set_version(&mut self, version: u64) { self.version = version; }
    pub(crate) fn items_mut(&mut self) -> &mut [OrderItem] { &mut self.items }

    /// Requests the transition to `target`, dispatching to the guarded
    /// methods below.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        match target {
            OrderStatus::Confirmed => self.confirm(),
            OrderStatus::Shipped => self.ship(),
            OrderStatus::Delivered => self.deliver(),
            OrderStatus::Cancelled => self.cancel(),
            OrderStatus::Pending => Err(self.invalid_transition(OrderStatus::Pending)),
        }
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if !self.status.can_transition_to(OrderStatus::Confirmed) {
            return Err(self.invalid_transition(OrderStatus::Confirmed));
        }
        self.status = OrderStatus::Confirmed;
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_number: self.order_number.clone() }));
        Ok(())
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        if !self.status.can_transition_to(OrderStatus::Shipped) {
            return Err(self.invalid_transition(OrderStatus::Shipped));
        }
        self.status = OrderStatus::Shipped;
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_number: self.order_number.clone() }));
        Ok(())
    }

    /// Marks the order delivered, stamping `delivery_date` when the carrier
    /// did not already report one.
    pub fn deliver(&mut self) -> Result<(), OrderError> {
        if !self.status.can_transition_to(OrderStatus::Delivered) {
            return Err(self.invalid_transition(OrderStatus::Delivered));
        }
        self.status = OrderStatus::Delivered;
        if self.delivery_date.is_none() { self.delivery_date = Some(Utc::now()); }
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_number: self.order_number.clone() }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.can_be_cancelled() {
            return Err(self.invalid_transition(OrderStatus::Cancelled));
        }
        let from = self.status;
        self.status = OrderStatus::Cancelled;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_number: self.order_number.clone(), from }));
        Ok(())
    }

    pub fn calculate_total_amount(&self) -> Decimal {
        round_money(self.items.iter().map(OrderItem::subtotal).sum())
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(OrderItem::quantity).sum()
    }

    pub fn meets_minimum_total_quantity(&self, minimum: u32) -> bool {
        !self.items.is_empty() && self.total_quantity() >= minimum
    }

    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::NotPending); }
        self.items.push(item);
        self.recalculate();
        Ok(())
    }

    /// Supplier-side price correction: replaces the unit price of one line
    /// item and recomputes the order total. Corrections must be strictly
    /// positive.
    pub fn update_item_price(&mut self, item_id: OrderItemId, unit_price: Decimal) -> Result<(), OrderError> {
        if unit_price <= Decimal::ZERO { return Err(OrderError::InvalidPrice); }
        let item = self.items.iter_mut()
            .find(|i| i.id() == Some(item_id))
            .ok_or(OrderError::ItemNotFound(item_id))?;
        item.update_price(unit_price)?;
        self.recalculate();
        self.raise_event(DomainEvent::Order(OrderEvent::Repriced {
            order_number: self.order_number.clone(), total: self.total_amount,
        }));
        Ok(())
    }

    pub fn apply_discount(&mut self, amount: Decimal) -> Result<(), OrderError> {
        if amount < Decimal::ZERO { return Err(OrderError::NegativeDiscount); }
        if amount > self.total_amount { return Err(OrderError::DiscountExceedsTotal); }
        self.total_amount = round_money(self.total_amount - amount);
        Ok(())
    }

    /// Updates mutable order details. A missing or blank address leaves the
    /// current one in place; addresses are stored trimmed.
    pub fn update_details(&mut self, shipping_address: Option<&str>, delivery_date: Option<DateTime<Utc>>) {
        if let Some(address) = shipping_address {
            let trimmed = address.trim();
            if !trimmed.is_empty() { self.shipping_address = Some(trimmed.to_string()); }
        }
        if let Some(date) = delivery_date { self.delivery_date = Some(date); }
    }

    pub fn set_delivery_date(&mut self, date: DateTime<Utc>) {
        self.delivery_date = Some(date);
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn recalculate(&mut self) {
        self.total_amount = self.calculate_total_amount();
    }

    fn invalid_transition(&self, to: OrderStatus) -> OrderError {
        OrderError::InvalidStatusTransition { from: self.status, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    EmptyOrder,
    InvalidQuantity,
    InvalidPrice,
    NegativeDiscount,
    DiscountExceedsTotal,
    NotPending,
    ItemNotFound(OrderItemId),
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
}

impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyOrder => write!(f, "Order items cannot be empty"),
            Self::InvalidQuantity => write!(f, "Quantity must be greater than 0"),
            Self::InvalidPrice => write!(f, "Price must be positive"),
            Self::NegativeDiscount => write!(f, "Discount amount cannot be negative"),
            Self::DiscountExceedsTotal => write!(f, "Discount amount cannot exceed total amount"),
            Self::NotPending => write!(f, "Items can only be added to pending orders"),
            Self::ItemNotFound(id) => write!(f, "Order item not found with ID: {id}"),
            Self::InvalidStatusTransition { from, to } => {
                write!(f, "Invalid status transition from {from} to {to}")
            }
        }
    }
}
