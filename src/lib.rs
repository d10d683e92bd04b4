//! Marketplace Fulfillment Core
//!
//! Inventory and order consistency engine for a B2B wholesale
//! marketplace: suppliers list bulk-priced products, retailers order
//! against live stock, and every order movement keeps the stock ledger
//! in step.
//!
//! ## Features
//! - Tiered volume pricing
//! - Reservation-based stock ledger (reserve, release, deduct, restock)
//! - Guarded order status machine
//! - Atomic fulfillment updates coupling orders to the ledger

pub mod domain;
pub mod services;
pub mod store;

pub use domain::aggregates::{Inventory, InventoryStatus, Order, OrderError, OrderItem, OrderStatus, StockError};
pub use domain::events::{DomainEvent, OrderEvent, StockEvent};
pub use domain::pricing::{PriceTier, PricingError, ProductPricing, VariantRecord};
pub use domain::value_objects::{
    InventoryId, OrderId, OrderItemId, OrderNumber, OrderNumberError, ProductId, Quantity, RetailerId, SupplierId,
    VariantId,
};
pub use services::{
    AvailabilityReport, FulfillmentCoordinator, FulfillmentError, InventoryService, InventoryServiceError,
    ItemPriceCorrection, OrderService, OrderServiceError, PlaceOrderCommand, PlaceOrderItem, ProvisionCommand,
    UpdateInventoryCommand, UpdateOrderCommand,
};
pub use store::{CatalogProduct, CatalogReader, InventoryStore, MemoryStore, OrderStore, StoreError, UnitOfWork};
