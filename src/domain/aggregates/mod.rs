//! Aggregates module
pub mod inventory;
pub mod order;

pub use inventory::{Inventory, InventoryStatus, StockError};
pub use order::{Order, OrderError, OrderItem, OrderStatus};
