//! Domain layer: aggregates, value objects, pricing rules, and events.

pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
