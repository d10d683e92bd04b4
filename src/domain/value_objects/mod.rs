//! Value objects shared across the marketplace domain

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 { self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self { Self(v) }
        }
    };
}

id_type!(ProductId);
id_type!(VariantId);
id_type!(SupplierId);
id_type!(RetailerId);
id_type!(OrderId);
id_type!(OrderItemId);
id_type!(InventoryId);

/// Order number value object
///
/// 5-50 characters, uppercase alphanumeric with hyphens. Input is trimmed
/// and uppercased before validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(value: impl Into<String>) -> Result<Self, OrderNumberError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(OrderNumberError::Empty); }
        if value.len() < 5 || value.len() > 50 { return Err(OrderNumberError::InvalidLength); }
        if !value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-') {
            return Err(OrderNumberError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderNumberError { Empty, InvalidLength, InvalidCharacter }
impl std::error::Error for OrderNumberError {}
impl fmt::Display for OrderNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Order number empty"),
            Self::InvalidLength => write!(f, "Order number must be 5-50 characters"),
            Self::InvalidCharacter => write!(f, "Order number must be alphanumeric with hyphens"),
        }
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl Default for Quantity { fn default() -> Self { Self(0) } }

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
