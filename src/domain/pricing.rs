//! Tiered pricing
//!
//! Pure price computation against a product's base price and its quantity
//! tiers. Nothing here touches stock or order state, so callers can price
//! speculatively (quote previews) without side effects.

use crate::domain::value_objects::{ProductId, VariantId};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rounds a money amount to 2 decimal places, half away from zero.
pub(crate) fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A quantity range with a discount percentage against the base price.
///
/// `max_quantity` of `None` means unbounded. Ranges are allowed to overlap;
/// tier selection always resolves to the cheapest applicable tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    min_quantity: u32,
    max_quantity: Option<u32>,
    discount_percent: Decimal,
}

impl PriceTier {
    pub fn new(min_quantity: u32, max_quantity: Option<u32>, discount_percent: Decimal) -> Result<Self, PricingError> {
        if discount_percent < Decimal::ZERO || discount_percent > Decimal::from(100) {
            return Err(PricingError::InvalidDiscount);
        }
        if let Some(max) = max_quantity {
            if max < min_quantity { return Err(PricingError::InvalidTierRange); }
        }
        Ok(Self { min_quantity, max_quantity, discount_percent })
    }

    pub fn min_quantity(&self) -> u32 { self.min_quantity }
    pub fn max_quantity(&self) -> Option<u32> { self.max_quantity }
    pub fn discount_percent(&self) -> Decimal { self.discount_percent }

    pub fn applies_to(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity && self.max_quantity.map_or(true, |max| quantity <= max)
    }

    pub fn price_per_unit(&self, base_price: Decimal) -> Decimal {
        if self.discount_percent.is_zero() { return base_price; }
        base_price * (Decimal::ONE - self.discount_percent / Decimal::from(100))
    }
}

/// Unit price for `quantity`: the cheapest applicable tier, or the base
/// price when no tier matches.
pub fn unit_price(base_price: Decimal, tiers: &[PriceTier], quantity: u32) -> Decimal {
    tiers.iter()
        .filter(|t| t.applies_to(quantity))
        .map(|t| t.price_per_unit(base_price))
        .min()
        .unwrap_or(base_price)
}

/// Total price for `quantity` units, rounded to 2 decimal places.
pub fn total_price(base_price: Decimal, tiers: &[PriceTier], quantity: u32) -> Result<Decimal, PricingError> {
    if quantity == 0 { return Err(PricingError::InvalidQuantity); }
    Ok(round_money(Decimal::from(quantity) * unit_price(base_price, tiers, quantity)))
}

pub fn meets_minimum_order_quantity(quantity: u32, minimum: u32) -> bool {
    quantity >= minimum
}

/// Read-only pricing view of a catalog product.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductPricing {
    pub base_price: Decimal,
    pub minimum_order_quantity: u32,
    pub tiers: Vec<PriceTier>,
}

impl ProductPricing {
    pub fn unit_price_for(&self, quantity: u32) -> Decimal {
        unit_price(self.base_price, &self.tiers, quantity)
    }

    /// Total price for `quantity`, enforcing the minimum order quantity.
    pub fn price_for_quantity(&self, quantity: u32) -> Result<Decimal, PricingError> {
        if quantity == 0 { return Err(PricingError::InvalidQuantity); }
        if !meets_minimum_order_quantity(quantity, self.minimum_order_quantity) {
            return Err(PricingError::BelowMinimumOrderQuantity { minimum: self.minimum_order_quantity });
        }
        total_price(self.base_price, &self.tiers, quantity)
    }
}

/// Read-only catalog view of a product variant. `price_adjustment` is added
/// to the product base price before tier selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantRecord {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub price_adjustment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    InvalidQuantity,
    InvalidDiscount,
    InvalidTierRange,
    BelowMinimumOrderQuantity { minimum: u32 },
}

impl std::error::Error for PricingError {}
impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be greater than 0"),
            Self::InvalidDiscount => write!(f, "Discount percent must be between 0 and 100"),
            Self::InvalidTierRange => write!(f, "Tier maximum must not be below its minimum"),
            Self::BelowMinimumOrderQuantity { minimum } => {
                write!(f, "Quantity does not meet minimum order quantity of {minimum}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk_tiers() -> Vec<PriceTier> {
        vec![
            PriceTier::new(1, Some(49), Decimal::ZERO).unwrap(),
            PriceTier::new(50, None, Decimal::from(20)).unwrap(),
        ]
    }

    #[test]
    fn test_base_price_below_first_tier_discount() {
        let base = Decimal::from(100);
        assert_eq!(total_price(base, &bulk_tiers(), 10).unwrap(), Decimal::from(1000));
    }

    #[test]
    fn test_bulk_tier_applies_at_threshold() {
        let base = Decimal::from(100);
        assert_eq!(total_price(base, &bulk_tiers(), 50).unwrap(), Decimal::from(4000));
    }

    #[test]
    fn test_no_matching_tier_falls_back_to_base() {
        let tiers = vec![PriceTier::new(100, None, Decimal::from(30)).unwrap()];
        assert_eq!(unit_price(Decimal::from(10), &tiers, 5), Decimal::from(10));
    }

    #[test]
    fn test_overlapping_tiers_pick_cheapest() {
        let tiers = vec![
            PriceTier::new(1, Some(100), Decimal::from(5)).unwrap(),
            PriceTier::new(50, Some(100), Decimal::from(15)).unwrap(),
        ];
        // 60 falls in both ranges; the 15% tier is cheaper.
        assert_eq!(unit_price(Decimal::from(100), &tiers, 60), Decimal::from(85));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert_eq!(total_price(Decimal::from(10), &[], 0), Err(PricingError::InvalidQuantity));
    }

    #[test]
    fn test_total_rounds_half_up() {
        // 3 * 1.115 = 3.345 -> 3.35
        let total = total_price(Decimal::new(1115, 3), &[], 3).unwrap();
        assert_eq!(total, Decimal::new(335, 2));
    }

    #[test]
    fn test_discount_out_of_range_rejected() {
        assert_eq!(PriceTier::new(1, None, Decimal::from(101)).unwrap_err(), PricingError::InvalidDiscount);
        assert_eq!(PriceTier::new(10, Some(5), Decimal::ZERO).unwrap_err(), PricingError::InvalidTierRange);
    }

    #[test]
    fn test_minimum_order_quantity_enforced() {
        let pricing = ProductPricing { base_price: Decimal::from(10), minimum_order_quantity: 10, tiers: vec![] };
        assert_eq!(
            pricing.price_for_quantity(5),
            Err(PricingError::BelowMinimumOrderQuantity { minimum: 10 })
        );
        assert_eq!(pricing.price_for_quantity(10).unwrap(), Decimal::from(100));
    }
}
