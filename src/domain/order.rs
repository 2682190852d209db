//! Checkout engine: order status and the price-freezing computation.
//!
//! [`price_order`] is the commit-point arithmetic: it takes selections whose
//! catalog prices were just resolved and produces the immutable per-line
//! snapshots plus order totals. After this point the numbers never change,
//! whatever happens to catalog prices later.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PricingConfig;
use crate::domain::cart::ItemSelection;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Production,
    Shipping,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub comment: Option<String>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
}

/// A checkout line whose variant and design were resolved against the
/// current catalog. Prices here are the live catalog prices.
#[derive(Clone, Debug)]
pub struct ResolvedItem {
    pub selection: ItemSelection,
    pub quantity: i32,
    pub product_price: Decimal,
    pub design_price: Decimal,
}

/// A line with its price snapshot frozen.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedItem {
    pub selection: ItemSelection,
    pub quantity: i32,
    pub product_price: Decimal,
    pub design_price: Decimal,
    pub total_item_price: Decimal,
}

#[derive(Clone, Debug)]
pub struct OrderPricing {
    pub items: Vec<PricedItem>,
    pub subtotal: Decimal,
    pub delivery_price: Decimal,
    pub total_price: Decimal,
}

/// Freeze per-line prices and compute order totals.
pub fn price_order(
    items: Vec<ResolvedItem>,
    pricing: &PricingConfig,
) -> Result<OrderPricing, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let items: Vec<PricedItem> = items
        .into_iter()
        .map(|item| {
            let total_item_price =
                (item.product_price + item.design_price) * Decimal::from(item.quantity);
            PricedItem {
                selection: item.selection,
                quantity: item.quantity,
                product_price: item.product_price,
                design_price: item.design_price,
                total_item_price,
            }
        })
        .collect();
    let subtotal: Decimal = items.iter().map(|i| i.total_item_price).sum();
    let delivery_price = pricing.delivery_fee(subtotal);
    Ok(OrderPricing {
        items,
        subtotal,
        delivery_price,
        total_price: subtotal + delivery_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::PlacementLocation;

    fn resolved(
        variant_id: i64,
        quantity: i32,
        product_price: i64,
        design: Option<(i64, i64, PlacementLocation)>,
    ) -> ResolvedItem {
        ResolvedItem {
            selection: ItemSelection {
                variant_id,
                size: "L".into(),
                design_id: design.map(|(id, _, _)| id),
                placement_location: design.map(|(_, _, loc)| loc),
            },
            quantity,
            product_price: Decimal::from(product_price),
            design_price: design.map(|(_, p, _)| Decimal::from(p)).unwrap_or(Decimal::ZERO),
        }
    }

    #[test]
    fn empty_order_is_rejected() {
        assert!(matches!(
            price_order(vec![], &PricingConfig::default()),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn line_snapshot_math() {
        let pricing = PricingConfig::default();
        let order = price_order(
            vec![resolved(1, 2, 10000, Some((7, 3000, PlacementLocation::Chest)))],
            &pricing,
        )
        .unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_price, Decimal::from(10000));
        assert_eq!(order.items[0].design_price, Decimal::from(3000));
        assert_eq!(order.items[0].total_item_price, Decimal::from(26000));
        assert_eq!(order.subtotal, Decimal::from(26000));
        // 26000 >= 25000, delivery waived
        assert_eq!(order.delivery_price, Decimal::ZERO);
        assert_eq!(order.total_price, Decimal::from(26000));
    }

    #[test]
    fn small_order_pays_delivery() {
        let pricing = PricingConfig::default();
        let order = price_order(vec![resolved(1, 1, 10000, None)], &pricing).unwrap();
        assert_eq!(order.subtotal, Decimal::from(10000));
        assert_eq!(order.delivery_price, Decimal::from(1500));
        assert_eq!(order.total_price, Decimal::from(11500));
    }

    #[test]
    fn snapshot_is_taken_at_pricing_time() {
        let pricing = PricingConfig::default();
        let before = price_order(vec![resolved(1, 2, 10000, None)], &pricing).unwrap();
        // A later catalog price change produces different resolved inputs,
        // but the already-priced order keeps its frozen numbers.
        let after = price_order(vec![resolved(1, 2, 12000, None)], &pricing).unwrap();
        assert_eq!(before.items[0].product_price, Decimal::from(10000));
        assert_eq!(before.items[0].total_item_price, Decimal::from(20000));
        assert_eq!(after.items[0].total_item_price, Decimal::from(24000));
        assert_ne!(before.subtotal, after.subtotal);
    }

    #[test]
    fn subtotal_sums_all_lines() {
        let pricing = PricingConfig::default();
        let order = price_order(
            vec![
                resolved(1, 2, 10000, None),
                resolved(2, 1, 8000, Some((3, 2500, PlacementLocation::Back))),
            ],
            &pricing,
        )
        .unwrap();
        assert_eq!(order.subtotal, Decimal::from(30500));
        assert_eq!(order.delivery_price, Decimal::ZERO);
    }
}
