//! Checkout engine over Postgres.
//!
//! Order creation is one transaction: stock-check reads, the order row and
//! every item row commit together or not at all. Clearing the originating
//! cart happens after the commit as a spawned best-effort task; checkout
//! never fails because cleanup did.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::config::PricingConfig;
use crate::domain::cart::{CartOwner, ItemSelection};
use crate::domain::catalog::PlacementLocation;
use crate::domain::order::{price_order, Order, OrderStatus, ResolvedItem};
use crate::error::{AppError, Result};
use crate::service::{cart, catalog};

#[derive(Debug, Deserialize, Validate)]
pub struct NewOrderItem {
    pub variant_id: i64,
    #[validate(length(min = 1))]
    pub size: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub design_id: Option<i64>,
    pub placement_location: Option<PlacementLocation>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewOrder {
    #[validate(length(min = 1))]
    pub customer_name: String,
    #[validate(length(min = 1))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub comment: Option<String>,
    #[validate]
    pub items: Vec<NewOrderItem>,
}

/// An order item as stored, joined with display fields from the catalog.
/// The three price columns are the checkout-time snapshot.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub size: String,
    pub quantity: i32,
    pub design_id: Option<i64>,
    pub placement_location: Option<PlacementLocation>,
    pub product_price: rust_decimal::Decimal,
    pub design_price: rust_decimal::Decimal,
    pub total_item_price: rust_decimal::Decimal,
    pub product_name: String,
    pub color_name: String,
    pub image_url: String,
    pub design_name: Option<String>,
    pub design_preview_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

const ITEMS_QUERY: &str = "SELECT i.id, i.order_id, i.variant_id, i.size, i.quantity, \
     i.design_id, i.placement_location, i.product_price, i.design_price, i.total_item_price, \
     p.name AS product_name, v.color_name, v.image_url, \
     d.name AS design_name, d.preview_url AS design_preview_url \
     FROM order_items i \
     JOIN product_variants v ON v.id = i.variant_id \
     JOIN products p ON p.id = v.product_id \
     LEFT JOIN designs d ON d.id = i.design_id \
     WHERE i.order_id = ANY($1) ORDER BY i.id";

/// Place an order: resolve and stock-check every line against the current
/// catalog, freeze prices, persist atomically, then clear the cart.
pub async fn create_order(
    db: &PgPool,
    pricing: &PricingConfig,
    owner: &CartOwner,
    new: NewOrder,
) -> Result<OrderWithItems> {
    new.validate()?;
    if new.items.is_empty() {
        return Err(AppError::invalid("cart is empty"));
    }

    let mut tx = db.begin().await?;

    let mut resolved = Vec::with_capacity(new.items.len());
    for item in &new.items {
        let selection = ItemSelection {
            variant_id: item.variant_id,
            size: item.size.clone(),
            design_id: item.design_id,
            placement_location: item.placement_location,
        };
        selection.ensure_coherent()?;

        let variant = catalog::variant_ref(&mut *tx, item.variant_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("variant id={} not found", item.variant_id))
            })?;
        if !variant.in_stock {
            return Err(AppError::conflict(format!(
                "variant \"{}\" is out of stock",
                variant.color_name
            )));
        }

        let design_price = match item.design_id {
            Some(design_id) => catalog::design_price(&mut *tx, design_id)
                .await?
                .ok_or_else(|| AppError::not_found("design not found"))?,
            None => rust_decimal::Decimal::ZERO,
        };

        resolved.push(ResolvedItem {
            selection,
            quantity: item.quantity,
            product_price: variant.base_price,
            design_price,
        });
    }

    let priced = price_order(resolved, pricing)?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders \
         (user_id, customer_name, phone, address, comment, subtotal, delivery_price, total_price) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(owner.user_id())
    .bind(&new.customer_name)
    .bind(&new.phone)
    .bind(&new.address)
    .bind(&new.comment)
    .bind(priced.subtotal)
    .bind(priced.delivery_price)
    .bind(priced.total_price)
    .fetch_one(&mut *tx)
    .await?;

    for item in &priced.items {
        sqlx::query(
            "INSERT INTO order_items \
             (order_id, variant_id, size, quantity, design_id, placement_location, \
              product_price, design_price, total_item_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(item.selection.variant_id)
        .bind(&item.selection.size)
        .bind(item.quantity)
        .bind(item.selection.design_id)
        .bind(item.selection.placement_location)
        .bind(item.product_price)
        .bind(item.design_price)
        .bind(item.total_item_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(order_id = order.id, owner = %owner, total = %order.total_price, "order placed");

    // Post-commit cleanup. The order is already placed; a failure here is
    // logged and the stale cart rows survive until the next clear.
    let cleanup_db = db.clone();
    let cleanup_owner = owner.clone();
    let order_id = order.id;
    tokio::spawn(async move {
        if let Err(err) = cart::clear_cart(&cleanup_db, &cleanup_owner).await {
            tracing::warn!(order_id, owner = %cleanup_owner, error = %err,
                "failed to clear cart after checkout");
        }
    });

    find_order(db, order.id).await
}

pub async fn find_order(db: &PgPool, id: i64) -> Result<OrderWithItems> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("order not found"))?;
    let items = sqlx::query_as::<_, OrderItemDetail>(ITEMS_QUERY)
        .bind(vec![id])
        .fetch_all(db)
        .await?;
    Ok(OrderWithItems { order, items })
}

pub async fn list_user_orders(db: &PgPool, user_id: i64) -> Result<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    attach_items(db, orders).await
}

pub async fn list_all_orders(
    db: &PgPool,
    status: Option<OrderStatus>,
) -> Result<Vec<OrderWithItems>> {
    let orders = match status {
        Some(status) => {
            sqlx::query_as::<_, Order>(
                "SELECT * FROM orders WHERE status = $1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(db)
                .await?
        }
    };
    attach_items(db, orders).await
}

async fn attach_items(db: &PgPool, orders: Vec<Order>) -> Result<Vec<OrderWithItems>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items = sqlx::query_as::<_, OrderItemDetail>(ITEMS_QUERY)
        .bind(&ids)
        .fetch_all(db)
        .await?;
    Ok(orders
        .into_iter()
        .map(|order| {
            let (mine, rest): (Vec<_>, Vec<_>) =
                items.drain(..).partition(|i| i.order_id == order.id);
            items = rest;
            OrderWithItems { order, items: mine }
        })
        .collect())
}

/// Back-office status overwrite. Any status may follow any other; the
/// workflow is operator-driven, not machine-enforced.
pub async fn update_status(db: &PgPool, id: i64, status: OrderStatus) -> Result<OrderWithItems> {
    let updated = sqlx::query(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .execute(db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("order not found"));
    }
    find_order(db, id).await
}
