//! Cart engine over Postgres.
//!
//! Rows are keyed by [`CartOwner`]; owner-scoped queries carry both owner
//! columns through `IS NOT DISTINCT FROM` so user and session carts share
//! one code path, and mutations by item id go through the
//! [`CartOwner::owns`] predicate first. The add-item read-modify-write runs
//! in a transaction with a row lock so two concurrent adds of the same line
//! cannot lose an increment.

use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::config::PricingConfig;
use crate::domain::cart::{CartLine, CartOwner, CartSummary, ItemSelection};
use crate::domain::catalog::PlacementLocation;
use crate::error::{AppError, Result};
use crate::service::catalog;

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    variant_id: i64,
    size: String,
    quantity: i32,
    design_id: Option<i64>,
    placement_location: Option<PlacementLocation>,
    product_name: String,
    color_name: String,
    image_url: String,
    design_name: Option<String>,
    design_preview_url: Option<String>,
    base_price: rust_decimal::Decimal,
    design_price: Option<rust_decimal::Decimal>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: row.id,
            selection: ItemSelection {
                variant_id: row.variant_id,
                size: row.size,
                design_id: row.design_id,
                placement_location: row.placement_location,
            },
            quantity: row.quantity,
            product_name: row.product_name,
            color_name: row.color_name,
            image_url: row.image_url,
            design_name: row.design_name,
            design_preview_url: row.design_preview_url,
            unit_product_price: row.base_price,
            unit_design_price: row.design_price.unwrap_or_default(),
        }
    }
}

const LINES_QUERY: &str = "SELECT c.id, c.variant_id, c.size, c.quantity, c.design_id, \
     c.placement_location, p.name AS product_name, v.color_name, v.image_url, \
     d.name AS design_name, d.preview_url AS design_preview_url, \
     p.base_price, d.price AS design_price \
     FROM cart_items c \
     JOIN product_variants v ON v.id = c.variant_id \
     JOIN products p ON p.id = v.product_id \
     LEFT JOIN designs d ON d.id = c.design_id \
     WHERE c.user_id IS NOT DISTINCT FROM $1 AND c.session_id IS NOT DISTINCT FROM $2 \
     ORDER BY c.id";

/// Priced view of the owner's cart, recomputed from the current catalog.
pub async fn get_summary(
    db: &PgPool,
    pricing: &PricingConfig,
    owner: &CartOwner,
) -> Result<CartSummary> {
    let rows = sqlx::query_as::<_, CartLineRow>(LINES_QUERY)
        .bind(owner.user_id())
        .bind(owner.session_id())
        .fetch_all(db)
        .await?;
    let lines = rows.into_iter().map(CartLine::from).collect();
    Ok(CartSummary::build(lines, pricing))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCartItem {
    pub variant_id: i64,
    #[validate(length(min = 1))]
    pub size: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub design_id: Option<i64>,
    pub placement_location: Option<PlacementLocation>,
}

/// Add a line to the cart, accumulating quantity onto an existing row when
/// the selection matches exactly on all of variant, size, design and
/// placement.
pub async fn add_item(
    db: &PgPool,
    pricing: &PricingConfig,
    owner: &CartOwner,
    item: NewCartItem,
) -> Result<CartSummary> {
    item.validate()?;
    let selection = ItemSelection {
        variant_id: item.variant_id,
        size: item.size,
        design_id: item.design_id,
        placement_location: item.placement_location,
    };
    selection.ensure_coherent()?;

    catalog::variant_ref(db, selection.variant_id)
        .await?
        .ok_or_else(|| AppError::not_found("variant not found"))?;
    if let Some(design_id) = selection.design_id {
        catalog::design_price(db, design_id)
            .await?
            .ok_or_else(|| AppError::not_found("design not found"))?;
    }

    let mut tx = db.begin().await?;
    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM cart_items \
         WHERE user_id IS NOT DISTINCT FROM $1 AND session_id IS NOT DISTINCT FROM $2 \
         AND variant_id = $3 AND size = $4 \
         AND design_id IS NOT DISTINCT FROM $5 \
         AND placement_location IS NOT DISTINCT FROM $6 \
         FOR UPDATE",
    )
    .bind(owner.user_id())
    .bind(owner.session_id())
    .bind(selection.variant_id)
    .bind(&selection.size)
    .bind(selection.design_id)
    .bind(selection.placement_location)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        Some((id,)) => {
            sqlx::query("UPDATE cart_items SET quantity = quantity + $2 WHERE id = $1")
                .bind(id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO cart_items \
                 (user_id, session_id, variant_id, size, quantity, design_id, placement_location) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(owner.user_id())
            .bind(owner.session_id())
            .bind(selection.variant_id)
            .bind(&selection.size)
            .bind(item.quantity)
            .bind(selection.design_id)
            .bind(selection.placement_location)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    get_summary(db, pricing, owner).await
}

/// Fetch the row's owner columns and check them against the caller's
/// identity via [`CartOwner::owns`]. A row someone else owns reads as
/// absent, so item ids never leak across identities.
async fn check_ownership(db: &PgPool, owner: &CartOwner, item_id: i64) -> Result<()> {
    let row: Option<(Option<i64>, Option<String>)> =
        sqlx::query_as("SELECT user_id, session_id FROM cart_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(db)
            .await?;
    match row {
        Some((user_id, session_id)) if owner.owns(user_id, session_id.as_deref()) => Ok(()),
        _ => Err(AppError::not_found("cart item not found")),
    }
}

/// Set a line's quantity. Only the owner's own rows are reachable.
pub async fn update_item(
    db: &PgPool,
    pricing: &PricingConfig,
    owner: &CartOwner,
    item_id: i64,
    quantity: i32,
) -> Result<CartSummary> {
    if quantity < 1 {
        return Err(AppError::invalid("quantity must be at least 1"));
    }
    check_ownership(db, owner, item_id).await?;
    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(quantity)
        .execute(db)
        .await?;
    get_summary(db, pricing, owner).await
}

pub async fn remove_item(
    db: &PgPool,
    pricing: &PricingConfig,
    owner: &CartOwner,
    item_id: i64,
) -> Result<CartSummary> {
    check_ownership(db, owner, item_id).await?;
    sqlx::query("DELETE FROM cart_items WHERE id = $1")
        .bind(item_id)
        .execute(db)
        .await?;
    get_summary(db, pricing, owner).await
}

/// Drop every line the owner has. Clearing an empty cart is a no-op.
pub async fn clear_cart(db: &PgPool, owner: &CartOwner) -> Result<()> {
    sqlx::query(
        "DELETE FROM cart_items \
         WHERE user_id IS NOT DISTINCT FROM $1 AND session_id IS NOT DISTINCT FROM $2",
    )
    .bind(owner.user_id())
    .bind(owner.session_id())
    .execute(db)
    .await?;
    Ok(())
}

/// Reassign every guest row to the user who just logged in. One UPDATE, so
/// concurrent readers see either the whole guest cart or none of it; a
/// second run matches zero rows and is a no-op. Duplicate lines are left
/// as-is: the next add_item consolidates them naturally.
pub async fn merge_guest_cart(db: &PgPool, session_id: &str, user_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE cart_items SET user_id = $2, session_id = NULL WHERE session_id = $1",
    )
    .bind(session_id)
    .bind(user_id)
    .execute(db)
    .await?;
    let moved = result.rows_affected();
    if moved > 0 {
        tracing::info!(session_id, user_id, moved, "merged guest cart");
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    async fn seed_variant(db: &PgPool) -> i64 {
        let (product_id,): (i64,) = sqlx::query_as(
            "INSERT INTO products (name, category, base_price) \
             VALUES ('240 GSM T-Shirt', 'tshirt', 10000) RETURNING id",
        )
        .fetch_one(db)
        .await
        .unwrap();
        let (variant_id,): (i64,) = sqlx::query_as(
            "INSERT INTO product_variants (product_id, color_name, image_url) \
             VALUES ($1, 'Navy Blue', '/img/navy-front.png') RETURNING id",
        )
        .bind(product_id)
        .fetch_one(db)
        .await
        .unwrap();
        variant_id
    }

    fn line(variant_id: i64, size: &str, quantity: i32) -> NewCartItem {
        NewCartItem {
            variant_id,
            size: size.into(),
            quantity,
            design_id: None,
            placement_location: None,
        }
    }

    #[sqlx::test]
    async fn add_same_line_twice_accumulates_quantity(db: PgPool) {
        let pricing = PricingConfig::default();
        let owner = CartOwner::Session("s1".into());
        let variant_id = seed_variant(&db).await;

        add_item(&db, &pricing, &owner, line(variant_id, "L", 2)).await.unwrap();
        let summary = add_item(&db, &pricing, &owner, line(variant_id, "L", 3)).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].quantity, 5);
        assert_eq!(summary.subtotal, Decimal::from(50000));

        // a different size is a distinct line
        let summary = add_item(&db, &pricing, &owner, line(variant_id, "M", 1)).await.unwrap();
        assert_eq!(summary.items.len(), 2);
    }

    #[sqlx::test]
    async fn updating_a_foreign_item_reads_as_absent(db: PgPool) {
        let pricing = PricingConfig::default();
        let owner = CartOwner::User(1);
        let variant_id = seed_variant(&db).await;
        let summary = add_item(&db, &pricing, &owner, line(variant_id, "L", 2)).await.unwrap();
        let item_id = summary.items[0].id;

        let other_user = CartOwner::User(2);
        let err = update_item(&db, &pricing, &other_user, item_id, 9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let guest = CartOwner::Session("g1".into());
        let err = update_item(&db, &pricing, &guest, item_id, 9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // the row is untouched and still reachable by its owner
        let summary = get_summary(&db, &pricing, &owner).await.unwrap();
        assert_eq!(summary.items[0].quantity, 2);
        let summary = update_item(&db, &pricing, &owner, item_id, 4).await.unwrap();
        assert_eq!(summary.items[0].quantity, 4);
    }

    #[sqlx::test]
    async fn removing_a_foreign_item_reads_as_absent(db: PgPool) {
        let pricing = PricingConfig::default();
        let owner = CartOwner::Session("s1".into());
        let variant_id = seed_variant(&db).await;
        let summary = add_item(&db, &pricing, &owner, line(variant_id, "L", 1)).await.unwrap();
        let item_id = summary.items[0].id;

        let other_guest = CartOwner::Session("s2".into());
        let err = remove_item(&db, &pricing, &other_guest, item_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let summary = remove_item(&db, &pricing, &owner, item_id).await.unwrap();
        assert!(summary.items.is_empty());
    }

    #[sqlx::test]
    async fn merging_twice_leaves_the_entry_set_unchanged(db: PgPool) {
        let pricing = PricingConfig::default();
        let guest = CartOwner::Session("g1".into());
        let variant_id = seed_variant(&db).await;
        add_item(&db, &pricing, &guest, line(variant_id, "L", 2)).await.unwrap();
        add_item(&db, &pricing, &guest, line(variant_id, "M", 1)).await.unwrap();

        let moved = merge_guest_cart(&db, "g1", 7).await.unwrap();
        assert_eq!(moved, 2);
        let user = CartOwner::User(7);
        let summary = get_summary(&db, &pricing, &user).await.unwrap();
        assert_eq!(summary.items.len(), 2);
        assert!(get_summary(&db, &pricing, &guest).await.unwrap().items.is_empty());

        // second run finds no session rows and is a no-op
        let moved = merge_guest_cart(&db, "g1", 7).await.unwrap();
        assert_eq!(moved, 0);
        let summary = get_summary(&db, &pricing, &user).await.unwrap();
        assert_eq!(summary.items.len(), 2);
    }
}
