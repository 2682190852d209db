//! Catalog queries: products with their color variants, and embroidery
//! designs. Also the two lookups the cart/checkout engines price against.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, QueryBuilder};
use std::collections::BTreeMap;
use validator::Validate;

use crate::domain::catalog::{
    ClothingCategory, Design, DesignCategory, PlacementLocation, Product, ProductVariant,
    VariantRef,
};
use crate::error::{AppError, Result};

/// `getVariant` for the pricing engines: the variant joined with its parent
/// product's current base price. Generic over the executor so checkout can
/// run it inside its transaction.
pub async fn variant_ref<'e>(db: impl PgExecutor<'e>, id: i64) -> Result<Option<VariantRef>> {
    let variant = sqlx::query_as::<_, VariantRef>(
        "SELECT v.id, v.color_name, v.in_stock, p.base_price \
         FROM product_variants v JOIN products p ON p.id = v.product_id \
         WHERE v.id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(variant)
}

/// `getDesign` for the pricing engines.
pub async fn design_price<'e>(db: impl PgExecutor<'e>, id: i64) -> Result<Option<Decimal>> {
    let price: Option<(Decimal,)> = sqlx::query_as("SELECT price FROM designs WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(price.map(|(p,)| p))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<ClothingCategory>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductWithVariants>,
    pub total: i64,
    pub page: u32,
    pub total_pages: u32,
}

fn push_product_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE p.is_active = TRUE");
    if let Some(category) = filter.category {
        builder.push(" AND p.category = ").push_bind(category);
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND p.base_price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND p.base_price <= ").push_bind(max);
    }
    if filter.in_stock == Some(true) {
        builder.push(
            " AND EXISTS (SELECT 1 FROM product_variants v \
             WHERE v.product_id = p.id AND v.in_stock)",
        );
    }
}

pub async fn list_products(db: &PgPool, filter: ProductFilter) -> Result<ProductPage> {
    let page = filter.page.unwrap_or(1).max(1);
    let limit = filter.limit.unwrap_or(12).clamp(1, 100);

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products p");
    push_product_filters(&mut count, &filter);
    let (total,): (i64,) = count.build_query_as().fetch_one(db).await?;

    let mut query = QueryBuilder::new("SELECT p.* FROM products p");
    push_product_filters(&mut query, &filter);
    query
        .push(" ORDER BY p.created_at DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(((page - 1) * limit) as i64);
    let products: Vec<Product> = query.build_query_as().fetch_all(db).await?;

    let items = attach_variants(db, products).await?;
    let total_pages = ((total + limit as i64 - 1) / limit as i64) as u32;
    Ok(ProductPage { items, total, page, total_pages })
}

async fn attach_variants(db: &PgPool, products: Vec<Product>) -> Result<Vec<ProductWithVariants>> {
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let variants = sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    Ok(products
        .into_iter()
        .map(|product| {
            let variants = variants
                .iter()
                .filter(|v| v.product_id == product.id)
                .cloned()
                .collect();
            ProductWithVariants { product, variants }
        })
        .collect())
}

pub async fn get_product(db: &PgPool, id: i64) -> Result<ProductWithVariants> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("product not found"))?;
    let variants = sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    Ok(ProductWithVariants { product, variants })
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1))]
    pub name: String,
    pub category: ClothingCategory,
    pub base_price: Decimal,
    pub description: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    pub sizes: Option<Vec<String>>,
}

pub async fn create_product(db: &PgPool, new: NewProduct) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, category, base_price, description, is_new, sizes) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&new.name)
    .bind(new.category)
    .bind(new.base_price)
    .bind(&new.description)
    .bind(new.is_new)
    .bind(&new.sizes)
    .fetch_one(db)
    .await?;
    Ok(product)
}

pub async fn update_product(db: &PgPool, id: i64, new: NewProduct) -> Result<Product> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, category = $3, base_price = $4, description = $5, \
         is_new = $6, sizes = $7, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&new.name)
    .bind(new.category)
    .bind(new.base_price)
    .bind(&new.description)
    .bind(new.is_new)
    .bind(&new.sizes)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("product not found"))
}

pub async fn delete_product(db: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("product not found"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewVariant {
    #[validate(length(min = 1))]
    pub color_name: String,
    pub hex_code: Option<String>,
    #[validate(length(min = 1))]
    pub image_url: String,
    pub image_side_url: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub stock_count: i32,
}

fn default_true() -> bool {
    true
}

pub async fn add_variant(db: &PgPool, product_id: i64, new: NewVariant) -> Result<ProductVariant> {
    // Validates the parent exists first so a dangling id surfaces as 404.
    get_product(db, product_id).await?;
    let variant = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants \
         (product_id, color_name, hex_code, image_url, image_side_url, in_stock, stock_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(product_id)
    .bind(&new.color_name)
    .bind(&new.hex_code)
    .bind(&new.image_url)
    .bind(&new.image_side_url)
    .bind(new.in_stock)
    .bind(new.stock_count)
    .fetch_one(db)
    .await?;
    Ok(variant)
}

pub async fn update_variant(db: &PgPool, variant_id: i64, new: NewVariant) -> Result<ProductVariant> {
    sqlx::query_as::<_, ProductVariant>(
        "UPDATE product_variants SET color_name = $2, hex_code = $3, image_url = $4, \
         image_side_url = $5, in_stock = $6, stock_count = $7 WHERE id = $1 RETURNING *",
    )
    .bind(variant_id)
    .bind(&new.color_name)
    .bind(&new.hex_code)
    .bind(&new.image_url)
    .bind(&new.image_side_url)
    .bind(new.in_stock)
    .bind(new.stock_count)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("variant not found"))
}

// ---------------------------------------------------------------------------
// Designs
// ---------------------------------------------------------------------------

pub async fn list_designs(db: &PgPool, category: Option<DesignCategory>) -> Result<Vec<Design>> {
    let designs = match category {
        Some(category) => {
            sqlx::query_as::<_, Design>(
                "SELECT * FROM designs WHERE is_active AND category = $1 ORDER BY name",
            )
            .bind(category)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Design>("SELECT * FROM designs WHERE is_active ORDER BY name")
                .fetch_all(db)
                .await?
        }
    };
    Ok(designs)
}

/// Active designs bucketed by category, for the garment constructor UI.
pub async fn designs_by_category(db: &PgPool) -> Result<BTreeMap<DesignCategory, Vec<Design>>> {
    let designs = list_designs(db, None).await?;
    let mut grouped: BTreeMap<DesignCategory, Vec<Design>> = BTreeMap::new();
    for design in designs {
        grouped.entry(design.category).or_default().push(design);
    }
    Ok(grouped)
}

pub async fn get_design(db: &PgPool, id: i64) -> Result<Design> {
    sqlx::query_as::<_, Design>("SELECT * FROM designs WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("design not found"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewDesign {
    #[validate(length(min = 1))]
    pub name: String,
    pub category: DesignCategory,
    #[validate(length(min = 1))]
    pub preview_url: String,
    pub dst_filename: Option<String>,
    pub price: Decimal,
    pub width_mm: Option<i32>,
    pub height_mm: Option<i32>,
    pub compatible_placements: Option<Vec<PlacementLocation>>,
}

pub async fn create_design(db: &PgPool, new: NewDesign) -> Result<Design> {
    let design = sqlx::query_as::<_, Design>(
        "INSERT INTO designs \
         (name, category, preview_url, dst_filename, price, width_mm, height_mm, compatible_placements) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(&new.name)
    .bind(new.category)
    .bind(&new.preview_url)
    .bind(&new.dst_filename)
    .bind(new.price)
    .bind(new.width_mm)
    .bind(new.height_mm)
    .bind(&new.compatible_placements)
    .fetch_one(db)
    .await?;
    Ok(design)
}

pub async fn update_design(db: &PgPool, id: i64, new: NewDesign) -> Result<Design> {
    sqlx::query_as::<_, Design>(
        "UPDATE designs SET name = $2, category = $3, preview_url = $4, dst_filename = $5, \
         price = $6, width_mm = $7, height_mm = $8, compatible_placements = $9 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&new.name)
    .bind(new.category)
    .bind(&new.preview_url)
    .bind(&new.dst_filename)
    .bind(new.price)
    .bind(new.width_mm)
    .bind(new.height_mm)
    .bind(&new.compatible_placements)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("design not found"))
}

pub async fn delete_design(db: &PgPool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM designs WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("design not found"));
    }
    Ok(())
}
