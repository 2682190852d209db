//! Catalog types: garments, their color variants, and embroidery designs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "clothing_category", rename_all = "lowercase")]
pub enum ClothingCategory {
    Tshirt,
    Hoodie,
    Longsleeve,
    Sweatshirt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "design_category", rename_all = "lowercase")]
pub enum DesignCategory {
    Cities,
    Anime,
    Football,
    Basketball,
    Countries,
}

/// Where an embroidery design is stitched onto the garment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "placement_location", rename_all = "lowercase")]
pub enum PlacementLocation {
    Chest,
    Back,
    Heart,
}

impl sqlx::postgres::PgHasArrayType for PlacementLocation {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_placement_location")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: ClothingCategory,
    /// Price of the plain garment, before any customization.
    pub base_price: Decimal,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_new: bool,
    pub sizes: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub color_name: String,
    pub hex_code: Option<String>,
    pub image_url: String,
    pub image_side_url: Option<String>,
    pub in_stock: bool,
    pub stock_count: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Design {
    pub id: i64,
    pub name: String,
    pub category: DesignCategory,
    pub preview_url: String,
    /// Machine file name; only meaningful to the back office.
    pub dst_filename: Option<String>,
    pub price: Decimal,
    pub width_mm: Option<i32>,
    pub height_mm: Option<i32>,
    pub compatible_placements: Option<Vec<PlacementLocation>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A variant resolved together with its parent product's current price.
/// This is the view the cart and checkout engines price against.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct VariantRef {
    pub id: i64,
    pub color_name: String,
    pub in_stock: bool,
    pub base_price: Decimal,
}
