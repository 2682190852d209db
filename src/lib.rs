//! Stitchwear — custom-apparel storefront backend.
//!
//! Catalog of garments and embroidery designs, a dual guest/authenticated
//! cart, and checkout with price snapshotting.
//!
//! ## Features
//! - Product catalog with color variants and stock flags
//! - Embroidery design library grouped by category
//! - Guest and user carts with exact-line deduplication
//! - Guest-cart merge on login
//! - Orders with frozen per-item prices and a free-delivery threshold
//! - Back-office order status management

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod service;
