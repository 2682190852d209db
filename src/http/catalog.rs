//! Catalog endpoints: storefront reads plus back-office CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use crate::domain::catalog::{Design, DesignCategory, Product, ProductVariant};
use crate::error::Result;
use crate::http::AppState;
use crate::service;
use crate::service::catalog::{
    NewDesign, NewProduct, NewVariant, ProductFilter, ProductPage, ProductWithVariants,
};

pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductPage>> {
    let page = service::catalog::list_products(&state.db, filter).await?;
    Ok(Json(page))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductWithVariants>> {
    let product = service::catalog::get_product(&state.db, id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    new.validate()?;
    let product = service::catalog::create_product(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewProduct>,
) -> Result<Json<Product>> {
    new.validate()?;
    let product = service::catalog::update_product(&state.db, id, new).await?;
    Ok(Json(product))
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    service::catalog::delete_product(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_variant(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(new): Json<NewVariant>,
) -> Result<(StatusCode, Json<ProductVariant>)> {
    new.validate()?;
    let variant = service::catalog::add_variant(&state.db, product_id, new).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn update_variant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewVariant>,
) -> Result<Json<ProductVariant>> {
    new.validate()?;
    let variant = service::catalog::update_variant(&state.db, id, new).await?;
    Ok(Json(variant))
}

#[derive(Debug, Deserialize)]
pub struct DesignFilter {
    pub category: Option<DesignCategory>,
}

pub async fn list_designs(
    State(state): State<AppState>,
    Query(filter): Query<DesignFilter>,
) -> Result<Json<Vec<Design>>> {
    let designs = service::catalog::list_designs(&state.db, filter.category).await?;
    Ok(Json(designs))
}

pub async fn grouped_designs(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<DesignCategory, Vec<Design>>>> {
    let grouped = service::catalog::designs_by_category(&state.db).await?;
    Ok(Json(grouped))
}

pub async fn get_design(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Design>> {
    let design = service::catalog::get_design(&state.db, id).await?;
    Ok(Json(design))
}

pub async fn create_design(
    State(state): State<AppState>,
    Json(new): Json<NewDesign>,
) -> Result<(StatusCode, Json<Design>)> {
    new.validate()?;
    let design = service::catalog::create_design(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(design)))
}

pub async fn update_design(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewDesign>,
) -> Result<Json<Design>> {
    new.validate()?;
    let design = service::catalog::update_design(&state.db, id, new).await?;
    Ok(Json(design))
}

pub async fn delete_design(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    service::catalog::delete_design(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
