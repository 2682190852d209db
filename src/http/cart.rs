//! Cart endpoints. Both guests and logged-in users share these; identity
//! comes from the headers resolved in [`super::cart_owner`].

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::domain::cart::CartSummary;
use crate::error::{AppError, Result};
use crate::http::{cart_owner, session_id, user_id, AppState};
use crate::service;
use crate::service::cart::NewCartItem;

pub async fn get_cart(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<CartSummary>> {
    let owner = cart_owner(&headers)?;
    let summary = service::cart::get_summary(&state.db, &state.pricing, &owner).await?;
    Ok(Json(summary))
}

pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(item): Json<NewCartItem>,
) -> Result<(StatusCode, Json<CartSummary>)> {
    let owner = cart_owner(&headers)?;
    let summary = service::cart::add_item(&state.db, &state.pricing, &owner, item).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantity {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
    Json(update): Json<UpdateQuantity>,
) -> Result<Json<CartSummary>> {
    update.validate()?;
    let owner = cart_owner(&headers)?;
    let summary =
        service::cart::update_item(&state.db, &state.pricing, &owner, item_id, update.quantity)
            .await?;
    Ok(Json(summary))
}

pub async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
) -> Result<Json<CartSummary>> {
    let owner = cart_owner(&headers)?;
    let summary = service::cart::remove_item(&state.db, &state.pricing, &owner, item_id).await?;
    Ok(Json(summary))
}

pub async fn clear_cart(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let owner = cart_owner(&headers)?;
    service::cart::clear_cart(&state.db, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Called by the auth layer right after login: moves the guest cart rows
/// (from `x-session-id`) onto the authenticated user (`x-user-id`).
pub async fn merge_guest_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let user_id = user_id(&headers)?
        .ok_or_else(|| AppError::invalid("missing x-user-id header"))?;
    let session_id =
        session_id(&headers).ok_or_else(|| AppError::invalid("missing x-session-id header"))?;
    let moved = service::cart::merge_guest_cart(&state.db, &session_id, user_id).await?;
    Ok(Json(serde_json::json!({ "moved": moved })))
}
