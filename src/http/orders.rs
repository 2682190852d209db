//! Order endpoints: checkout for the storefront, listing and status
//! updates for the back office. Role checks live in the upstream gateway.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::domain::order::OrderStatus;
use crate::error::{AppError, Result};
use crate::http::{cart_owner, user_id, AppState};
use crate::service;
use crate::service::orders::{NewOrder, OrderWithItems};

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let owner = cart_owner(&headers)?;
    let order = service::orders::create_order(&state.db, &state.pricing, &owner, new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderWithItems>> {
    let order = service::orders::find_order(&state.db, id).await?;
    Ok(Json(order))
}

/// Order history for the logged-in user.
pub async fn my_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderWithItems>>> {
    let user_id =
        user_id(&headers)?.ok_or_else(|| AppError::invalid("missing x-user-id header"))?;
    let orders = service::orders::list_user_orders(&state.db, user_id).await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let orders = service::orders::list_all_orders(&state.db, params.status).await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatus {
    pub status: OrderStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateStatus>,
) -> Result<Json<OrderWithItems>> {
    let order = service::orders::update_status(&state.db, id, update.status).await?;
    Ok(Json(order))
}
