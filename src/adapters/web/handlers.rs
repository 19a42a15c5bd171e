//! HTTP request handlers for the indicator API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::config::IndicatorConfig;
use crate::domain::indicator::IndicatorResult;
use crate::domain::subscription::{NewSubscription, Subscription, SubscriptionPatch};

use super::{AppState, WebError};

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>), WebError> {
    let sub = state.subscriptions.create(request)?;
    Ok((StatusCode::CREATED, Json(sub)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Subscription>>, WebError> {
    let user_id = query
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| WebError::bad_request("userId is required"))?;
    Ok(Json(state.subscriptions.list_by_user(&user_id)?))
}

pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<SubscriptionPatch>,
) -> Result<Json<Subscription>, WebError> {
    Ok(Json(state.subscriptions.update(&id, &patch)?))
}

pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, WebError> {
    state.subscriptions.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Subscription>, WebError> {
    Ok(Json(state.subscriptions.toggle(&id)?))
}

pub async fn get_indicator(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<IndicatorResult>, WebError> {
    if symbol.trim().is_empty() {
        return Err(WebError::bad_request("symbol is required"));
    }
    Ok(Json(state.indicators.get_cached_or_computed(&symbol).await?))
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndicatorConfig>, WebError> {
    Ok(Json(state.indicators.repository().get_indicator_config()?))
}

pub async fn not_found() -> Response {
    WebError::not_found("route not found").into_response()
}
