//! JSON REST adapter over the subscription and indicator services.

mod error;
mod handlers;

pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::{IndicatorService, SubscriptionService};

pub struct AppState {
    pub subscriptions: SubscriptionService,
    pub indicators: IndicatorService,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/indicators/subscribe", post(handlers::subscribe))
        .route(
            "/api/indicators/subscriptions",
            get(handlers::list_subscriptions),
        )
        .route(
            "/api/indicators/subscriptions/{id}",
            put(handlers::update_subscription).delete(handlers::delete_subscription),
        )
        .route(
            "/api/indicators/subscriptions/{id}/toggle",
            post(handlers::toggle_subscription),
        )
        .route("/api/indicators/config", get(handlers::get_config))
        .route("/api/indicators/{symbol}", get(handlers::get_indicator))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
