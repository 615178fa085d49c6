//! Router assembly.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::{api_routes, resource_routes};

use crate::handlers::fallback;
use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// The full application: common routes, resource routes, JSON 404 fallback, body limit and request tracing.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(api_routes(state))
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}
