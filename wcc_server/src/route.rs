pub mod address;
pub mod calendar;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use wcc_core::pipeline::Pipeline;

pub type SharedPipeline = Arc<Pipeline>;

pub fn app(pipeline: SharedPipeline) -> Router {
    Router::new()
        .route("/calendar", get(calendar::handler))
        .route("/address", get(address::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}
