mod index;
mod predict;

use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use xray_model::{
    routes::{healthcheck, metrics_handler},
    ModelService,
};

pub use predict::PREDICT_ROUTE;

pub fn api_routes<M: ModelService>() -> Router<SharedState<M>> {
    Router::new()
        .route("/", get(index::index))
        .route(PREDICT_ROUTE, post(predict::predict::<M>))
        .route("/health", get(healthcheck))
        .route("/metrics", get(metrics_handler))
}
