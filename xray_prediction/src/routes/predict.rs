use crate::state::SharedState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use std::time::Instant;
use tracing::instrument;
use xray_model::{preprocess::decode_image, upload::read_image_field, ApiError, ModelService, Prediction};

pub const PREDICT_ROUTE: &str = "/predict";

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    state.metrics.record_request(PREDICT_ROUTE);
    let image_data = read_image_field(multipart).await?;

    let classifier = state.classifier.clone();
    let start = Instant::now();
    let prediction = tokio::task::spawn_blocking(move || -> Result<Prediction, ApiError> {
        let image = decode_image(&image_data)?;
        Ok(classifier.predict(&image)?)
    })
    .await??;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    state
        .metrics
        .record_inference_duration(elapsed_ms, PREDICT_ROUTE);
    tracing::info!(
        "Predicted `{}` (class {}) with confidence {:.3} in {} ms",
        prediction.label,
        prediction.index,
        prediction.confidence,
        elapsed_ms
    );

    Ok(Json(prediction))
}
