use crate::state::SharedState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use xray_model::{preprocess::decode_image, upload::read_image_field, ApiError, ModelService};

pub const PREDICT_ROUTE: &str = "/predict";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainedPrediction {
    pub label: String,
    pub confidence: f32,
    pub explanation_url: String,
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExplainedPrediction>, ApiError> {
    state.metrics.record_request(PREDICT_ROUTE);
    let image_data = read_image_field(multipart).await?;

    let classifier = state.classifier.clone();
    let explainer = state.explainer.clone();
    let metrics = state.metrics.clone();

    let response = tokio::task::spawn_blocking(move || -> Result<ExplainedPrediction, ApiError> {
        let image = decode_image(&image_data)?;

        let start = Instant::now();
        let prediction = classifier.predict(&image)?;
        metrics.record_inference_duration(start.elapsed().as_millis() as u64, PREDICT_ROUTE);

        let start = Instant::now();
        let explanation = explainer
            .explain(&classifier, &image, prediction.index)
            .map_err(|e| ApiError::Explanation(e.to_string()))?;
        let explanation_url = explanation
            .data_uri()
            .map_err(|e| ApiError::Explanation(e.to_string()))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        metrics.record_explanation_duration(elapsed_ms, PREDICT_ROUTE);

        tracing::info!(
            "Predicted `{}` with confidence {:.3}, highlighted {} of {} superpixels in {} ms",
            prediction.label,
            prediction.confidence,
            explanation.superpixels.len(),
            explanation.num_segments,
            elapsed_ms
        );

        Ok(ExplainedPrediction {
            label: prediction.label,
            confidence: prediction.confidence,
            explanation_url,
        })
    })
    .await??;

    Ok(Json(response))
}
