use crate::{
    config::{Config, ExplanationConfig},
    explain::Explainer,
    routes::api_routes,
    state::SharedState,
};
use axum::Router;
use xray_model::{
    config::ServerConfig,
    server::{with_common_layers, HttpServer},
    Classifier, LabelTable, Metrics, ModelService, OrtModelService,
};

pub fn build_router<M: ModelService>(state: SharedState<M>, server_config: &ServerConfig) -> Router {
    with_common_layers(api_routes().with_state(state), server_config)
}

/// Checks the binary label table and the model output width before any
/// request is served.
pub fn build_state<M: ModelService>(
    model: M,
    labels: LabelTable,
    explanation: ExplanationConfig,
) -> anyhow::Result<SharedState<M>> {
    anyhow::ensure!(
        labels.len() == 2,
        "binary classifier expects 2 labels, found {}",
        labels.len()
    );

    let classifier = Classifier::new(model, labels);
    classifier.check_outputs().map_err(|e| {
        tracing::error!("Model does not fit the label table: {}", e);
        e
    })?;

    Ok(SharedState::new(
        classifier,
        Explainer::new(explanation),
        Metrics::new("xray_explanation")?,
    ))
}

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let labels = LabelTable::from_config(&config.labels)?;
    tracing::info!(
        "Loaded labels: {:?}",
        labels.iter().collect::<Vec<_>>()
    );

    let model_service = OrtModelService::new(&config.model).map_err(|e| {
        tracing::error!("Failed to load model: {}", e);
        e
    })?;

    tracing::info!("Explanation settings: {:?}", config.explanation);
    let state = build_state(model_service, labels, config.explanation.clone())?;

    let server = HttpServer::new(build_router(state, &config.server), &config.server).await?;
    server.run().await
}
