use crate::{config::Config, routes::api_routes, state::SharedState};
use axum::Router;
use xray_model::{
    config::ServerConfig,
    server::{with_common_layers, HttpServer},
    Classifier, LabelTable, Metrics, ModelService, OrtModelService,
};

pub fn build_router<M: ModelService>(state: SharedState<M>, server_config: &ServerConfig) -> Router {
    with_common_layers(api_routes().with_state(state), server_config)
}

/// Pairs the model with its labels, refusing a model whose output width does
/// not match the label table.
pub fn build_state<M: ModelService>(
    model: M,
    labels: LabelTable,
) -> anyhow::Result<SharedState<M>> {
    let classifier = Classifier::new(model, labels);
    classifier.check_outputs().map_err(|e| {
        tracing::error!("Model does not fit the label table: {}", e);
        e
    })?;

    Ok(SharedState::new(classifier, Metrics::new("xray_prediction")?))
}

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let model_service = OrtModelService::new(&config.model).map_err(|e| {
        tracing::error!("Failed to load model: {}", e);
        e
    })?;
    let labels = LabelTable::from_config(&config.labels)?;
    tracing::info!(
        "Loaded {} labels: {:?}",
        labels.len(),
        labels.iter().collect::<Vec<_>>()
    );

    let state = build_state(model_service, labels)?;

    let server = HttpServer::new(build_router(state, &config.server), &config.server).await?;
    server.run().await
}
