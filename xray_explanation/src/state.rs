use crate::explain::Explainer;
use axum::extract::FromRef;
use std::sync::Arc;
use xray_model::{Classifier, Metrics, ModelService};

#[derive(Clone)]
pub struct SharedState<M: ModelService> {
    pub classifier: Arc<Classifier<M>>,
    pub explainer: Arc<Explainer>,
    pub metrics: Arc<Metrics>,
}

impl<M: ModelService> SharedState<M> {
    pub fn new(classifier: Classifier<M>, explainer: Explainer, metrics: Metrics) -> Self {
        Self {
            classifier: Arc::new(classifier),
            explainer: Arc::new(explainer),
            metrics: Arc::new(metrics),
        }
    }
}

impl<M: ModelService> FromRef<SharedState<M>> for Arc<Metrics> {
    fn from_ref(state: &SharedState<M>) -> Self {
        state.metrics.clone()
    }
}
