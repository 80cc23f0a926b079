use ndarray::{Array2, ArrayView4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("Invalid output shape: {0}")]
    Shape(String),
    #[error("Model produced {outputs} classes but the label table has {labels}")]
    LabelMismatch { outputs: usize, labels: usize },
    #[error("Empty batch")]
    EmptyBatch,
}

/// A loaded classifier. Implementations are immutable after construction and
/// shared read-only across requests.
pub trait ModelService: Send + Sync + Clone + 'static {
    /// Runs an `N x 3 x H x W` batch and returns the raw `N x C` logits.
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError>;
}
