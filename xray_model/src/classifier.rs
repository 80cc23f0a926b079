use crate::{
    labels::LabelTable,
    model_service::{ModelError, ModelService},
    preprocess::{images_to_batch, INPUT_SIZE},
};
use image::RgbImage;
use ndarray::{Array2, Array4, ArrayView1, Axis};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    #[serde(skip)]
    pub index: usize,
    pub confidence: f32,
}

/// Row-wise softmax, shifted by the row maximum for numerical stability.
pub fn softmax(logits: &Array2<f32>) -> Array2<f32> {
    let mut probs = logits.clone();
    for mut row in probs.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    probs
}

/// Index and value of the largest entry. Ties resolve to the lowest index.
pub fn argmax(values: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .reduce(|best, item| if item.1 > best.1 { item } else { best })
}

/// Model plus label table: the immutable context every request runs against.
#[derive(Clone)]
pub struct Classifier<M: ModelService> {
    model: M,
    labels: Arc<LabelTable>,
}

impl<M: ModelService> Classifier<M> {
    pub fn new(model: M, labels: LabelTable) -> Self {
        Self {
            model,
            labels: Arc::new(labels),
        }
    }

    /// Runs one blank image through the model and checks that it yields one
    /// logit per label.
    pub fn check_outputs(&self) -> Result<(), ModelError> {
        let side = INPUT_SIZE as usize;
        let blank = Array4::<f32>::zeros((1, 3, side, side));
        let logits = self.model.forward(blank.view())?;

        if logits.nrows() != 1 {
            return Err(ModelError::Shape(format!(
                "expected 1 row for a single image, got {}",
                logits.nrows()
            )));
        }
        if logits.ncols() != self.labels.len() {
            return Err(ModelError::LabelMismatch {
                outputs: logits.ncols(),
                labels: self.labels.len(),
            });
        }
        Ok(())
    }

    /// Preprocesses and scores a batch, returning one probability row per image.
    pub fn probabilities(&self, images: &[RgbImage]) -> Result<Array2<f32>, ModelError> {
        if images.is_empty() {
            return Err(ModelError::EmptyBatch);
        }

        let batch = images_to_batch(images);
        let logits = self.model.forward(batch.view())?;

        if logits.nrows() != images.len() {
            return Err(ModelError::Shape(format!(
                "expected {} rows, got {}",
                images.len(),
                logits.nrows()
            )));
        }
        if logits.ncols() != self.labels.len() {
            return Err(ModelError::LabelMismatch {
                outputs: logits.ncols(),
                labels: self.labels.len(),
            });
        }

        Ok(softmax(&logits))
    }

    pub fn predict(&self, image: &RgbImage) -> Result<Prediction, ModelError> {
        let probs = self.probabilities(std::slice::from_ref(image))?;
        let (index, confidence) = argmax(probs.row(0))
            .ok_or_else(|| ModelError::Shape("model returned no classes".to_string()))?;

        let label = self
            .labels
            .get(index)
            .ok_or(ModelError::LabelMismatch {
                outputs: probs.ncols(),
                labels: self.labels.len(),
            })?
            .to_string();

        Ok(Prediction {
            label,
            index,
            confidence,
        })
    }
}
