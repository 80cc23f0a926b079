//! Local surrogate explanation of a single prediction.
//!
//! The image is split into superpixels, randomly masked `num_samples` times and
//! every masked copy is scored by the classifier. A weighted ridge model of the
//! target class probability over superpixel presence then tells which regions
//! drove the prediction; the strongest positive ones are painted as a heatmap.

mod overlay;
mod segmentation;
mod surrogate;

use crate::config::ExplanationConfig;
use image::{imageops::FilterType, GrayImage, RgbImage};
use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use xray_model::{Classifier, ModelError, ModelService};

pub use overlay::{blend_heatmap, jet, to_data_uri, DATA_URI_PREFIX};
pub use segmentation::{slic, Segmentation};
pub use surrogate::{
    kernel_weights, sample_presence, top_positive_features, weighted_ridge, RidgeFit,
    SurrogateError,
};

const SLIC_ITERATIONS: usize = 10;

#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Scoring perturbed samples failed: {0}")]
    Model(#[from] ModelError),
    #[error("Surrogate fit failed: {0}")]
    Surrogate(#[from] SurrogateError),
    #[error("Failed to encode overlay: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Target class {target} is outside the {classes} model outputs")]
    Target { target: usize, classes: usize },
}

#[derive(Debug, Clone)]
pub struct Explanation {
    pub target: usize,
    /// Selected superpixel ids, strongest first.
    pub superpixels: Vec<usize>,
    pub num_segments: usize,
    pub mask: GrayImage,
    pub overlay: RgbImage,
    pub score: f64,
}

impl Explanation {
    pub fn data_uri(&self) -> Result<String, ExplainError> {
        Ok(to_data_uri(&self.overlay)?)
    }
}

#[derive(Debug, Clone)]
pub struct Explainer {
    config: ExplanationConfig,
}

impl Explainer {
    pub fn new(config: ExplanationConfig) -> Self {
        Self { config }
    }

    pub fn explain<M: ModelService>(
        &self,
        classifier: &Classifier<M>,
        image: &RgbImage,
        target: usize,
    ) -> Result<Explanation, ExplainError> {
        let cfg = &self.config;
        let image = fit_within(image, cfg.max_dimension);

        let segmentation = slic(&image, cfg.num_segments, cfg.compactness, SLIC_ITERATIONS);
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let presence = sample_presence(segmentation.count(), cfg.num_samples, &mut rng);

        let probabilities = self.score_samples(classifier, &image, &segmentation, &presence)?;
        if target >= probabilities.ncols() {
            return Err(ExplainError::Target {
                target,
                classes: probabilities.ncols(),
            });
        }

        let y = probabilities.column(target).mapv(f64::from);
        let weights = kernel_weights(&presence, cfg.kernel_width);
        let fit = weighted_ridge(&presence, &y, &weights, cfg.ridge_alpha)?;
        let superpixels = top_positive_features(&fit.coefficients, cfg.num_features);

        tracing::debug!(
            "Explained class {} over {} superpixels: selected {:?}, surrogate R2 {:.3}",
            target,
            segmentation.count(),
            superpixels,
            fit.score
        );

        let mask = segmentation.mask(&superpixels);
        let overlay = blend_heatmap(&image, &mask, cfg.overlay_alpha);

        Ok(Explanation {
            target,
            superpixels,
            num_segments: segmentation.count(),
            mask,
            overlay,
            score: fit.score,
        })
    }

    fn score_samples<M: ModelService>(
        &self,
        classifier: &Classifier<M>,
        image: &RgbImage,
        segmentation: &Segmentation,
        presence: &Array2<f64>,
    ) -> Result<Array2<f32>, ExplainError> {
        let mut batches = Vec::with_capacity(presence.nrows().div_ceil(self.config.batch_size));
        for chunk in presence.axis_chunks_iter(Axis(0), self.config.batch_size) {
            let images: Vec<RgbImage> = chunk
                .outer_iter()
                .map(|row| segmentation.perturb(image, row))
                .collect();
            batches.push(classifier.probabilities(&images)?);
        }

        let views: Vec<_> = batches.iter().map(|b| b.view()).collect();
        ndarray::concatenate(Axis(0), &views)
            .map_err(|e| ExplainError::Model(ModelError::Shape(e.to_string())))
    }
}

/// Downscales so that neither side exceeds `max_dimension`, keeping the aspect ratio.
pub fn fit_within(image: &RgbImage, max_dimension: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if w <= max_dimension && h <= max_dimension {
        return image.clone();
    }

    let scale = max_dimension as f64 / w.max(h) as f64;
    let nw = ((w as f64 * scale).round() as u32).clamp(1, max_dimension);
    let nh = ((h as f64 * scale).round() as u32).clamp(1, max_dimension);
    image::imageops::resize(image, nw, nh, FilterType::Triangle)
}
