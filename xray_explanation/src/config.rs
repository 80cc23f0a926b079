use serde::Deserialize;
use xray_model::config::{
    deserialize_log_level, load_configuration, LabelsConfig, LogLevel, ModelConfig, ServerConfig,
    Validatable,
};

const ENV_PREFIX: &str = "EXPLANATION";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
    #[serde(default)]
    pub explanation: ExplanationConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.labels.validate()?;
        self.explanation.validate()
    }
}

/// Tuning of the perturbation-based explanation.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Perturbed samples per explanation, the unperturbed image included.
    pub num_samples: usize,
    /// Samples scored per forward pass.
    pub batch_size: usize,
    /// Superpixels kept in the mask.
    pub num_features: usize,
    /// Target superpixel count for segmentation.
    pub num_segments: usize,
    /// SLIC weight of spatial over color distance.
    pub compactness: f32,
    pub kernel_width: f64,
    pub ridge_alpha: f64,
    /// Share of the original image in the blended overlay.
    pub overlay_alpha: f32,
    /// Longest side of the image the explanation is computed and drawn on.
    pub max_dimension: u32,
    pub seed: Option<u64>,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            batch_size: 10,
            num_features: 5,
            num_segments: 50,
            compactness: 10.0,
            kernel_width: 0.25,
            ridge_alpha: 1.0,
            overlay_alpha: 0.7,
            max_dimension: 224,
            seed: None,
        }
    }
}

impl ExplanationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_samples < 2 {
            return Err("explanation.num_samples must be at least 2".to_string());
        }
        if self.batch_size == 0 {
            return Err("explanation.batch_size must be at least 1".to_string());
        }
        if self.num_features == 0 || self.num_segments == 0 {
            return Err("explanation.num_features and num_segments must be positive".to_string());
        }
        if self.compactness <= 0.0 || self.kernel_width <= 0.0 {
            return Err("explanation.compactness and kernel_width must be positive".to_string());
        }
        if self.ridge_alpha <= 0.0 {
            return Err("explanation.ridge_alpha must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.overlay_alpha) {
            return Err("explanation.overlay_alpha must be within [0, 1]".to_string());
        }
        if self.max_dimension == 0 {
            return Err("explanation.max_dimension must be positive".to_string());
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config: Config = load_configuration(ENV_PREFIX)?;

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExplanationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_samples, 1000);
        assert_eq!(config.num_features, 5);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let config = ExplanationConfig {
            overlay_alpha: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExplanationConfig {
            num_samples: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExplanationConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
