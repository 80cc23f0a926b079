use serde::Deserialize;
use xray_model::config::{
    deserialize_log_level, load_configuration, LabelsConfig, LogLevel, ModelConfig, ServerConfig,
    Validatable,
};

const ENV_PREFIX: &str = "PREDICTION";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.labels.validate()
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
