use serde::{de::DeserializeOwned, Deserialize};
use std::path::{Path, PathBuf};

pub trait Validatable {
    fn get_path(&self) -> PathBuf;

    fn validate(&self) -> Result<(), String> {
        let path = self.get_path();
        if !path.exists() {
            return Err(format!("File not found: {:?}", path));
        }
        Ok(())
    }
}

pub fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub onnx_file: String,
    pub model_dir: PathBuf,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_use_cuda")]
    pub use_cuda: bool,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

fn default_use_cuda() -> bool {
    true
}

impl Validatable for ModelConfig {
    fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }

    fn validate(&self) -> Result<(), String> {
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".to_string());
        }
        if !self.get_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_path()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    pub labels_file: String,
    pub labels_dir: PathBuf,
}

impl Validatable for LabelsConfig {
    fn get_path(&self) -> PathBuf {
        self.labels_dir.join(&self.labels_file)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "{} is not a supported minimum log level. Use `debug`, `info`, `warn` or `error`.",
                other
            )),
        }
    }
}

/// Reads `configuration/` under the working directory for the environment
/// named by `APP_ENVIRONMENT` (default `local`).
pub fn load_configuration<T: DeserializeOwned>(env_prefix: &str) -> Result<T, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("Failed to read current dir: {}", e)))?;

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_configuration_from(&base_path.join("configuration"), &environment, env_prefix)
}

/// Layers `base.yaml`, the optional `<environment>.yaml` and
/// `<env_prefix>_SECTION__KEY` environment variables, later sources winning.
pub fn load_configuration_from<T: DeserializeOwned>(
    configuration_directory: &Path,
    environment: &Environment,
    env_prefix: &str,
) -> Result<T, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        let level: LogLevel = "DEBUG".to_string().try_into().unwrap();
        assert_eq!(level.as_str(), "debug");
        let level: LogLevel = "Warning".to_string().try_into().unwrap();
        assert_eq!(level.as_str(), "warn");

        let err = LogLevel::try_from("trace".to_string()).unwrap_err();
        assert!(err.contains("trace"));
    }

    #[test]
    fn test_environment_parsing() {
        let env: Environment = "Production".to_string().try_into().unwrap();
        assert_eq!(env.as_str(), "production");
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn test_model_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ModelConfig {
            onnx_file: "densenet.onnx".to_string(),
            model_dir: dir.path().to_path_buf(),
            num_instances: 1,
            use_cuda: false,
        };
        assert!(model.validate().is_err());

        std::fs::write(dir.path().join("densenet.onnx"), b"onnx").unwrap();
        assert!(model.validate().is_ok());

        model.num_instances = 0;
        assert!(model.validate().is_err());
    }

    #[derive(Debug, Deserialize)]
    struct LayeredConfig {
        server: ServerConfig,
        model: ModelConfig,
    }

    #[test]
    fn test_configuration_layering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "server:\n  host: 0.0.0.0\n  port: 5000\nmodel:\n  model_dir: models\n  onnx_file: base.onnx\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("local.yaml"), "server:\n  port: 5100\n").unwrap();
        std::env::set_var("XRAYLAYERTEST_MODEL__ONNX_FILE", "override.onnx");

        let cfg: LayeredConfig =
            load_configuration_from(dir.path(), &Environment::Local, "XRAYLAYERTEST").unwrap();
        std::env::remove_var("XRAYLAYERTEST_MODEL__ONNX_FILE");

        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 5100);
        assert_eq!(cfg.server.max_upload_bytes, default_max_upload_bytes());
        assert_eq!(cfg.model.onnx_file, "override.onnx");
        assert_eq!(cfg.model.model_dir, PathBuf::from("models"));
        assert!(cfg.model.use_cuda);
    }

    #[test]
    fn test_missing_environment_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "server:\n  host: 127.0.0.1\n  port: 5000\nmodel:\n  model_dir: models\n  onnx_file: base.onnx\n",
        )
        .unwrap();

        let cfg: LayeredConfig =
            load_configuration_from(dir.path(), &Environment::Production, "XRAYNOENVTEST").unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.model.onnx_file, "base.onnx");
    }

    #[test]
    fn test_server_address() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: default_max_upload_bytes(),
        };
        assert_eq!(server.get_address(), "0.0.0.0:5000");
    }
}
