//! Shared building blocks of the chest X-ray inference services: model
//! loading, preprocessing, classification and the HTTP plumbing around them.

mod classifier;
mod labels;
mod model_service;
mod ort_service;

pub mod config;
pub mod error;
pub mod preprocess;
pub mod routes;
pub mod server;
pub mod telemetry;
pub mod upload;

pub use classifier::{argmax, softmax, Classifier, Prediction};
pub use error::{ApiError, ErrorKind};
pub use labels::{LabelError, LabelTable};
pub use model_service::{ModelError, ModelService};
pub use ort_service::OrtModelService;
pub use telemetry::Metrics;
