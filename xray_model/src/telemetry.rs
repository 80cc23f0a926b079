use crate::config::LogLevel;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to build prometheus exporter: {0}")]
    Exporter(String),
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("Metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn init_tracing(log_level: &LogLevel) {
    let log_level = format!("{},ort=info", log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_level(true)
                .with_thread_names(true),
        )
        .init();
}

pub struct Metrics {
    request_counter: Counter<u64>,
    inference_duration: Histogram<u64>,
    explanation_duration: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new(service_name: &'static str) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter(service_name);
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let inference_duration = meter
            .u64_histogram("inference_duration_ms")
            .with_boundaries(exponential_boundaries(5.0, 2.0, 10))
            .with_description("Duration of single image inference in milliseconds")
            .build();

        let explanation_duration = meter
            .u64_histogram("explanation_duration_ms")
            .with_boundaries(exponential_boundaries(250.0, 2.0, 10))
            .with_description("Duration of explanation generation in milliseconds")
            .build();

        Ok(Metrics {
            request_counter,
            inference_duration,
            explanation_duration,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        let attributes = [KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_inference_duration(&self, duration_ms: u64, route: &str) {
        let attributes = [KeyValue::new("route", route.to_string())];
        self.inference_duration.record(duration_ms, &attributes);
    }

    pub fn record_explanation_duration(&self, duration_ms: u64, route: &str) {
        let attributes = [KeyValue::new("route", route.to_string())];
        self.explanation_duration.record(duration_ms, &attributes);
    }

    pub fn encode(&self) -> Result<String, TelemetryError> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

fn exponential_boundaries(start: f64, factor: f64, count: usize) -> Vec<f64> {
    std::iter::successors(Some(start), |b| Some(b * factor))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_boundaries() {
        assert_eq!(
            exponential_boundaries(5.0, 2.0, 4),
            vec![5.0, 10.0, 20.0, 40.0]
        );
        assert!(exponential_boundaries(1.0, 3.0, 0).is_empty());
    }

    #[test]
    fn test_recorded_requests_are_exported() {
        let metrics = Metrics::new("xray_model_test").unwrap();
        metrics.record_request("/predict");
        metrics.record_inference_duration(12, "/predict");

        let text = metrics.encode().unwrap();
        assert!(text.contains("requests_total"));
        assert!(text.contains("inference_duration_ms"));
    }
}
