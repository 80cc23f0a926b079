use xray_model::telemetry::init_tracing;
use xray_prediction::{config, start_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    init_tracing(&config.log_level);

    start_app(config).await
}
