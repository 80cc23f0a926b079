use xray_explanation::{config, start_app};
use xray_model::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_configuration()?;
    init_tracing(&config.log_level);

    start_app(config).await
}
