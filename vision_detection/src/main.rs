use vision_detection::{config, start_server, telemetry, BoxError};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = config::get_configuration()?;
    telemetry::init_tracing(config.log_level);

    start_server(config).await
}
