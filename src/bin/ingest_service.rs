use pump_ingestor::{services::IngestService, Config};
use std::str::FromStr;
use tracing::{error, info, Level};

fn init_tracing(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);
    info!("🔧 Starting pump.fun ingest service...");
    info!("Configuration loaded successfully");

    let service = match IngestService::new(config).await {
        Ok(service) => service,
        Err(e) => {
            error!("❌ Failed to initialize ingest service: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = service.start().await {
        error!("❌ Ingest service stopped: {:#}", e);
        std::process::exit(1);
    }

    info!("👋 Ingest service stopped");
}
