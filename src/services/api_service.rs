use crate::{
    api::{create_router, ApiState},
    config::ServerConfig,
    types::IngestStats,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Read-only status endpoint over the shared ingestion counters.
pub struct ApiService {
    config: ServerConfig,
    stats: Arc<IngestStats>,
}

impl ApiService {
    pub fn new(config: ServerConfig, stats: Arc<IngestStats>) -> Self {
        Self { config, stats }
    }

    pub async fn start(&self) -> Result<()> {
        let app = create_router(ApiState::new(Arc::clone(&self.stats)));
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", self.config.host, self.config.port)).await?;

        info!("📊 Status server listening on {}:{}", self.config.host, self.config.port);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
