use crate::config::{Config, StorageConfig};
use crate::database::{PersistenceGateway, PgRecordStore, PostgrestRecordStore, RecordStore};
use crate::event_listener::{ConnectionSupervisor, FrameProcessor};
use crate::metadata::MetadataFetcher;
use crate::services::ApiService;
use crate::types::IngestStats;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Wires the feed connection, the metadata fetcher and the record store
/// together and runs them until the feed is lost or the process is interrupted.
pub struct IngestService {
    config: Config,
    stats: Arc<IngestStats>,
    supervisor: ConnectionSupervisor,
}

impl IngestService {
    pub async fn new(config: Config) -> Result<Self> {
        let stats = Arc::new(IngestStats::default());

        let store = Self::build_store(&config.storage).await?;
        let metadata = Arc::new(MetadataFetcher::new(&config.metadata)?);
        let processor = FrameProcessor::new(
            PersistenceGateway::new(store),
            metadata,
            Arc::clone(&stats),
            config.filter_spam_tokens,
        );
        let supervisor = ConnectionSupervisor::new(config.feed.clone(), Arc::new(processor), Arc::clone(&stats));

        Ok(Self {
            config,
            stats,
            supervisor,
        })
    }

    async fn build_store(storage: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
        match storage {
            StorageConfig::Postgrest {
                url,
                service_key,
                timeout_secs,
            } => {
                info!("🗄️ Writing records through PostgREST at {}", url);
                let store = PostgrestRecordStore::new(url, service_key, Duration::from_secs(*timeout_secs))?;
                Ok(Arc::new(store))
            }
            StorageConfig::Postgres { url, max_connections } => {
                let store = PgRecordStore::connect(url, *max_connections).await?;
                store.create_schema().await?;
                info!("🗄️ Database connected and schema created");
                Ok(Arc::new(store))
            }
        }
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Returns `Ok` on an interrupt and an error once the feed is lost for good.
    /// Either way, writes already dispatched get [`SHUTDOWN_GRACE`] to finish.
    pub async fn start(mut self) -> Result<()> {
        info!("🚀 启动数据采集服务...");

        if let Some(server) = self.config.server.clone() {
            let api_service = ApiService::new(server, Arc::clone(&self.stats));
            tokio::spawn(async move {
                if let Err(e) = api_service.start().await {
                    error!("Status server error: {}", e);
                }
            });
        }

        let outcome = tokio::select! {
            result = self.supervisor.run() => result.map_err(anyhow::Error::from),
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 收到退出信号，正在停止采集服务...");
                Ok(())
            }
        };

        // 退出前等待已派发的写入完成
        if !self.supervisor.drain(SHUTDOWN_GRACE).await {
            warn!("⚠️ Some writes were still in flight at shutdown");
        }

        outcome
    }
}
