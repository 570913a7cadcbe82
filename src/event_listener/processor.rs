use crate::database::PersistenceGateway;
use crate::metadata::MetadataSource;
use crate::types::{ClassifiedFrame, IngestStats, MigrationEvent, TokenCreationEvent, TradeEvent};
use crate::utils::validation::is_valid_token_name;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Enriches and persists the records of one classified frame.
///
/// Each record kind has its own error handling: a failed write is logged and
/// counted, and never stops the other kinds or the next frame.
pub struct FrameProcessor {
    gateway: PersistenceGateway,
    metadata: Arc<dyn MetadataSource>,
    stats: Arc<IngestStats>,
    filter_spam_tokens: bool,
}

impl FrameProcessor {
    pub fn new(
        gateway: PersistenceGateway,
        metadata: Arc<dyn MetadataSource>,
        stats: Arc<IngestStats>,
        filter_spam_tokens: bool,
    ) -> Self {
        Self {
            gateway,
            metadata,
            stats,
            filter_spam_tokens,
        }
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Drops a creation record whose name looks like spam, when filtering is on.
    /// Returns `false` if the creation was dropped.
    pub fn screen(&self, frame: &mut ClassifiedFrame) -> bool {
        if !self.filter_spam_tokens {
            return true;
        }

        match &frame.creation {
            Some(token) if !is_valid_token_name(&token.name) => {
                info!("🗑️ Skipping spam token {} ({})", token.name, token.mint_address);
                self.stats.spam_skipped();
                frame.creation = None;
                false
            }
            _ => true,
        }
    }

    /// Writes every record of the frame. The three writes run concurrently.
    pub async fn process(&self, frame: ClassifiedFrame) {
        let ClassifiedFrame {
            creation,
            migration,
            trade,
        } = frame;

        // 三类记录并发写入，任一失败不影响其他
        tokio::join!(
            async move {
                if let Some(token) = creation {
                    self.persist_creation(token).await;
                }
            },
            async move {
                if let Some(migration) = migration {
                    self.persist_migration(migration).await;
                }
            },
            async move {
                if let Some(trade) = trade {
                    self.persist_trade(trade).await;
                }
            },
        );
    }

    /// Best-effort metadata enrichment. A failed fetch keeps the defaults.
    pub async fn enrich(&self, token: &mut TokenCreationEvent) {
        let Some(uri) = token.uri.clone() else {
            info!("🚫 No metadata URI found for {}", token.mint_address);
            return;
        };

        info!("🔄 获取代币元数据: {} ({})", token.mint_address, uri);
        match self.metadata.fetch(&uri).await {
            Ok(document) => document.apply_to(token),
            Err(e) => {
                self.stats.metadata_failed();
                warn!("🚨 Error fetching metadata for {}: {}", token.mint_address, e);
            }
        }
    }

    async fn persist_creation(&self, mut token: TokenCreationEvent) {
        // 元数据获取失败时保留默认值
        self.enrich(&mut token).await;

        match self.gateway.insert_creation(&token).await {
            Ok(()) => {
                self.stats.creation_written();
                info!("✅ Token {} ({}) inserted", token.name, token.mint_address);
            }
            Err(e) => {
                self.stats.write_failed();
                error!("❌ Error inserting token {}: {}", token.mint_address, e.message());
            }
        }
    }

    async fn persist_migration(&self, migration: MigrationEvent) {
        let mint = migration.mint_address.as_deref().unwrap_or("<unknown>");
        info!("📡 Raydium liquidity detected for {}", mint);

        match self.gateway.insert_migration(&migration).await {
            Ok(()) => {
                self.stats.migration_written();
                info!("✅ Raydium migration for {} inserted", mint);
            }
            Err(e) => {
                self.stats.write_failed();
                error!("❌ Error inserting Raydium data for {}: {}", mint, e.message());
            }
        }
    }

    async fn persist_trade(&self, trade: TradeEvent) {
        match self.gateway.insert_trade(&trade).await {
            Ok(()) => {
                self.stats.trade_written();
                info!("📈 Trade {} {} inserted", trade.tx_type, trade.signature);
            }
            Err(e) => {
                self.stats.write_failed();
                error!("❌ Error inserting trade {}: {}", trade.signature, e.message());
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticMetadata;
    use super::*;
    use crate::database::testing::MemoryStore;
    use crate::error::WriteError;
    use crate::event_listener::classifier::classify;
    use crate::types::{InboundFrame, TokenMetadataDocument, METADATA_SENTINEL};
    use crate::utils::retry::RetryPolicy;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn processor(store: Arc<MemoryStore>, metadata: Arc<StaticMetadata>, filter: bool) -> FrameProcessor {
        let gateway = PersistenceGateway::new(store)
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)));
        FrameProcessor::new(gateway, metadata, Arc::new(IngestStats::default()), filter)
    }

    fn classified(json: &str) -> ClassifiedFrame {
        classify(&InboundFrame::from_json(json).unwrap(), 1_000)
    }

    #[tokio::test]
    async fn test_creation_without_uri_skips_fetch() {
        let store = Arc::new(MemoryStore::default());
        let metadata = Arc::new(StaticMetadata::failing());
        let processor = processor(Arc::clone(&store), Arc::clone(&metadata), false);

        processor.process(classified(r#"{"name": "Foo", "mint": "M1"}"#)).await;

        let creations = store.creations.lock().unwrap();
        assert_eq!(creations.len(), 1);
        assert_eq!(creations[0].description, METADATA_SENTINEL);
        assert_eq!(metadata.calls.load(Ordering::SeqCst), 0);
        assert!(store.trades.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_metadata_keeps_remaining_defaults() {
        let store = Arc::new(MemoryStore::default());
        let metadata = Arc::new(StaticMetadata::returning(TokenMetadataDocument {
            description: Some("X".to_string()),
            ..TokenMetadataDocument::default()
        }));
        let processor = processor(Arc::clone(&store), metadata, false);

        processor
            .process(classified(r#"{"name": "Foo", "mint": "M1", "uri": "https://ipfs.io/ipfs/QmX"}"#))
            .await;

        let creations = store.creations.lock().unwrap();
        let token = &creations[0];
        assert_eq!(token.description, "X");
        assert_eq!(token.twitter, METADATA_SENTINEL);
        assert_eq!(token.telegram, METADATA_SENTINEL);
        assert_eq!(token.website, METADATA_SENTINEL);
        assert_eq!(token.image, METADATA_SENTINEL);
    }

    #[tokio::test]
    async fn test_failed_fetch_still_writes_the_token() {
        let store = Arc::new(MemoryStore::default());
        let processor = processor(Arc::clone(&store), Arc::new(StaticMetadata::failing()), false);

        processor
            .process(classified(r#"{"name": "Foo", "mint": "M1", "uri": "https://ipfs.io/ipfs/QmX"}"#))
            .await;

        assert_eq!(store.creations.lock().unwrap().len(), 1);
        let snapshot = processor.stats().snapshot();
        assert_eq!(snapshot.metadata_failures, 1);
        assert_eq!(snapshot.creations_written, 1);
    }

    #[tokio::test]
    async fn test_creation_and_trade_from_one_frame() {
        let store = Arc::new(MemoryStore::default());
        let processor = processor(Arc::clone(&store), Arc::new(StaticMetadata::failing()), false);

        processor
            .process(classified(
                r#"{"signature": "S1", "txType": "create", "name": "Foo", "mint": "M1"}"#,
            ))
            .await;

        assert_eq!(store.creations.lock().unwrap().len(), 1);
        assert_eq!(store.trades.lock().unwrap().len(), 1);
        assert!(store.migrations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_rejected_write_does_not_block_the_others() {
        let store = Arc::new(MemoryStore::failing_with(vec![WriteError::Rejected("bad row".into())]));
        let processor = processor(Arc::clone(&store), Arc::new(StaticMetadata::failing()), false);

        processor
            .process(classified(
                r#"{"signature": "S1", "txType": "migrate", "mint": "M1", "pool": "raydium"}"#,
            ))
            .await;

        let written = store.migrations.lock().unwrap().len() + store.trades.lock().unwrap().len();
        assert_eq!(written, 1);
        let snapshot = processor.stats().snapshot();
        assert_eq!(snapshot.write_failures, 1);
        assert_eq!(snapshot.migrations_written + snapshot.trades_written, 1);
    }

    #[tokio::test]
    async fn test_spam_filter_drops_only_the_creation() {
        let store = Arc::new(MemoryStore::default());
        let processor = processor(Arc::clone(&store), Arc::new(StaticMetadata::failing()), true);

        let mut frame = classified(r#"{"signature": "S1", "txType": "create", "name": "Free Airdrop", "mint": "M1"}"#);
        assert!(!processor.screen(&mut frame));
        assert!(frame.creation.is_none());
        processor.process(frame).await;

        assert!(store.creations.lock().unwrap().is_empty());
        assert_eq!(store.trades.lock().unwrap().len(), 1);
        assert_eq!(processor.stats().snapshot().spam_skipped, 1);

        let mut frame = classified(r#"{"name": "Pixel Dragons", "mint": "M2"}"#);
        assert!(processor.screen(&mut frame));
        assert!(frame.creation.is_some());
    }
}
