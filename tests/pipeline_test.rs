use pump_ingestor::config::MetadataConfig;
use pump_ingestor::database::{PersistenceGateway, PostgrestRecordStore};
use pump_ingestor::event_listener::{classify, FrameProcessor};
use pump_ingestor::metadata::MetadataFetcher;
use pump_ingestor::utils::retry::RetryPolicy;
use pump_ingestor::{InboundFrame, IngestStats, METADATA_SENTINEL};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_KEY: &str = "service-role-key";

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5))
}

async fn processor(backend: &MockServer, gateway: &MockServer) -> FrameProcessor {
    let store = PostgrestRecordStore::new(&backend.uri(), SERVICE_KEY, Duration::from_secs(5)).unwrap();
    let fetcher = MetadataFetcher::new(&MetadataConfig {
        gateway_url: format!("{}/", gateway.uri()),
        timeout_secs: 5,
    })
    .unwrap()
    .with_retry_policy(fast_policy());

    FrameProcessor::new(
        PersistenceGateway::new(Arc::new(store)).with_retry_policy(fast_policy()),
        Arc::new(fetcher),
        Arc::new(IngestStats::default()),
        false,
    )
}

#[tokio::test]
async fn test_creation_frame_is_enriched_and_written() {
    let backend = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/QmPixel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Pixel Dragons",
            "description": "dragons, but pixelated",
            "twitter": "https://x.com/pixeldragons",
            "image": "https://ipfs.io/ipfs/QmImage"
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_token_with_prefix"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {}", SERVICE_KEY).as_str()))
        .and(body_partial_json(json!({
            "p_mint_address": "M1",
            "p_name": "Pixel Dragons",
            "p_symbol": "PXD",
            "p_initial_buy": 1000,
            "p_description": "dragons, but pixelated",
            "p_twitter": "https://x.com/pixeldragons",
            "p_telegram": METADATA_SENTINEL,
            "p_website": METADATA_SENTINEL,
            "p_image": "https://ipfs.io/ipfs/QmImage"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_trade_with_prefix"))
        .and(body_partial_json(json!({
            "p_signature": "S1",
            "p_tx_type": "create",
            "p_mint_address": "M1"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&backend)
        .await;

    let processor = processor(&backend, &gateway).await;
    let frame = InboundFrame::from_json(
        r#"{"signature": "S1", "mint": "M1", "traderPublicKey": "T1", "txType": "create",
            "initialBuy": 1000, "name": "Pixel Dragons", "symbol": "PXD",
            "uri": "https://ipfs.io/ipfs/QmPixel", "pool": "pump"}"#,
    )
    .unwrap();

    processor.process(classify(&frame, 1_700_000_000_000)).await;

    let stats = processor.stats().snapshot();
    assert_eq!(stats.creations_written, 1);
    assert_eq!(stats.trades_written, 1);
    assert_eq!(stats.write_failures, 0);
    assert_eq!(stats.metadata_failures, 0);
}

#[tokio::test]
async fn test_unreachable_gateway_writes_defaults() {
    let backend = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&gateway)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_token_with_prefix"))
        .and(body_partial_json(json!({
            "p_mint_address": "M2",
            "p_symbol": "UNKNOWN",
            "p_description": METADATA_SENTINEL,
            "p_image": METADATA_SENTINEL
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend)
        .await;

    let processor = processor(&backend, &gateway).await;
    let frame = InboundFrame::from_json(r#"{"name": "Nameless", "mint": "M2", "uri": "https://ipfs.io/ipfs/QmGone"}"#)
        .unwrap();

    processor.process(classify(&frame, 1)).await;

    let stats = processor.stats().snapshot();
    assert_eq!(stats.creations_written, 1);
    assert_eq!(stats.metadata_failures, 1);
    assert_eq!(gateway.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_transient_backend_failure_is_retried_until_accepted() {
    let backend = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_migrating_with_prefix"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_migrating_with_prefix"))
        .and(body_partial_json(json!({ "p_pool": "raydium", "p_market_id": "Mkt1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend)
        .await;

    let processor = processor(&backend, &gateway).await;
    let frame = InboundFrame::from_json(r#"{"mint": "M3", "pool": "raydium", "marketId": "Mkt1"}"#).unwrap();

    processor.process(classify(&frame, 1)).await;

    let stats = processor.stats().snapshot();
    assert_eq!(stats.migrations_written, 1);
    assert_eq!(stats.trades_written, 0);
    assert_eq!(stats.write_failures, 0);
}

#[tokio::test]
async fn test_rejected_write_is_not_retried() {
    let backend = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/insert_trade_with_prefix"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid input syntax for type numeric",
            "code": "22P02"
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let processor = processor(&backend, &gateway).await;
    let frame = InboundFrame::from_json(r#"{"signature": "S4", "txType": "sell", "mint": "M4"}"#).unwrap();

    processor.process(classify(&frame, 1)).await;

    let stats = processor.stats().snapshot();
    assert_eq!(stats.trades_written, 0);
    assert_eq!(stats.write_failures, 1);
}
