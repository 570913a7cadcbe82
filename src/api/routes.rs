use super::{handlers, ApiState};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::get_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IngestStats;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn serve(stats: Arc<IngestStats>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(ApiState::new(stats));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = serve(Arc::new(IngestStats::default())).await;

        let body: serde_json::Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_status_reflects_counters() {
        let stats = Arc::new(IngestStats::default());
        stats.set_connected(true);
        stats.frame_received();
        stats.trade_written();
        stats.set_subscribed_mints(4);
        let base = serve(Arc::clone(&stats)).await;

        let response = reqwest::get(format!("{}/status", base)).await.unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["connected"], true);
        assert_eq!(body["frames_received"], 1);
        assert_eq!(body["trades_written"], 1);
        assert_eq!(body["subscribed_mints"], 4);
        assert_eq!(body["write_failures"], 0);
    }
}
