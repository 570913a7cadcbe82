use super::ApiState;
use crate::types::StatsSnapshot;
use axum::{extract::State, response::Json};
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Live ingestion counters.
pub async fn get_status(State(state): State<ApiState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}
