use super::{
    creation_params, migration_params, trade_params, RecordStore, RPC_INSERT_CREATION, RPC_INSERT_MIGRATION,
    RPC_INSERT_TRADE,
};
use crate::error::WriteError;
use crate::types::{MigrationEvent, TokenCreationEvent, TradeEvent};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Calls the insert procedures through the PostgREST `/rest/v1/rpc/<fn>` endpoint.
pub struct PostgrestRecordStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
}

impl PostgrestRecordStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, WriteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WriteError::Rejected(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    async fn call(&self, function: &str, params: Value) -> Result<(), WriteError> {
        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&params)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!("✅ {} accepted ({})", function, status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

#[async_trait]
impl RecordStore for PostgrestRecordStore {
    async fn insert_creation(&self, token: &TokenCreationEvent) -> Result<(), WriteError> {
        self.call(RPC_INSERT_CREATION, creation_params(token)).await
    }

    async fn insert_migration(&self, migration: &MigrationEvent) -> Result<(), WriteError> {
        self.call(RPC_INSERT_MIGRATION, migration_params(migration)).await
    }

    async fn insert_trade(&self, trade: &TradeEvent) -> Result<(), WriteError> {
        self.call(RPC_INSERT_TRADE, trade_params(trade)).await
    }
}

fn classify_transport_error(err: reqwest::Error) -> WriteError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        WriteError::Transient(err.to_string())
    } else {
        WriteError::Rejected(err.to_string())
    }
}

/// 408, 429 and 5xx are worth another attempt. Everything else is a rejection.
fn classify_status(status: StatusCode, body: &str) -> WriteError {
    let message = backend_message(status, body);

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        WriteError::Transient(message)
    } else {
        WriteError::Rejected(message)
    }
}

fn backend_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(PostgrestError {
            message: Some(message),
            code,
            details,
        }) => {
            let mut text = format!("{} ({})", message, status.as_u16());
            if let Some(code) = code {
                text.push_str(&format!(" code={}", code));
            }
            if let Some(details) = details {
                text.push_str(&format!(" details={}", details));
            }
            text
        }
        _ if body.is_empty() => format!("status {}", status.as_u16()),
        _ => format!("status {}: {}", status.as_u16(), body),
    }
}
