pub mod postgres;
pub mod postgrest;

pub use postgres::PgRecordStore;
pub use postgrest::PostgrestRecordStore;

use crate::error::WriteError;
use crate::types::{MigrationEvent, TokenCreationEvent, TradeEvent};
use crate::utils::retry::{retry_if, RetryPolicy};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Number, Value};
use std::sync::Arc;
use std::time::Duration;

// Stored procedures exposed by the backend
pub const RPC_INSERT_CREATION: &str = "insert_token_with_prefix";
pub const RPC_INSERT_MIGRATION: &str = "insert_migrating_with_prefix";
pub const RPC_INSERT_TRADE: &str = "insert_trade_with_prefix";

/// One remote procedure call per record kind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_creation(&self, token: &TokenCreationEvent) -> Result<(), WriteError>;
    async fn insert_migration(&self, migration: &MigrationEvent) -> Result<(), WriteError>;
    async fn insert_trade(&self, trade: &TradeEvent) -> Result<(), WriteError>;
}

/// Write path used by the pipeline: a [`RecordStore`] behind the retry policy.
///
/// Transient failures are retried; rejections are returned on first sight.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn RecordStore>,
    retry_policy: RetryPolicy,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::new(5, Duration::from_millis(1000), Duration::from_millis(10_000)),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub async fn insert_creation(&self, token: &TokenCreationEvent) -> Result<(), WriteError> {
        retry_if(&self.retry_policy, || self.store.insert_creation(token), WriteError::is_transient).await
    }

    pub async fn insert_migration(&self, migration: &MigrationEvent) -> Result<(), WriteError> {
        retry_if(&self.retry_policy, || self.store.insert_migration(migration), WriteError::is_transient).await
    }

    pub async fn insert_trade(&self, trade: &TradeEvent) -> Result<(), WriteError> {
        retry_if(&self.retry_policy, || self.store.insert_trade(trade), WriteError::is_transient).await
    }
}

/// Numeric procedure arguments go out as JSON numbers: integral values as
/// integers, everything else as the nearest `f64`.
fn numeric(value: impl Into<Option<Decimal>>) -> Value {
    let Some(value) = value.into() else {
        return Value::Null;
    };

    if value.fract().is_zero() {
        if let Some(int) = value.to_i64() {
            return Value::from(int);
        }
    }

    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// `p_`-prefixed named parameters of `insert_token_with_prefix`.
pub fn creation_params(token: &TokenCreationEvent) -> Value {
    json!({
        "p_signature": token.signature,
        "p_mint_address": token.mint_address,
        "p_trader_public_key": token.trader_public_key,
        "p_tx_type": token.tx_type,
        "p_initial_buy": numeric(token.initial_buy),
        "p_sol_amount": numeric(token.sol_amount),
        "p_bonding_curve_key": token.bonding_curve_key,
        "p_v_tokens_in_bonding_curve": numeric(token.v_tokens_in_bonding_curve),
        "p_v_sol_in_bonding_curve": numeric(token.v_sol_in_bonding_curve),
        "p_market_cap_sol": numeric(token.market_cap_sol),
        "p_name": token.name,
        "p_symbol": token.symbol,
        "p_uri": token.uri,
        "p_pool": token.pool,
        "p_description": token.description,
        "p_twitter": token.twitter,
        "p_telegram": token.telegram,
        "p_website": token.website,
        "p_image": token.image,
        "p_timestamp": token.timestamp,
    })
}

pub fn migration_params(migration: &MigrationEvent) -> Value {
    json!({
        "p_signature": migration.signature,
        "p_mint_address": migration.mint_address,
        "p_tx_type": migration.tx_type,
        "p_market_id": migration.market_id,
        "p_market_cap_sol": numeric(migration.market_cap_sol),
        "p_price": numeric(migration.price),
        "p_pool": migration.pool,
        "p_timestamp": migration.timestamp,
    })
}

pub fn trade_params(trade: &TradeEvent) -> Value {
    json!({
        "p_signature": trade.signature,
        "p_mint_address": trade.mint_address,
        "p_trader_public_key": trade.trader_public_key,
        "p_tx_type": trade.tx_type,
        "p_initial_buy": numeric(trade.initial_buy),
        "p_sol_amount": numeric(trade.sol_amount),
        "p_bonding_curve_key": trade.bonding_curve_key,
        "p_v_tokens_in_bonding_curve": numeric(trade.v_tokens_in_bonding_curve),
        "p_v_sol_in_bonding_curve": numeric(trade.v_sol_in_bonding_curve),
        "p_market_cap_sol": numeric(trade.market_cap_sol),
        "p_name": trade.name,
        "p_symbol": trade.symbol,
        "p_uri": trade.uri,
        "p_pool": trade.pool,
        "p_timestamp": trade.timestamp,
        "p_token_amount": numeric(trade.token_amount),
        "p_new_token_balance": numeric(trade.new_token_balance),
    })
}
