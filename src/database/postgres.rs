use super::{RecordStore, RPC_INSERT_CREATION, RPC_INSERT_MIGRATION, RPC_INSERT_TRADE};
use crate::error::WriteError;
use crate::types::{MigrationEvent, TokenCreationEvent, TradeEvent};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Calls the insert procedures over a direct Postgres connection.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the record tables and the three insert procedures when absent.
    pub async fn create_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("🗄️ Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_creation(&self, token: &TokenCreationEvent) -> Result<(), WriteError> {
        let sql = format!(
            "SELECT {}(p_signature => $1, p_mint_address => $2, p_trader_public_key => $3, \
             p_tx_type => $4, p_initial_buy => $5, p_sol_amount => $6, p_bonding_curve_key => $7, \
             p_v_tokens_in_bonding_curve => $8, p_v_sol_in_bonding_curve => $9, p_market_cap_sol => $10, \
             p_name => $11, p_symbol => $12, p_uri => $13, p_pool => $14, p_description => $15, \
             p_twitter => $16, p_telegram => $17, p_website => $18, p_image => $19, p_timestamp => $20)",
            RPC_INSERT_CREATION
        );

        sqlx::query(&sql)
            .bind(&token.signature)
            .bind(&token.mint_address)
            .bind(&token.trader_public_key)
            .bind(&token.tx_type)
            .bind(token.initial_buy)
            .bind(token.sol_amount)
            .bind(&token.bonding_curve_key)
            .bind(token.v_tokens_in_bonding_curve)
            .bind(token.v_sol_in_bonding_curve)
            .bind(token.market_cap_sol)
            .bind(&token.name)
            .bind(&token.symbol)
            .bind(&token.uri)
            .bind(&token.pool)
            .bind(&token.description)
            .bind(&token.twitter)
            .bind(&token.telegram)
            .bind(&token.website)
            .bind(&token.image)
            .bind(token.timestamp)
            .execute(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(())
    }

    async fn insert_migration(&self, migration: &MigrationEvent) -> Result<(), WriteError> {
        let sql = format!(
            "SELECT {}(p_signature => $1, p_mint_address => $2, p_tx_type => $3, p_market_id => $4, \
             p_market_cap_sol => $5, p_price => $6, p_pool => $7, p_timestamp => $8)",
            RPC_INSERT_MIGRATION
        );

        sqlx::query(&sql)
            .bind(&migration.signature)
            .bind(&migration.mint_address)
            .bind(&migration.tx_type)
            .bind(&migration.market_id)
            .bind(migration.market_cap_sol)
            .bind(migration.price)
            .bind(&migration.pool)
            .bind(migration.timestamp)
            .execute(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(())
    }

    async fn insert_trade(&self, trade: &TradeEvent) -> Result<(), WriteError> {
        let sql = format!(
            "SELECT {}(p_signature => $1, p_mint_address => $2, p_trader_public_key => $3, \
             p_tx_type => $4, p_initial_buy => $5, p_sol_amount => $6, p_bonding_curve_key => $7, \
             p_v_tokens_in_bonding_curve => $8, p_v_sol_in_bonding_curve => $9, p_market_cap_sol => $10, \
             p_name => $11, p_symbol => $12, p_uri => $13, p_pool => $14, p_timestamp => $15, \
             p_token_amount => $16, p_new_token_balance => $17)",
            RPC_INSERT_TRADE
        );

        sqlx::query(&sql)
            .bind(&trade.signature)
            .bind(&trade.mint_address)
            .bind(&trade.trader_public_key)
            .bind(&trade.tx_type)
            .bind(trade.initial_buy)
            .bind(trade.sol_amount)
            .bind(&trade.bonding_curve_key)
            .bind(trade.v_tokens_in_bonding_curve)
            .bind(trade.v_sol_in_bonding_curve)
            .bind(trade.market_cap_sol)
            .bind(&trade.name)
            .bind(&trade.symbol)
            .bind(&trade.uri)
            .bind(&trade.pool)
            .bind(trade.timestamp)
            .bind(trade.token_amount)
            .bind(trade.new_token_balance)
            .execute(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(())
    }
}

/// Connection-class, serialization and resource errors are transient;
/// constraint violations and everything else are rejections.
pub fn classify_sqlx_error(err: sqlx::Error) -> WriteError {
    match &err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
            WriteError::Transient(err.to_string())
        }
        sqlx::Error::Database(db_err) => {
            let transient = db_err
                .code()
                .map(|code| is_transient_sqlstate(&code))
                .unwrap_or(false);
            if transient {
                WriteError::Transient(db_err.message().to_string())
            } else {
                WriteError::Rejected(db_err.message().to_string())
            }
        }
        _ => WriteError::Rejected(err.to_string()),
    }
}

fn is_transient_sqlstate(code: &str) -> bool {
    // 08: connection exception, 53: insufficient resources, 57014: query canceled,
    // 57P01..57P03: admin shutdown / cannot connect now
    code.starts_with("08")
        || code.starts_with("53")
        || matches!(code, "40001" | "40P01" | "57014" | "57P01" | "57P02" | "57P03")
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        mint_address TEXT PRIMARY KEY,
        signature TEXT,
        trader_public_key TEXT,
        tx_type TEXT,
        initial_buy NUMERIC,
        sol_amount NUMERIC,
        bonding_curve_key TEXT,
        v_tokens_in_bonding_curve NUMERIC,
        v_sol_in_bonding_curve NUMERIC,
        market_cap_sol NUMERIC,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        uri TEXT,
        pool TEXT,
        description TEXT,
        twitter TEXT,
        telegram TEXT,
        website TEXT,
        image TEXT,
        timestamp BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS migrations (
        id BIGSERIAL PRIMARY KEY,
        signature TEXT,
        mint_address TEXT,
        tx_type TEXT,
        market_id TEXT,
        market_cap_sol NUMERIC,
        price NUMERIC,
        pool TEXT NOT NULL,
        timestamp BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (signature, mint_address)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trades (
        id BIGSERIAL PRIMARY KEY,
        signature TEXT NOT NULL,
        mint_address TEXT,
        trader_public_key TEXT,
        tx_type TEXT NOT NULL,
        initial_buy NUMERIC NOT NULL DEFAULT 0,
        sol_amount NUMERIC,
        bonding_curve_key TEXT,
        v_tokens_in_bonding_curve NUMERIC,
        v_sol_in_bonding_curve NUMERIC,
        market_cap_sol NUMERIC,
        name TEXT,
        symbol TEXT NOT NULL,
        uri TEXT,
        pool TEXT,
        token_amount NUMERIC NOT NULL DEFAULT 0,
        new_token_balance NUMERIC NOT NULL DEFAULT 0,
        timestamp BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (signature, mint_address)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_trades_mint ON trades(mint_address, timestamp DESC)",
    r#"
    CREATE OR REPLACE FUNCTION insert_token_with_prefix(
        p_signature TEXT, p_mint_address TEXT, p_trader_public_key TEXT, p_tx_type TEXT,
        p_initial_buy NUMERIC, p_sol_amount NUMERIC, p_bonding_curve_key TEXT,
        p_v_tokens_in_bonding_curve NUMERIC, p_v_sol_in_bonding_curve NUMERIC,
        p_market_cap_sol NUMERIC, p_name TEXT, p_symbol TEXT, p_uri TEXT, p_pool TEXT,
        p_description TEXT, p_twitter TEXT, p_telegram TEXT, p_website TEXT, p_image TEXT,
        p_timestamp BIGINT
    ) RETURNS VOID LANGUAGE sql AS $$
        INSERT INTO tokens (
            signature, mint_address, trader_public_key, tx_type, initial_buy, sol_amount,
            bonding_curve_key, v_tokens_in_bonding_curve, v_sol_in_bonding_curve, market_cap_sol,
            name, symbol, uri, pool, description, twitter, telegram, website, image, timestamp
        ) VALUES (
            p_signature, p_mint_address, p_trader_public_key, p_tx_type, p_initial_buy, p_sol_amount,
            p_bonding_curve_key, p_v_tokens_in_bonding_curve, p_v_sol_in_bonding_curve, p_market_cap_sol,
            p_name, p_symbol, p_uri, p_pool, p_description, p_twitter, p_telegram, p_website, p_image,
            p_timestamp
        )
        ON CONFLICT (mint_address) DO NOTHING
    $$
    "#,
    r#"
    CREATE OR REPLACE FUNCTION insert_migrating_with_prefix(
        p_signature TEXT, p_mint_address TEXT, p_tx_type TEXT, p_market_id TEXT,
        p_market_cap_sol NUMERIC, p_price NUMERIC, p_pool TEXT, p_timestamp BIGINT
    ) RETURNS VOID LANGUAGE sql AS $$
        INSERT INTO migrations (
            signature, mint_address, tx_type, market_id, market_cap_sol, price, pool, timestamp
        ) VALUES (
            p_signature, p_mint_address, p_tx_type, p_market_id, p_market_cap_sol, p_price, p_pool,
            p_timestamp
        )
        ON CONFLICT (signature, mint_address) DO NOTHING
    $$
    "#,
    r#"
    CREATE OR REPLACE FUNCTION insert_trade_with_prefix(
        p_signature TEXT, p_mint_address TEXT, p_trader_public_key TEXT, p_tx_type TEXT,
        p_initial_buy NUMERIC, p_sol_amount NUMERIC, p_bonding_curve_key TEXT,
        p_v_tokens_in_bonding_curve NUMERIC, p_v_sol_in_bonding_curve NUMERIC,
        p_market_cap_sol NUMERIC, p_name TEXT, p_symbol TEXT, p_uri TEXT, p_pool TEXT,
        p_timestamp BIGINT, p_token_amount NUMERIC, p_new_token_balance NUMERIC
    ) RETURNS VOID LANGUAGE sql AS $$
        INSERT INTO trades (
            signature, mint_address, trader_public_key, tx_type, initial_buy, sol_amount,
            bonding_curve_key, v_tokens_in_bonding_curve, v_sol_in_bonding_curve, market_cap_sol,
            name, symbol, uri, pool, timestamp, token_amount, new_token_balance
        ) VALUES (
            p_signature, p_mint_address, p_trader_public_key, p_tx_type, p_initial_buy, p_sol_amount,
            p_bonding_curve_key, p_v_tokens_in_bonding_curve, p_v_sol_in_bonding_curve, p_market_cap_sol,
            p_name, p_symbol, p_uri, p_pool, p_timestamp, p_token_amount, p_new_token_balance
        )
        ON CONFLICT (signature, mint_address) DO NOTHING
    $$
    "#,
];
