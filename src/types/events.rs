use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder for enrichment fields the metadata document did not supply.
pub const METADATA_SENTINEL: &str = "N/A";
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
/// Pool tag of frames that announce a token's liquidity migration.
pub const RAYDIUM_POOL: &str = "raydium";

/// A freshly minted token. `mint_address` is the natural dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreationEvent {
    pub signature: Option<String>,
    pub mint_address: String,
    pub trader_public_key: Option<String>,
    pub tx_type: Option<String>,
    pub initial_buy: Option<Decimal>,
    pub sol_amount: Option<Decimal>,
    pub bonding_curve_key: Option<String>,
    pub v_tokens_in_bonding_curve: Option<Decimal>,
    pub v_sol_in_bonding_curve: Option<Decimal>,
    pub market_cap_sol: Option<Decimal>,
    pub name: String,
    pub symbol: String,
    pub uri: Option<String>,
    pub pool: Option<String>,
    pub description: String,
    pub twitter: String,
    pub telegram: String,
    pub website: String,
    pub image: String,
    /// Ingestion time, epoch milliseconds.
    pub timestamp: i64,
}

/// Liquidity for a token entering the Raydium pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEvent {
    pub signature: Option<String>,
    pub mint_address: Option<String>,
    pub tx_type: Option<String>,
    pub market_id: Option<String>,
    pub market_cap_sol: Option<Decimal>,
    pub price: Option<Decimal>,
    pub pool: String,
    pub timestamp: i64,
}

/// A buy, sell or create transaction on a tracked token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub signature: String,
    pub mint_address: Option<String>,
    pub trader_public_key: Option<String>,
    pub tx_type: String,
    pub initial_buy: Decimal,
    pub sol_amount: Option<Decimal>,
    pub bonding_curve_key: Option<String>,
    pub v_tokens_in_bonding_curve: Option<Decimal>,
    pub v_sol_in_bonding_curve: Option<Decimal>,
    pub market_cap_sol: Option<Decimal>,
    pub name: Option<String>,
    pub symbol: String,
    pub uri: Option<String>,
    pub pool: Option<String>,
    pub token_amount: Decimal,
    pub new_token_balance: Decimal,
    pub timestamp: i64,
}

/// Everything one inbound frame produced. Kinds overlap: a creation frame
/// usually also carries a trade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedFrame {
    pub creation: Option<TokenCreationEvent>,
    pub migration: Option<MigrationEvent>,
    pub trade: Option<TradeEvent>,
}

impl ClassifiedFrame {
    pub fn is_empty(&self) -> bool {
        self.creation.is_none() && self.migration.is_none() && self.trade.is_none()
    }

    pub fn record_count(&self) -> usize {
        self.creation.is_some() as usize + self.migration.is_some() as usize + self.trade.is_some() as usize
    }
}
