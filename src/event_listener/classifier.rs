//! Maps one inbound frame onto the record kinds it satisfies.
//!
//! The three predicates overlap on purpose: a creation frame also carries
//! `signature` and `txType`, so it yields a trade record as well. Whether
//! the second row is wanted is left to the backend's uniqueness rules.

use crate::types::{
    present, ClassifiedFrame, InboundFrame, MigrationEvent, TokenCreationEvent, TradeEvent, METADATA_SENTINEL,
    RAYDIUM_POOL, UNKNOWN_SYMBOL,
};
use rust_decimal::Decimal;

/// Non-empty `name` and `mint`.
pub fn is_creation(frame: &InboundFrame) -> bool {
    present(&frame.name).is_some() && present(&frame.mint).is_some()
}

/// `pool == "raydium"`.
pub fn is_migration(frame: &InboundFrame) -> bool {
    frame.pool.as_deref() == Some(RAYDIUM_POOL)
}

/// Non-empty `signature` and `txType`.
pub fn is_trade(frame: &InboundFrame) -> bool {
    present(&frame.signature).is_some() && present(&frame.tx_type).is_some()
}

/// Builds every record the frame qualifies for, stamped with `timestamp` (epoch ms).
pub fn classify(frame: &InboundFrame, timestamp: i64) -> ClassifiedFrame {
    ClassifiedFrame {
        creation: creation_record(frame, timestamp),
        migration: migration_record(frame, timestamp),
        trade: trade_record(frame, timestamp),
    }
}

pub fn creation_record(frame: &InboundFrame, timestamp: i64) -> Option<TokenCreationEvent> {
    let name = present(&frame.name)?;
    let mint = present(&frame.mint)?;

    Some(TokenCreationEvent {
        signature: frame.signature.clone(),
        mint_address: mint.to_string(),
        trader_public_key: frame.trader_public_key.clone(),
        tx_type: frame.tx_type.clone(),
        initial_buy: frame.initial_buy,
        sol_amount: frame.sol_amount,
        bonding_curve_key: frame.bonding_curve_key.clone(),
        v_tokens_in_bonding_curve: frame.v_tokens_in_bonding_curve,
        v_sol_in_bonding_curve: frame.v_sol_in_bonding_curve,
        market_cap_sol: frame.market_cap_sol,
        name: name.to_string(),
        symbol: symbol_or_unknown(frame),
        uri: present(&frame.uri).map(str::to_string),
        pool: frame.pool.clone(),
        description: METADATA_SENTINEL.to_string(),
        twitter: METADATA_SENTINEL.to_string(),
        telegram: METADATA_SENTINEL.to_string(),
        website: METADATA_SENTINEL.to_string(),
        image: METADATA_SENTINEL.to_string(),
        timestamp,
    })
}

pub fn migration_record(frame: &InboundFrame, timestamp: i64) -> Option<MigrationEvent> {
    if !is_migration(frame) {
        return None;
    }

    Some(MigrationEvent {
        signature: frame.signature.clone(),
        mint_address: frame.mint.clone(),
        tx_type: frame.tx_type.clone(),
        market_id: frame.market_id.clone(),
        market_cap_sol: frame.market_cap_sol,
        price: frame.price,
        pool: RAYDIUM_POOL.to_string(),
        timestamp,
    })
}

pub fn trade_record(frame: &InboundFrame, timestamp: i64) -> Option<TradeEvent> {
    let signature = present(&frame.signature)?;
    let tx_type = present(&frame.tx_type)?;

    // 缺失的数量字段按 0 处理
    Some(TradeEvent {
        signature: signature.to_string(),
        mint_address: frame.mint.clone(),
        trader_public_key: frame.trader_public_key.clone(),
        tx_type: tx_type.to_string(),
        initial_buy: frame.initial_buy.unwrap_or(Decimal::ZERO),
        sol_amount: frame.sol_amount,
        bonding_curve_key: frame.bonding_curve_key.clone(),
        v_tokens_in_bonding_curve: frame.v_tokens_in_bonding_curve,
        v_sol_in_bonding_curve: frame.v_sol_in_bonding_curve,
        market_cap_sol: frame.market_cap_sol,
        name: present(&frame.name).map(str::to_string),
        symbol: symbol_or_unknown(frame),
        uri: present(&frame.uri).map(str::to_string),
        pool: frame.pool.clone(),
        token_amount: frame.token_amount.unwrap_or(Decimal::ZERO),
        new_token_balance: frame.new_token_balance.unwrap_or(Decimal::ZERO),
        timestamp,
    })
}

fn symbol_or_unknown(frame: &InboundFrame) -> String {
    present(&frame.symbol).unwrap_or(UNKNOWN_SYMBOL).to_string()
}
