use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One decoded message from the upstream feed.
///
/// The feed never guarantees which keys are present, so every field is
/// optional. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    #[serde(default, deserialize_with = "lenient_string")]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mint: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trader_public_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tx_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub initial_buy: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub sol_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bonding_curve_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub v_tokens_in_bonding_curve: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub v_sol_in_bonding_curve: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub market_cap_sol: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pool: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub token_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub new_token_balance: Option<Decimal>,
}

impl InboundFrame {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Non-empty string value of an optional field.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Accepts strings as-is and stringifies numbers; anything else becomes `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts JSON numbers and numeric strings; anything unparseable becomes `None`.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(serde_json::Value::String(s)) => parse_decimal(s.trim()),
        _ => None,
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decode_creation_frame() {
        let frame = InboundFrame::from_json(
            r#"{
                "signature": "5Kx",
                "mint": "M1",
                "traderPublicKey": "Trader1",
                "txType": "create",
                "initialBuy": 61616161.5,
                "solAmount": 1.75,
                "bondingCurveKey": "Curve1",
                "vTokensInBondingCurve": 1011383838.5,
                "vSolInBondingCurve": 31.75,
                "marketCapSol": 31.39,
                "name": "Pixel Dragons",
                "symbol": "PXD",
                "uri": "https://ipfs.io/ipfs/QmHash",
                "pool": "pump",
                "somethingNew": {"nested": true}
            }"#,
        )
        .unwrap();

        assert_eq!(frame.mint.as_deref(), Some("M1"));
        assert_eq!(frame.tx_type.as_deref(), Some("create"));
        assert_eq!(frame.sol_amount, Some(Decimal::from_str("1.75").unwrap()));
        assert_eq!(frame.market_cap_sol, Some(Decimal::from_str("31.39").unwrap()));
        assert_eq!(frame.pool.as_deref(), Some("pump"));
        assert!(frame.token_amount.is_none());
    }

    #[test]
    fn test_lenient_field_types() {
        let frame = InboundFrame::from_json(
            r#"{"marketId": 12345, "price": "0.000042", "solAmount": null, "name": ["x"], "tokenAmount": 1e3}"#,
        )
        .unwrap();

        assert_eq!(frame.market_id.as_deref(), Some("12345"));
        assert_eq!(frame.price, Some(Decimal::from_str("0.000042").unwrap()));
        assert!(frame.sol_amount.is_none());
        assert!(frame.name.is_none());
        assert_eq!(frame.token_amount, Some(Decimal::from(1000)));
    }

    #[test]
    fn test_non_object_frames_are_rejected() {
        assert!(InboundFrame::from_json("not json").is_err());
        assert!(InboundFrame::from_json("\"Successfully subscribed\"").is_err());
        assert!(InboundFrame::from_json("42").is_err());
    }

    #[test]
    fn test_present_ignores_empty_strings() {
        assert_eq!(present(&Some("x".to_string())), Some("x"));
        assert_eq!(present(&Some(String::new())), None);
        assert_eq!(present(&None), None);
    }
}
