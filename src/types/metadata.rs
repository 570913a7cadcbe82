use super::events::TokenCreationEvent;
use serde::{Deserialize, Deserializer};

/// Off-chain token metadata document served by the IPFS gateway.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenMetadataDocument {
    #[serde(default, deserialize_with = "string_only")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub telegram: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub image: Option<String>,
}

impl TokenMetadataDocument {
    /// Copies every non-empty field onto the token, leaving defaults in place otherwise.
    pub fn apply_to(&self, token: &mut TokenCreationEvent) {
        overwrite(&mut token.description, &self.description);
        overwrite(&mut token.twitter, &self.twitter);
        overwrite(&mut token.telegram, &self.telegram);
        overwrite(&mut token.website, &self.website);
        overwrite(&mut token.image, &self.image);
    }
}

fn overwrite(target: &mut String, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        *target = value.to_string();
    }
}

fn string_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::events::METADATA_SENTINEL;

    fn token() -> TokenCreationEvent {
        TokenCreationEvent {
            signature: None,
            mint_address: "M1".to_string(),
            trader_public_key: None,
            tx_type: None,
            initial_buy: None,
            sol_amount: None,
            bonding_curve_key: None,
            v_tokens_in_bonding_curve: None,
            v_sol_in_bonding_curve: None,
            market_cap_sol: None,
            name: "Foo".to_string(),
            symbol: "FOO".to_string(),
            uri: None,
            pool: None,
            description: METADATA_SENTINEL.to_string(),
            twitter: METADATA_SENTINEL.to_string(),
            telegram: METADATA_SENTINEL.to_string(),
            website: METADATA_SENTINEL.to_string(),
            image: METADATA_SENTINEL.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_only_non_empty_fields_overwrite() {
        let doc: TokenMetadataDocument = serde_json::from_str(
            r#"{"name": "Foo", "description": "X", "twitter": "", "website": 42, "image": "https://img"}"#,
        )
        .unwrap();

        let mut token = token();
        doc.apply_to(&mut token);

        assert_eq!(token.description, "X");
        assert_eq!(token.twitter, METADATA_SENTINEL);
        assert_eq!(token.telegram, METADATA_SENTINEL);
        assert_eq!(token.website, METADATA_SENTINEL);
        assert_eq!(token.image, "https://img");
    }
}
