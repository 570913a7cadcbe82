use serde::Serialize;
use std::collections::HashSet;

/// Outbound control frame of the feed's subscribe protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ControlFrame {
    SubscribeNewToken,
    SubscribeTokenTrade { keys: Vec<String> },
    SubscribeRaydiumLiquidity { keys: Vec<String> },
}

impl ControlFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Accumulated subscription set of the feed connection.
///
/// Subscriptions only ever grow. The set outlives a single socket so that
/// it can be replayed after a reconnect.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    known: HashSet<String>,
    // 按订阅顺序保存，重连时依次重放
    mints: Vec<String>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent once a fresh socket opens.
    pub fn initial_frames(&self) -> Vec<ControlFrame> {
        vec![ControlFrame::SubscribeNewToken]
    }

    /// Records `mint` and returns the trade and liquidity subscriptions for it.
    /// A mint already in the set yields nothing.
    pub fn register(&mut self, mint: &str) -> Vec<ControlFrame> {
        // 已订阅过的 mint 不再重复发送
        if !self.known.insert(mint.to_string()) {
            return Vec::new();
        }
        self.mints.push(mint.to_string());
        Self::token_frames(mint)
    }

    pub fn token_frames(mint: &str) -> Vec<ControlFrame> {
        vec![
            ControlFrame::SubscribeTokenTrade {
                keys: vec![mint.to_string()],
            },
            ControlFrame::SubscribeRaydiumLiquidity {
                keys: vec![mint.to_string()],
            },
        ]
    }

    pub fn contains(&self, mint: &str) -> bool {
        self.known.contains(mint)
    }

    pub fn subscribed_mints(&self) -> &[String] {
        &self.mints
    }

    pub fn len(&self) -> usize {
        self.mints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty()
    }
}
