use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("failed to parse configuration {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Socket-level failures of the upstream feed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket connect to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("websocket error: {0}")]
    Socket(String),

    #[error("websocket connection closed")]
    Closed,

    #[error("subscription replay failed: {0}")]
    Replay(String),
}

/// Metadata resolution failures. Recovered by keeping the default fields.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("uri {0} does not contain the ipfs gateway marker")]
    MissingGatewayMarker(String),

    #[error("metadata request failed: {0}")]
    Request(String),

    #[error("metadata gateway returned status {0}")]
    Status(u16),

    #[error("metadata document could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Backend write failures, split by whether a retry can help.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("transient backend failure: {0}")]
    Transient(String),

    #[error("backend rejected write: {0}")]
    Rejected(String),
}

impl WriteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, WriteError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            WriteError::Transient(msg) | WriteError::Rejected(msg) => msg,
        }
    }
}
