pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod event_listener;
pub mod metadata;
pub mod services;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, ConnectionError, FetchError, WriteError};
pub use types::*;
