pub mod handlers;
pub mod routes;

pub use routes::create_router;

use crate::types::IngestStats;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub stats: Arc<IngestStats>,
}

impl ApiState {
    pub fn new(stats: Arc<IngestStats>) -> Self {
        Self { stats }
    }
}
