pub mod api_service;
pub mod ingest_service;

pub use api_service::ApiService;
pub use ingest_service::IngestService;
