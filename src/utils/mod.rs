pub mod batch;
pub mod retry;
pub mod validation;

pub use batch::process_batch;
pub use retry::{retry, retry_if, RetryPolicy};
pub use validation::is_valid_token_name;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
