use super::retry::{retry, RetryPolicy};
use futures_util::future::try_join_all;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Processes `items` in fixed-size windows to stay under upstream rate limits.
///
/// Items of one window run concurrently, each wrapped in [`retry`] with the
/// default policy. Results come back in input order. The scheduler sleeps
/// `delay` between windows, never after the last one. The first item that
/// still fails after its retries fails the whole call.
pub async fn process_batch<'a, I, T, E, F, Fut>(
    items: &'a [I],
    batch_size: usize,
    delay: Duration,
    processor: F,
) -> Result<Vec<T>, E>
where
    F: Fn(&'a I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let batch_size = batch_size.max(1);
    let policy = &RetryPolicy::default();
    let processor = &processor;
    let total_batches = items.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(items.len());

    for (index, batch) in items.chunks(batch_size).enumerate() {
        debug!("📦 Processing batch {}/{} ({} items)", index + 1, total_batches, batch.len());

        let batch_results = try_join_all(
            batch
                .iter()
                .map(|item| retry(policy, move || processor(item))),
        )
        .await?;
        results.extend(batch_results);

        if index + 1 < total_batches {
            sleep(delay).await;
        }
    }

    Ok(results)
}
