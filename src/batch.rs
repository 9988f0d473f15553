// =============================================================================
// BULK OPERATIONS
// =============================================================================
// A bulk request is a set of independent item operations. Items are
// dispatched concurrently and each one succeeds or fails on its own; the
// caller gets a report with both lists instead of an all-or-nothing error.
// =============================================================================

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::AppResult;
use crate::metrics;
use crate::models::{BatchFailure, BatchReport};

/// Items in flight at once; stays below the database pool size
pub const MAX_CONCURRENCY: usize = 8;

/// Run `task` for every id and collect the outcomes.
///
/// Both lists in the report keep the order of `ids`. An item whose task
/// panics is reported as failed.
pub async fn fan_out<F, Fut, T>(operation: &'static str, ids: Vec<String>, task: F) -> BatchReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENCY));
    let mut set = JoinSet::new();

    for (index, id) in ids.iter().enumerate() {
        let permits = permits.clone();
        let item = task(id.clone());
        set.spawn(async move {
            // Err only once the semaphore is closed, which never happens here
            let _permit = permits.acquire_owned().await;
            (index, item.await.map(|_| ()))
        });
    }

    let mut outcomes: Vec<Option<Result<(), String>>> = vec![None; ids.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => {
                outcomes[index] = Some(result.map_err(|err| err.to_string()));
            }
            // A panicked item leaves its slot empty
            Err(join_error) => {
                tracing::error!(operation, error = %join_error, "Bulk item task failed");
            }
        }
    }

    let mut report = BatchReport::default();
    for (id, outcome) in ids.into_iter().zip(outcomes) {
        match outcome.unwrap_or_else(|| Err("task did not complete".to_string())) {
            Ok(()) => {
                metrics::record_batch_item(operation, true);
                report.succeeded.push(id);
            }
            Err(error) => {
                metrics::record_batch_item(operation, false);
                report.failed.push(BatchFailure { id, error });
            }
        }
    }
    report.succeeded_count = report.succeeded.len();
    report.failed_count = report.failed.len();

    if report.failed_count > 0 {
        tracing::warn!(
            operation,
            succeeded = report.succeeded_count,
            failed = report.failed_count,
            "Bulk operation finished with failures"
        );
    } else {
        tracing::info!(operation, succeeded = report.succeeded_count, "Bulk operation finished");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::time::Duration;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_per_item() {
        let report = fan_out("test", ids(&["1", "2", "3", "4"]), |id| async move {
            if id == "2" || id == "4" {
                Err(AppError::NotFound(format!("Product not found: {id}")))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.succeeded, ids(&["1", "3"]));
        assert_eq!(report.succeeded_count, 2);
        assert_eq!(report.failed_count, 2);
        assert_eq!(report.failed[0].id, "2");
        assert!(report.failed[0].error.contains("Product not found"));
    }

    #[tokio::test]
    async fn test_order_is_stable_regardless_of_completion() {
        let report = fan_out("test", ids(&["30", "20", "10"]), |id| async move {
            let delay: u64 = id.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, AppError>(delay)
        })
        .await;

        assert_eq!(report.succeeded, ids(&["30", "20", "10"]));
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = fan_out("test", Vec::new(), |_| async { Ok::<_, AppError>(()) }).await;
        assert_eq!(report.succeeded_count, 0);
        assert_eq!(report.failed_count, 0);
    }
}
