//! Bounded parallel execution for independent work items

use futures::{stream::FuturesUnordered, Future, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Context provided to each item in a batch
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    /// Item number (1-indexed for display)
    pub task_number: usize,
    /// Total number of items in this batch
    pub total_tasks: usize,
}

/// Execute items with at most `concurrency` running at once
///
/// Every item runs to completion: a failing item does not stop its siblings,
/// the executor's output (usually a `Result`) is returned as-is.
///
/// # Returns
/// Outputs in input order, regardless of completion order
///
/// # Example
/// ```rust,ignore
/// let outputs = execute_batch(specs, 3, |spec, ctx| async move {
///     generator.generate(&spec, &context, &cancel).await
/// })
/// .await;
/// ```
pub async fn execute_batch<T, F, Fut, R>(items: Vec<T>, concurrency: usize, executor: F) -> Vec<R>
where
    F: Fn(T, TaskContext) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let executor = &executor;
    let mut tasks = FuturesUnordered::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let ctx = TaskContext {
            task_number: idx + 1,
            total_tasks: total,
        };

        tasks.push(async move {
            // Waits while `concurrency` items are running; the semaphore is never closed
            let _permit = sem.acquire().await.ok();
            (idx, executor(item, ctx).await)
        });
    }

    let mut outputs = Vec::with_capacity(total);
    while let Some(output) = tasks.next().await {
        outputs.push(output);
    }

    outputs.sort_by_key(|(idx, _)| *idx);
    outputs.into_iter().map(|(_, output)| output).collect()
}
