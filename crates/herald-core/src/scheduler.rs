//! Bounded worker pool over a list of tasks.
//!
//! A fixed number of cooperative workers share one cursor into the task
//! list. Each worker claims the next unclaimed index, runs it to completion
//! and loops until the list is exhausted, so at most `concurrency` tasks are
//! in flight at any time.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

/// Default ceiling on concurrently processed domains.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Run `run` over every task with at most `concurrency` in flight.
///
/// Results come back in task order, regardless of completion order. When
/// `cancel` fires, workers stop claiming tasks and abandon the ones in
/// flight; only finished tasks contribute a result.
pub async fn run_bounded<T, R, F, Fut>(
    tasks: Vec<T>,
    concurrency: usize,
    cancel: &CancellationToken,
    run: F,
) -> Vec<R>
where
    T: Clone,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    if tasks.is_empty() {
        return Vec::new();
    }

    let cursor = AtomicUsize::new(0);
    let worker_count = concurrency.max(1).min(tasks.len());

    let workers = (0..worker_count).map(|worker_id| {
        let cursor = &cursor;
        let tasks = &tasks;
        let run = &run;
        async move {
            let mut finished = Vec::new();
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(task) = tasks.get(index) else {
                    break;
                };
                tracing::trace!(worker_id, index, "Worker claimed task");

                tokio::select! {
                    result = run(index, task.clone()) => finished.push((index, result)),
                    () = cancel.cancelled() => break,
                }
            }
            finished
        }
    });

    let mut results: Vec<(usize, R)> = join_all(workers).await.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
