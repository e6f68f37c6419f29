//! Purpose: Run blocking work items with a fixed upper bound on concurrency.
//! Exports: `run_bounded`, `run_blocking`.
//! Role: Fan-out primitive for table fetches and chunk uploads; keeps blocking I/O off async workers.
//! Invariants: At most `limit` items run at once; results come back in input order.
//! Invariants: The first failure stops scheduling, aborts queued tasks, and is returned.
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::core::error::{Error, ErrorKind};

pub async fn run_bounded<I, T, F>(limit: usize, inputs: Vec<I>, work: F) -> Result<Vec<T>, Error>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Result<T, Error> + Send + Sync + 'static,
{
    let limit = limit.max(1);
    let work = Arc::new(work);
    let mut results: Vec<Option<T>> = Vec::with_capacity(inputs.len());
    results.resize_with(inputs.len(), || None);

    let mut pending = inputs.into_iter().enumerate();
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < limit {
            let Some((index, input)) = pending.next() else {
                break;
            };
            let work = Arc::clone(&work);
            tasks.spawn_blocking(move || (index, work(input)));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (index, outcome) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                tasks.abort_all();
                return Err(Error::new(ErrorKind::Internal)
                    .with_message("worker task failed")
                    .with_source(err));
            }
        };
        match outcome {
            Ok(value) => results[index] = Some(value),
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }

    Ok(results.into_iter().flatten().collect())
}

/// Runs one blocking call on the blocking pool and returns its result.
pub async fn run_blocking<T, F>(work: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("worker task failed")
            .with_source(err)
    })?
}
