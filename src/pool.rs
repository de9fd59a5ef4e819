//! Bounded worker pool for per-file VCS queries.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::cancel::CancellationToken;
use crate::config::ParallelConfig;
use crate::errors::{Error, Result};

/// Runs per-file work on a dedicated rayon pool, one chunk at a time.
///
/// Sequential configurations run on the calling thread.
pub struct WorkerPool {
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self { pool: None });
        }
        let threads = config.effective_concurrency();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gitauthors-worker-{}", i))
            .build()
            .map_err(|e| Error::Configuration(format!("cannot start worker pool: {}", e)))?;
        log::debug!("started worker pool with {} threads", threads);
        Ok(Self { pool: Some(pool) })
    }

    pub fn sequential() -> Self {
        Self { pool: None }
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Apply `f` to every item, submitting `chunk_size` items at a time.
    ///
    /// Results keep the order of `items`. Cancellation is checked between
    /// chunks; work already submitted runs to completion.
    pub fn map_chunked<T, R, F>(
        &self,
        items: &[T],
        chunk_size: usize,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let mut results = Vec::with_capacity(items.len());
        for chunk in items.chunks(chunk_size.max(1)) {
            cancel.check()?;
            match &self.pool {
                Some(pool) => {
                    let part: Vec<R> = pool.install(|| chunk.par_iter().map(&f).collect());
                    results.extend(part);
                }
                None => results.extend(chunk.iter().map(&f)),
            }
        }
        cancel.check()?;
        Ok(results)
    }
}
