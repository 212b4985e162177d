use rayon::prelude::*;

use crate::error::MatchError;

/// A fixed-size worker pool for independent tasks with optional worker recycling.
///
/// Tasks are identified by their index and results come back in index order,
/// whatever the scheduling. When `max_tasks_per_worker` is set, tasks run in
/// batches of `num_threads * max_tasks_per_worker` and every batch gets freshly
/// spawned worker threads, which are torn down once the batch is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    num_threads: usize,
    max_tasks_per_worker: Option<usize>,
}

impl WorkerPool {
    /// Create a pool description.
    ///
    /// # Arguments
    ///
    /// * `num_threads` - Number of workers, `None` for the available parallelism.
    /// * `max_tasks_per_worker` - Recycle the workers after this many tasks each,
    ///   `None` to keep them for the whole run.
    pub fn new(
        num_threads: Option<usize>,
        max_tasks_per_worker: Option<usize>,
    ) -> Result<Self, MatchError> {
        let num_threads = match num_threads {
            Some(0) => {
                return Err(MatchError::InvalidParams(
                    "thread count must be > 0".to_string(),
                ))
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        if max_tasks_per_worker == Some(0) {
            return Err(MatchError::InvalidParams(
                "max tasks per worker must be > 0".to_string(),
            ));
        }
        Ok(Self {
            num_threads,
            max_tasks_per_worker,
        })
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Number of tasks handed to one generation of workers.
    pub fn batch_len(&self, num_tasks: usize) -> usize {
        match self.max_tasks_per_worker {
            Some(cap) => self.num_threads.saturating_mul(cap).max(1),
            None => num_tasks.max(1),
        }
    }

    /// Run `task(i)` for every `i` in `0..num_tasks` and block until all are done.
    pub fn map<T, F>(&self, num_tasks: usize, task: F) -> Result<Vec<T>, MatchError>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        let batch_len = self.batch_len(num_tasks);
        let mut results = Vec::with_capacity(num_tasks);

        for start in (0..num_tasks).step_by(batch_len) {
            let end = (start + batch_len).min(num_tasks);

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .thread_name(|i| format!("granni-worker-{i}"))
                .build()
                .map_err(|e| MatchError::ThreadPool(e.to_string()))?;

            log::debug!(
                "dispatching tasks {start}..{end} on {} workers",
                self.num_threads
            );

            let batch = pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(&task)
                    .collect::<Vec<_>>()
            });
            results.extend(batch);
        }

        Ok(results)
    }
}
