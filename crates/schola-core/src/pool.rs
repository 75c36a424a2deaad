//! Submit-and-join worker pools used by the parallel strategy

use crate::config::EngineConfig;
use crate::errors::{CommandError, Result};

/// Work item borrowing from the caller's stack
pub type PoolTask<'a> = Box<dyn FnOnce() + Send + 'a>;

pub trait WorkerPool: Send + Sync {
    /// Run every task and return once all of them finished.
    ///
    /// Tasks are submitted in vector order; completion order is unspecified.
    fn run_all<'a>(&self, tasks: Vec<PoolTask<'a>>);
}

/// Pool backed by a dedicated rayon thread pool
pub struct RayonWorkerPool {
    pool: rayon::ThreadPool,
}

impl RayonWorkerPool {
    /// # Errors
    ///
    /// `WorkerPool` if rayon cannot spawn the threads.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let prefix = config.thread_name_prefix.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| CommandError::WorkerPool {
                message: e.to_string(),
            })?;
        tracing::debug!(threads = pool.current_num_threads(), "worker pool started");
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl WorkerPool for RayonWorkerPool {
    fn run_all<'a>(&self, tasks: Vec<PoolTask<'a>>) {
        self.pool.scope(|scope| {
            for task in tasks {
                scope.spawn(move |_| task());
            }
        });
    }
}

/// Runs tasks one after another on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineWorkerPool;

impl WorkerPool for InlineWorkerPool {
    fn run_all<'a>(&self, tasks: Vec<PoolTask<'a>>) {
        for task in tasks {
            task();
        }
    }
}
