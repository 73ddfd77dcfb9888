//! Rayon thread pool sizing for solver workloads.
//!
//! Star-option solves and sampling trials run inside [WorkerPool::install] or a
//! [PoolSession]; with `workers == 0` they share Rayon's global pool (one thread per core).

use log::warn;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// How many worker threads a parallel solve may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use the Rayon global pool.
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Build the threads once for a run that installs work repeatedly.
    ///
    /// If the OS refuses the threads, the session falls back to the global pool.
    pub fn session(&self) -> PoolSession {
        if self.workers == 0 {
            return PoolSession { threads: None };
        }
        match ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => PoolSession {
                threads: Some(pool),
            },
            Err(err) => {
                warn!(
                    "could not build a {}-thread pool ({err}); using the global pool",
                    self.workers
                );
                PoolSession { threads: None }
            }
        }
    }

    /// Run `f` once on a pool of [workers](WorkerPool::workers) threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.session().install(f)
    }
}

/// Threads built by [WorkerPool::session], reused by every `install` on it.
#[derive(Debug)]
pub struct PoolSession {
    threads: Option<ThreadPool>,
}

impl PoolSession {
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.threads {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}
