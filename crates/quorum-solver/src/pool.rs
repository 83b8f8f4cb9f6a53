//! Bounded worker pool.
//!
//! Evaluation work is scheduled as tasks on a fixed set of worker threads,
//! never as one thread per node, so worker count stays flat no matter how
//! wide or deep a circuit is. The pool is explicit state handed to
//! [`Solver::new`](crate::Solver::new) rather than an ambient singleton.

use std::future::Future;
use std::io;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// A bounded set of worker threads shared by every evaluation the solver
/// runs.
///
/// Either owns a dedicated runtime ([`WorkerPool::new`]) or attaches to one
/// the caller already runs ([`WorkerPool::attach`] /
/// [`WorkerPool::current`]). An attached pool borrows capacity; shutting the
/// solver down releases only what the pool owns.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
}

impl WorkerPool {
    /// Build a pool owning `workers` dedicated worker threads.
    pub fn new(workers: usize) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name("quorum-worker")
            .enable_time()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
        })
    }

    /// Attach to an existing runtime; the pool schedules onto it and owns
    /// none of its threads.
    pub fn attach(handle: Handle) -> Self {
        Self {
            runtime: Mutex::new(None),
            handle,
        }
    }

    /// Attach to the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn current() -> Self {
        Self::attach(Handle::current())
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Release an owned runtime. Idempotent; a no-op for attached pools.
    ///
    /// Callers tear down tasks first (see [`Solver::stop`]), so the owned
    /// runtime is idle here and a background shutdown frees its threads
    /// without blocking the calling context.
    ///
    /// [`Solver::stop`]: crate::Solver::stop
    pub(crate) fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_pool_runs_tasks() {
        let pool = WorkerPool::new(2).unwrap();
        let task = pool.spawn(async { 21 * 2 });
        assert_eq!(futures::executor::block_on(task).unwrap(), 42);
    }

    #[tokio::test]
    async fn attached_pool_schedules_onto_current_runtime() {
        let pool = WorkerPool::current();
        let task = pool.spawn(async { "scheduled" });
        assert_eq!(task.await.unwrap(), "scheduled");
    }

    #[test]
    fn shutdown_is_idempotent() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown();
        pool.shutdown();
    }

    #[test]
    fn zero_workers_still_builds_a_pool() {
        let pool = WorkerPool::new(0).unwrap();
        let task = pool.spawn(async { 1 });
        assert_eq!(futures::executor::block_on(task).unwrap(), 1);
    }
}
