//! Solver front end: submission, registry, global stop.
//!
//! # Blocking lock usage
//!
//! The root-task registry sits behind a `parking_lot::Mutex`: operations
//! are a push or a drain, and the lock is never held across an `.await`.

use parking_lot::Mutex;
use quorum_circuit::Circuit;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::CancelScope;
use crate::eval::evaluate;
use crate::pool::WorkerPool;
use crate::value::ValueHandle;

/// Entry point for concurrent circuit evaluation.
///
/// All submissions share the solver's [`WorkerPool`]. The solver is
/// `Active` until [`Solver::stop`]; stopping cancels every outstanding
/// evaluation and is one-way.
#[derive(Debug)]
pub struct Solver {
    pool: WorkerPool,
    scope: CancelScope,
    roots: Mutex<Vec<JoinHandle<()>>>,
}

impl Solver {
    /// Build a solver over an explicit worker pool.
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            scope: CancelScope::root(),
            roots: Mutex::new(Vec::new()),
        }
    }

    /// Submit a circuit for evaluation.
    ///
    /// Non-blocking: the returned handle resolves once the root gate
    /// settles. Each submission is an independent evaluation instance; the
    /// circuit itself is only read. A stopped solver schedules nothing and
    /// returns an already-cancelled handle.
    pub fn submit(&self, circuit: &Circuit) -> ValueHandle {
        if self.scope.is_cancelled() {
            debug!("submission after stop, returning cancelled handle");
            return ValueHandle::cancelled();
        }

        let scope = CancelScope::child(&self.scope.token());
        let (handle, cell) = ValueHandle::pending();
        let root = circuit.root().clone();
        debug!(kind = %root.kind(), "circuit submitted");

        let task = self.pool.spawn(async move {
            let outcome = evaluate(root, scope.token()).await;
            let _ = cell.send(Some(outcome));
            // the scope lives exactly as long as the evaluation
            drop(scope);
        });

        let mut roots = self.roots.lock();
        roots.retain(|root| !root.is_finished());
        roots.push(task);
        handle
    }

    /// Stop the solver.
    ///
    /// Cancels every outstanding evaluation, waits until their root tasks
    /// have finished, and releases an owned pool. Idempotent: later calls
    /// (and concurrent ones) find nothing left to tear down. Handles that
    /// were pending resolve as cancelled.
    pub async fn stop(&self) {
        debug!("stopping solver");
        self.scope.cancel();

        let drained: Vec<JoinHandle<()>> = self.roots.lock().drain(..).collect();
        for task in &drained {
            task.abort();
        }
        for task in drained {
            let _ = task.await;
        }

        self.pool.shutdown();
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        self.scope.cancel();
        for task in self.roots.lock().drain(..) {
            task.abort();
        }
    }
}
