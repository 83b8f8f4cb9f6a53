//! Caller-facing handle to one evaluation's eventual outcome.

use tokio::sync::watch;

use crate::error::SolveError;

type Outcome = Option<Result<bool, SolveError>>;

/// Producer side of a handle; the root evaluation task publishes exactly
/// once.
pub(crate) type OutcomeCell = watch::Sender<Outcome>;

/// Handle to one submitted circuit evaluation.
///
/// Starts pending and settles exactly once. Clones observe the same
/// outcome, and reads after settlement return it again without blocking.
#[derive(Debug, Clone)]
pub struct ValueHandle {
    outcome: watch::Receiver<Outcome>,
}

impl ValueHandle {
    pub(crate) fn pending() -> (Self, OutcomeCell) {
        let (tx, rx) = watch::channel(None);
        (Self { outcome: rx }, tx)
    }

    /// A handle that was cancelled before any work was scheduled, handed
    /// out by a stopped solver.
    pub(crate) fn cancelled() -> Self {
        let (tx, rx) = watch::channel(Some(Err(SolveError::Cancelled)));
        drop(tx);
        Self { outcome: rx }
    }

    /// Await the outcome.
    ///
    /// Resolves with the circuit's boolean, or with
    /// [`SolveError::Cancelled`] when the evaluation was cancelled (by a
    /// short-circuiting ancestor or by [`Solver::stop`]), or with
    /// [`SolveError::Failed`] on a fault. Safe to call repeatedly and from
    /// multiple clones.
    ///
    /// [`Solver::stop`]: crate::Solver::stop
    pub async fn value(&self) -> Result<bool, SolveError> {
        let mut outcome = self.outcome.clone();
        loop {
            if let Some(result) = outcome.borrow_and_update().clone() {
                return result;
            }
            // The producer dropping without publishing is a hard teardown;
            // report it as cancellation, never hang.
            if outcome.changed().await.is_err() {
                return Err(SolveError::Cancelled);
            }
        }
    }

    /// Block the calling thread on [`ValueHandle::value`].
    ///
    /// For callers outside any async context. Must not be called from a
    /// worker of the pool evaluating this circuit.
    pub fn wait(&self) -> Result<bool, SolveError> {
        futures::executor::block_on(self.value())
    }

    /// The outcome if already settled, without blocking.
    pub fn try_value(&self) -> Option<Result<bool, SolveError>> {
        self.outcome.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once_published() {
        let (handle, cell) = ValueHandle::pending();
        assert_eq!(handle.try_value(), None);

        let _ = cell.send(Some(Ok(true)));
        assert_eq!(handle.value().await, Ok(true));
    }

    #[tokio::test]
    async fn repeated_reads_return_the_same_outcome() {
        let (handle, cell) = ValueHandle::pending();
        let _ = cell.send(Some(Ok(false)));

        assert_eq!(handle.value().await, Ok(false));
        assert_eq!(handle.value().await, Ok(false));
        assert_eq!(handle.try_value(), Some(Ok(false)));
    }

    #[tokio::test]
    async fn clones_observe_the_same_outcome() {
        let (handle, cell) = ValueHandle::pending();
        let observer = handle.clone();

        let _ = cell.send(Some(Ok(true)));
        assert_eq!(handle.value().await, Ok(true));
        assert_eq!(observer.value().await, Ok(true));
    }

    #[tokio::test]
    async fn outcome_survives_the_producer() {
        let (handle, cell) = ValueHandle::pending();
        let _ = cell.send(Some(Ok(true)));
        drop(cell);
        assert_eq!(handle.value().await, Ok(true));
    }

    #[tokio::test]
    async fn dropped_producer_reads_as_cancellation() {
        let (handle, cell) = ValueHandle::pending();
        drop(cell);
        assert_eq!(handle.value().await, Err(SolveError::Cancelled));
    }

    #[tokio::test]
    async fn pre_cancelled_handle_is_already_settled() {
        let handle = ValueHandle::cancelled();
        assert_eq!(handle.try_value(), Some(Err(SolveError::Cancelled)));
        assert_eq!(handle.value().await, Err(SolveError::Cancelled));
    }

    #[test]
    fn wait_blocks_outside_async_contexts() {
        let (handle, cell) = ValueHandle::pending();
        let _ = cell.send(Some(Ok(true)));
        assert_eq!(handle.wait(), Ok(true));
    }
}
