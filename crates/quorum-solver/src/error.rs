//! Outcome and error taxonomy for circuit evaluation.
//!
//! Evaluation of a node produces exactly one of three things: a boolean, a
//! cancellation, or a fault. Internally that is `Result<bool, SolveError>`
//! so combinators propagate cancellation and faults alike with `?`.

use quorum_circuit::NodeKind;
use tokio::task::JoinError;

/// Result of evaluating one node.
pub(crate) type EvalResult = Result<bool, SolveError>;

/// An unexpected fault during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// The node's kind is outside the set this engine evaluates.
    #[error("unsupported node kind `{kind}`")]
    UnsupportedNode { kind: NodeKind },

    /// A threshold gate violating the construction invariants reached
    /// evaluation.
    #[error("{kind} threshold {threshold} exceeds child count {children}")]
    InvalidThreshold {
        kind: NodeKind,
        threshold: usize,
        children: usize,
    },

    /// An evaluation task panicked.
    #[error("evaluation task panicked: {message}")]
    TaskPanicked { message: String },
}

/// Why a value handle carries no boolean.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// The evaluation was cancelled before it resolved, either by an
    /// ancestor's short-circuit decision or by [`Solver::stop`].
    ///
    /// [`Solver::stop`]: crate::Solver::stop
    #[error("evaluation was cancelled before it resolved")]
    Cancelled,

    /// The evaluation hit a fault; the first fault in a subtree wins.
    #[error("evaluation failed: {0}")]
    Failed(#[from] Fault),
}

impl SolveError {
    /// True for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SolveError::Cancelled)
    }

    /// Fold a task join error into the outcome alphabet: a panicked task is
    /// a fault, an aborted one was cancelled.
    pub(crate) fn from_join(error: JoinError) -> Self {
        if error.is_panic() {
            let payload = error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_owned());
            SolveError::Failed(Fault::TaskPanicked { message })
        } else {
            SolveError::Cancelled
        }
    }
}
