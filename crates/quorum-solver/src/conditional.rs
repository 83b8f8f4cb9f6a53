//! Speculative conditional evaluation.
//!
//! Either branch may be cheaper than the condition, and the branches may
//! agree outright, so all three children run concurrently. The gate settles
//! through whichever route is determined first: the condition selecting a
//! branch, or both branches agreeing and making the condition irrelevant.
//! What the gate resolves to is a function of the children's values and
//! faults alone; arrival order only changes how soon it resolves.

use std::sync::Arc;

use quorum_circuit::Node;
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

use crate::cancel::{CancelScope, CancelToken};
use crate::error::{EvalResult, Fault, SolveError};
use crate::eval::evaluate;

type Joined = Result<EvalResult, JoinError>;

/// Terminal state of a child evaluation.
#[derive(Debug, Clone)]
enum Settled {
    Value(bool),
    Fault(Fault),
}

impl Settled {
    fn into_result(self) -> EvalResult {
        match self {
            Settled::Value(value) => Ok(value),
            Settled::Fault(fault) => Err(fault.into()),
        }
    }
}

#[derive(Debug)]
enum Progress {
    Pending,
    Done(Settled),
}

impl Progress {
    fn is_pending(&self) -> bool {
        matches!(self, Progress::Pending)
    }

    fn value(&self) -> Option<bool> {
        match self {
            Progress::Done(Settled::Value(value)) => Some(*value),
            _ => None,
        }
    }
}

/// One speculatively evaluated child: its cancellation domain, its task,
/// and what we have seen of it so far.
#[derive(Debug)]
struct Speculation {
    scope: CancelScope,
    task: JoinHandle<EvalResult>,
    progress: Progress,
}

impl Speculation {
    fn spawn(node: &Arc<Node>, parent: &CancelToken) -> Self {
        let scope = CancelScope::child(parent);
        let task = tokio::spawn(evaluate(node.clone(), scope.token()));
        Self {
            scope,
            task,
            progress: Progress::Pending,
        }
    }

    /// This child's result is no longer needed.
    fn discard(&self) {
        self.scope.cancel();
        self.task.abort();
    }

    /// Await this child as the gate's outcome.
    async fn outcome(mut self, token: &CancelToken) -> EvalResult {
        match &self.progress {
            Progress::Done(settled) => settled.clone().into_result(),
            Progress::Pending => tokio::select! {
                _ = token.cancelled() => Err(SolveError::Cancelled),
                joined = &mut self.task => settle(joined)?.into_result(),
            },
        }
    }
}

impl Drop for Speculation {
    // A dropped frame must not leave children in flight.
    fn drop(&mut self) {
        self.scope.cancel();
        self.task.abort();
    }
}

/// Fold a joined child into the settled alphabet; ancestor cancellation
/// (reported or via abort) propagates as `Err`.
fn settle(joined: Joined) -> Result<Settled, SolveError> {
    match joined {
        Ok(Ok(value)) => Ok(Settled::Value(value)),
        Ok(Err(SolveError::Cancelled)) => Err(SolveError::Cancelled),
        Ok(Err(SolveError::Failed(fault))) => Ok(Settled::Fault(fault)),
        Err(join_error) => match SolveError::from_join(join_error) {
            SolveError::Failed(fault) => Ok(Settled::Fault(fault)),
            SolveError::Cancelled => Err(SolveError::Cancelled),
        },
    }
}

/// Evaluate a conditional gate with all three children in flight.
pub(crate) async fn evaluate_if(
    condition: &Arc<Node>,
    then_branch: &Arc<Node>,
    else_branch: &Arc<Node>,
    token: &CancelToken,
) -> EvalResult {
    let mut cond = Speculation::spawn(condition, token);
    let mut then = Speculation::spawn(then_branch, token);
    let mut other = Speculation::spawn(else_branch, token);

    enum Event {
        Cancelled,
        Cond(Joined),
        Then(Joined),
        Else(Joined),
    }

    loop {
        let event = tokio::select! {
            _ = token.cancelled() => Event::Cancelled,
            joined = &mut cond.task, if cond.progress.is_pending() => Event::Cond(joined),
            joined = &mut then.task, if then.progress.is_pending() => Event::Then(joined),
            joined = &mut other.task, if other.progress.is_pending() => Event::Else(joined),
        };
        match event {
            // Dropping the speculations cancels their scopes.
            Event::Cancelled => return Err(SolveError::Cancelled),
            Event::Cond(joined) => cond.progress = Progress::Done(settle(joined)?),
            Event::Then(joined) => then.progress = Progress::Done(settle(joined)?),
            Event::Else(joined) => other.progress = Progress::Done(settle(joined)?),
        }

        // Agreeing branches settle the gate without the condition.
        if let (Some(t), Some(e)) = (then.progress.value(), other.progress.value()) {
            if t == e {
                trace!(value = t, "branches agree, condition irrelevant");
                cond.discard();
                return Ok(t);
            }
            // Disagreement: only the condition can pick a side.
        }

        match &cond.progress {
            Progress::Done(Settled::Value(selector)) => {
                let selector = *selector;
                let (selected, unselected) = if selector { (then, other) } else { (other, then) };
                unselected.discard();
                trace!(condition = selector, "condition resolved, following selected branch");
                return selected.outcome(token).await;
            }
            Progress::Done(Settled::Fault(fault)) => {
                let fault = fault.clone();
                return agreement_or_fault(then, other, fault, token).await;
            }
            Progress::Pending => {}
        }
    }
}

/// The condition failed. Branch agreement is the only route left; anything
/// short of two equal branch values surfaces the condition's fault.
async fn agreement_or_fault(
    mut then: Speculation,
    mut other: Speculation,
    fault: Fault,
    token: &CancelToken,
) -> EvalResult {
    enum Event {
        Cancelled,
        Then(Joined),
        Else(Joined),
    }

    loop {
        match (&then.progress, &other.progress) {
            (Progress::Done(Settled::Value(t)), Progress::Done(Settled::Value(e))) => {
                return if t == e { Ok(*t) } else { Err(fault.into()) };
            }
            (Progress::Done(Settled::Fault(_)), _) | (_, Progress::Done(Settled::Fault(_))) => {
                then.discard();
                other.discard();
                return Err(fault.into());
            }
            _ => {}
        }

        let event = tokio::select! {
            _ = token.cancelled() => Event::Cancelled,
            joined = &mut then.task, if then.progress.is_pending() => Event::Then(joined),
            joined = &mut other.task, if other.progress.is_pending() => Event::Else(joined),
        };
        match event {
            Event::Cancelled => return Err(SolveError::Cancelled),
            Event::Then(joined) => then.progress = Progress::Done(settle(joined)?),
            Event::Else(joined) => other.progress = Progress::Done(settle(joined)?),
        }
    }
}
