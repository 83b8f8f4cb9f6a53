//! Per-node evaluation dispatch.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use quorum_circuit::{Node, ThresholdKind};

use crate::aggregate::aggregate;
use crate::cancel::CancelToken;
use crate::conditional::evaluate_if;
use crate::error::{EvalResult, Fault, SolveError};

/// Evaluate one node under a cancellation token.
///
/// Boxed because gates recurse into children. Cancellation is checked
/// before any work: an already-cancelled token spawns nothing. Plain leaves
/// resolve inline and never suspend; `Not` folds over its child inline; the
/// multi-child gates fan out through the combinators.
pub(crate) fn evaluate(node: Arc<Node>, token: CancelToken) -> BoxFuture<'static, EvalResult> {
    Box::pin(async move {
        if token.is_cancelled() {
            return Err(SolveError::Cancelled);
        }
        match &*node {
            Node::Leaf { value, delay } => leaf(*value, *delay, &token).await,
            Node::Not { child } => Ok(!evaluate(child.clone(), token).await?),
            Node::And { children } => aggregate(children, false, 1, &token).await,
            Node::Or { children } => aggregate(children, true, 1, &token).await,
            Node::Threshold {
                kind,
                threshold,
                children,
            } => {
                if *threshold > children.len() {
                    return Err(Fault::InvalidThreshold {
                        kind: node.kind(),
                        threshold: *threshold,
                        children: children.len(),
                    }
                    .into());
                }
                match kind {
                    // true iff strictly more than `threshold` children are
                    // true: one extra match settles it
                    ThresholdKind::GreaterThan => {
                        aggregate(children, true, threshold + 1, &token).await
                    }
                    // true iff strictly fewer than `threshold` children are
                    // true, i.e. at least len - threshold + 1 are false
                    ThresholdKind::LessThan => {
                        let quota = children.len() - threshold + 1;
                        Ok(!aggregate(children, false, quota, &token).await?)
                    }
                }
            }
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => evaluate_if(condition, then_branch, else_branch, &token).await,
            other => Err(SolveError::Failed(Fault::UnsupportedNode {
                kind: other.kind(),
            })),
        }
    })
}

async fn leaf(value: bool, delay: Option<Duration>, token: &CancelToken) -> EvalResult {
    if let Some(delay) = delay {
        tokio::select! {
            _ = token.cancelled() => return Err(SolveError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
    Ok(value)
}
