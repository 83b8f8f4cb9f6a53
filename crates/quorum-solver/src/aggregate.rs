//! Quota aggregation over concurrently evaluated children.

use std::sync::Arc;

use quorum_circuit::Node;
use tokio::task::JoinSet;
use tracing::trace;

use crate::cancel::{CancelScope, CancelToken};
use crate::error::{EvalResult, SolveError};
use crate::eval::evaluate;

/// Count children resolving to `target` until `quota` of them were seen or
/// the quota became unreachable.
///
/// Returns `Ok(target)` the moment `quota` matching children resolved, and
/// `Ok(!target)` the moment the children still outstanding cannot reach it
/// any more; both decisions cancel every child still in flight. Outcomes
/// are consumed in completion order, so the fastest children decide how
/// soon a gate settles, but the result itself depends only on the child
/// values, never on their order.
///
/// `And` is `target = false, quota = 1`; `Or` is `target = true,
/// quota = 1`; the threshold gates pick quotas from their threshold.
pub(crate) async fn aggregate(
    children: &[Arc<Node>],
    target: bool,
    quota: usize,
    token: &CancelToken,
) -> EvalResult {
    let mut remaining = children.len();
    if quota == 0 {
        return Ok(target);
    }
    if quota > remaining {
        return Ok(!target);
    }

    let scope = CancelScope::child(token);
    let mut tasks = JoinSet::new();
    for child in children {
        tasks.spawn(evaluate(child.clone(), scope.token()));
    }

    let mut matches = 0usize;
    loop {
        let joined = tokio::select! {
            _ = token.cancelled() => {
                scope.cancel();
                return Err(SolveError::Cancelled);
            }
            joined = tasks.join_next() => joined,
        };
        let Some(joined) = joined else {
            // every child consumed without reaching the quota
            return Ok(!target);
        };
        remaining -= 1;
        match joined {
            Ok(Ok(value)) => {
                if value == target {
                    matches += 1;
                }
                if matches >= quota {
                    trace!(matches, remaining, "quota met, cancelling remaining children");
                    scope.cancel();
                    return Ok(target);
                }
                if matches + remaining < quota {
                    trace!(
                        matches,
                        remaining,
                        quota,
                        "quota unreachable, cancelling remaining children"
                    );
                    scope.cancel();
                    return Ok(!target);
                }
            }
            // A child reports cancellation only when an ancestor domain was
            // cancelled; fold it into our own cancellation.
            Ok(Err(SolveError::Cancelled)) => {
                scope.cancel();
                return Err(SolveError::Cancelled);
            }
            // First fault wins; siblings are cancelled, not blamed.
            Ok(Err(failure)) => {
                scope.cancel();
                return Err(failure);
            }
            Err(join_error) => {
                scope.cancel();
                return Err(SolveError::from_join(join_error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;
    use quorum_circuit::NodeKind;
    use std::time::Duration;

    const SLOW: Duration = Duration::from_secs(3600);

    fn leaves(values: &[bool]) -> Vec<Arc<Node>> {
        values.iter().map(|v| Arc::new(Node::leaf(*v))).collect()
    }

    fn root_token() -> (CancelScope, CancelToken) {
        let scope = CancelScope::root();
        let token = scope.token();
        (scope, token)
    }

    #[tokio::test]
    async fn zero_quota_is_immediate_success() {
        let (_scope, token) = root_token();
        let children = leaves(&[false, false]);
        assert_eq!(aggregate(&children, true, 0, &token).await, Ok(true));
    }

    #[tokio::test]
    async fn quota_above_child_count_is_immediate_failure() {
        let (_scope, token) = root_token();
        let children = leaves(&[true, true]);
        assert_eq!(aggregate(&children, true, 3, &token).await, Ok(false));
    }

    #[tokio::test]
    async fn no_children_and_positive_quota_misses() {
        let (_scope, token) = root_token();
        assert_eq!(aggregate(&[], true, 1, &token).await, Ok(false));
    }

    #[tokio::test]
    async fn quota_met_across_all_children() {
        let (_scope, token) = root_token();
        let children = leaves(&[true, false, true]);
        assert_eq!(aggregate(&children, true, 2, &token).await, Ok(true));
        assert_eq!(aggregate(&children, true, 3, &token).await, Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn quota_met_without_slow_children() {
        let (_scope, token) = root_token();
        let started = tokio::time::Instant::now();
        let children = vec![
            Arc::new(Node::leaf_after(true, SLOW)),
            Arc::new(Node::leaf(true)),
        ];
        assert_eq!(aggregate(&children, true, 1, &token).await, Ok(true));
        assert!(started.elapsed() < SLOW);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_quota_settles_without_slow_children() {
        let (_scope, token) = root_token();
        let started = tokio::time::Instant::now();
        let children = vec![
            Arc::new(Node::leaf(false)),
            Arc::new(Node::leaf(false)),
            Arc::new(Node::leaf_after(false, SLOW)),
            Arc::new(Node::leaf_after(true, SLOW)),
        ];
        // two fast falses leave at most two matches; a quota of three can
        // no longer be reached
        assert_eq!(aggregate(&children, true, 3, &token).await, Ok(false));
        assert!(started.elapsed() < SLOW);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fault_wins_over_slow_siblings() {
        let (_scope, token) = root_token();
        let started = tokio::time::Instant::now();
        let children = vec![
            Arc::new(Node::less_than(9, [Node::leaf(true)])),
            Arc::new(Node::leaf_after(true, SLOW)),
        ];
        assert_eq!(
            aggregate(&children, false, 2, &token).await,
            Err(SolveError::Failed(Fault::InvalidThreshold {
                kind: NodeKind::LessThan,
                threshold: 9,
                children: 1,
            }))
        );
        assert!(started.elapsed() < SLOW);
    }

    #[tokio::test(start_paused = true)]
    async fn own_cancellation_interrupts_the_wait() {
        let scope = CancelScope::root();
        let token = scope.token();
        let task = tokio::spawn(async move {
            let children = vec![Arc::new(Node::leaf_after(true, SLOW))];
            aggregate(&children, true, 1, &token).await
        });
        tokio::task::yield_now().await;
        scope.cancel();
        assert_eq!(task.await.unwrap(), Err(SolveError::Cancelled));
    }
}
