//! Hierarchical cooperative cancellation.
//!
//! A [`CancelScope`] owns one cancellation domain; its [`CancelToken`]s
//! observe that domain and every ancestor domain, so cancelling a scope
//! cancels its whole subtree while leaving ancestors untouched. Dropping a
//! scope cancels it, which keeps the subtree from outliving an evaluation
//! frame that was itself torn down.

use std::future::Future;
use std::pin::Pin;

use futures::future::select_all;
use tokio::sync::watch;

type Observer = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Observer side of a cancellation lineage. Cheap to clone; safe to poll
/// from any task.
#[derive(Debug, Clone)]
pub(crate) struct CancelToken {
    lineage: Vec<watch::Receiver<bool>>,
}

impl CancelToken {
    /// Non-blocking check of this scope and all ancestors.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.lineage.iter().any(|rx| *rx.borrow())
    }

    /// Resolves once this scope or any ancestor is cancelled.
    pub(crate) async fn cancelled(&self) {
        let observers: Vec<Observer> = self
            .lineage
            .iter()
            .map(|rx| Box::pin(observe(rx.clone())) as Observer)
            .collect();
        select_all(observers).await;
    }
}

async fn observe(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // A dropped sender means the owning scope is gone; its Drop already
        // flagged cancellation, so either way we are done.
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Owner side of one cancellation domain.
#[derive(Debug)]
pub(crate) struct CancelScope {
    tx: watch::Sender<bool>,
    token: CancelToken,
}

impl CancelScope {
    /// A scope with no ancestors.
    pub(crate) fn root() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx,
            token: CancelToken { lineage: vec![rx] },
        }
    }

    /// A scope nested under every domain `parent` observes.
    pub(crate) fn child(parent: &CancelToken) -> Self {
        let (tx, rx) = watch::channel(false);
        let mut lineage = parent.lineage.clone();
        lineage.push(rx);
        Self {
            tx,
            token: CancelToken { lineage },
        }
    }

    /// Request cancellation of this scope's subtree. Idempotent.
    pub(crate) fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token observing this scope and its ancestors.
    pub(crate) fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_observes_its_own_scope() {
        let scope = CancelScope::root();
        let token = scope.token();
        assert!(!token.is_cancelled());

        scope.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancellation_propagates_to_descendants() {
        let root = CancelScope::root();
        let child = CancelScope::child(&root.token());
        let grandchild = CancelScope::child(&child.token());

        root.cancel();
        assert!(grandchild.is_cancelled());
        grandchild.token().cancelled().await;
    }

    #[tokio::test]
    async fn child_cancellation_leaves_parent_running() {
        let root = CancelScope::root();
        let child = CancelScope::child(&root.token());

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn sibling_scopes_are_independent() {
        let root = CancelScope::root();
        let left = CancelScope::child(&root.token());
        let right = CancelScope::child(&root.token());

        left.cancel();
        assert!(left.is_cancelled());
        assert!(!right.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_a_scope_cancels_its_tokens() {
        let scope = CancelScope::root();
        let token = scope.token();

        drop(scope);
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancel_twice_is_a_no_op() {
        let scope = CancelScope::root();
        scope.cancel();
        scope.cancel();
        assert!(scope.is_cancelled());
    }
}
