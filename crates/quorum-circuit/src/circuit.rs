//! Circuit wrapper and construction-time validation.

use std::sync::Arc;

use crate::node::{Node, NodeKind};

/// Construction-time invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    /// A threshold gate with no children.
    #[error("{kind} gate requires at least one child")]
    ThresholdWithoutChildren { kind: NodeKind },

    /// A threshold outside `0..=children.len()`.
    #[error("{kind} threshold {threshold} exceeds child count {children}")]
    ThresholdOutOfRange {
        kind: NodeKind,
        threshold: usize,
        children: usize,
    },
}

/// A validated boolean circuit: a single root gate tree.
#[derive(Debug, Clone)]
pub struct Circuit {
    root: Arc<Node>,
}

impl Circuit {
    /// Wrap a root node, checking the tree's construction invariants once.
    ///
    /// Finiteness and acyclicity hold by construction (the tree owns its
    /// children); only threshold ranges need checking.
    pub fn new(root: Node) -> Result<Self, CircuitError> {
        validate(&root)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Wrap a root node the producer has already validated.
    ///
    /// Evaluation does not re-check invariants; an invariant-violating tree
    /// submitted through this path fails at evaluation time rather than
    /// producing a silent default.
    pub fn new_unchecked(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// The root gate.
    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }
}

fn validate(node: &Node) -> Result<(), CircuitError> {
    if let Node::Threshold {
        kind: _,
        threshold,
        children,
    } = node
    {
        let kind = node.kind();
        if children.is_empty() {
            return Err(CircuitError::ThresholdWithoutChildren { kind });
        }
        if *threshold > children.len() {
            return Err(CircuitError::ThresholdOutOfRange {
                kind,
                threshold: *threshold,
                children: children.len(),
            });
        }
    }
    for child in node.children() {
        validate(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_thresholds() {
        let circuit = Circuit::new(Node::greater_than(
            2,
            [Node::leaf(true), Node::leaf(false), Node::leaf(true)],
        ));
        assert!(circuit.is_ok());
    }

    #[test]
    fn threshold_may_equal_child_count() {
        assert!(Circuit::new(Node::less_than(1, [Node::leaf(true)])).is_ok());
    }

    #[test]
    fn rejects_childless_threshold() {
        let err = Circuit::new(Node::greater_than(0, [])).unwrap_err();
        assert_eq!(
            err,
            CircuitError::ThresholdWithoutChildren {
                kind: NodeKind::GreaterThan
            }
        );
    }

    #[test]
    fn rejects_out_of_range_threshold_anywhere_in_the_tree() {
        let nested = Node::and([Node::leaf(true), Node::less_than(3, [Node::leaf(false)])]);
        let err = Circuit::new(nested).unwrap_err();
        assert_eq!(
            err,
            CircuitError::ThresholdOutOfRange {
                kind: NodeKind::LessThan,
                threshold: 3,
                children: 1,
            }
        );
    }

    #[test]
    fn unchecked_constructor_skips_validation() {
        let circuit = Circuit::new_unchecked(Node::greater_than(9, [Node::leaf(true)]));
        assert_eq!(circuit.root().kind(), NodeKind::GreaterThan);
    }
}
