//! Gate-tree nodes.
//!
//! Children are held as `Arc<Node>` so an evaluation engine can hand
//! subtrees to spawned tasks without copying; the tree itself is never
//! mutated and carries no back-references.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Direction of a threshold gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// True iff more than `threshold` children are true.
    GreaterThan,
    /// True iff fewer than `threshold` children are true.
    LessThan,
}

/// One node of a boolean circuit.
///
/// The enum is non-exhaustive so consumers dispatching on node kind keep an
/// explicit arm for kinds they do not understand instead of silently
/// defaulting.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum Node {
    /// Terminal node carrying a stored boolean.
    ///
    /// `delay` is an optional simulated evaluation latency, used to model
    /// expensive inputs; a leaf without one is free to evaluate inline.
    Leaf {
        value: bool,
        delay: Option<Duration>,
    },
    /// Negation of a single child.
    Not { child: Arc<Node> },
    /// True iff every child is true.
    And { children: Vec<Arc<Node>> },
    /// True iff at least one child is true.
    Or { children: Vec<Arc<Node>> },
    /// Counting gate over its children, direction given by `kind`.
    ///
    /// Invariant (checked by [`Circuit::new`](crate::Circuit::new), assumed
    /// by evaluation): `threshold <= children.len()` and children is
    /// non-empty.
    Threshold {
        kind: ThresholdKind,
        threshold: usize,
        children: Vec<Arc<Node>>,
    },
    /// Three-way conditional: the condition selects which branch supplies
    /// the gate's value.
    If {
        condition: Arc<Node>,
        then_branch: Arc<Node>,
        else_branch: Arc<Node>,
    },
}

/// Discriminant of a [`Node`], usable in diagnostics.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Not,
    And,
    Or,
    GreaterThan,
    LessThan,
    If,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "LEAF",
            NodeKind::Not => "NOT",
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::GreaterThan => "GT",
            NodeKind::LessThan => "LT",
            NodeKind::If => "IF",
        };
        f.write_str(name)
    }
}

impl Node {
    /// Terminal leaf with a stored value.
    pub fn leaf(value: bool) -> Self {
        Node::Leaf { value, delay: None }
    }

    /// Leaf whose evaluation takes `delay` to complete.
    pub fn leaf_after(value: bool, delay: Duration) -> Self {
        Node::Leaf {
            value,
            delay: Some(delay),
        }
    }

    /// Negation gate.
    pub fn not(child: Node) -> Self {
        Node::Not {
            child: Arc::new(child),
        }
    }

    /// Conjunction gate.
    pub fn and(children: impl IntoIterator<Item = Node>) -> Self {
        Node::And {
            children: collect(children),
        }
    }

    /// Disjunction gate.
    pub fn or(children: impl IntoIterator<Item = Node>) -> Self {
        Node::Or {
            children: collect(children),
        }
    }

    /// Threshold gate: true iff more than `threshold` children are true.
    pub fn greater_than(threshold: usize, children: impl IntoIterator<Item = Node>) -> Self {
        Node::Threshold {
            kind: ThresholdKind::GreaterThan,
            threshold,
            children: collect(children),
        }
    }

    /// Threshold gate: true iff fewer than `threshold` children are true.
    pub fn less_than(threshold: usize, children: impl IntoIterator<Item = Node>) -> Self {
        Node::Threshold {
            kind: ThresholdKind::LessThan,
            threshold,
            children: collect(children),
        }
    }

    /// Conditional gate.
    pub fn if_then_else(condition: Node, then_branch: Node, else_branch: Node) -> Self {
        Node::If {
            condition: Arc::new(condition),
            then_branch: Arc::new(then_branch),
            else_branch: Arc::new(else_branch),
        }
    }

    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf { .. } => NodeKind::Leaf,
            Node::Not { .. } => NodeKind::Not,
            Node::And { .. } => NodeKind::And,
            Node::Or { .. } => NodeKind::Or,
            Node::Threshold {
                kind: ThresholdKind::GreaterThan,
                ..
            } => NodeKind::GreaterThan,
            Node::Threshold {
                kind: ThresholdKind::LessThan,
                ..
            } => NodeKind::LessThan,
            Node::If { .. } => NodeKind::If,
        }
    }

    /// Ordered children of this node; empty for a leaf.
    pub fn children(&self) -> Vec<&Arc<Node>> {
        match self {
            Node::Leaf { .. } => Vec::new(),
            Node::Not { child } => vec![child],
            Node::And { children } | Node::Or { children } => children.iter().collect(),
            Node::Threshold { children, .. } => children.iter().collect(),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],
        }
    }

    /// Pure single-threaded evaluation with no short-circuiting.
    ///
    /// Ignores leaf delays. This is the semantic reference for the
    /// concurrent engine: for any valid tree both must agree.
    pub fn evaluate(&self) -> bool {
        match self {
            Node::Leaf { value, .. } => *value,
            Node::Not { child } => !child.evaluate(),
            Node::And { children } => children.iter().all(|c| c.evaluate()),
            Node::Or { children } => children.iter().any(|c| c.evaluate()),
            Node::Threshold {
                kind,
                threshold,
                children,
            } => {
                let trues = children.iter().filter(|c| c.evaluate()).count();
                match kind {
                    ThresholdKind::GreaterThan => trues > *threshold,
                    ThresholdKind::LessThan => trues < *threshold,
                }
            }
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if condition.evaluate() {
                    then_branch.evaluate()
                } else {
                    else_branch.evaluate()
                }
            }
        }
    }
}

fn collect(children: impl IntoIterator<Item = Node>) -> Vec<Arc<Node>> {
    children.into_iter().map(Arc::new).collect()
}
