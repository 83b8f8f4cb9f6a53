//! Immutable boolean gate trees.
//!
//! A circuit is a finite, cycle-free tree of gates with boolean leaves. This
//! crate owns the data model only: node constructors, construction-time
//! validation, and a pure single-threaded reference evaluation. It has no
//! concurrency concerns; trees are read-only after construction and safe to
//! share across threads without locking.
//!
//! The concurrent evaluation engine lives in `quorum-solver` and consumes
//! this model through [`Circuit`] and [`Node`].

#![forbid(unsafe_code)]

mod circuit;
mod node;

pub use circuit::{Circuit, CircuitError};
pub use node::{Node, NodeKind, ThresholdKind};
