//! Concurrent, short-circuiting evaluation of boolean circuits.
//!
//! Gates fan out across a bounded pool of workers, settle the moment their
//! result is logically determined, and cooperatively cancel children whose
//! results stopped mattering. `And`/`Or`/threshold gates resolve through
//! quota counting over child completions in completion order; conditional
//! gates speculate on the condition and both branches at once. Waiting
//! never parks a worker: parents are suspended futures, so the engine runs
//! deadlock-free even on a single worker thread.
//!
//! ```no_run
//! use quorum_circuit::{Circuit, Node};
//! use quorum_solver::{Solver, WorkerPool};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let solver = Solver::new(WorkerPool::new(4)?);
//! let circuit = Circuit::new(Node::or([Node::leaf(false), Node::leaf(true)]))?;
//!
//! let handle = solver.submit(&circuit);
//! assert!(handle.wait()?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod aggregate;
mod cancel;
mod conditional;
mod error;
mod eval;
mod pool;
mod solver;
mod value;

pub use error::{Fault, SolveError};
pub use pool::WorkerPool;
pub use solver::Solver;
pub use value::ValueHandle;
