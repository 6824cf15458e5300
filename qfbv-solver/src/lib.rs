//! qfbv-solver - Incremental solving facade over `qfbv-core`.
//!
//! The [`Solver`] keeps a monotonic store of asserted constraints, an
//! index from symbols to the constraints mentioning them, and a cached
//! candidate model, and forwards the queries it cannot answer locally to a
//! pluggable [`Backend`]:
//!
//! - [`ExhaustiveBackend`] enumerates small domains through the core
//!   evaluator; it needs no native solver and serves as the reference
//!   oracle.
//! - `Z3Backend` (cargo feature `z3`) drives the Z3 SMT solver.
//!
//! # Examples
//!
//! ```
//! use qfbv_core::ExprBuilder;
//! use qfbv_solver::{CheckResult, ExhaustiveBackend, Solver};
//!
//! let eb = ExprBuilder::new();
//! let mut solver = Solver::new(eb.clone(), ExhaustiveBackend::new(eb.clone()));
//!
//! let a = eb.mk_bvs("a", 8);
//! solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
//! solver.add(&eb.mk_uge(&a, &eb.mk_bvv(21, 8)).unwrap());
//!
//! assert_eq!(solver.satisfiable(), CheckResult::Sat);
//! let value = solver.eval(&a).unwrap().as_u64();
//! assert!((21..=42).contains(&value));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod exhaustive;
mod solver;
#[cfg(feature = "z3")]
mod z3_backend;

pub use backend::{Backend, CheckResult};
pub use exhaustive::{ExhaustiveBackend, DEFAULT_MAX_BITS};
pub use solver::{Solver, SolverConfig, SolverError};
#[cfg(feature = "z3")]
pub use z3_backend::Z3Backend;
