//! qfbv-core - Hash-consed bit-vector expressions for SMT front-ends.
//!
//! This crate provides the term layer of a QF_BV solving stack:
//! - [`BvConst`]: concrete fixed-width bit-vectors of arbitrary width
//! - An immutable expression DAG with [`BvExprPtr`] / [`BoolExprPtr`]
//!   handles whose identity is structural identity
//! - [`ExprBuilder`]: hash-consing construction with algebraic
//!   simplification applied at every constructor call
//! - A substitution evaluator for (partial) assignments
//!
//! # Examples
//!
//! ## Building terms
//!
//! ```
//! use qfbv_core::ExprBuilder;
//!
//! let eb = ExprBuilder::new();
//! let a = eb.mk_bvs("a", 32);
//! let b = eb.mk_bvs("b", 32);
//! let sum = eb.mk_add(&a, &b).unwrap();
//!
//! // Construction is hash-consed: equal terms share one node.
//! let again = eb.mk_add(&b, &a).unwrap();
//! assert_eq!(sum.id(), again.id());
//! ```
//!
//! ## Evaluating under an assignment
//!
//! ```
//! use qfbv_core::{Assignment, BvConst, ExprBuilder};
//!
//! let eb = ExprBuilder::new();
//! let a = eb.mk_bvs("a", 32);
//! let e = eb.mk_add(&a, &eb.mk_bvv(1, 32)).unwrap();
//!
//! let mut sigma = Assignment::default();
//! sigma.insert("a".to_owned(), BvConst::new(41, 32));
//! let r = eb.eval_bv(&e, &sigma).unwrap();
//! assert_eq!(r.const_value().unwrap().as_u64(), 42);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bv;
mod builder;
pub mod error;
mod eval;
pub mod expr;

pub use builder::{BuilderStats, ExprBuilder, ExprRef};
pub use bv::{BvConst, BvWidth};
pub use error::{ExprError, Result};
pub use eval::Assignment;
pub use expr::{
    BoolExpr, BoolExprPtr, BoolKind, BoolNaryOp, BvBinOp, BvExpr, BvExprPtr, BvKind, BvNaryOp,
    BvUnOp, CmpOp, ExprId,
};
