//! The decision-procedure contract.
//!
//! A backend is a black box that can decide a boolean query, report a
//! satisfying assignment, and enumerate values of a bit-vector term under
//! a context formula. Every call is self-contained: backends reset their
//! own state per query, and a top-level conjunction is asserted one
//! conjunct at a time.

use qfbv_core::{Assignment, BoolExprPtr, BvConst, BvExprPtr};

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CheckResult {
    /// The backend failed.
    Error = 0,
    /// The query is satisfiable.
    Sat = 1,
    /// The query is unsatisfiable.
    Unsat = 2,
    /// The backend could not decide within its own limits.
    Unknown = 3,
}

impl CheckResult {
    /// True iff the result is [`CheckResult::Sat`].
    #[must_use]
    pub fn is_sat(self) -> bool {
        matches!(self, CheckResult::Sat)
    }
}

/// A black-box decision procedure for QF_BV queries.
pub trait Backend {
    /// Decides the query.
    fn check(&mut self, query: &BoolExprPtr) -> CheckResult;

    /// The satisfying assignment found by the last successful call, keyed
    /// by symbol name. Empty if no model is available.
    fn model(&self) -> Assignment;

    /// Up to `n` distinct values of `bv` under the context `pi`, found by
    /// repeatedly solving and excluding previous answers. Updates the
    /// model to the assignment behind the last value.
    fn eval_upto(&mut self, bv: &BvExprPtr, pi: &BoolExprPtr, n: usize) -> Vec<BvConst>;
}
