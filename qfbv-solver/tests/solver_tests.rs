//! End-to-end tests for the solver facade.
//!
//! The default suite runs against the exhaustive reference backend at
//! small widths, wrapped in a recorder so the tests can observe which
//! formulas actually reach the backend. The `z3` feature adds the same
//! scenarios at full width against Z3.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use qfbv_core::{Assignment, BoolExprPtr, BvConst, BvExprPtr, ExprBuilder};
use qfbv_solver::{Backend, CheckResult, ExhaustiveBackend, Solver};

/// Wraps a backend and records every formula it is asked about.
#[derive(Clone)]
struct RecordingBackend<B> {
    inner: B,
    queries: Rc<RefCell<Vec<String>>>,
    checks: Rc<Cell<usize>>,
    evals: Rc<Cell<usize>>,
}

impl<B> RecordingBackend<B> {
    fn new(inner: B) -> Self {
        Self {
            inner,
            queries: Rc::new(RefCell::new(Vec::new())),
            checks: Rc::new(Cell::new(0)),
            evals: Rc::new(Cell::new(0)),
        }
    }
}

impl<B: Backend> Backend for RecordingBackend<B> {
    fn check(&mut self, query: &BoolExprPtr) -> CheckResult {
        self.queries.borrow_mut().push(query.to_string());
        self.checks.set(self.checks.get() + 1);
        self.inner.check(query)
    }

    fn model(&self) -> Assignment {
        self.inner.model()
    }

    fn eval_upto(&mut self, bv: &BvExprPtr, pi: &BoolExprPtr, n: usize) -> Vec<BvConst> {
        self.queries.borrow_mut().push(pi.to_string());
        self.evals.set(self.evals.get() + 1);
        self.inner.eval_upto(bv, pi, n)
    }
}

fn recorded_solver(eb: &ExprBuilder) -> (Solver<RecordingBackend<ExhaustiveBackend>>, RecordingBackend<ExhaustiveBackend>) {
    let backend = RecordingBackend::new(ExhaustiveBackend::new(eb.clone()));
    (Solver::new(eb.clone(), backend.clone()), backend)
}

#[test]
fn sat_and_eval_within_bounds() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
    solver.add(&eb.mk_uge(&a, &eb.mk_bvv(21, 8)).unwrap());

    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    assert_eq!(solver.check_sat(&eb.mk_bool_val(true)), CheckResult::Sat);

    let value = solver.eval(&a).unwrap().as_u64();
    assert!((21..=42).contains(&value));
    assert!(solver.model().contains_key("a"));

    // The cached model must witness the whole constraint store.
    let reduced = eb.eval_bool(&solver.pi(), solver.model()).unwrap();
    assert_eq!(reduced.const_value(), Ok(true));
}

#[test]
fn eval_upto_enumerates_exactly() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
    solver.add(&eb.mk_uge(&a, &eb.mk_bvv(21, 8)).unwrap());

    let values = solver.eval_upto(&a, 128);
    assert_eq!(values.len(), 22);
    let mut got: Vec<u64> = values.iter().map(BvConst::as_u64).collect();
    got.sort_unstable();
    assert_eq!(got.first(), Some(&21));
    assert_eq!(got.last(), Some(&42));
}

#[test]
fn unrelated_constraints_stay_out_of_the_query() {
    let eb = ExprBuilder::new();
    let (mut solver, backend) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    let b = eb.mk_bvs("b", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
    solver.add(&eb.mk_ule(&b, &eb.mk_bvv(100, 8)).unwrap());

    let q = eb.mk_eq(&b, &eb.mk_bvv(50, 8)).unwrap();
    assert_eq!(solver.check_sat(&q), CheckResult::Sat);

    let queries = backend.queries.borrow();
    let last = queries.last().unwrap();
    assert!(last.contains("b u<= 0x64"));
    assert!(last.contains("b == 0x32"));
    assert!(!last.contains("a u<="));
}

#[test]
fn dependencies_close_transitively() {
    let eb = ExprBuilder::new();
    let (mut solver, backend) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 4);
    let b = eb.mk_bvs("b", 4);
    let c = eb.mk_bvs("c", 4);
    // a is linked to b, b is linked to c; nothing mentions a and c together.
    let sum = eb.mk_add(&a, &b).unwrap();
    solver.add(&eb.mk_ult(&sum, &eb.mk_bvv(9, 4)).unwrap());
    solver.add(&eb.mk_eq(&b, &c).unwrap());

    let q = eb.mk_ugt(&c, &eb.mk_bvv(1, 4)).unwrap();
    assert_eq!(solver.check_sat(&q), CheckResult::Sat);

    let queries = backend.queries.borrow();
    let last = queries.last().unwrap();
    assert!(last.contains("a + b"), "closure must pull in the a-b link");
    assert!(last.contains("b == c"));
}

#[test]
fn cached_model_short_circuits_the_backend() {
    let eb = ExprBuilder::new();
    let (mut solver, backend) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());

    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    assert_eq!(backend.checks.get(), 1);

    // Second answer comes from the cached model.
    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    assert_eq!(backend.checks.get(), 1);

    // A fully resolved eval never reaches the backend either.
    let value = solver.eval(&a).unwrap();
    assert!(value.as_u64() <= 42);
    assert_eq!(backend.evals.get(), 0);
}

#[test]
fn stale_model_falls_back_to_the_backend() {
    let eb = ExprBuilder::new();
    let (mut solver, backend) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    let cached = solver.model()["a"].clone();

    // Rule out the cached value; the old model now evaluates to false.
    let ne = eb.mk_bool_not(&eb.mk_eq(&a, &eb.mk_bv_const(cached)).unwrap());
    solver.add(&ne);
    let before = backend.checks.get();
    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    assert_eq!(backend.checks.get(), before + 1);
}

#[test]
fn check_sat_and_add_keeps_sat_queries() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());
    assert_eq!(solver.len(), 1);

    let q = eb.mk_uge(&a, &eb.mk_bvv(40, 8)).unwrap();
    assert_eq!(solver.check_sat_and_add_if_sat(&q), CheckResult::Sat);
    assert_eq!(solver.len(), 2);

    // An unsatisfiable query is not retained.
    let bad = eb.mk_ugt(&a, &eb.mk_bvv(42, 8)).unwrap();
    assert_eq!(solver.check_sat_and_add_if_sat(&bad), CheckResult::Unsat);
    assert_eq!(solver.len(), 2);

    // The retained query now constrains evaluation.
    let values = solver.eval_upto(&a, 128);
    assert_eq!(values.len(), 3);
}

#[test]
fn duplicate_and_trivial_constraints_are_skipped() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    let c = eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap();
    solver.add(&c);
    solver.add(&c);
    solver.add(&eb.mk_bool_val(true));
    assert_eq!(solver.len(), 1);
}

#[test]
fn unsatisfiable_evaluation_reports_unsat() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ult(&a, &eb.mk_bvv(0, 8)).unwrap());
    assert_eq!(solver.satisfiable(), CheckResult::Unsat);
    assert!(solver.eval(&a).is_err());
}

#[test]
fn eval_list_uses_one_backend_query() {
    let eb = ExprBuilder::new();
    let (mut solver, backend) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    let b = eb.mk_bvs("b", 4);
    solver.add(&eb.mk_eq(&a, &eb.mk_bvv(7, 8)).unwrap());
    solver.add(&eb.mk_eq(&b, &eb.mk_bvv(9, 4)).unwrap());

    let values = solver.eval_list(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(backend.evals.get(), 1);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].as_u64(), 7);
    assert_eq!(values[0].width(), 8);
    assert_eq!(values[1].as_u64(), 9);
    assert_eq!(values[1].width(), 4);

    assert!(solver.eval_list(&[]).unwrap().is_empty());
}

#[test]
fn clones_answer_identically_until_mutated() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    let a = eb.mk_bvs("a", 8);
    solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap());

    let mut fork = solver.clone();
    assert_eq!(solver.satisfiable(), CheckResult::Sat);
    assert_eq!(fork.satisfiable(), CheckResult::Sat);
    assert_eq!(solver.eval_upto(&a, 128).len(), fork.eval_upto(&a, 128).len());

    // Diverge the fork; the original must not notice.
    fork.add(&eb.mk_ult(&a, &eb.mk_bvv(10, 8)).unwrap());
    assert_eq!(fork.len(), 2);
    assert_eq!(solver.len(), 1);
    assert_eq!(fork.eval_upto(&a, 128).len(), 10);
    assert_eq!(solver.eval_upto(&a, 128).len(), 43);
}

#[test]
fn pi_is_the_conjunction_of_the_store() {
    let eb = ExprBuilder::new();
    let (mut solver, _) = recorded_solver(&eb);

    assert_eq!(solver.pi().const_value(), Ok(true));

    let a = eb.mk_bvs("a", 8);
    let c1 = eb.mk_ule(&a, &eb.mk_bvv(42, 8)).unwrap();
    solver.add(&c1);
    assert_eq!(solver.pi().id(), c1.id());

    let c2 = eb.mk_uge(&a, &eb.mk_bvv(21, 8)).unwrap();
    solver.add(&c2);
    assert_eq!(solver.pi().id(), eb.mk_bool_and(&c1, &c2).id());
}

#[cfg(feature = "z3")]
mod z3_scenarios {
    use super::*;
    use qfbv_solver::Z3Backend;

    #[test]
    fn sat_and_eval_at_full_width() {
        let eb = ExprBuilder::new();
        let mut solver = Solver::new(eb.clone(), Z3Backend::new());

        let a = eb.mk_bvs("a", 32);
        solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 32)).unwrap());
        solver.add(&eb.mk_uge(&a, &eb.mk_bvv(21, 32)).unwrap());

        assert_eq!(solver.check_sat(&eb.mk_bool_val(true)), CheckResult::Sat);
        let value = solver.eval(&a).unwrap().as_u64();
        assert!((21..=42).contains(&value));

        let values = solver.eval_upto(&a, 128);
        assert_eq!(values.len(), 22);
    }

    #[test]
    fn isolation_at_full_width() {
        let eb = ExprBuilder::new();
        let backend = RecordingBackend::new(Z3Backend::new());
        let mut solver = Solver::new(eb.clone(), backend.clone());

        let a = eb.mk_bvs("a", 32);
        let b = eb.mk_bvs("b", 32);
        solver.add(&eb.mk_ule(&a, &eb.mk_bvv(42, 32)).unwrap());
        solver.add(&eb.mk_ule(&b, &eb.mk_bvv(100, 32)).unwrap());

        let q = eb.mk_eq(&b, &eb.mk_bvv(50, 32)).unwrap();
        assert_eq!(solver.check_sat(&q), CheckResult::Sat);
        let queries = backend.queries.borrow();
        assert!(!queries.last().unwrap().contains("a u<="));
    }

    #[test]
    fn wide_values_round_trip_through_the_backend() {
        let eb = ExprBuilder::new();
        let mut solver = Solver::new(eb.clone(), Z3Backend::new());

        let a = eb.mk_bvs("a", 96);
        let expect = qfbv_core::BvConst::from_str_radix("deadbeefcafebabe12345678", 16, 96).unwrap();
        solver.add(&eb.mk_eq(&a, &eb.mk_bv_const(expect.clone())).unwrap());
        assert_eq!(solver.eval(&a).unwrap(), expect);
    }
}
