//! Exhaustive-enumeration reference backend.
//!
//! Decides queries by enumerating every assignment of the involved
//! symbols and evaluating through the core builder. Only viable for small
//! domains; beyond the configured bit budget every check answers
//! [`CheckResult::Unknown`]. The point of this backend is a trustworthy
//! oracle for the solver facade and its tests, with no native solver
//! dependency.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use qfbv_core::{Assignment, BoolExprPtr, BvConst, BvExpr, BvExprPtr, BvWidth, ExprBuilder};
use rustc_hash::FxHashSet;

use crate::backend::{Backend, CheckResult};

/// Default ceiling on the summed width of the enumerated symbols.
pub const DEFAULT_MAX_BITS: u64 = 20;

/// A backend that brute-forces the assignment space.
#[derive(Clone)]
pub struct ExhaustiveBackend {
    builder: ExprBuilder,
    max_bits: u64,
    model: Assignment,
}

struct Odometer {
    names: Vec<String>,
    widths: Vec<BvWidth>,
    values: Vec<BigUint>,
    exhausted: bool,
}

impl Odometer {
    fn new(syms: &[BvExprPtr]) -> Self {
        let mut names = Vec::with_capacity(syms.len());
        let mut widths = Vec::with_capacity(syms.len());
        for s in syms {
            match s.expr() {
                BvExpr::Sym { name, width } => {
                    names.push(name.clone());
                    widths.push(*width);
                }
                _ => unreachable!("involved_inputs returns symbols only"),
            }
        }
        let values = vec![BigUint::zero(); syms.len()];
        Self {
            names,
            widths,
            values,
            exhausted: false,
        }
    }

    fn assignment(&self) -> Assignment {
        let mut sigma = Assignment::default();
        for ((name, width), value) in self
            .names
            .iter()
            .zip(self.widths.iter())
            .zip(self.values.iter())
        {
            sigma.insert(name.clone(), BvConst::from_biguint(value.clone(), *width));
        }
        sigma
    }

    fn step(&mut self) {
        let mut i = 0;
        loop {
            if i == self.values.len() {
                self.exhausted = true;
                return;
            }
            self.values[i] += BigUint::one();
            if self.values[i] == (BigUint::one() << self.widths[i]) {
                self.values[i] = BigUint::zero();
                i += 1;
            } else {
                return;
            }
        }
    }
}

impl ExhaustiveBackend {
    /// Creates a backend with the default bit budget.
    #[must_use]
    pub fn new(builder: ExprBuilder) -> Self {
        Self::with_max_bits(builder, DEFAULT_MAX_BITS)
    }

    /// Creates a backend that enumerates at most `2^max_bits` assignments.
    #[must_use]
    pub fn with_max_bits(builder: ExprBuilder, max_bits: u64) -> Self {
        Self {
            builder,
            max_bits,
            model: Assignment::default(),
        }
    }

    fn within_budget(&self, syms: &[BvExprPtr]) -> bool {
        let total: u64 = syms.iter().map(|s| u64::from(s.width())).sum();
        total <= self.max_bits
    }
}

impl Backend for ExhaustiveBackend {
    fn check(&mut self, query: &BoolExprPtr) -> CheckResult {
        let syms = self.builder.involved_inputs(query);
        if !self.within_budget(&syms) {
            tracing::debug!(symbols = syms.len(), "query exceeds enumeration budget");
            return CheckResult::Unknown;
        }

        let mut odo = Odometer::new(&syms);
        while !odo.exhausted {
            let sigma = odo.assignment();
            let reduced = match self.builder.eval_bool(query, &sigma) {
                Ok(r) => r,
                Err(_) => return CheckResult::Error,
            };
            match reduced.const_value() {
                Ok(true) => {
                    self.model = sigma;
                    return CheckResult::Sat;
                }
                Ok(false) => {}
                Err(_) => return CheckResult::Error,
            }
            odo.step();
        }
        CheckResult::Unsat
    }

    fn model(&self) -> Assignment {
        self.model.clone()
    }

    fn eval_upto(&mut self, bv: &BvExprPtr, pi: &BoolExprPtr, n: usize) -> Vec<BvConst> {
        let mut syms = self.builder.involved_inputs(pi);
        syms.extend(self.builder.involved_inputs(bv));
        syms.sort_by_key(BvExprPtr::id);
        syms.dedup_by_key(|s| s.id());
        if !self.within_budget(&syms) {
            tracing::debug!(symbols = syms.len(), "eval exceeds enumeration budget");
            return Vec::new();
        }

        let mut values = Vec::new();
        let mut seen: FxHashSet<BvConst> = FxHashSet::default();
        let mut odo = Odometer::new(&syms);
        while !odo.exhausted && values.len() < n {
            let sigma = odo.assignment();
            odo.step();

            let holds = self
                .builder
                .eval_bool(pi, &sigma)
                .ok()
                .and_then(|r| r.const_value().ok());
            if holds != Some(true) {
                continue;
            }
            let value = self
                .builder
                .eval_bv(bv, &sigma)
                .ok()
                .and_then(|r| r.const_value().ok());
            if let Some(c) = value {
                if seen.insert(c.clone()) {
                    values.push(c);
                    self.model = sigma;
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decides_small_queries() {
        let eb = ExprBuilder::new();
        let mut backend = ExhaustiveBackend::new(eb.clone());

        let a = eb.mk_bvs("a", 8);
        let sat = eb.mk_eq(&a, &eb.mk_bvv(77, 8)).unwrap();
        assert_eq!(backend.check(&sat), CheckResult::Sat);
        assert_eq!(backend.model()["a"].as_u64(), 77);

        let unsat = eb.mk_ult(&a, &eb.mk_bvv(0, 8)).unwrap();
        assert_eq!(backend.check(&unsat), CheckResult::Unsat);
    }

    #[test]
    fn refuses_large_domains() {
        let eb = ExprBuilder::new();
        let mut backend = ExhaustiveBackend::new(eb.clone());
        let a = eb.mk_bvs("a", 64);
        let q = eb.mk_eq(&a, &eb.mk_bvv(1, 64)).unwrap();
        assert_eq!(backend.check(&q), CheckResult::Unknown);
    }

    #[test]
    fn enumerates_distinct_values() {
        let eb = ExprBuilder::new();
        let mut backend = ExhaustiveBackend::new(eb.clone());
        let a = eb.mk_bvs("a", 4);
        let pi = eb.mk_ule(&a, &eb.mk_bvv(5, 4)).unwrap();
        // a & 0b1110 under a <= 5 takes values {0, 2, 4}.
        let masked = eb.mk_and(&a, &eb.mk_bvv(0b1110, 4)).unwrap();
        let vals = backend.eval_upto(&masked, &pi, 16);
        let mut got: Vec<u64> = vals.iter().map(BvConst::as_u64).collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 2, 4]);
    }
}
