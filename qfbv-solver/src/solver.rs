//! The incremental solver facade.
//!
//! A [`Solver`] accumulates asserted boolean constraints, indexes them by
//! the symbols they mention, and answers satisfiability and evaluation
//! queries through a [`Backend`]. Two mechanisms keep backend calls rare:
//!
//! - **Relevant-constraint extraction**: a query is checked under the
//!   constraints reachable from its symbols through the transitive closure
//!   of the co-occurrence graph, not under the full store.
//! - **Model caching**: the assignment from the last SAT answer is kept;
//!   if substituting it reduces a query to the constant true, the backend
//!   is not consulted. A stale model can only fail the shortcut, never
//!   produce an unsound answer.
//!
//! Constraints are never removed; cloning a solver is a deep copy of the
//! index maps and the cached model, while the expression DAG and its
//! builder stay shared.

use qfbv_core::{
    Assignment, BoolExprPtr, BvConst, BvExprPtr, ExprBuilder, ExprError, ExprId, ExprRef,
};
use rustc_hash::FxHashMap;

use crate::backend::{Backend, CheckResult};

/// Errors surfaced by the evaluation entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolverError {
    /// No satisfying value exists under the current constraints.
    #[error("constraints are unsatisfiable")]
    Unsat,
    /// The backend could not decide the query.
    #[error("backend could not decide the query")]
    BackendUnknown,
    /// An expression-level failure bubbled up.
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Tunables for the solver facade.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Try the cached candidate model before calling the backend.
    pub use_model_cache: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            use_model_cache: true,
        }
    }
}

/// Incremental constraint store and query front-end over a [`Backend`].
pub struct Solver<B> {
    builder: ExprBuilder,
    backend: B,
    config: SolverConfig,
    constraints: FxHashMap<ExprId, BoolExprPtr>,
    sym_constraints: FxHashMap<ExprId, FxHashMap<ExprId, BoolExprPtr>>,
    sym_deps: FxHashMap<ExprId, FxHashMap<ExprId, BvExprPtr>>,
    model: Assignment,
}

impl<B: Backend> Solver<B> {
    /// Creates a solver over the given builder and backend.
    #[must_use]
    pub fn new(builder: ExprBuilder, backend: B) -> Self {
        Self::with_config(builder, backend, SolverConfig::default())
    }

    /// Creates a solver with explicit configuration.
    #[must_use]
    pub fn with_config(builder: ExprBuilder, backend: B, config: SolverConfig) -> Self {
        Self {
            builder,
            backend,
            config,
            constraints: FxHashMap::default(),
            sym_constraints: FxHashMap::default(),
            sym_deps: FxHashMap::default(),
            model: Assignment::default(),
        }
    }

    /// The shared expression builder.
    #[must_use]
    pub fn builder(&self) -> &ExprBuilder {
        &self.builder
    }

    /// Number of asserted constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// True iff nothing has been asserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Asserts a constraint. Duplicate assertions and the constant true
    /// are ignored; the symbol indices are updated for everything else.
    pub fn add(&mut self, constraint: &BoolExprPtr) {
        if self.constraints.contains_key(&constraint.id()) {
            return;
        }
        if constraint.const_value() == Ok(true) {
            return;
        }
        tracing::debug!(constraint = %constraint, "asserting constraint");
        self.constraints
            .insert(constraint.id(), constraint.clone());

        let syms = self.builder.involved_inputs(constraint);
        for (i, sym) in syms.iter().enumerate() {
            self.sym_constraints
                .entry(sym.id())
                .or_default()
                .insert(constraint.id(), constraint.clone());
            for other in &syms[i + 1..] {
                self.sym_deps
                    .entry(sym.id())
                    .or_default()
                    .insert(other.id(), other.clone());
                self.sym_deps
                    .entry(other.id())
                    .or_default()
                    .insert(sym.id(), sym.clone());
            }
        }
    }

    /// The conjunction of every asserted constraint.
    #[must_use]
    pub fn pi(&self) -> BoolExprPtr {
        let mut res = self.builder.mk_bool_val(true);
        for c in self.constraints.values() {
            res = self.builder.mk_bool_and(&res, c);
        }
        res
    }

    /// The conjunction of the constraints relevant to `e`: those reachable
    /// from its symbols through the transitive closure of the
    /// symbol-dependency graph.
    #[must_use]
    pub fn relevant_constraints<'a>(&self, e: impl Into<ExprRef<'a>>) -> BoolExprPtr {
        let mut frontier = self.builder.involved_inputs(e);
        let mut visited: FxHashMap<ExprId, BvExprPtr> = FxHashMap::default();
        while let Some(sym) = frontier.pop() {
            if visited.contains_key(&sym.id()) {
                continue;
            }
            if let Some(deps) = self.sym_deps.get(&sym.id()) {
                frontier.extend(deps.values().cloned());
            }
            visited.insert(sym.id(), sym);
        }

        let mut relevant: FxHashMap<ExprId, BoolExprPtr> = FxHashMap::default();
        for sym_id in visited.keys() {
            if let Some(cs) = self.sym_constraints.get(sym_id) {
                for (id, c) in cs {
                    relevant.entry(*id).or_insert_with(|| c.clone());
                }
            }
        }

        let mut res = self.builder.mk_bool_val(true);
        for c in relevant.values() {
            res = self.builder.mk_bool_and(&res, c);
        }
        res
    }

    /// Substitutes the cached model into `query`; `Some(true)` means the
    /// model still witnesses satisfiability.
    fn model_witnesses(&self, query: &BoolExprPtr) -> Option<bool> {
        if !self.config.use_model_cache || self.model.is_empty() {
            return None;
        }
        let reduced = self.builder.eval_bool(query, &self.model).ok()?;
        reduced.const_value().ok()
    }

    fn check_query(&mut self, query: &BoolExprPtr) -> CheckResult {
        match self.model_witnesses(query) {
            Some(true) => {
                tracing::debug!("cached model satisfies the query");
                return CheckResult::Sat;
            }
            Some(false) => {
                tracing::debug!("cached model is stale, consulting backend");
            }
            None => {}
        }
        let res = self.backend.check(query);
        if res.is_sat() {
            self.model = self.backend.model();
        }
        res
    }

    /// Checks whether the asserted constraints are satisfiable.
    pub fn satisfiable(&mut self) -> CheckResult {
        let query = self.pi();
        self.check_query(&query)
    }

    /// Checks whether `query` is satisfiable together with the constraints
    /// relevant to it.
    pub fn check_sat(&mut self, query: &BoolExprPtr) -> CheckResult {
        let conjoined = self
            .builder
            .mk_bool_and(&self.relevant_constraints(query), query);
        self.check_query(&conjoined)
    }

    /// Like [`Solver::check_sat`], and asserts the query when the answer
    /// is SAT.
    pub fn check_sat_and_add_if_sat(&mut self, query: &BoolExprPtr) -> CheckResult {
        let res = self.check_sat(query);
        if res.is_sat() {
            self.add(query);
        }
        res
    }

    /// The cached candidate model.
    #[must_use]
    pub fn model(&self) -> &Assignment {
        &self.model
    }

    /// One concrete value of `bv` under the relevant constraints.
    ///
    /// The cached model is tried first; if it does not fully resolve the
    /// term, the backend provides a value and refreshes the model.
    ///
    /// # Errors
    ///
    /// [`SolverError::Unsat`] when no value exists.
    pub fn eval(&mut self, bv: &BvExprPtr) -> Result<BvConst, SolverError> {
        if self.config.use_model_cache && !self.model.is_empty() {
            if let Ok(reduced) = self.builder.eval_bv(bv, &self.model) {
                if let Ok(c) = reduced.const_value() {
                    return Ok(c);
                }
            }
        }
        let pi = self.relevant_constraints(bv);
        let values = self.backend.eval_upto(bv, &pi, 1);
        match values.into_iter().next() {
            Some(v) => {
                self.model = self.backend.model();
                Ok(v)
            }
            None => Err(SolverError::Unsat),
        }
    }

    /// Up to `n` distinct values of `bv` under the relevant constraints.
    pub fn eval_upto(&mut self, bv: &BvExprPtr, n: usize) -> Vec<BvConst> {
        let pi = self.relevant_constraints(bv);
        let values = self.backend.eval_upto(bv, &pi, n);
        if !values.is_empty() {
            self.model = self.backend.model();
        }
        values
    }

    /// Evaluates several terms with a single backend query by
    /// concatenating them, evaluating once and slicing the result.
    ///
    /// # Errors
    ///
    /// [`SolverError::Unsat`] when no joint value exists.
    pub fn eval_list(&mut self, bvs: &[BvExprPtr]) -> Result<Vec<BvConst>, SolverError> {
        let Some(first) = bvs.first() else {
            return Ok(Vec::new());
        };
        let mut joined = first.clone();
        for bv in &bvs[1..] {
            joined = self.builder.mk_concat(&joined, bv);
        }
        let value = self.eval(&joined)?;

        let mut out = Vec::with_capacity(bvs.len());
        let mut low = 0;
        for bv in bvs.iter().rev() {
            let width = bv.width();
            out.push(value.slice(low + width - 1, low)?);
            low += width;
        }
        out.reverse();
        Ok(out)
    }
}

impl<B: Backend + Clone> Clone for Solver<B> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            backend: self.backend.clone(),
            config: self.config,
            constraints: self.constraints.clone(),
            sym_constraints: self.sym_constraints.clone(),
            sym_deps: self.sym_deps.clone(),
            model: self.model.clone(),
        }
    }
}
