//! Substitution evaluator.
//!
//! Replaces symbols with constants from an [`Assignment`] and rebuilds the
//! expression through the builder, so every construction-time rewrite
//! applies again. With a total assignment the result is a constant node;
//! with a partial one it is the residual expression.

use rustc_hash::FxHashMap;

use crate::builder::ExprBuilder;
use crate::bv::BvConst;
use crate::error::Result;
use crate::expr::{BoolExpr, BoolExprPtr, BvExpr, BvExprPtr, ExprId};

/// A (possibly partial) mapping from symbol names to concrete values.
pub type Assignment = FxHashMap<String, BvConst>;

#[derive(Default)]
struct EvalCache {
    bv: FxHashMap<ExprId, BvExprPtr>,
    bools: FxHashMap<ExprId, BoolExprPtr>,
}

impl ExprBuilder {
    /// Evaluates a bit-vector expression under an assignment.
    ///
    /// # Errors
    ///
    /// Propagates constructor errors; they cannot occur for expressions
    /// built by this builder, since substitution preserves widths.
    pub fn eval_bv(&self, e: &BvExprPtr, assignment: &Assignment) -> Result<BvExprPtr> {
        let mut cache = EvalCache::default();
        self.eval_bv_inner(e, assignment, &mut cache)
    }

    /// Evaluates a boolean expression under an assignment.
    ///
    /// # Errors
    ///
    /// Propagates constructor errors; they cannot occur for expressions
    /// built by this builder.
    pub fn eval_bool(&self, e: &BoolExprPtr, assignment: &Assignment) -> Result<BoolExprPtr> {
        let mut cache = EvalCache::default();
        self.eval_bool_inner(e, assignment, &mut cache)
    }

    fn eval_bv_inner(
        &self,
        e: &BvExprPtr,
        assignment: &Assignment,
        cache: &mut EvalCache,
    ) -> Result<BvExprPtr> {
        if let Some(hit) = cache.bv.get(&e.id()) {
            return Ok(hit.clone());
        }

        let result = match e.expr() {
            BvExpr::Sym { name, .. } => match assignment.get(name) {
                Some(c) => self.mk_bv_const(c.clone()),
                None => e.clone(),
            },
            BvExpr::Const(_) => e.clone(),
            BvExpr::Unary { op, child } => {
                let child = self.eval_bv_inner(child, assignment, cache)?;
                match op {
                    crate::expr::BvUnOp::Not => self.mk_not(&child),
                    crate::expr::BvUnOp::Neg => self.mk_neg(&child),
                }
            }
            BvExpr::Nary { op, children } => {
                let op = *op;
                let mut res = self.eval_bv_inner(&children[0], assignment, cache)?;
                for c in &children[1..] {
                    let c = self.eval_bv_inner(c, assignment, cache)?;
                    res = match op {
                        crate::expr::BvNaryOp::And => self.mk_and(&res, &c)?,
                        crate::expr::BvNaryOp::Or => self.mk_or(&res, &c)?,
                        crate::expr::BvNaryOp::Xor => self.mk_xor(&res, &c)?,
                        crate::expr::BvNaryOp::Add => self.mk_add(&res, &c)?,
                        crate::expr::BvNaryOp::Mul => self.mk_mul(&res, &c)?,
                    };
                }
                res
            }
            BvExpr::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs = self.eval_bv_inner(lhs, assignment, cache)?;
                let rhs = self.eval_bv_inner(rhs, assignment, cache)?;
                match op {
                    crate::expr::BvBinOp::Shl => self.mk_shl(&lhs, &rhs)?,
                    crate::expr::BvBinOp::LShr => self.mk_lshr(&lhs, &rhs)?,
                    crate::expr::BvBinOp::AShr => self.mk_ashr(&lhs, &rhs)?,
                    crate::expr::BvBinOp::SDiv => self.mk_sdiv(&lhs, &rhs)?,
                    crate::expr::BvBinOp::UDiv => self.mk_udiv(&lhs, &rhs)?,
                    crate::expr::BvBinOp::SRem => self.mk_srem(&lhs, &rhs)?,
                    crate::expr::BvBinOp::URem => self.mk_urem(&lhs, &rhs)?,
                }
            }
            BvExpr::Extract { child, high, low } => {
                let (high, low) = (*high, *low);
                let child = self.eval_bv_inner(child, assignment, cache)?;
                self.mk_extract(&child, high, low)?
            }
            BvExpr::Concat { children } => {
                let mut res = self.eval_bv_inner(&children[0], assignment, cache)?;
                for c in &children[1..] {
                    let c = self.eval_bv_inner(c, assignment, cache)?;
                    res = self.mk_concat(&res, &c);
                }
                res
            }
            BvExpr::Extend { signed, n, child } => {
                let (signed, n) = (*signed, *n);
                let child = self.eval_bv_inner(child, assignment, cache)?;
                if signed {
                    self.mk_sext(&child, n)
                } else {
                    self.mk_zext(&child, n)
                }
            }
            BvExpr::Ite {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.eval_bool_inner(cond, assignment, cache)?;
                let then_expr = self.eval_bv_inner(then_expr, assignment, cache)?;
                let else_expr = self.eval_bv_inner(else_expr, assignment, cache)?;
                self.mk_ite(&cond, &then_expr, &else_expr)?
            }
        };

        cache.bv.insert(e.id(), result.clone());
        Ok(result)
    }

    fn eval_bool_inner(
        &self,
        e: &BoolExprPtr,
        assignment: &Assignment,
        cache: &mut EvalCache,
    ) -> Result<BoolExprPtr> {
        if let Some(hit) = cache.bools.get(&e.id()) {
            return Ok(hit.clone());
        }

        let result = match e.expr() {
            BoolExpr::Const(_) => e.clone(),
            BoolExpr::Not(child) => {
                let child = self.eval_bool_inner(child, assignment, cache)?;
                self.mk_bool_not(&child)
            }
            BoolExpr::Nary { op, children } => {
                let op = *op;
                let mut res = self.eval_bool_inner(&children[0], assignment, cache)?;
                for c in &children[1..] {
                    let c = self.eval_bool_inner(c, assignment, cache)?;
                    res = match op {
                        crate::expr::BoolNaryOp::And => self.mk_bool_and(&res, &c),
                        crate::expr::BoolNaryOp::Or => self.mk_bool_or(&res, &c),
                    };
                }
                res
            }
            BoolExpr::Cmp { op, lhs, rhs } => {
                let op = *op;
                let lhs = self.eval_bv_inner(lhs, assignment, cache)?;
                let rhs = self.eval_bv_inner(rhs, assignment, cache)?;
                self.mk_cmp(op, &lhs, &rhs)?
            }
        };

        cache.bools.insert(e.id(), result.clone());
        Ok(result)
    }
}
