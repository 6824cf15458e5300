//! Boolean connectives and bit-vector comparisons.
//!
//! The connectives have no width preconditions and are infallible.
//! Negation pushes through De Morgan and flips comparisons into their dual
//! operator where one exists (`EQ` has none and stays wrapped).

use rustc_hash::FxHashSet;

use crate::builder::{ensure_same_width, ExprBuilder};
use crate::error::Result;
use crate::expr::{BoolChildren, BoolExpr, BoolExprPtr, BoolNaryOp, BvExprPtr, CmpOp, ExprId};

impl ExprBuilder {
    /// Logical negation.
    #[must_use]
    pub fn mk_bool_not(&self, e: &BoolExprPtr) -> BoolExprPtr {
        if let Some(b) = e.as_const() {
            return self.mk_bool_val(!b);
        }
        match e.expr() {
            BoolExpr::Not(child) => child.clone(),
            BoolExpr::Nary { op, children } => {
                // De Morgan: push the negation into the children.
                let negated: Vec<BoolExprPtr> =
                    children.iter().map(|c| self.mk_bool_not(c)).collect();
                let dual = match op {
                    BoolNaryOp::And => BoolNaryOp::Or,
                    BoolNaryOp::Or => BoolNaryOp::And,
                };
                let mut res = negated[0].clone();
                for c in &negated[1..] {
                    res = self.mk_bool_nary(dual, &res, c);
                }
                res
            }
            BoolExpr::Cmp { op, lhs, rhs } => match op.negated() {
                Some(dual) => self
                    .mk_cmp(dual, &lhs.clone(), &rhs.clone())
                    .expect("operands were width-checked at construction"),
                None => self.intern_bool(BoolExpr::Not(e.clone())),
            },
            BoolExpr::Const(_) => unreachable!("constants fold above"),
        }
    }

    /// Conjunction.
    #[must_use]
    pub fn mk_bool_and(&self, lhs: &BoolExprPtr, rhs: &BoolExprPtr) -> BoolExprPtr {
        self.mk_bool_nary(BoolNaryOp::And, lhs, rhs)
    }

    /// Disjunction.
    #[must_use]
    pub fn mk_bool_or(&self, lhs: &BoolExprPtr, rhs: &BoolExprPtr) -> BoolExprPtr {
        self.mk_bool_nary(BoolNaryOp::Or, lhs, rhs)
    }

    fn mk_bool_nary(&self, op: BoolNaryOp, lhs: &BoolExprPtr, rhs: &BoolExprPtr) -> BoolExprPtr {
        // The annihilator and the dropped identity per operator.
        let annihilator = matches!(op, BoolNaryOp::Or);

        let mut flat: Vec<BoolExprPtr> = Vec::new();
        for side in [lhs, rhs] {
            match side.expr() {
                BoolExpr::Nary { op: o, children } if *o == op => {
                    flat.extend(children.iter().cloned());
                }
                _ => flat.push(side.clone()),
            }
        }

        let mut rest: Vec<BoolExprPtr> = Vec::new();
        for c in flat {
            match c.as_const() {
                Some(b) if b == annihilator => return self.mk_bool_val(annihilator),
                Some(_) => {}
                None => rest.push(c),
            }
        }

        let mut seen: FxHashSet<ExprId> = FxHashSet::default();
        rest.retain(|c| seen.insert(c.id()));

        if rest.is_empty() {
            return self.mk_bool_val(!annihilator);
        }
        if rest.len() == 1 {
            return rest.swap_remove(0);
        }
        let mut children: BoolChildren = rest.into_iter().collect();
        children.sort_by_key(BoolExprPtr::id);
        self.intern_bool(BoolExpr::Nary { op, children })
    }

    pub(crate) fn mk_cmp(&self, op: CmpOp, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        ensure_same_width(lhs, rhs)?;
        if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
            return Ok(self.mk_bool_val(op.apply(a, b)?));
        }
        Ok(self.intern_bool(BoolExpr::Cmp {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }))
    }

    /// Unsigned less-than.
    pub fn mk_ult(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Ult, lhs, rhs)
    }

    /// Unsigned less-or-equal.
    pub fn mk_ule(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Ule, lhs, rhs)
    }

    /// Unsigned greater-than.
    pub fn mk_ugt(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Ugt, lhs, rhs)
    }

    /// Unsigned greater-or-equal.
    pub fn mk_uge(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Uge, lhs, rhs)
    }

    /// Signed less-than.
    pub fn mk_slt(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Slt, lhs, rhs)
    }

    /// Signed less-or-equal.
    pub fn mk_sle(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Sle, lhs, rhs)
    }

    /// Signed greater-than.
    pub fn mk_sgt(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Sgt, lhs, rhs)
    }

    /// Signed greater-or-equal.
    pub fn mk_sge(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Sge, lhs, rhs)
    }

    /// Equality.
    pub fn mk_eq(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BoolExprPtr> {
        self.mk_cmp(CmpOp::Eq, lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_printing() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 64);
        let b = eb.mk_bvs("b", 64);
        let e = eb.mk_ule(&a, &b).unwrap();
        assert_eq!(e.to_string(), "a u<= b");
    }

    #[test]
    fn de_morgan_over_and() {
        let eb = ExprBuilder::new();
        let a = eb.mk_eq(&eb.mk_bvs("a", 1), &eb.mk_bvv(1, 1)).unwrap();
        let b = eb.mk_eq(&eb.mk_bvs("b", 1), &eb.mk_bvv(1, 1)).unwrap();

        let e = eb.mk_bool_and(&a, &b);
        let e = eb.mk_bool_not(&e);
        let e = eb.mk_bool_and(&e, &eb.mk_bool_val(true));
        let e = eb.mk_bool_or(&e, &eb.mk_bool_val(false));
        assert_eq!(e.to_string(), "(!(a == 0x1)) || (!(b == 0x1))");
    }

    #[test]
    fn negated_comparison_flips_operator() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let lt = eb.mk_ult(&a, &b).unwrap();
        assert_eq!(eb.mk_bool_not(&lt).to_string(), "a u>= b");
        let sle = eb.mk_sle(&a, &b).unwrap();
        assert_eq!(eb.mk_bool_not(&sle).to_string(), "a s> b");
        // Double negation restores identity through the dual operator.
        assert_eq!(eb.mk_bool_not(&eb.mk_bool_not(&lt)).id(), lt.id());
    }

    #[test]
    fn connective_identities() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let p = eb.mk_ult(&a, &b).unwrap();
        let t = eb.mk_bool_val(true);
        let f = eb.mk_bool_val(false);

        assert_eq!(eb.mk_bool_and(&p, &t).id(), p.id());
        assert_eq!(eb.mk_bool_and(&p, &f).as_const(), Some(false));
        assert_eq!(eb.mk_bool_or(&p, &f).id(), p.id());
        assert_eq!(eb.mk_bool_or(&p, &t).as_const(), Some(true));
        assert_eq!(eb.mk_bool_and(&p, &p).id(), p.id());
    }

    #[test]
    fn constant_comparisons_fold() {
        let eb = ExprBuilder::new();
        let x = eb.mk_bvv(-10, 32);
        let y = eb.mk_bvv(3, 32);
        assert_eq!(eb.mk_slt(&x, &y).unwrap().as_const(), Some(true));
        assert_eq!(eb.mk_ult(&x, &y).unwrap().as_const(), Some(false));
        assert_eq!(eb.mk_eq(&x, &x).unwrap().as_const(), Some(true));
    }

    #[test]
    fn conjunction_is_canonical_in_child_order() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let p = eb.mk_ult(&a, &b).unwrap();
        let q = eb.mk_eq(&a, &b).unwrap();
        assert_eq!(eb.mk_bool_and(&p, &q).id(), eb.mk_bool_and(&q, &p).id());
    }
}
