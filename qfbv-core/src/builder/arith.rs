//! Arithmetic, bitwise and shift constructors.
//!
//! Commutative n-ary operators share one pipeline: flatten children of the
//! same kind, fold constants into an accumulator, apply operator-specific
//! pruning, sort by node id and intern. Shifts and division fold constants
//! and apply their algebraic identities before interning.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::{ensure_same_width, ExprBuilder};
use crate::bv::{BvConst, BvWidth};
use crate::error::Result;
use crate::expr::{BvBinOp, BvChildren, BvExpr, BvExprPtr, BvNaryOp, BvUnOp, ExprId};

/// Clamps a constant shift amount to the operand width; everything at or
/// past the width behaves the same.
fn shift_amount(c: &BvConst, width: BvWidth) -> BvWidth {
    if !c.fits_in_u64() {
        return width;
    }
    let n = c.as_u64();
    if n >= u64::from(width) {
        width
    } else {
        n as BvWidth
    }
}

impl ExprBuilder {
    /// Two's-complement negation. Folds constants, cancels double
    /// negation and distributes over addition.
    #[must_use]
    pub fn mk_neg(&self, e: &BvExprPtr) -> BvExprPtr {
        if let Some(c) = e.as_const() {
            return self.mk_bv_const(c.neg());
        }
        match e.expr() {
            BvExpr::Unary {
                op: BvUnOp::Neg,
                child,
            } => child.clone(),
            BvExpr::Nary {
                op: BvNaryOp::Add,
                children,
            } => {
                let mut res: Option<BvExprPtr> = None;
                for c in children {
                    let neg = self.mk_neg(c);
                    res = Some(match res {
                        None => neg,
                        Some(acc) => self
                            .mk_add(&acc, &neg)
                            .expect("addends share a width by construction"),
                    });
                }
                res.expect("n-ary nodes have at least two children")
            }
            _ => self.intern_bv(BvExpr::Unary {
                op: BvUnOp::Neg,
                child: e.clone(),
            }),
        }
    }

    /// Bitwise complement. Folds constants and cancels double complement.
    #[must_use]
    pub fn mk_not(&self, e: &BvExprPtr) -> BvExprPtr {
        if let Some(c) = e.as_const() {
            return self.mk_bv_const(c.not());
        }
        if let BvExpr::Unary {
            op: BvUnOp::Not,
            child,
        } = e.expr()
        {
            return child.clone();
        }
        self.intern_bv(BvExpr::Unary {
            op: BvUnOp::Not,
            child: e.clone(),
        })
    }

    /// Addition.
    pub fn mk_add(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_nary(BvNaryOp::Add, lhs, rhs)
    }

    /// Subtraction, expressed as `lhs + (-rhs)`.
    pub fn mk_sub(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_add(lhs, &self.mk_neg(rhs))
    }

    /// Multiplication.
    pub fn mk_mul(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_nary(BvNaryOp::Mul, lhs, rhs)
    }

    /// Bitwise and.
    pub fn mk_and(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_nary(BvNaryOp::And, lhs, rhs)
    }

    /// Bitwise or.
    pub fn mk_or(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_nary(BvNaryOp::Or, lhs, rhs)
    }

    /// Bitwise xor.
    pub fn mk_xor(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_nary(BvNaryOp::Xor, lhs, rhs)
    }

    fn mk_nary(&self, op: BvNaryOp, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        ensure_same_width(lhs, rhs)?;
        let width = lhs.width();

        // Flatten one level; children of an interned node are never of the
        // same kind as the node itself.
        let mut flat: Vec<BvExprPtr> = Vec::new();
        for side in [lhs, rhs] {
            match side.expr() {
                BvExpr::Nary { op: o, children } if *o == op => {
                    flat.extend(children.iter().cloned());
                }
                _ => flat.push(side.clone()),
            }
        }

        let mut acc = op.identity(width);
        let mut rest: Vec<BvExprPtr> = Vec::new();
        for c in flat {
            match c.as_const() {
                Some(k) => acc = op.fold(&acc, k)?,
                None => rest.push(c),
            }
        }

        match op {
            BvNaryOp::Add => {
                // x + (-x) cancels, pairwise.
                let mut removed = vec![false; rest.len()];
                for i in 0..rest.len() {
                    if removed[i] {
                        continue;
                    }
                    for j in i + 1..rest.len() {
                        if !removed[j] && rest[i].is_opposite_of(&rest[j]) {
                            removed[i] = true;
                            removed[j] = true;
                            break;
                        }
                    }
                }
                let mut keep = removed.iter().copied();
                rest.retain(|_| !keep.next().unwrap());
            }
            BvNaryOp::Mul => {
                if acc.is_zero() {
                    return Ok(self.mk_bv_const(acc));
                }
            }
            BvNaryOp::And => {
                if acc.is_zero() {
                    return Ok(self.mk_bv_const(acc));
                }
                let mut seen: FxHashSet<ExprId> = FxHashSet::default();
                rest.retain(|c| seen.insert(c.id()));
            }
            BvNaryOp::Or => {
                if acc.has_all_bits_set() {
                    return Ok(self.mk_bv_const(acc));
                }
                let mut seen: FxHashSet<ExprId> = FxHashSet::default();
                rest.retain(|c| seen.insert(c.id()));
            }
            BvNaryOp::Xor => {
                // Duplicate children cancel in pairs.
                let mut counts: FxHashMap<ExprId, usize> = FxHashMap::default();
                for c in &rest {
                    *counts.entry(c.id()).or_default() += 1;
                }
                let mut emitted: FxHashSet<ExprId> = FxHashSet::default();
                rest.retain(|c| counts[&c.id()] % 2 == 1 && emitted.insert(c.id()));
            }
        }

        if rest.is_empty() {
            return Ok(self.mk_bv_const(acc));
        }
        let drop_acc = match op {
            BvNaryOp::Add | BvNaryOp::Or | BvNaryOp::Xor => acc.is_zero(),
            BvNaryOp::Mul => acc.is_one(),
            BvNaryOp::And => acc.has_all_bits_set(),
        };
        let mut children: BvChildren = rest.into_iter().collect();
        if !drop_acc {
            children.push(self.mk_bv_const(acc));
        }
        if children.len() == 1 {
            return Ok(children.swap_remove(0));
        }
        children.sort_by_key(BvExprPtr::id);
        Ok(self.intern_bv(BvExpr::Nary { op, children }))
    }

    /// Left shift.
    pub fn mk_shl(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_shift(BvBinOp::Shl, lhs, rhs)
    }

    /// Logical right shift.
    pub fn mk_lshr(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_shift(BvBinOp::LShr, lhs, rhs)
    }

    /// Arithmetic right shift.
    pub fn mk_ashr(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_shift(BvBinOp::AShr, lhs, rhs)
    }

    fn mk_shift(&self, op: BvBinOp, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        ensure_same_width(lhs, rhs)?;
        let width = lhs.width();

        if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
            let n = shift_amount(b, width);
            let folded = match op {
                BvBinOp::Shl => a.shl(n),
                BvBinOp::LShr => a.lshr(n),
                BvBinOp::AShr => a.ashr(n),
                _ => unreachable!("not a shift operator"),
            };
            return Ok(self.mk_bv_const(folded));
        }

        if let Some(n) = rhs.as_const() {
            if n.is_zero() {
                return Ok(lhs.clone());
            }
            if shift_amount(n, width) == width {
                return Ok(self.mk_bv_const(BvConst::zero(width)));
            }
        }

        Ok(self.intern_bv(BvExpr::Binary {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }))
    }

    /// Unsigned division. `x / x` is one; division by the constant zero is
    /// all-ones, as in SMT bit-vector semantics.
    pub fn mk_udiv(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_divrem(BvBinOp::UDiv, lhs, rhs)
    }

    /// Signed division; see [`ExprBuilder::mk_udiv`].
    pub fn mk_sdiv(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_divrem(BvBinOp::SDiv, lhs, rhs)
    }

    /// Unsigned remainder. `x % x` and `x % 1` are zero; remainder by the
    /// constant zero is the dividend.
    pub fn mk_urem(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_divrem(BvBinOp::URem, lhs, rhs)
    }

    /// Signed remainder; see [`ExprBuilder::mk_urem`].
    pub fn mk_srem(&self, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        self.mk_divrem(BvBinOp::SRem, lhs, rhs)
    }

    fn mk_divrem(&self, op: BvBinOp, lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<BvExprPtr> {
        ensure_same_width(lhs, rhs)?;
        let width = lhs.width();
        let is_div = matches!(op, BvBinOp::UDiv | BvBinOp::SDiv);

        if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
            let folded = match op {
                BvBinOp::UDiv => a.udiv(b)?,
                BvBinOp::SDiv => a.sdiv(b)?,
                BvBinOp::URem => a.urem(b)?,
                BvBinOp::SRem => a.srem(b)?,
                _ => unreachable!("not a division operator"),
            };
            return Ok(self.mk_bv_const(folded));
        }

        if rhs.is_zero() {
            return if is_div {
                Ok(self.mk_bv_const(BvConst::all_ones(width)))
            } else {
                Ok(lhs.clone())
            };
        }
        if !is_div && rhs.is_one() {
            return Ok(self.mk_bv_const(BvConst::zero(width)));
        }
        if lhs.id() == rhs.id() {
            return if is_div {
                Ok(self.mk_bvv(1, width))
            } else {
                Ok(self.mk_bv_const(BvConst::zero(width)))
            };
        }

        Ok(self.intern_bv(BvExpr::Binary {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_prints_in_creation_order() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        let b = eb.mk_bvs("b", 32);
        let e = eb.mk_add(&a, &b).unwrap();
        let e = eb.mk_add(&e, &eb.mk_bvv(42, 32)).unwrap();
        assert_eq!(e.to_string(), "a + b + 0x2a");
    }

    #[test]
    fn nested_arithmetic_printing() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        let b = eb.mk_bvs("b", 32);
        let e1 = eb.mk_mul(&a, &b).unwrap();
        let e1 = eb.mk_mul(&e1, &eb.mk_bvv(42, 32)).unwrap();
        let e2 = eb.mk_add(&e1, &eb.mk_bvv(12, 32)).unwrap();
        let e3 = eb.mk_and(&e2, &eb.mk_bvv(0xfff0_0fff, 32)).unwrap();
        let e4 = eb.mk_or(&e3, &eb.mk_bvv(15, 32)).unwrap();
        assert_eq!(
            e4.to_string(),
            "(((a * b * 0x2a) + 0xc) & 0xfff00fff) | 0xf"
        );
    }

    #[test]
    fn add_cancels_opposites() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 64);
        let b = eb.mk_bvs("b", 64);
        let e1 = eb.mk_add(&a, &eb.mk_neg(&b)).unwrap();
        let e2 = eb.mk_add(&e1, &eb.mk_neg(&e1)).unwrap();
        assert_eq!(e2.to_string(), "0x0");
    }

    #[test]
    fn add_folds_constants_across_flattening() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let e = eb.mk_add(&a, &eb.mk_bvv(1, 8)).unwrap();
        let e = eb.mk_add(&e, &eb.mk_bvv(2, 8)).unwrap();
        assert_eq!(e.to_string(), "a + 0x3");
    }

    #[test]
    fn add_identity_is_dropped() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let zero = eb.mk_bvv(0, 8);
        assert_eq!(eb.mk_add(&a, &zero).unwrap().id(), a.id());
        assert_eq!(eb.mk_add(&zero, &a).unwrap().id(), a.id());
    }

    #[test]
    fn neg_distributes_over_add() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let sum = eb.mk_add(&a, &b).unwrap();
        let neg = eb.mk_neg(&sum);
        assert_eq!(neg.to_string(), "-a + -b");
        assert_eq!(eb.mk_neg(&neg).id(), sum.id());
    }

    #[test]
    fn mul_identities() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        assert_eq!(eb.mk_mul(&a, &eb.mk_bvv(1, 8)).unwrap().id(), a.id());
        assert!(eb.mk_mul(&a, &eb.mk_bvv(0, 8)).unwrap().is_zero());
        let e = eb.mk_mul(&eb.mk_bvv(6, 8), &eb.mk_bvv(7, 8)).unwrap();
        assert_eq!(e.const_value().unwrap().as_u64(), 42);
    }

    #[test]
    fn and_or_identities() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let ones = eb.mk_bvv(-1, 8);
        let zero = eb.mk_bvv(0, 8);
        assert_eq!(eb.mk_and(&a, &ones).unwrap().id(), a.id());
        assert!(eb.mk_and(&a, &zero).unwrap().is_zero());
        assert_eq!(eb.mk_and(&a, &a).unwrap().id(), a.id());
        assert_eq!(eb.mk_or(&a, &zero).unwrap().id(), a.id());
        assert!(eb.mk_or(&a, &ones).unwrap().has_all_bits_set());
        assert_eq!(eb.mk_or(&a, &a).unwrap().id(), a.id());
    }

    #[test]
    fn xor_cancels_itself() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        assert!(eb.mk_xor(&a, &a).unwrap().is_zero());
        let e = eb.mk_xor(&a, &b).unwrap();
        let e = eb.mk_xor(&e, &a).unwrap();
        assert_eq!(e.id(), b.id());
    }

    #[test]
    fn commutative_children_are_canonical() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 16);
        let b = eb.mk_bvs("b", 16);
        let c = eb.mk_bvs("c", 16);
        let e1 = eb.mk_add(&eb.mk_add(&a, &b).unwrap(), &c).unwrap();
        let e2 = eb.mk_add(&eb.mk_add(&c, &a).unwrap(), &b).unwrap();
        assert_eq!(e1.id(), e2.id());
    }

    #[test]
    fn shift_printing_and_folding() {
        let eb = ExprBuilder::new();
        let sym = eb.mk_bvs("sym", 64);
        let e = eb.mk_ashr(&sym, &eb.mk_bvv(16, 64)).unwrap();
        let e = eb.mk_shl(&e, &eb.mk_bvv(8, 64)).unwrap();
        assert_eq!(e.to_string(), "(sym a>> 0x10) << 0x8");

        let c = eb.mk_bvv(0xff, 64);
        let shifted = eb.mk_shl(&c, &eb.mk_bvv(8, 64)).unwrap();
        assert_eq!(shifted.const_value().unwrap().as_u64(), 0xff00);
    }

    #[test]
    fn shift_by_zero_and_past_width() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        assert_eq!(eb.mk_shl(&a, &eb.mk_bvv(0, 8)).unwrap().id(), a.id());
        assert!(eb.mk_shl(&a, &eb.mk_bvv(8, 8)).unwrap().is_zero());
        assert!(eb.mk_lshr(&a, &eb.mk_bvv(200, 8)).unwrap().is_zero());
        assert!(eb.mk_ashr(&a, &eb.mk_bvv(8, 8)).unwrap().is_zero());
    }

    #[test]
    fn division_identities() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let zero = eb.mk_bvv(0, 8);
        let one = eb.mk_bvv(1, 8);
        assert_eq!(eb.mk_udiv(&a, &a).unwrap().const_value().unwrap().as_u64(), 1);
        assert_eq!(eb.mk_sdiv(&a, &a).unwrap().const_value().unwrap().as_u64(), 1);
        assert!(eb.mk_urem(&a, &a).unwrap().is_zero());
        assert!(eb.mk_srem(&a, &a).unwrap().is_zero());
        assert!(eb.mk_urem(&a, &one).unwrap().is_zero());
        assert!(eb.mk_srem(&a, &one).unwrap().is_zero());
        assert!(eb.mk_udiv(&a, &zero).unwrap().has_all_bits_set());
        assert!(eb.mk_sdiv(&a, &zero).unwrap().has_all_bits_set());
        assert_eq!(eb.mk_urem(&a, &zero).unwrap().id(), a.id());
        assert_eq!(eb.mk_srem(&a, &zero).unwrap().id(), a.id());
    }

    #[test]
    fn constant_division_keeps_z3_semantics() {
        let eb = ExprBuilder::new();
        let zero = eb.mk_bvv(0, 8);
        // 0 / 0 folds through the constant path, not the x/x identity.
        let e = eb.mk_udiv(&zero, &zero).unwrap();
        assert!(e.has_all_bits_set());
    }

    #[test]
    fn width_mismatch_is_reported() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 16);
        assert!(eb.mk_add(&a, &b).is_err());
        assert!(eb.mk_shl(&a, &b).is_err());
        assert!(eb.mk_udiv(&a, &b).is_err());
    }
}
