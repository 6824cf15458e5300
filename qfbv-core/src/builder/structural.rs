//! Extract, concat, extension and if-then-else constructors.
//!
//! These carry the slicing algebra: extracts fuse through extracts,
//! concats and extensions; concats flatten, merge adjacent constants and
//! reassemble slices of one source (including materialised sign
//! extensions) back into the source term.

use crate::builder::{ensure_same_width, ExprBuilder};
use crate::bv::{BvConst, BvWidth};
use crate::error::{ExprError, Result};
use crate::expr::{BoolExprPtr, BvChildren, BvExpr, BvExprPtr};

impl ExprBuilder {
    /// Bits `[high:low]` of `e`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OutOfBounds`] unless
    /// `low <= high < e.width()`.
    pub fn mk_extract(&self, e: &BvExprPtr, high: BvWidth, low: BvWidth) -> Result<BvExprPtr> {
        if low > high || high >= e.width() {
            return Err(ExprError::OutOfBounds {
                high,
                low,
                width: e.width(),
            });
        }
        if low == 0 && high == e.width() - 1 {
            return Ok(e.clone());
        }
        if let Some(c) = e.as_const() {
            return Ok(self.mk_bv_const(c.slice(high, low)?));
        }

        match e.expr() {
            // Extract of extract composes.
            BvExpr::Extract {
                child,
                low: inner_low,
                ..
            } => {
                return self.mk_extract(&child.clone(), high + inner_low, low + inner_low);
            }
            // A range inside a single concat operand narrows to it.
            BvExpr::Concat { children } => {
                let mut offset = e.width();
                for c in children {
                    offset -= c.width();
                    if low >= offset && high < offset + c.width() {
                        return self.mk_extract(&c.clone(), high - offset, low - offset);
                    }
                }
            }
            BvExpr::Extend {
                signed: false,
                child,
                ..
            } => {
                let child_width = child.width();
                if high < child_width {
                    return self.mk_extract(&child.clone(), high, low);
                }
                if low >= child_width {
                    return Ok(self.mk_bv_const(BvConst::zero(high - low + 1)));
                }
                let inner = self.mk_extract(&child.clone(), child_width - 1, low)?;
                return Ok(self.mk_zext(&inner, high - child_width + 1));
            }
            BvExpr::Extend {
                signed: true,
                child,
                ..
            } => {
                if high < child.width() {
                    return self.mk_extract(&child.clone(), high, low);
                }
            }
            _ => {}
        }

        Ok(self.intern_bv(BvExpr::Extract {
            child: e.clone(),
            high,
            low,
        }))
    }

    /// Zero extension of `e` by `n` bits. `n == 0` is the identity.
    #[must_use]
    pub fn mk_zext(&self, e: &BvExprPtr, n: BvWidth) -> BvExprPtr {
        if n == 0 {
            return e.clone();
        }
        if let Some(c) = e.as_const() {
            return self.mk_bv_const(c.zext(n));
        }
        if let BvExpr::Extend {
            signed: false,
            n: inner_n,
            child,
        } = e.expr()
        {
            return self.intern_bv(BvExpr::Extend {
                signed: false,
                n: inner_n + n,
                child: child.clone(),
            });
        }
        self.intern_bv(BvExpr::Extend {
            signed: false,
            n,
            child: e.clone(),
        })
    }

    /// Sign extension of `e` by `n` bits. `n == 0` is the identity; sign
    /// extension of a zero extension is a zero extension.
    #[must_use]
    pub fn mk_sext(&self, e: &BvExprPtr, n: BvWidth) -> BvExprPtr {
        if n == 0 {
            return e.clone();
        }
        if let Some(c) = e.as_const() {
            return self.mk_bv_const(c.sext(n));
        }
        if let BvExpr::Extend {
            signed,
            n: inner_n,
            child,
        } = e.expr()
        {
            return self.intern_bv(BvExpr::Extend {
                signed: *signed,
                n: inner_n + n,
                child: child.clone(),
            });
        }
        self.intern_bv(BvExpr::Extend {
            signed: true,
            n,
            child: e.clone(),
        })
    }

    /// Concatenation with `high` as the most significant part.
    #[must_use]
    pub fn mk_concat(&self, high: &BvExprPtr, low: &BvExprPtr) -> BvExprPtr {
        let mut flat: Vec<BvExprPtr> = Vec::new();
        for side in [high, low] {
            match side.expr() {
                BvExpr::Concat { children } => flat.extend(children.iter().cloned()),
                _ => flat.push(side.clone()),
            }
        }

        let mut out: Vec<BvExprPtr> = Vec::new();
        for c in flat {
            let mut cur = c;
            while let Some(last) = out.last() {
                match self.fuse_concat_pair(last, &cur) {
                    Some(fused) => {
                        out.pop();
                        cur = fused;
                    }
                    None => break,
                }
            }
            out.push(cur);
        }

        if out.len() == 1 {
            return out.swap_remove(0);
        }
        let children: BvChildren = out.into_iter().collect();
        self.intern_bv(BvExpr::Concat { children })
    }

    /// Tries to merge two adjacent concat operands into one term.
    fn fuse_concat_pair(&self, left: &BvExprPtr, right: &BvExprPtr) -> Option<BvExprPtr> {
        if let (Some(a), Some(b)) = (left.as_const(), right.as_const()) {
            return Some(self.mk_bv_const(a.concat(b)));
        }

        // Adjacent slices of one source term fuse into the wider slice.
        if let (
            BvExpr::Extract {
                child: src_l,
                high: high_l,
                low: low_l,
            },
            BvExpr::Extract {
                child: src_r,
                high: high_r,
                low: low_r,
            },
        ) = (left.expr(), right.expr())
        {
            if src_l.id() == src_r.id() && *low_l == high_r + 1 {
                let fused = self
                    .mk_extract(&src_l.clone(), *high_l, *low_r)
                    .expect("fused range lies within the source");
                return Some(fused);
            }
        }

        // The materialised form of a sign extension: the high slice of
        // SExt(x, m) on top of x itself.
        if let BvExpr::Extract { child, high, low } = left.expr() {
            if let BvExpr::Extend {
                signed: true,
                child: x,
                ..
            } = child.expr()
            {
                let xw = x.width();
                if *low == xw && x.id() == right.id() {
                    return Some(self.mk_sext(&x.clone(), high - xw + 1));
                }
            }
        }

        None
    }

    /// If-then-else over equal-width branches. A constant guard selects
    /// the branch.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::WidthMismatch`] if the branch widths differ.
    pub fn mk_ite(
        &self,
        cond: &BoolExprPtr,
        then_expr: &BvExprPtr,
        else_expr: &BvExprPtr,
    ) -> Result<BvExprPtr> {
        ensure_same_width(then_expr, else_expr)?;
        if let Some(b) = cond.as_const() {
            return Ok(if b {
                then_expr.clone()
            } else {
                else_expr.clone()
            });
        }
        Ok(self.intern_bv(BvExpr::Ite {
            cond: cond.clone(),
            then_expr: then_expr.clone(),
            else_expr: else_expr.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_full_range_is_identity() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        assert_eq!(eb.mk_extract(&a, 31, 0).unwrap().id(), a.id());
    }

    #[test]
    fn extract_bounds_are_checked() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        assert!(matches!(
            eb.mk_extract(&a, 32, 0),
            Err(ExprError::OutOfBounds { high: 32, .. })
        ));
        assert!(eb.mk_extract(&a, 3, 7).is_err());
    }

    #[test]
    fn extract_of_extract_composes() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        let inner = eb.mk_extract(&a, 23, 8).unwrap();
        let outer = eb.mk_extract(&inner, 11, 4).unwrap();
        assert_eq!(outer.to_string(), "a[19:12]");
    }

    #[test]
    fn extract_of_constant_folds() {
        let eb = ExprBuilder::new();
        let c = eb.mk_bvv(0xdeadbeef, 32);
        let e = eb.mk_extract(&c, 15, 8).unwrap();
        assert_eq!(e.const_value().unwrap().as_u64(), 0xbe);
    }

    #[test]
    fn extract_narrows_into_concat_child() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let cc = eb.mk_concat(&a, &b);
        assert_eq!(eb.mk_extract(&cc, 15, 8).unwrap().id(), a.id());
        assert_eq!(eb.mk_extract(&cc, 7, 0).unwrap().id(), b.id());
        assert_eq!(eb.mk_extract(&cc, 5, 2).unwrap().to_string(), "b[5:2]");
        // Straddling both halves stays an extract of the concat.
        assert_eq!(
            eb.mk_extract(&cc, 11, 4).unwrap().to_string(),
            "(a .. b)[11:4]"
        );
    }

    #[test]
    fn extract_through_zext() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let z = eb.mk_zext(&a, 24);
        // Inside the original value.
        assert_eq!(eb.mk_extract(&z, 5, 2).unwrap().to_string(), "a[5:2]");
        // Entirely in the extension: constant zero.
        assert!(eb.mk_extract(&z, 23, 8).unwrap().is_zero());
        // Straddling: extract then re-extend.
        assert_eq!(
            eb.mk_extract(&z, 11, 4).unwrap().to_string(),
            "ZExt((a[7:4]), 4)"
        );
    }

    #[test]
    fn extract_through_sext() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let s = eb.mk_sext(&a, 24);
        assert_eq!(eb.mk_extract(&s, 5, 2).unwrap().to_string(), "a[5:2]");
        assert_eq!(
            eb.mk_extract(&s, 15, 8).unwrap().to_string(),
            "(SExt(a, 24))[15:8]"
        );
    }

    #[test]
    fn extension_chains_fuse() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let z = eb.mk_zext(&eb.mk_zext(&a, 8), 8);
        assert_eq!(z.to_string(), "ZExt(a, 16)");
        let s = eb.mk_sext(&eb.mk_sext(&a, 8), 8);
        assert_eq!(s.to_string(), "SExt(a, 16)");
        let sz = eb.mk_sext(&eb.mk_zext(&a, 8), 8);
        assert_eq!(sz.to_string(), "ZExt(a, 16)");
        assert_eq!(eb.mk_zext(&a, 0).id(), a.id());
        assert_eq!(eb.mk_sext(&a, 0).id(), a.id());
    }

    #[test]
    fn extension_of_constant_folds() {
        let eb = ExprBuilder::new();
        let c = eb.mk_bvv(-10, 8);
        let s = eb.mk_sext(&c, 8);
        assert_eq!(s.const_value().unwrap().as_i64(), -10);
        assert_eq!(s.width(), 16);
        let z = eb.mk_zext(&c, 8);
        assert_eq!(z.const_value().unwrap().as_u64(), 0xf6);
    }

    #[test]
    fn concat_of_slices_reassembles_source() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 32);
        let p0 = eb.mk_extract(&a, 7, 0).unwrap();
        let p1 = eb.mk_extract(&a, 15, 8).unwrap();
        let p2 = eb.mk_extract(&a, 23, 16).unwrap();
        let p3 = eb.mk_extract(&a, 31, 24).unwrap();

        let c = eb.mk_concat(&p3, &p2);
        let c = eb.mk_concat(&c, &p1);
        let c = eb.mk_concat(&c, &p0);
        assert_eq!(c.to_string(), "a");
        assert_eq!(c.id(), a.id());
    }

    #[test]
    fn concat_fuses_adjacent_constants() {
        let eb = ExprBuilder::new();
        let c = eb.mk_concat(&eb.mk_bvv(0xaa, 8), &eb.mk_bvv(0xbb, 8));
        assert_eq!(c.const_value().unwrap().as_u64(), 0xaabb);
        assert_eq!(c.width(), 16);
    }

    #[test]
    fn concat_flattens_and_keeps_order() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let c = eb.mk_bvs("c", 8);
        let e = eb.mk_concat(&eb.mk_concat(&a, &b), &c);
        assert_eq!(e.to_string(), "a .. b .. c");
        assert_eq!(e.width(), 24);
        let e2 = eb.mk_concat(&a, &eb.mk_concat(&b, &c));
        assert_eq!(e.id(), e2.id());
    }

    #[test]
    fn concat_recognises_materialised_sext() {
        let eb = ExprBuilder::new();
        let x = eb.mk_bvs("x", 8);
        let wide = eb.mk_sext(&x, 8);
        let high = eb.mk_extract(&wide, 15, 8).unwrap();
        let e = eb.mk_concat(&high, &x);
        assert_eq!(e.to_string(), "SExt(x, 8)");
        assert_eq!(e.id(), wide.id());
    }

    #[test]
    fn ite_constant_guard_selects_branch() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 8);
        let b = eb.mk_bvs("b", 8);
        let t = eb.mk_bool_val(true);
        let f = eb.mk_bool_val(false);
        assert_eq!(eb.mk_ite(&t, &a, &b).unwrap().id(), a.id());
        assert_eq!(eb.mk_ite(&f, &a, &b).unwrap().id(), b.id());

        let cond = eb.mk_eq(&a, &b).unwrap();
        let ite = eb.mk_ite(&cond, &a, &b).unwrap();
        assert_eq!(ite.to_string(), "ITE(a == b, a, b)");
        assert!(eb.mk_ite(&cond, &a, &eb.mk_bvs("w", 16)).is_err());
    }
}
