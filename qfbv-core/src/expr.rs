//! The expression DAG.
//!
//! Nodes are immutable tagged sums, one per theory: [`BvExpr`] for
//! bit-vector terms and [`BoolExpr`] for boolean terms. Clients never hold
//! nodes directly; they hold [`BvExprPtr`] / [`BoolExprPtr`] handles handed
//! out by the [`ExprBuilder`](crate::ExprBuilder). Hash-consing guarantees
//! that two live handles with structurally equal nodes compare equal by id,
//! so handle identity is expression identity.
//!
//! Each node carries the structural hash and the builder-scoped id it was
//! interned with. Ids are assigned in creation order, which makes the
//! canonical ordering of commutative children (and therefore the printer
//! output) deterministic.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::bv::{BvConst, BvWidth};
use crate::error::{ExprError, Result};

/// Stable identity of an interned node, unique within one builder.
pub type ExprId = u64;

/// Child list of an n-ary bit-vector node.
pub type BvChildren = SmallVec<[BvExprPtr; 2]>;

/// Child list of an n-ary boolean node.
pub type BoolChildren = SmallVec<[BoolExprPtr; 2]>;

/// Unary bit-vector operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvUnOp {
    /// Bitwise complement.
    Not,
    /// Two's-complement negation.
    Neg,
}

impl BvUnOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BvUnOp::Not => "~",
            BvUnOp::Neg => "-",
        }
    }
}

/// Commutative, associative n-ary bit-vector operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvNaryOp {
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Modular addition.
    Add,
    /// Modular multiplication.
    Mul,
}

impl BvNaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BvNaryOp::And => "&",
            BvNaryOp::Or => "|",
            BvNaryOp::Xor => "^",
            BvNaryOp::Add => "+",
            BvNaryOp::Mul => "*",
        }
    }

    /// Neutral element used as the constant accumulator seed.
    pub(crate) fn identity(self, width: BvWidth) -> BvConst {
        match self {
            BvNaryOp::And => BvConst::all_ones(width),
            BvNaryOp::Or | BvNaryOp::Xor | BvNaryOp::Add => BvConst::zero(width),
            BvNaryOp::Mul => BvConst::one(width),
        }
    }

    pub(crate) fn fold(self, acc: &BvConst, c: &BvConst) -> Result<BvConst> {
        match self {
            BvNaryOp::And => acc.and(c),
            BvNaryOp::Or => acc.or(c),
            BvNaryOp::Xor => acc.xor(c),
            BvNaryOp::Add => acc.add(c),
            BvNaryOp::Mul => acc.mul(c),
        }
    }
}

/// Positional binary bit-vector operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BvBinOp {
    /// Left shift.
    Shl,
    /// Logical right shift.
    LShr,
    /// Arithmetic right shift.
    AShr,
    /// Signed division.
    SDiv,
    /// Unsigned division.
    UDiv,
    /// Signed remainder.
    SRem,
    /// Unsigned remainder.
    URem,
}

impl BvBinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BvBinOp::Shl => "<<",
            BvBinOp::LShr => "l>>",
            BvBinOp::AShr => "a>>",
            BvBinOp::SDiv => "s/",
            BvBinOp::UDiv => "u/",
            BvBinOp::SRem => "s%",
            BvBinOp::URem => "u%",
        }
    }
}

/// Comparison operators over equal-width bit-vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// Unsigned less-than.
    Ult,
    /// Unsigned less-or-equal.
    Ule,
    /// Unsigned greater-than.
    Ugt,
    /// Unsigned greater-or-equal.
    Uge,
    /// Signed less-than.
    Slt,
    /// Signed less-or-equal.
    Sle,
    /// Signed greater-than.
    Sgt,
    /// Signed greater-or-equal.
    Sge,
    /// Equality.
    Eq,
}

impl CmpOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            CmpOp::Ult => "u<",
            CmpOp::Ule => "u<=",
            CmpOp::Ugt => "u>",
            CmpOp::Uge => "u>=",
            CmpOp::Slt => "s<",
            CmpOp::Sle => "s<=",
            CmpOp::Sgt => "s>",
            CmpOp::Sge => "s>=",
            CmpOp::Eq => "==",
        }
    }

    /// The operator expressing the negation, if one exists (`Eq` has no
    /// dual kind).
    pub(crate) fn negated(self) -> Option<CmpOp> {
        match self {
            CmpOp::Ult => Some(CmpOp::Uge),
            CmpOp::Ule => Some(CmpOp::Ugt),
            CmpOp::Ugt => Some(CmpOp::Ule),
            CmpOp::Uge => Some(CmpOp::Ult),
            CmpOp::Slt => Some(CmpOp::Sge),
            CmpOp::Sle => Some(CmpOp::Sgt),
            CmpOp::Sgt => Some(CmpOp::Sle),
            CmpOp::Sge => Some(CmpOp::Slt),
            CmpOp::Eq => None,
        }
    }

    pub(crate) fn apply(self, lhs: &BvConst, rhs: &BvConst) -> Result<bool> {
        match self {
            CmpOp::Ult => lhs.ult(rhs),
            CmpOp::Ule => lhs.ule(rhs),
            CmpOp::Ugt => lhs.ugt(rhs),
            CmpOp::Uge => lhs.uge(rhs),
            CmpOp::Slt => lhs.slt(rhs),
            CmpOp::Sle => lhs.sle(rhs),
            CmpOp::Sgt => lhs.sgt(rhs),
            CmpOp::Sge => lhs.sge(rhs),
            CmpOp::Eq => lhs.eq(rhs),
        }
    }
}

/// Commutative n-ary boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolNaryOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

impl BoolNaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BoolNaryOp::And => "&&",
            BoolNaryOp::Or => "||",
        }
    }
}

/// A bit-vector expression node.
#[derive(Debug, Clone)]
pub enum BvExpr {
    /// A free symbol of the given width.
    Sym {
        /// Symbol name.
        name: String,
        /// Width in bits.
        width: BvWidth,
    },
    /// A concrete constant.
    Const(BvConst),
    /// `~x` or `-x`.
    Unary {
        /// The operator.
        op: BvUnOp,
        /// The operand.
        child: BvExprPtr,
    },
    /// Commutative n-ary operation over two or more equal-width children,
    /// kept sorted by child id.
    Nary {
        /// The operator.
        op: BvNaryOp,
        /// The children, canonically ordered.
        children: BvChildren,
    },
    /// Positional binary operation.
    Binary {
        /// The operator.
        op: BvBinOp,
        /// Left operand.
        lhs: BvExprPtr,
        /// Right operand.
        rhs: BvExprPtr,
    },
    /// Bits `[high:low]` of the child.
    Extract {
        /// The operand.
        child: BvExprPtr,
        /// High bit, inclusive.
        high: BvWidth,
        /// Low bit, inclusive.
        low: BvWidth,
    },
    /// Concatenation; the first child is the most significant.
    Concat {
        /// Two or more children.
        children: BvChildren,
    },
    /// Zero or sign extension of the child by `n` bits.
    Extend {
        /// True for sign extension.
        signed: bool,
        /// Number of bits added.
        n: BvWidth,
        /// The operand.
        child: BvExprPtr,
    },
    /// If-then-else over equal-width branches.
    Ite {
        /// The guard.
        cond: BoolExprPtr,
        /// Value when the guard holds.
        then_expr: BvExprPtr,
        /// Value when the guard does not hold.
        else_expr: BvExprPtr,
    },
}

/// A boolean expression node.
#[derive(Debug, Clone)]
pub enum BoolExpr {
    /// A boolean constant.
    Const(bool),
    /// Logical negation.
    Not(BoolExprPtr),
    /// Commutative n-ary conjunction or disjunction, kept sorted by child
    /// id.
    Nary {
        /// The operator.
        op: BoolNaryOp,
        /// The children, canonically ordered.
        children: BoolChildren,
    },
    /// Comparison of two equal-width bit-vectors.
    Cmp {
        /// The operator.
        op: CmpOp,
        /// Left operand.
        lhs: BvExprPtr,
        /// Right operand.
        rhs: BvExprPtr,
    },
}

/// Discriminant of a bit-vector node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BvKind {
    Sym,
    Const,
    Not,
    Neg,
    And,
    Or,
    Xor,
    Add,
    Mul,
    Shl,
    LShr,
    AShr,
    SDiv,
    UDiv,
    SRem,
    URem,
    Extract,
    Concat,
    ZExt,
    SExt,
    Ite,
}

/// Discriminant of a boolean node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BoolKind {
    Const,
    Not,
    And,
    Or,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
    Eq,
}

impl BvExpr {
    /// Discriminant of this node.
    #[must_use]
    pub fn kind(&self) -> BvKind {
        match self {
            BvExpr::Sym { .. } => BvKind::Sym,
            BvExpr::Const(_) => BvKind::Const,
            BvExpr::Unary { op: BvUnOp::Not, .. } => BvKind::Not,
            BvExpr::Unary { op: BvUnOp::Neg, .. } => BvKind::Neg,
            BvExpr::Nary { op, .. } => match op {
                BvNaryOp::And => BvKind::And,
                BvNaryOp::Or => BvKind::Or,
                BvNaryOp::Xor => BvKind::Xor,
                BvNaryOp::Add => BvKind::Add,
                BvNaryOp::Mul => BvKind::Mul,
            },
            BvExpr::Binary { op, .. } => match op {
                BvBinOp::Shl => BvKind::Shl,
                BvBinOp::LShr => BvKind::LShr,
                BvBinOp::AShr => BvKind::AShr,
                BvBinOp::SDiv => BvKind::SDiv,
                BvBinOp::UDiv => BvKind::UDiv,
                BvBinOp::SRem => BvKind::SRem,
                BvBinOp::URem => BvKind::URem,
            },
            BvExpr::Extract { .. } => BvKind::Extract,
            BvExpr::Concat { .. } => BvKind::Concat,
            BvExpr::Extend { signed: false, .. } => BvKind::ZExt,
            BvExpr::Extend { signed: true, .. } => BvKind::SExt,
            BvExpr::Ite { .. } => BvKind::Ite,
        }
    }

    /// Result width, derived from the kind and the children.
    #[must_use]
    pub fn width(&self) -> BvWidth {
        match self {
            BvExpr::Sym { width, .. } => *width,
            BvExpr::Const(c) => c.width(),
            BvExpr::Unary { child, .. } => child.width(),
            BvExpr::Nary { children, .. } => children[0].width(),
            BvExpr::Binary { lhs, .. } => lhs.width(),
            BvExpr::Extract { high, low, .. } => high - low + 1,
            BvExpr::Concat { children } => children.iter().map(|c| c.width()).sum(),
            BvExpr::Extend { n, child, .. } => child.width() + n,
            BvExpr::Ite { then_expr, .. } => then_expr.width(),
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, BvExpr::Sym { .. } | BvExpr::Const(_))
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        self.kind().hash(&mut h);
        match self {
            BvExpr::Sym { name, width } => {
                name.hash(&mut h);
                width.hash(&mut h);
            }
            BvExpr::Const(c) => {
                c.width().hash(&mut h);
                c.as_u64().hash(&mut h);
            }
            BvExpr::Unary { child, .. } => child.id().hash(&mut h),
            BvExpr::Nary { children, .. } | BvExpr::Concat { children } => {
                for c in children {
                    c.id().hash(&mut h);
                }
            }
            BvExpr::Binary { lhs, rhs, .. } => {
                lhs.id().hash(&mut h);
                rhs.id().hash(&mut h);
            }
            BvExpr::Extract { child, high, low } => {
                child.id().hash(&mut h);
                high.hash(&mut h);
                low.hash(&mut h);
            }
            BvExpr::Extend { n, child, .. } => {
                n.hash(&mut h);
                child.id().hash(&mut h);
            }
            BvExpr::Ite {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.id().hash(&mut h);
                then_expr.id().hash(&mut h);
                else_expr.id().hash(&mut h);
            }
        }
        h.finish()
    }

    pub(crate) fn shallow_eq(&self, other: &BvExpr) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self, other) {
            (
                BvExpr::Sym { name: n1, width: w1 },
                BvExpr::Sym { name: n2, width: w2 },
            ) => n1 == n2 && w1 == w2,
            (BvExpr::Const(c1), BvExpr::Const(c2)) => c1 == c2,
            (BvExpr::Unary { child: c1, .. }, BvExpr::Unary { child: c2, .. }) => {
                c1.id() == c2.id()
            }
            (BvExpr::Nary { children: c1, .. }, BvExpr::Nary { children: c2, .. })
            | (BvExpr::Concat { children: c1 }, BvExpr::Concat { children: c2 }) => {
                c1.len() == c2.len()
                    && c1.iter().zip(c2.iter()).all(|(a, b)| a.id() == b.id())
            }
            (
                BvExpr::Binary { lhs: l1, rhs: r1, .. },
                BvExpr::Binary { lhs: l2, rhs: r2, .. },
            ) => l1.id() == l2.id() && r1.id() == r2.id(),
            (
                BvExpr::Extract { child: c1, high: h1, low: l1 },
                BvExpr::Extract { child: c2, high: h2, low: l2 },
            ) => c1.id() == c2.id() && h1 == h2 && l1 == l2,
            (
                BvExpr::Extend { n: n1, child: c1, .. },
                BvExpr::Extend { n: n2, child: c2, .. },
            ) => n1 == n2 && c1.id() == c2.id(),
            (
                BvExpr::Ite { cond: g1, then_expr: t1, else_expr: e1 },
                BvExpr::Ite { cond: g2, then_expr: t2, else_expr: e2 },
            ) => g1.id() == g2.id() && t1.id() == t2.id() && e1.id() == e2.id(),
            _ => false,
        }
    }
}

impl BoolExpr {
    /// Discriminant of this node.
    #[must_use]
    pub fn kind(&self) -> BoolKind {
        match self {
            BoolExpr::Const(_) => BoolKind::Const,
            BoolExpr::Not(_) => BoolKind::Not,
            BoolExpr::Nary { op: BoolNaryOp::And, .. } => BoolKind::And,
            BoolExpr::Nary { op: BoolNaryOp::Or, .. } => BoolKind::Or,
            BoolExpr::Cmp { op, .. } => match op {
                CmpOp::Ult => BoolKind::Ult,
                CmpOp::Ule => BoolKind::Ule,
                CmpOp::Ugt => BoolKind::Ugt,
                CmpOp::Uge => BoolKind::Uge,
                CmpOp::Slt => BoolKind::Slt,
                CmpOp::Sle => BoolKind::Sle,
                CmpOp::Sgt => BoolKind::Sgt,
                CmpOp::Sge => BoolKind::Sge,
                CmpOp::Eq => BoolKind::Eq,
            },
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, BoolExpr::Const(_))
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        let mut h = FxHasher::default();
        self.kind().hash(&mut h);
        match self {
            BoolExpr::Const(b) => b.hash(&mut h),
            BoolExpr::Not(child) => child.id().hash(&mut h),
            BoolExpr::Nary { children, .. } => {
                for c in children {
                    c.id().hash(&mut h);
                }
            }
            BoolExpr::Cmp { lhs, rhs, .. } => {
                lhs.id().hash(&mut h);
                rhs.id().hash(&mut h);
            }
        }
        h.finish()
    }

    pub(crate) fn shallow_eq(&self, other: &BoolExpr) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self, other) {
            (BoolExpr::Const(b1), BoolExpr::Const(b2)) => b1 == b2,
            (BoolExpr::Not(c1), BoolExpr::Not(c2)) => c1.id() == c2.id(),
            (BoolExpr::Nary { children: c1, .. }, BoolExpr::Nary { children: c2, .. }) => {
                c1.len() == c2.len()
                    && c1.iter().zip(c2.iter()).all(|(a, b)| a.id() == b.id())
            }
            (
                BoolExpr::Cmp { lhs: l1, rhs: r1, .. },
                BoolExpr::Cmp { lhs: l2, rhs: r2, .. },
            ) => l1.id() == l2.id() && r1.id() == r2.id(),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct BvNode {
    pub(crate) id: ExprId,
    pub(crate) hash: u64,
    pub(crate) expr: BvExpr,
}

#[derive(Debug)]
pub(crate) struct BoolNode {
    pub(crate) id: ExprId,
    pub(crate) hash: u64,
    pub(crate) expr: BoolExpr,
}

/// Handle to an interned bit-vector expression.
///
/// Handles are cheap to clone and compare by node identity: two handles
/// from the same builder are equal iff they denote the same expression.
#[derive(Debug, Clone)]
pub struct BvExprPtr(pub(crate) Arc<BvNode>);

/// Handle to an interned boolean expression.
#[derive(Debug, Clone)]
pub struct BoolExprPtr(pub(crate) Arc<BoolNode>);

impl BvExprPtr {
    /// Stable identity of the node within its builder.
    #[must_use]
    pub fn id(&self) -> ExprId {
        self.0.id
    }

    /// Discriminant of the node.
    #[must_use]
    pub fn kind(&self) -> BvKind {
        self.0.expr.kind()
    }

    /// Result width in bits.
    #[must_use]
    pub fn width(&self) -> BvWidth {
        self.0.expr.width()
    }

    /// Read access to the underlying node.
    #[must_use]
    pub fn expr(&self) -> &BvExpr {
        &self.0.expr
    }

    /// True iff the node is a constant.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self.0.expr, BvExpr::Const(_))
    }

    pub(crate) fn as_const(&self) -> Option<&BvConst> {
        match &self.0.expr {
            BvExpr::Const(c) => Some(c),
            _ => None,
        }
    }

    /// The constant value of the node.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::NotAConstant`] if the node is not a constant.
    pub fn const_value(&self) -> Result<BvConst> {
        self.as_const().cloned().ok_or(ExprError::NotAConstant)
    }

    /// True iff the node is the zero constant.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_const().is_some_and(BvConst::is_zero)
    }

    /// True iff the node is the one constant.
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.as_const().is_some_and(BvConst::is_one)
    }

    /// True iff the node is the all-ones constant.
    #[must_use]
    pub fn has_all_bits_set(&self) -> bool {
        self.as_const().is_some_and(BvConst::has_all_bits_set)
    }

    /// True iff `self` is `NEG(other)` or `other` is `NEG(self)`.
    #[must_use]
    pub fn is_opposite_of(&self, other: &Self) -> bool {
        if let BvExpr::Unary { op: BvUnOp::Neg, child } = self.expr() {
            if child.id() == other.id() {
                return true;
            }
        }
        if let BvExpr::Unary { op: BvUnOp::Neg, child } = other.expr() {
            return child.id() == self.id();
        }
        false
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.0.expr.is_leaf()
    }

    /// Full recursive structural comparison. Hash-consing makes `id`
    /// comparison equivalent for handles of one builder; this walk exists
    /// for tests and debugging.
    #[must_use]
    pub fn deep_eq(&self, other: &Self) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self.expr(), other.expr()) {
            (
                BvExpr::Sym { name: n1, width: w1 },
                BvExpr::Sym { name: n2, width: w2 },
            ) => n1 == n2 && w1 == w2,
            (BvExpr::Const(c1), BvExpr::Const(c2)) => c1 == c2,
            (BvExpr::Unary { child: c1, .. }, BvExpr::Unary { child: c2, .. }) => {
                c1.deep_eq(c2)
            }
            (BvExpr::Nary { children: c1, .. }, BvExpr::Nary { children: c2, .. })
            | (BvExpr::Concat { children: c1 }, BvExpr::Concat { children: c2 }) => {
                c1.len() == c2.len()
                    && c1.iter().zip(c2.iter()).all(|(a, b)| a.deep_eq(b))
            }
            (
                BvExpr::Binary { lhs: l1, rhs: r1, .. },
                BvExpr::Binary { lhs: l2, rhs: r2, .. },
            ) => l1.deep_eq(l2) && r1.deep_eq(r2),
            (
                BvExpr::Extract { child: c1, high: h1, low: l1 },
                BvExpr::Extract { child: c2, high: h2, low: l2 },
            ) => h1 == h2 && l1 == l2 && c1.deep_eq(c2),
            (
                BvExpr::Extend { n: n1, child: c1, .. },
                BvExpr::Extend { n: n2, child: c2, .. },
            ) => n1 == n2 && c1.deep_eq(c2),
            (
                BvExpr::Ite { cond: g1, then_expr: t1, else_expr: e1 },
                BvExpr::Ite { cond: g2, then_expr: t2, else_expr: e2 },
            ) => g1.deep_eq(g2) && t1.deep_eq(t2) && e1.deep_eq(e2),
            _ => false,
        }
    }
}

impl BoolExprPtr {
    /// Stable identity of the node within its builder.
    #[must_use]
    pub fn id(&self) -> ExprId {
        self.0.id
    }

    /// Discriminant of the node.
    #[must_use]
    pub fn kind(&self) -> BoolKind {
        self.0.expr.kind()
    }

    /// Read access to the underlying node.
    #[must_use]
    pub fn expr(&self) -> &BoolExpr {
        &self.0.expr
    }

    /// True iff the node is a constant.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self.0.expr, BoolExpr::Const(_))
    }

    pub(crate) fn as_const(&self) -> Option<bool> {
        match self.0.expr {
            BoolExpr::Const(b) => Some(b),
            _ => None,
        }
    }

    /// The constant value of the node.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::NotAConstant`] if the node is not a constant.
    pub fn const_value(&self) -> Result<bool> {
        self.as_const().ok_or(ExprError::NotAConstant)
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.0.expr.is_leaf()
    }

    /// Full recursive structural comparison; see [`BvExprPtr::deep_eq`].
    #[must_use]
    pub fn deep_eq(&self, other: &Self) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self.expr(), other.expr()) {
            (BoolExpr::Const(b1), BoolExpr::Const(b2)) => b1 == b2,
            (BoolExpr::Not(c1), BoolExpr::Not(c2)) => c1.deep_eq(c2),
            (BoolExpr::Nary { children: c1, .. }, BoolExpr::Nary { children: c2, .. }) => {
                c1.len() == c2.len()
                    && c1.iter().zip(c2.iter()).all(|(a, b)| a.deep_eq(b))
            }
            (
                BoolExpr::Cmp { lhs: l1, rhs: r1, .. },
                BoolExpr::Cmp { lhs: l2, rhs: r2, .. },
            ) => l1.deep_eq(l2) && r1.deep_eq(r2),
            _ => false,
        }
    }
}

impl PartialEq for BvExprPtr {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for BvExprPtr {}

impl Hash for BvExprPtr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialEq for BoolExprPtr {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for BoolExprPtr {}

impl Hash for BoolExprPtr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

fn fmt_bv_child(f: &mut fmt::Formatter<'_>, child: &BvExprPtr) -> fmt::Result {
    if child.is_leaf() {
        write!(f, "{child}")
    } else {
        write!(f, "({child})")
    }
}

fn fmt_bool_child(f: &mut fmt::Formatter<'_>, child: &BoolExprPtr) -> fmt::Result {
    if child.is_leaf() {
        write!(f, "{child}")
    } else {
        write!(f, "({child})")
    }
}

impl fmt::Display for BvExprPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr() {
            BvExpr::Sym { name, .. } => write!(f, "{name}"),
            BvExpr::Const(c) => write!(f, "0x{:x}", c.uint_value()),
            BvExpr::Unary { op, child } => {
                write!(f, "{}", op.symbol())?;
                fmt_bv_child(f, child)
            }
            BvExpr::Nary { op, children } => {
                fmt_bv_child(f, &children[0])?;
                for c in &children[1..] {
                    write!(f, " {} ", op.symbol())?;
                    fmt_bv_child(f, c)?;
                }
                Ok(())
            }
            BvExpr::Binary { op, lhs, rhs } => {
                fmt_bv_child(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                fmt_bv_child(f, rhs)
            }
            BvExpr::Extract { child, high, low } => {
                fmt_bv_child(f, child)?;
                write!(f, "[{high}:{low}]")
            }
            BvExpr::Concat { children } => {
                fmt_bv_child(f, &children[0])?;
                for c in &children[1..] {
                    write!(f, " .. ")?;
                    fmt_bv_child(f, c)?;
                }
                Ok(())
            }
            BvExpr::Extend { signed, n, child } => {
                write!(f, "{}(", if *signed { "SExt" } else { "ZExt" })?;
                fmt_bv_child(f, child)?;
                write!(f, ", {n})")
            }
            BvExpr::Ite {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "ITE({cond}, {then_expr}, {else_expr})"),
        }
    }
}

impl fmt::Display for BoolExprPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr() {
            BoolExpr::Const(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            BoolExpr::Not(child) => {
                write!(f, "!")?;
                fmt_bool_child(f, child)
            }
            BoolExpr::Nary { op, children } => {
                fmt_bool_child(f, &children[0])?;
                for c in &children[1..] {
                    write!(f, " {} ", op.symbol())?;
                    fmt_bool_child(f, c)?;
                }
                Ok(())
            }
            BoolExpr::Cmp { op, lhs, rhs } => {
                fmt_bv_child(f, lhs)?;
                write!(f, " {} ", op.symbol())?;
                fmt_bv_child(f, rhs)
            }
        }
    }
}
