//! Z3 backend.
//!
//! Translates the expression DAG to Z3's AST, memoised by node id so
//! shared subterms convert once. Checks are stateless: each call builds a
//! fresh context and solver, asserts the query (one conjunct at a time for
//! a top-level conjunction) and extracts the model eagerly, so nothing
//! borrowed from the context outlives the call. Values wider than 64 bits
//! are read back in 64-bit slices.

use num_bigint::BigUint;
use num_traits::Zero;
use qfbv_core::{
    Assignment, BoolExpr, BoolExprPtr, BoolNaryOp, BvBinOp, BvConst, BvExpr, BvExprPtr,
    BvNaryOp, BvUnOp, BvWidth, CmpOp, ExprId,
};
use rustc_hash::FxHashMap;
use z3::ast::{Ast, Bool, BV};
use z3::{Config, Context, SatResult, Solver as Z3Solver};

use crate::backend::{Backend, CheckResult};

/// Backend over the Z3 SMT solver.
#[derive(Clone, Default)]
pub struct Z3Backend {
    model: Assignment,
}

impl Z3Backend {
    /// Creates a Z3 backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct Converter<'ctx> {
    ctx: &'ctx Context,
    bv_cache: FxHashMap<ExprId, BV<'ctx>>,
    bool_cache: FxHashMap<ExprId, Bool<'ctx>>,
    // Symbols seen while converting the current query.
    symbols: Vec<(String, BvWidth, BV<'ctx>)>,
}

fn const_to_z3<'ctx>(ctx: &'ctx Context, c: &BvConst) -> BV<'ctx> {
    let width = c.width();
    if width <= 64 {
        return BV::from_u64(ctx, c.as_u64(), width);
    }
    // Assemble wide constants from 64-bit slices, most significant first.
    let chunks = width.div_ceil(64);
    let top_width = width - 64 * (chunks - 1);
    let top = c
        .slice(width - 1, 64 * (chunks - 1))
        .expect("chunk range is in bounds");
    let mut acc = BV::from_u64(ctx, top.as_u64(), top_width);
    for i in (0..chunks - 1).rev() {
        let chunk = c
            .slice(64 * i + 63, 64 * i)
            .expect("chunk range is in bounds");
        acc = acc.concat(&BV::from_u64(ctx, chunk.as_u64(), 64));
    }
    acc
}

fn read_z3_value(model: &z3::Model<'_>, ast: &BV<'_>, width: BvWidth) -> Option<BvConst> {
    if width <= 64 {
        let v = model.eval(ast, true)?.as_u64()?;
        return Some(BvConst::from_biguint(BigUint::from(v), width));
    }
    let mut value = BigUint::zero();
    let chunks = width.div_ceil(64);
    for i in (0..chunks).rev() {
        let high = (width - 1).min(64 * i + 63);
        let chunk = model.eval(&ast.extract(high, 64 * i), true)?.as_u64()?;
        value = (value << (high - 64 * i + 1)) | BigUint::from(chunk);
    }
    Some(BvConst::from_biguint(value, width))
}

impl<'ctx> Converter<'ctx> {
    fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            bv_cache: FxHashMap::default(),
            bool_cache: FxHashMap::default(),
            symbols: Vec::new(),
        }
    }

    fn convert_bv(&mut self, e: &BvExprPtr) -> BV<'ctx> {
        if let Some(hit) = self.bv_cache.get(&e.id()) {
            return hit.clone();
        }
        let result = match e.expr() {
            BvExpr::Sym { name, width } => {
                let ast = BV::new_const(self.ctx, name.as_str(), *width);
                self.symbols.push((name.clone(), *width, ast.clone()));
                ast
            }
            BvExpr::Const(c) => const_to_z3(self.ctx, c),
            BvExpr::Unary { op, child } => {
                let child = self.convert_bv(child);
                match op {
                    BvUnOp::Not => child.bvnot(),
                    BvUnOp::Neg => child.bvneg(),
                }
            }
            BvExpr::Nary { op, children } => {
                let mut acc = self.convert_bv(&children[0]);
                for c in &children[1..] {
                    let c = self.convert_bv(c);
                    acc = match op {
                        BvNaryOp::And => acc.bvand(&c),
                        BvNaryOp::Or => acc.bvor(&c),
                        BvNaryOp::Xor => acc.bvxor(&c),
                        BvNaryOp::Add => acc.bvadd(&c),
                        BvNaryOp::Mul => acc.bvmul(&c),
                    };
                }
                acc
            }
            BvExpr::Binary { op, lhs, rhs } => {
                let lhs = self.convert_bv(lhs);
                let rhs = self.convert_bv(rhs);
                match op {
                    BvBinOp::Shl => lhs.bvshl(&rhs),
                    BvBinOp::LShr => lhs.bvlshr(&rhs),
                    BvBinOp::AShr => lhs.bvashr(&rhs),
                    BvBinOp::SDiv => lhs.bvsdiv(&rhs),
                    BvBinOp::UDiv => lhs.bvudiv(&rhs),
                    BvBinOp::SRem => lhs.bvsrem(&rhs),
                    BvBinOp::URem => lhs.bvurem(&rhs),
                }
            }
            BvExpr::Extract { child, high, low } => self.convert_bv(child).extract(*high, *low),
            BvExpr::Concat { children } => {
                let mut acc = self.convert_bv(&children[0]);
                for c in &children[1..] {
                    let c = self.convert_bv(c);
                    acc = acc.concat(&c);
                }
                acc
            }
            BvExpr::Extend { signed, n, child } => {
                let child = self.convert_bv(child);
                if *signed {
                    child.sign_ext(*n)
                } else {
                    child.zero_ext(*n)
                }
            }
            BvExpr::Ite {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.convert_bool(cond);
                cond.ite(&self.convert_bv(then_expr), &self.convert_bv(else_expr))
            }
        };
        self.bv_cache.insert(e.id(), result.clone());
        result
    }

    fn convert_bool(&mut self, e: &BoolExprPtr) -> Bool<'ctx> {
        if let Some(hit) = self.bool_cache.get(&e.id()) {
            return hit.clone();
        }
        let result = match e.expr() {
            BoolExpr::Const(b) => Bool::from_bool(self.ctx, *b),
            BoolExpr::Not(child) => self.convert_bool(child).not(),
            BoolExpr::Nary { op, children } => {
                let converted: Vec<Bool<'ctx>> =
                    children.iter().map(|c| self.convert_bool(c)).collect();
                let refs: Vec<&Bool<'ctx>> = converted.iter().collect();
                match op {
                    BoolNaryOp::And => Bool::and(self.ctx, &refs),
                    BoolNaryOp::Or => Bool::or(self.ctx, &refs),
                }
            }
            BoolExpr::Cmp { op, lhs, rhs } => {
                let lhs = self.convert_bv(lhs);
                let rhs = self.convert_bv(rhs);
                match op {
                    CmpOp::Ult => lhs.bvult(&rhs),
                    CmpOp::Ule => lhs.bvule(&rhs),
                    CmpOp::Ugt => lhs.bvugt(&rhs),
                    CmpOp::Uge => lhs.bvuge(&rhs),
                    CmpOp::Slt => lhs.bvslt(&rhs),
                    CmpOp::Sle => lhs.bvsle(&rhs),
                    CmpOp::Sgt => lhs.bvsgt(&rhs),
                    CmpOp::Sge => lhs.bvsge(&rhs),
                    CmpOp::Eq => lhs._eq(&rhs),
                }
            }
        };
        self.bool_cache.insert(e.id(), result.clone());
        result
    }
}

fn assert_conjuncts<'ctx>(
    solver: &Z3Solver<'ctx>,
    conv: &mut Converter<'ctx>,
    query: &BoolExprPtr,
) {
    match query.expr() {
        BoolExpr::Nary {
            op: BoolNaryOp::And,
            children,
        } => {
            for c in children {
                let converted = conv.convert_bool(c);
                solver.assert(&converted);
            }
        }
        _ => {
            let converted = conv.convert_bool(query);
            solver.assert(&converted);
        }
    }
}

fn extract_model(model: &z3::Model<'_>, conv: &Converter<'_>) -> Assignment {
    let mut assignment = Assignment::default();
    for (name, width, ast) in &conv.symbols {
        if let Some(value) = read_z3_value(model, ast, *width) {
            assignment.insert(name.clone(), value);
        }
    }
    assignment
}

impl Backend for Z3Backend {
    fn check(&mut self, query: &BoolExprPtr) -> CheckResult {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let solver = Z3Solver::new(&ctx);
        let mut conv = Converter::new(&ctx);
        assert_conjuncts(&solver, &mut conv, query);

        match solver.check() {
            SatResult::Sat => {
                if let Some(model) = solver.get_model() {
                    self.model = extract_model(&model, &conv);
                }
                CheckResult::Sat
            }
            SatResult::Unsat => CheckResult::Unsat,
            SatResult::Unknown => CheckResult::Unknown,
        }
    }

    fn model(&self) -> Assignment {
        self.model.clone()
    }

    fn eval_upto(&mut self, bv: &BvExprPtr, pi: &BoolExprPtr, n: usize) -> Vec<BvConst> {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let solver = Z3Solver::new(&ctx);
        let mut conv = Converter::new(&ctx);
        let bv_ast = conv.convert_bv(bv);
        assert_conjuncts(&solver, &mut conv, pi);

        let mut values = Vec::new();
        while values.len() < n {
            if solver.check() != SatResult::Sat {
                break;
            }
            let Some(model) = solver.get_model() else {
                break;
            };
            let Some(value) = read_z3_value(&model, &bv_ast, bv.width()) else {
                break;
            };
            self.model = extract_model(&model, &conv);
            solver.assert(&bv_ast._eq(&const_to_z3(&ctx, &value)).not());
            values.push(value);
        }
        values
    }
}
