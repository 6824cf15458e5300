//! Hash-consing expression builder.
//!
//! [`ExprBuilder`] is the only way to create expression nodes. Every
//! constructor validates widths, applies the local rewrites described in
//! the sibling modules, canonicalises commutative children by ascending
//! node id and interns the result, so structurally equal live expressions
//! always share one node.
//!
//! The cache maps structural hashes to buckets of weak references. Live
//! handles (and parent nodes) keep nodes alive through their `Arc`; when
//! the last handle drops, the bucket entry goes stale and is pruned the
//! next time the bucket is probed, or wholesale by [`ExprBuilder::purge_dead`].
//! A single lock serialises probing, insertion and pruning, so builders can
//! be shared between solvers.

mod arith;
mod boolean;
mod structural;

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::bv::{BvConst, BvWidth};
use crate::error::{ExprError, Result};
use crate::expr::{
    BoolExpr, BoolExprPtr, BoolNode, BvExpr, BvExprPtr, BvNode, ExprId,
};

/// Counters describing the hash-cons cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderStats {
    /// Number of intern probes.
    pub lookups: u64,
    /// Number of probes answered from the cache.
    pub hits: u64,
    /// Live bit-vector nodes currently tracked (pruned lazily).
    pub live_bv: u64,
    /// Live boolean nodes currently tracked (pruned lazily).
    pub live_bool: u64,
}

impl fmt::Display for BuilderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ratio = if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64 * 100.0
        };
        write!(
            f,
            "lookups: {}, hits: {} ({ratio:.1}%), live nodes: {} bv / {} bool",
            self.lookups, self.hits, self.live_bv, self.live_bool
        )
    }
}

type BvBucket = SmallVec<[Weak<BvNode>; 2]>;
type BoolBucket = SmallVec<[Weak<BoolNode>; 2]>;

#[derive(Default)]
struct Interner {
    next_id: ExprId,
    bv_cache: FxHashMap<u64, BvBucket>,
    bool_cache: FxHashMap<u64, BoolBucket>,
    stats: BuilderStats,
}

/// Hash-consing builder for bit-vector and boolean expressions.
///
/// Cloning is cheap and shares the cache, so several solvers (or threads)
/// can construct terms against the same DAG.
#[derive(Clone)]
pub struct ExprBuilder {
    inner: Arc<Mutex<Interner>>,
}

/// A borrowed handle of either theory, accepted by the generic DAG walks.
#[derive(Clone, Copy)]
pub enum ExprRef<'a> {
    /// A bit-vector expression.
    Bv(&'a BvExprPtr),
    /// A boolean expression.
    Bool(&'a BoolExprPtr),
}

impl<'a> From<&'a BvExprPtr> for ExprRef<'a> {
    fn from(e: &'a BvExprPtr) -> Self {
        ExprRef::Bv(e)
    }
}

impl<'a> From<&'a BoolExprPtr> for ExprRef<'a> {
    fn from(e: &'a BoolExprPtr) -> Self {
        ExprRef::Bool(e)
    }
}

pub(crate) fn ensure_same_width(lhs: &BvExprPtr, rhs: &BvExprPtr) -> Result<()> {
    if lhs.width() != rhs.width() {
        return Err(ExprError::WidthMismatch {
            lhs: lhs.width(),
            rhs: rhs.width(),
        });
    }
    Ok(())
}

impl ExprBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Interner::default())),
        }
    }

    pub(crate) fn intern_bv(&self, expr: BvExpr) -> BvExprPtr {
        let hash = expr.structural_hash();
        let mut inner = self.inner.lock().expect("builder lock poisoned");
        inner.stats.lookups += 1;

        let mut found: Option<Arc<BvNode>> = None;
        let mut pruned: u64 = 0;
        let bucket = inner.bv_cache.entry(hash).or_default();
        bucket.retain(|weak| match weak.upgrade() {
            Some(node) => {
                if found.is_none() && node.expr.shallow_eq(&expr) {
                    found = Some(node);
                }
                true
            }
            None => {
                pruned += 1;
                false
            }
        });
        inner.stats.live_bv -= pruned;

        if let Some(node) = found {
            inner.stats.hits += 1;
            return BvExprPtr(node);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let node = Arc::new(BvNode { id, hash, expr });
        inner
            .bv_cache
            .entry(hash)
            .or_default()
            .push(Arc::downgrade(&node));
        inner.stats.live_bv += 1;
        BvExprPtr(node)
    }

    pub(crate) fn intern_bool(&self, expr: BoolExpr) -> BoolExprPtr {
        let hash = expr.structural_hash();
        let mut inner = self.inner.lock().expect("builder lock poisoned");
        inner.stats.lookups += 1;

        let mut found: Option<Arc<BoolNode>> = None;
        let mut pruned: u64 = 0;
        let bucket = inner.bool_cache.entry(hash).or_default();
        bucket.retain(|weak| match weak.upgrade() {
            Some(node) => {
                if found.is_none() && node.expr.shallow_eq(&expr) {
                    found = Some(node);
                }
                true
            }
            None => {
                pruned += 1;
                false
            }
        });
        inner.stats.live_bool -= pruned;

        if let Some(node) = found {
            inner.stats.hits += 1;
            return BoolExprPtr(node);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let node = Arc::new(BoolNode { id, hash, expr });
        inner
            .bool_cache
            .entry(hash)
            .or_default()
            .push(Arc::downgrade(&node));
        inner.stats.live_bool += 1;
        BoolExprPtr(node)
    }

    /// A bit-vector constant from a signed integer.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn mk_bvv(&self, value: i64, width: BvWidth) -> BvExprPtr {
        self.mk_bv_const(BvConst::new(value, width))
    }

    /// A bit-vector constant node.
    #[must_use]
    pub fn mk_bv_const(&self, value: BvConst) -> BvExprPtr {
        self.intern_bv(BvExpr::Const(value))
    }

    /// A free bit-vector symbol.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn mk_bvs(&self, name: &str, width: BvWidth) -> BvExprPtr {
        assert!(width >= 1, "bit-vector width must be at least 1");
        self.intern_bv(BvExpr::Sym {
            name: name.to_owned(),
            width,
        })
    }

    /// A boolean constant node.
    #[must_use]
    pub fn mk_bool_val(&self, value: bool) -> BoolExprPtr {
        self.intern_bool(BoolExpr::Const(value))
    }

    /// The free symbols an expression depends on, deduplicated and sorted
    /// by node id.
    #[must_use]
    pub fn involved_inputs<'a>(&self, e: impl Into<ExprRef<'a>>) -> Vec<BvExprPtr> {
        enum Item {
            Bv(BvExprPtr),
            Bool(BoolExprPtr),
        }

        let mut stack = vec![match e.into() {
            ExprRef::Bv(e) => Item::Bv(e.clone()),
            ExprRef::Bool(e) => Item::Bool(e.clone()),
        }];
        let mut seen: FxHashSet<ExprId> = FxHashSet::default();
        let mut out = Vec::new();

        while let Some(item) = stack.pop() {
            match item {
                Item::Bv(e) => {
                    if !seen.insert(e.id()) {
                        continue;
                    }
                    match e.expr() {
                        BvExpr::Sym { .. } => out.push(e.clone()),
                        BvExpr::Const(_) => {}
                        BvExpr::Unary { child, .. } => stack.push(Item::Bv(child.clone())),
                        BvExpr::Nary { children, .. } | BvExpr::Concat { children } => {
                            stack.extend(children.iter().cloned().map(Item::Bv));
                        }
                        BvExpr::Binary { lhs, rhs, .. } => {
                            stack.push(Item::Bv(lhs.clone()));
                            stack.push(Item::Bv(rhs.clone()));
                        }
                        BvExpr::Extract { child, .. } | BvExpr::Extend { child, .. } => {
                            stack.push(Item::Bv(child.clone()));
                        }
                        BvExpr::Ite {
                            cond,
                            then_expr,
                            else_expr,
                        } => {
                            stack.push(Item::Bool(cond.clone()));
                            stack.push(Item::Bv(then_expr.clone()));
                            stack.push(Item::Bv(else_expr.clone()));
                        }
                    }
                }
                Item::Bool(e) => {
                    if !seen.insert(e.id()) {
                        continue;
                    }
                    match e.expr() {
                        BoolExpr::Const(_) => {}
                        BoolExpr::Not(child) => stack.push(Item::Bool(child.clone())),
                        BoolExpr::Nary { children, .. } => {
                            stack.extend(children.iter().cloned().map(Item::Bool));
                        }
                        BoolExpr::Cmp { lhs, rhs, .. } => {
                            stack.push(Item::Bv(lhs.clone()));
                            stack.push(Item::Bv(rhs.clone()));
                        }
                    }
                }
            }
        }

        out.sort_by_key(BvExprPtr::id);
        out
    }

    /// Snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> BuilderStats {
        self.inner.lock().expect("builder lock poisoned").stats
    }

    /// Sweeps every bucket, dropping entries whose nodes have died.
    ///
    /// Pruning also happens lazily whenever a bucket is probed; this is the
    /// on-demand compaction pass.
    pub fn purge_dead(&self) {
        let mut inner = self.inner.lock().expect("builder lock poisoned");
        let mut pruned: u64 = 0;
        inner.bv_cache.retain(|_, bucket| {
            bucket.retain(|weak| {
                let alive = weak.strong_count() > 0;
                if !alive {
                    pruned += 1;
                }
                alive
            });
            !bucket.is_empty()
        });
        inner.stats.live_bv -= pruned;

        pruned = 0;
        inner.bool_cache.retain(|_, bucket| {
            bucket.retain(|weak| {
                let alive = weak.strong_count() > 0;
                if !alive {
                    pruned += 1;
                }
                alive
            });
            !bucket.is_empty()
        });
        inner.stats.live_bool -= pruned;
        tracing::debug!(stats = %inner.stats, "purged dead cache entries");
    }
}

impl Default for ExprBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_interned() {
        let eb = ExprBuilder::new();
        let s1 = eb.mk_bvs("s1", 32);
        let s2 = eb.mk_bvs("s2", 32);
        let e = eb.mk_add(&s1, &s2).unwrap();

        let s1_again = eb.mk_bvs("s1", 32);
        assert_eq!(s1.id(), s1_again.id());
        let e_again = eb.mk_add(&s1_again, &s2).unwrap();
        assert_eq!(e.id(), e_again.id());
    }

    #[test]
    fn same_name_different_width_is_distinct() {
        let eb = ExprBuilder::new();
        let a32 = eb.mk_bvs("a", 32);
        let a64 = eb.mk_bvs("a", 64);
        assert_ne!(a32.id(), a64.id());
    }

    #[test]
    fn dead_nodes_are_reinterned_fresh() {
        let eb = ExprBuilder::new();
        let old_id = {
            let s1 = eb.mk_bvs("s1", 32);
            s1.id()
        };
        // s1 is gone; a fresh intern must produce a new node.
        eb.purge_dead();
        let s1 = eb.mk_bvs("s1", 32);
        assert_ne!(s1.id(), old_id);

        // While alive, re-interning hits the cache.
        assert_eq!(eb.mk_bvs("s1", 32).id(), s1.id());
    }

    #[test]
    fn live_nodes_survive_noise() {
        let eb = ExprBuilder::new();
        let s1 = eb.mk_bvs("s1", 32);
        let s2 = eb.mk_bvs("s2", 32);
        let e = eb.mk_add(&s1, &s2).unwrap();
        let (id1, id2, ide) = (s1.id(), s2.id(), e.id());

        for i in 0..32 {
            let _ = eb.mk_bvv(i, 32);
        }
        eb.purge_dead();

        assert_eq!(eb.mk_bvs("s1", 32).id(), id1);
        assert_eq!(eb.mk_bvs("s2", 32).id(), id2);
        assert_eq!(eb.mk_add(&s1, &s2).unwrap().id(), ide);
    }

    #[test]
    fn stats_track_hits() {
        let eb = ExprBuilder::new();
        let _a = eb.mk_bvs("a", 8);
        let _b = eb.mk_bvs("a", 8);
        let stats = eb.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.live_bv, 1);
    }

    #[test]
    fn involved_inputs_deduplicates() {
        let eb = ExprBuilder::new();
        let a = eb.mk_bvs("a", 16);
        let b = eb.mk_bvs("b", 16);
        let e = eb.mk_add(&a, &b).unwrap();
        let e = eb.mk_mul(&e, &a).unwrap();
        let q = eb.mk_ult(&e, &eb.mk_bvv(100, 16)).unwrap();

        let inputs = eb.involved_inputs(&q);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].id(), a.id());
        assert_eq!(inputs[1].id(), b.id());
    }
}
