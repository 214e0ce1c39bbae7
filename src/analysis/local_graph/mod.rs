//! Read→write reaching analysis for function-local slots.
//!
//! [`LocalGraph`] connects every [`LocalGet`](crate::ir::Expr::LocalGet) in a
//! function body to the set of [`LocalSet`](crate::ir::Expr::LocalSet) nodes
//! whose value may reach it, with [`Origin::Implicit`] standing in for the
//! slot's initial value. On top of the core map it offers equivalence queries
//! and, computed on demand, influence maps in both directions and SSA-form
//! detection per slot.

mod flow;

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::cfg::ControlFlowGraph,
    ir::{Expr, ExprId, Function, LocalIndex, NodeLocation},
    Result,
};

pub use flow::Origin;

use flow::ReachingDefinitionFlow;

/// The reaching-definitions map of one function, plus derived analyses.
///
/// Construction runs the full dataflow; the influence maps and SSA set are
/// computed only when asked for, since many callers need only [`origins`].
///
/// [`origins`]: LocalGraph::origins
///
/// # Examples
///
/// ```
/// use stackir::prelude::*;
///
/// let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![ValType::I32]);
/// let one = b.i32_const(1);
/// let set = b.set(1, one);
/// let get = b.get(1);
/// let d = b.drop_(get);
/// let body = b.block(vec![set, d]);
/// let func = b.finish(body);
///
/// let graph = LocalGraph::new(&func)?;
/// assert_eq!(graph.origins(get), &[Origin::Set(set)].into_iter().collect());
/// # Ok::<(), stackir::Error>(())
/// ```
pub struct LocalGraph<'f> {
    func: &'f Function,
    /// Every reachable read, mapped to its full (non-empty) origin set.
    get_origins: HashMap<ExprId, HashSet<Origin>>,
    /// Parent/child-slot coordinates of every tracked read and write, for
    /// in-place rewriting by optimization passes.
    locations: HashMap<ExprId, NodeLocation>,
    set_influences: Option<HashMap<ExprId, HashSet<ExprId>>>,
    get_influences: Option<HashMap<ExprId, HashSet<ExprId>>>,
    ssa_locals: Option<HashSet<LocalIndex>>,
}

impl<'f> LocalGraph<'f> {
    /// Builds the graph for `func`, running the reaching-definitions flow.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is malformed: a branch to an unknown
    /// label, a slot index past the function's locals, or a missing body.
    pub fn new(func: &'f Function) -> Result<Self> {
        let cfg = ControlFlowGraph::build(func)?;
        let locations = cfg.locations().clone();
        let get_origins = ReachingDefinitionFlow::new(cfg, func.num_locals()).solve();
        Ok(LocalGraph {
            func,
            get_origins,
            locations,
            set_influences: None,
            get_influences: None,
            ssa_locals: None,
        })
    }

    /// The function this graph was built for.
    #[must_use]
    pub const fn function(&self) -> &'f Function {
        self.func
    }

    /// The origin set of one read. Never empty.
    ///
    /// # Panics
    ///
    /// Panics if `get` is not a reachable [`LocalGet`](Expr::LocalGet) of this
    /// function. Querying an untracked node is a caller bug, not a recoverable
    /// condition.
    #[must_use]
    pub fn origins(&self, get: ExprId) -> &HashSet<Origin> {
        self.get_origins
            .get(&get)
            .unwrap_or_else(|| panic!("{get} is not a tracked local.get"))
    }

    /// Iterates over every tracked read with its origin set.
    pub fn reads(&self) -> impl Iterator<Item = (ExprId, &HashSet<Origin>)> + '_ {
        self.get_origins.iter().map(|(id, origins)| (*id, origins))
    }

    /// Number of tracked reads.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.get_origins.len()
    }

    /// Tree coordinates (parent and child slot) of every tracked read and
    /// write, so a pass can splice replacement nodes in place.
    #[must_use]
    pub const fn locations(&self) -> &HashMap<ExprId, NodeLocation> {
        &self.locations
    }

    /// Whether two reads are known to observe the same value.
    ///
    /// Conservative: `true` only when both reads have exactly one origin and
    /// the origins provably coincide: the same write, the same incoming
    /// parameter, or the zero init of two plain locals of the same type. Any
    /// merge point makes this `false` even if the merged values happen to be
    /// equal.
    #[must_use]
    pub fn equivalent(&self, a: ExprId, b: ExprId) -> bool {
        let origins_a = self.origins(a);
        let origins_b = self.origins(b);
        if origins_a.len() != 1 || origins_b.len() != 1 {
            return false;
        }
        let origin_a = origins_a.iter().next().unwrap();
        let origin_b = origins_b.iter().next().unwrap();
        match (origin_a, origin_b) {
            (Origin::Set(x), Origin::Set(y)) => x == y,
            (Origin::Implicit, Origin::Implicit) => {
                let index_a = self.get_index(a);
                let index_b = self.get_index(b);
                match (self.func.is_param(index_a), self.func.is_param(index_b)) {
                    // Two reads of the same incoming parameter value.
                    (true, true) => index_a == index_b,
                    // Zero inits of the same type hold the same value even
                    // across distinct slots.
                    (false, false) => {
                        self.func.local_type(index_a) == self.func.local_type(index_b)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Computes, for every write, the reads it may supply. Idempotent.
    pub fn compute_set_influences(&mut self) {
        if self.set_influences.is_some() {
            return;
        }
        let mut influences: HashMap<ExprId, HashSet<ExprId>> = HashMap::new();
        for (get, origins) in &self.get_origins {
            for origin in origins {
                if let Origin::Set(set) = origin {
                    influences.entry(*set).or_default().insert(*get);
                }
            }
        }
        self.set_influences = Some(influences);
    }

    /// The reads a write may supply.
    ///
    /// # Panics
    ///
    /// Panics unless [`compute_set_influences`](Self::compute_set_influences)
    /// ran first.
    #[must_use]
    pub fn set_influences(&self, set: ExprId) -> Option<&HashSet<ExprId>> {
        self.set_influences
            .as_ref()
            .expect("set influences were not computed")
            .get(&set)
    }

    /// Computes, for every read, the writes whose stored value is computed
    /// from it: every tracked write whose value subtree contains the read.
    /// Idempotent.
    pub fn compute_get_influences(&mut self) {
        if self.get_influences.is_some() {
            return;
        }
        let mut influences: HashMap<ExprId, HashSet<ExprId>> = HashMap::new();
        // Only tracked (reachable) writes participate; dead code never
        // influences anything.
        for id in self.locations.keys().copied() {
            if !self.func.expr(id).is_set() {
                continue;
            }
            for child in self.func.descendants(id) {
                if child != id && self.func.expr(child).is_get() {
                    influences.entry(child).or_default().insert(id);
                }
            }
        }
        self.get_influences = Some(influences);
    }

    /// The writes whose stored value depends on a read.
    ///
    /// # Panics
    ///
    /// Panics unless [`compute_get_influences`](Self::compute_get_influences)
    /// ran first.
    #[must_use]
    pub fn get_influences(&self, get: ExprId) -> Option<&HashSet<ExprId>> {
        self.get_influences
            .as_ref()
            .expect("get influences were not computed")
            .get(&get)
    }

    /// Finds the slots in SSA form: exactly one origin across the whole
    /// function, counting the implicit init as an origin. Idempotent.
    ///
    /// A second reachable write disqualifies a slot even when it supplies no
    /// read. Writes in unreachable code are not tracked and do not count.
    pub fn compute_ssa_locals(&mut self) {
        if self.ssa_locals.is_some() {
            return;
        }
        let mut origin_of: HashMap<LocalIndex, Origin> = HashMap::new();
        let mut disqualified: HashSet<LocalIndex> = HashSet::new();
        for (get, origins) in &self.get_origins {
            let index = self.get_index(*get);
            for origin in origins {
                match origin_of.get(&index) {
                    None => {
                        origin_of.insert(index, *origin);
                    }
                    Some(seen) if seen == origin => {}
                    Some(_) => {
                        disqualified.insert(index);
                    }
                }
            }
        }
        // Second pass over the tracked writes: a reachable write no read
        // consumes still counts as an origin of its slot.
        for id in self.locations.keys().copied() {
            if let Expr::LocalSet { index, .. } = self.func.expr(id) {
                match origin_of.get(index) {
                    None => {
                        origin_of.insert(*index, Origin::Set(id));
                    }
                    Some(Origin::Set(seen)) if *seen == id => {}
                    Some(_) => {
                        disqualified.insert(*index);
                    }
                }
            }
        }
        let ssa = origin_of
            .keys()
            .copied()
            .filter(|index| !disqualified.contains(index))
            .collect();
        self.ssa_locals = Some(ssa);
    }

    /// Whether a slot is in SSA form.
    ///
    /// Slots no tracked read or write ever mentions have no established
    /// origin and report `false`.
    ///
    /// # Panics
    ///
    /// Panics unless [`compute_ssa_locals`](Self::compute_ssa_locals) ran
    /// first, or if `index` is out of range.
    #[must_use]
    pub fn is_ssa(&self, index: LocalIndex) -> bool {
        assert!(
            index < self.func.num_locals(),
            "local index {index} out of range"
        );
        self.ssa_locals
            .as_ref()
            .expect("SSA locals were not computed")
            .contains(&index)
    }

    /// Slot index of a tracked read.
    fn get_index(&self, get: ExprId) -> LocalIndex {
        match self.func.expr(get) {
            Expr::LocalGet { index } => *index,
            other => panic!("{get} is not a local.get: {other:?}"),
        }
    }
}

impl std::fmt::Debug for LocalGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGraph")
            .field("function", &self.func.name())
            .field("reads", &self.get_origins.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, ValType};

    #[test]
    fn test_origins_panics_on_untracked_node() {
        let mut b = FunctionBuilder::new("f", vec![], vec![]);
        let body = b.nop();
        let func = b.finish(body);
        let graph = LocalGraph::new(&func).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            graph.origins(body);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_equivalent_same_write() {
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let c = b.i32_const(5);
        let w = b.set(0, c);
        let r1 = b.get(0);
        let d1 = b.drop_(r1);
        let r2 = b.get(0);
        let d2 = b.drop_(r2);
        let body = b.block(vec![w, d1, d2]);
        let func = b.finish(body);

        let graph = LocalGraph::new(&func).unwrap();
        assert!(graph.equivalent(r1, r2));
    }

    #[test]
    fn test_equivalent_implicit_rules() {
        // p0, p1: i32 params; x: i32 local; y: i64 local; z: i32 local
        let mut b = FunctionBuilder::new(
            "f",
            vec![ValType::I32, ValType::I32],
            vec![ValType::I32, ValType::I64, ValType::I32],
        );
        let p0 = b.get(0);
        let p0_again = b.get(0);
        let p1 = b.get(1);
        let x = b.get(2);
        let y = b.get(3);
        let z = b.get(4);
        let drops: Vec<_> = [p0, p0_again, p1, x, y, z]
            .into_iter()
            .map(|g| b.drop_(g))
            .collect();
        let body = b.block(drops);
        let func = b.finish(body);

        let graph = LocalGraph::new(&func).unwrap();
        // Same parameter: equivalent. Different parameters: not.
        assert!(graph.equivalent(p0, p0_again));
        assert!(!graph.equivalent(p0, p1));
        // Parameter vs zero-init local: never.
        assert!(!graph.equivalent(p0, x));
        // Zero inits: equivalent iff same type.
        assert!(graph.equivalent(x, z));
        assert!(!graph.equivalent(x, y));
    }

    #[test]
    fn test_equivalent_rejects_merged_reads() {
        // if p { x = 1 }; r = x — r has two origins, so nothing pairs with it.
        let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![ValType::I32]);
        let p = b.get(0);
        let c = b.i32_const(1);
        let w = b.set(1, c);
        let iff = b.if_(p, w);
        let r1 = b.get(1);
        let d1 = b.drop_(r1);
        let r2 = b.get(1);
        let d2 = b.drop_(r2);
        let body = b.block(vec![iff, d1, d2]);
        let func = b.finish(body);

        let graph = LocalGraph::new(&func).unwrap();
        assert!(!graph.equivalent(r1, r2));
    }

    #[test]
    fn test_set_influences() {
        let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![ValType::I32]);
        let p = b.get(0);
        let c1 = b.i32_const(1);
        let w1 = b.set(1, c1);
        let c2 = b.i32_const(2);
        let w2 = b.set(1, c2);
        let iff = b.if_else(p, w1, w2);
        let r = b.get(1);
        let d = b.drop_(r);
        let body = b.block(vec![iff, d]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_set_influences();
        assert_eq!(graph.set_influences(w1), Some(&HashSet::from([r])));
        assert_eq!(graph.set_influences(w2), Some(&HashSet::from([r])));
    }

    #[test]
    #[should_panic(expected = "set influences were not computed")]
    fn test_set_influences_requires_compute() {
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let c = b.i32_const(1);
        let w = b.set(0, c);
        let func = b.finish(w);
        let graph = LocalGraph::new(&func).unwrap();
        graph.set_influences(w);
    }

    #[test]
    fn test_get_influences_tracks_containment() {
        // y = x + x: both reads of x influence the write to y.
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32, ValType::I32]);
        let r1 = b.get(0);
        let r2 = b.get(0);
        let sum = b.binary(crate::ir::BinaryOp::Add, r1, r2);
        let w = b.set(1, sum);
        let func = b.finish(w);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_get_influences();
        assert_eq!(graph.get_influences(r1), Some(&HashSet::from([w])));
        assert_eq!(graph.get_influences(r2), Some(&HashSet::from([w])));
    }

    #[test]
    fn test_get_influences_skips_unreachable_writes() {
        // return; x = p: the write sits in dead code, so the read of p nested
        // in it influences nothing.
        let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![ValType::I32]);
        let live = b.get(0);
        let d = b.drop_(live);
        let ret = b.ret(None);
        let p = b.get(0);
        let dead = b.set(1, p);
        let body = b.block(vec![d, ret, dead]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_get_influences();
        assert_eq!(graph.get_influences(p), None);
        assert_eq!(graph.get_influences(live), None);
    }

    #[test]
    fn test_get_influences_ignores_unrelated_reads() {
        // x = 1; drop y — the read of y feeds no write.
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32, ValType::I32]);
        let c = b.i32_const(1);
        let w = b.set(0, c);
        let r = b.get(1);
        let d = b.drop_(r);
        let body = b.block(vec![w, d]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_get_influences();
        assert_eq!(graph.get_influences(r), None);
    }

    #[test]
    fn test_ssa_detection() {
        // p: param read twice (SSA); x: written once (SSA);
        // y: written twice (not SSA); z: never mentioned (no origin, not SSA).
        let mut b = FunctionBuilder::new(
            "f",
            vec![ValType::I32],
            vec![ValType::I32, ValType::I32, ValType::I32],
        );
        let p1 = b.get(0);
        let d1 = b.drop_(p1);
        let p2 = b.get(0);
        let d2 = b.drop_(p2);
        let c1 = b.i32_const(1);
        let wx = b.set(1, c1);
        let c2 = b.i32_const(2);
        let wy1 = b.set(2, c2);
        let c3 = b.i32_const(3);
        let wy2 = b.set(2, c3);
        let body = b.block(vec![d1, d2, wx, wy1, wy2]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_ssa_locals();
        assert!(graph.is_ssa(0));
        assert!(graph.is_ssa(1));
        assert!(!graph.is_ssa(2));
        assert!(!graph.is_ssa(3));
    }

    #[test]
    fn test_ssa_ignores_unmentioned_slot() {
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let body = b.nop();
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_ssa_locals();
        assert!(!graph.is_ssa(0));
    }

    #[test]
    fn test_ssa_ignores_unreachable_write() {
        // x = 1; drop x; return; x = 2: the second write cannot execute and
        // does not cost the slot its single-assignment status.
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let c1 = b.i32_const(1);
        let w1 = b.set(0, c1);
        let r = b.get(0);
        let d = b.drop_(r);
        let ret = b.ret(None);
        let c2 = b.i32_const(2);
        let dead = b.set(0, c2);
        let body = b.block(vec![w1, d, ret, dead]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        assert!(!graph.locations().contains_key(&dead));
        graph.compute_ssa_locals();
        assert!(graph.is_ssa(0));
    }

    #[test]
    fn test_ssa_implicit_plus_write_disqualifies() {
        // r = x; x = 1 — the read sees the init, so the write is a second origin.
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let r = b.get(0);
        let d = b.drop_(r);
        let c = b.i32_const(1);
        let w = b.set(0, c);
        let body = b.block(vec![d, w]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_ssa_locals();
        assert!(!graph.is_ssa(0));
    }

    #[test]
    fn test_ssa_unread_second_write_disqualifies() {
        // x = 1; r = x; x = 2 — the second write reaches nothing, yet the slot
        // is statically multi-assigned.
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let c1 = b.i32_const(1);
        let w1 = b.set(0, c1);
        let r = b.get(0);
        let d = b.drop_(r);
        let c2 = b.i32_const(2);
        let w2 = b.set(0, c2);
        let body = b.block(vec![w1, d, w2]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_ssa_locals();
        assert!(!graph.is_ssa(0));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
        let c = b.i32_const(1);
        let w = b.set(0, c);
        let r = b.get(0);
        let d = b.drop_(r);
        let body = b.block(vec![w, d]);
        let func = b.finish(body);

        let mut graph = LocalGraph::new(&func).unwrap();
        graph.compute_set_influences();
        graph.compute_ssa_locals();
        let before = graph.set_influences(w).cloned();
        graph.compute_set_influences();
        graph.compute_ssa_locals();
        assert_eq!(graph.set_influences(w).cloned(), before);
        assert!(graph.is_ssa(0));
    }
}
