//! Control-flow reduction of structured function bodies.
//!
//! [`ControlFlowGraph::build`] walks a function body in execution order and
//! reduces the structured tree (blocks, loops, ifs, labeled branches) to a flat
//! list of basic blocks wired by predecessor edges. Each block records the
//! variable reads and writes that occur in it, in execution order — the *actions*
//! the dataflow engine consumes.
//!
//! Two properties matter to the consumers:
//!
//! - Unreachable code (anything after an unconditional branch, `return` or
//!   `unreachable`, and anything only they dominate) produces no blocks and no
//!   actions: a write that cannot execute must never surface as a reaching
//!   definition.
//! - Branches that leave the function (`return`) are wired nowhere. Local slots
//!   do not survive the function boundary, so for this analysis such edges carry
//!   no information.
//!
//! # Example
//!
//! ```rust
//! use stackir::prelude::*;
//!
//! let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![]);
//! let cond = b.get(0);
//! let t = b.nop();
//! let e = b.nop();
//! let body = b.if_else(cond, t, e);
//! let func = b.finish(body);
//!
//! let cfg = ControlFlowGraph::build(&func)?;
//! // entry, true arm, false arm, join
//! assert_eq!(cfg.block_count(), 4);
//! # Ok::<(), stackir::Error>(())
//! ```

mod builder;

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use crate::{
    ir::{ExprId, Function, LocalIndex, NodeLocation},
    Result,
};

/// A strongly-typed handle for a basic block within one [`ControlFlowGraph`].
///
/// Blocks are assigned sequentially starting from 0; block 0 is always the entry
/// block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Creates a handle from a raw block index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// Returns the raw block index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// One variable operation as it occurs in a block, in execution order.
///
/// The acted-on slot index is carried alongside the node handle so the dataflow
/// engine never has to chase back into the tree on its hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A read of a local slot.
    Get {
        /// The reading [`crate::ir::Expr::LocalGet`] node.
        expr: ExprId,
        /// The slot being read.
        local: LocalIndex,
    },
    /// A write of a local slot.
    Set {
        /// The writing [`crate::ir::Expr::LocalSet`] node.
        expr: ExprId,
        /// The slot being written.
        local: LocalIndex,
    },
}

impl Action {
    /// Returns the node this action stems from.
    #[must_use]
    pub const fn expr(&self) -> ExprId {
        match self {
            Action::Get { expr, .. } | Action::Set { expr, .. } => *expr,
        }
    }

    /// Returns the slot this action touches.
    #[must_use]
    pub const fn local(&self) -> LocalIndex {
        match self {
            Action::Get { local, .. } | Action::Set { local, .. } => *local,
        }
    }

    /// Returns `true` for a read.
    #[must_use]
    pub const fn is_get(&self) -> bool {
        matches!(self, Action::Get { .. })
    }
}

/// A basic block: an execution-ordered action sequence plus predecessor edges.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    /// Reads and writes in execution order.
    pub(crate) actions: Vec<Action>,
    /// Blocks control may arrive from.
    pub(crate) preds: Vec<BlockId>,
}

impl BasicBlock {
    /// Returns the block's actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Returns the block's predecessors.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.preds
    }
}

/// The control-flow graph of one function body.
///
/// Owns the block arena, the entry designation, and the location map recording
/// the mutable tree position of every tracked read and write.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) entry: BlockId,
    pub(crate) locations: HashMap<ExprId, NodeLocation>,
}

impl ControlFlowGraph {
    /// Reduces `func`'s body to basic blocks.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::MissingBody`] for a bodyless function.
    /// - [`crate::Error::UnknownLabel`] if a branch targets a label no enclosing
    ///   block or loop declares.
    /// - [`crate::Error::InvalidLocal`] if a read or write references a slot
    ///   outside the function's local table.
    pub fn build(func: &Function) -> Result<Self> {
        builder::reduce(func)
    }

    /// Returns the entry block handle.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns a block by handle.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Returns all blocks, indexed by [`BlockId`].
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the tree positions of all tracked reads and writes.
    #[must_use]
    pub fn locations(&self) -> &HashMap<ExprId, NodeLocation> {
        &self.locations
    }

    /// Renders the graph in Graphviz dot format, for debugging.
    ///
    /// Each node shows the block handle and its action count; edges run from
    /// predecessor to block.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph cfg {\n");
        for (i, block) in self.blocks.iter().enumerate() {
            let id = BlockId(i);
            let shape = if id == self.entry { "doublecircle" } else { "box" };
            let _ = writeln!(
                out,
                "  {id} [shape={shape}, label=\"{id} ({} actions)\"];",
                block.actions.len()
            );
            for pred in &block.preds {
                let _ = writeln!(out, "  {pred} -> {id};");
            }
        }
        out.push_str("}\n");
        out
    }
}
