//! Expression nodes and the handles that address them.
//!
//! Expressions live in an arena owned by their [`crate::ir::Function`]; they
//! reference children through [`ExprId`] handles. The handle doubles as the node's
//! identity for every analysis map — two distinct occurrences of the same shape are
//! distinct nodes with distinct handles.

use std::fmt;

use crate::ir::{BinaryOp, Literal, LocalIndex};

/// A stable handle addressing one expression node within its owning function's
/// arena.
///
/// Handles are assigned sequentially as nodes are allocated and are never reused;
/// they stay valid for the lifetime of the function, across in-place rewrites.
/// They are only meaningful relative to the function that allocated them.
///
/// # Examples
///
/// ```rust
/// use stackir::prelude::*;
/// use std::collections::HashMap;
///
/// let mut b = FunctionBuilder::new("f", vec![], vec![]);
/// let a = b.nop();
/// let c = b.nop();
/// assert_ne!(a, c);
///
/// // Handles are Copy + Hash and key analysis maps.
/// let mut notes: HashMap<ExprId, &str> = HashMap::new();
/// notes.insert(a, "first");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    /// Creates a handle from a raw arena index.
    ///
    /// Primarily intended for internal use and testing; normal usage obtains
    /// handles from [`crate::ir::FunctionBuilder`] or [`crate::ir::Function::alloc`].
    #[must_use]
    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    /// Returns the raw arena index of this handle.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One expression node of the structured tree.
///
/// Children are execution-ordered: operands are evaluated before the operation
/// itself, an [`Expr::If`] evaluates its condition before either arm, and an
/// [`Expr::LocalSet`] evaluates its value before performing the write.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Does nothing.
    Nop,
    /// Traps; control never proceeds past this point.
    Unreachable,
    /// Produces a constant value.
    Const(Literal),
    /// Applies a two-operand operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: ExprId,
        /// Right operand.
        right: ExprId,
    },
    /// Evaluates and discards a value.
    Drop {
        /// The discarded operand.
        value: ExprId,
    },
    /// Reads a local slot.
    LocalGet {
        /// The slot being read.
        index: LocalIndex,
    },
    /// Writes a local slot.
    LocalSet {
        /// The slot being written.
        index: LocalIndex,
        /// The expression producing the written value.
        value: ExprId,
    },
    /// A sequence of children; an optional label that branches target to jump to
    /// the block's *end*.
    Block {
        /// Branch label, if any.
        name: Option<String>,
        /// Children, in execution order.
        children: Vec<ExprId>,
    },
    /// A loop; branches targeting its label jump back to the loop's *start*.
    Loop {
        /// Branch label, if any.
        name: Option<String>,
        /// The loop body.
        body: ExprId,
    },
    /// A two-way fork on a condition.
    If {
        /// The condition, evaluated first.
        condition: ExprId,
        /// Taken when the condition is non-zero.
        if_true: ExprId,
        /// Taken when the condition is zero; falls through when absent.
        if_false: Option<ExprId>,
    },
    /// A branch to an enclosing label, unconditional or conditional.
    Br {
        /// The targeted label.
        target: String,
        /// When present, the branch is taken only if this evaluates non-zero;
        /// otherwise control falls through.
        condition: Option<ExprId>,
    },
    /// Leaves the function, optionally producing a value.
    Return {
        /// The returned value, if any.
        value: Option<ExprId>,
    },
}

impl Expr {
    /// Returns this node's children in execution order.
    ///
    /// The position of a child in the returned list is its *child slot*, the
    /// second component of a [`NodeLocation`].
    #[must_use]
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expr::Nop | Expr::Unreachable | Expr::Const(_) | Expr::LocalGet { .. } => Vec::new(),
            Expr::Binary { left, right, .. } => vec![*left, *right],
            Expr::Drop { value } | Expr::LocalSet { value, .. } | Expr::Loop { body: value, .. } => {
                vec![*value]
            }
            Expr::Block { children, .. } => children.clone(),
            Expr::If {
                condition,
                if_true,
                if_false,
            } => {
                let mut out = vec![*condition, *if_true];
                if let Some(f) = if_false {
                    out.push(*f);
                }
                out
            }
            Expr::Br { condition, .. } => condition.iter().copied().collect(),
            Expr::Return { value } => value.iter().copied().collect(),
        }
    }

    /// Returns `true` for a [`Expr::LocalGet`].
    #[must_use]
    pub const fn is_get(&self) -> bool {
        matches!(self, Expr::LocalGet { .. })
    }

    /// Returns `true` for a [`Expr::LocalSet`].
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Expr::LocalSet { .. })
    }
}

/// The mutable position of a node within its tree.
///
/// A location names the slot holding a node: either a child slot of a parent
/// node, or the function's body root when `parent` is `None`. Optimization
/// passes use locations (via [`crate::analysis::LocalGraph::locations`]) together
/// with [`crate::ir::Function::replace_child`] to rewrite the tree in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeLocation {
    /// The parent holding the node, or `None` for the body root.
    pub parent: Option<ExprId>,
    /// The child slot within the parent (see [`Expr::children`]).
    pub child: usize,
}

impl NodeLocation {
    /// The location of the function body root.
    #[must_use]
    pub const fn root() -> Self {
        NodeLocation {
            parent: None,
            child: 0,
        }
    }

    /// A location inside a parent node.
    #[must_use]
    pub const fn child_of(parent: ExprId, child: usize) -> Self {
        NodeLocation {
            parent: Some(parent),
            child,
        }
    }
}
