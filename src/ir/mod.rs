//! The expression-tree intermediate representation.
//!
//! A [`Function`] owns all of its expression nodes in a flat arena; nodes reference
//! each other through [`ExprId`] handles rather than pointers, so node identity is
//! stable and cheap to use as a map key. The tree is structured (blocks, loops,
//! ifs, labeled branches) rather than a flat instruction list; control flow is
//! recovered from the structure by [`crate::analysis::ControlFlowGraph`].
//!
//! # Construction
//!
//! [`FunctionBuilder`] is the intended way to build bodies:
//!
//! ```rust
//! use stackir::prelude::*;
//!
//! let mut b = FunctionBuilder::new("dec", vec![ValType::I32], vec![]);
//! let p = b.get(0);
//! let one = b.i32_const(1);
//! let sub = b.binary(BinaryOp::Sub, p, one);
//! let body = b.ret(Some(sub));
//! let func = b.finish(body);
//! assert_eq!(func.num_locals(), 1);
//! ```
//!
//! # Mutation contract
//!
//! The tree is logically frozen while any analysis built from it is alive.
//! [`Function::replace_child`] exists so that optimization passes can rewrite the
//! tree in place through the analysis' location map; after that, every
//! outstanding analysis result is invalid and must be rebuilt.

mod expr;
mod function;
mod module;
mod types;

pub use expr::{Expr, ExprId, NodeLocation};
pub use function::{Function, FunctionBuilder, LocalIndex};
pub use module::Module;
pub use types::{BinaryOp, Literal, ValType};
