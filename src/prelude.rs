//! Convenience re-exports for the common types.
//!
//! ```
//! use stackir::prelude::*;
//! ```

pub use crate::{
    analysis::{
        cfg::{Action, BasicBlock, BlockId, ControlFlowGraph},
        LocalGraph, ModuleAnalysis, Origin,
    },
    ir::{
        BinaryOp, Expr, ExprId, Function, FunctionBuilder, Literal, LocalIndex, Module,
        NodeLocation, ValType,
    },
    Error, Result,
};
