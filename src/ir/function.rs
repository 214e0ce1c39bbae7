//! Function representation: the local slot table and the expression arena.

use std::fmt;

use crate::ir::{BinaryOp, Expr, ExprId, Literal, NodeLocation, ValType};

/// Index of a local slot (parameter or plain local) within one function.
///
/// Slots `0..num_params` are parameters; the remainder are plain locals that start
/// life holding their type's zero value. The namespace is owned by the function —
/// analyses never extend or renumber it.
pub type LocalIndex = u32;

/// A function: its local slot table and the expression tree of its body.
///
/// All expression nodes live in an arena owned by the function and are addressed
/// by [`ExprId`] handles. The body, when present, is a single root node.
///
/// # Examples
///
/// ```rust
/// use stackir::prelude::*;
///
/// let mut b = FunctionBuilder::new("id", vec![ValType::I32], vec![]);
/// let p = b.get(0);
/// let body = b.ret(Some(p));
/// let func = b.finish(body);
///
/// assert!(func.is_param(0));
/// assert_eq!(func.local_type(0), ValType::I32);
/// ```
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name, unique within its module.
    name: String,
    /// Parameter types; slot `i` of the local namespace for `i < params.len()`.
    params: Vec<ValType>,
    /// Plain (non-parameter) local types, continuing the slot namespace.
    vars: Vec<ValType>,
    /// The expression arena.
    exprs: Vec<Expr>,
    /// The body root, if the function has a body.
    body: Option<ExprId>,
}

impl Function {
    /// Creates a bodyless function with the given signature.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<ValType>, vars: Vec<ValType>) -> Self {
        Function {
            name: name.into(),
            params,
            vars,
            exprs: Vec::new(),
            body: None,
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn num_params(&self) -> u32 {
        self.params.len() as u32
    }

    /// Returns the total number of local slots (parameters plus plain locals).
    #[must_use]
    pub fn num_locals(&self) -> u32 {
        (self.params.len() + self.vars.len()) as u32
    }

    /// Returns `true` if slot `index` is a parameter.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the local table; that is a caller defect.
    #[must_use]
    pub fn is_param(&self, index: LocalIndex) -> bool {
        assert!(
            index < self.num_locals(),
            "local index {index} out of range for function '{}'",
            self.name
        );
        (index as usize) < self.params.len()
    }

    /// Returns the declared type of slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the local table; that is a caller defect.
    #[must_use]
    pub fn local_type(&self, index: LocalIndex) -> ValType {
        let i = index as usize;
        if i < self.params.len() {
            self.params[i]
        } else if i - self.params.len() < self.vars.len() {
            self.vars[i - self.params.len()]
        } else {
            panic!(
                "local index {index} out of range for function '{}'",
                self.name
            );
        }
    }

    /// Allocates a node in the arena and returns its handle.
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    /// Returns the node behind a handle.
    ///
    /// # Panics
    ///
    /// Panics on a handle from another function (out of range); caller defect.
    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Returns a mutable reference to the node behind a handle.
    ///
    /// Mutating the tree invalidates every analysis built from this function.
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    /// Returns the number of allocated nodes.
    #[must_use]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Returns the body root, if present.
    #[must_use]
    pub fn body(&self) -> Option<ExprId> {
        self.body
    }

    /// Sets the body root.
    pub fn set_body(&mut self, body: ExprId) {
        self.body = Some(body);
    }

    /// Iterates over `root` and all nodes syntactically nested inside it, in
    /// depth-first pre-order.
    ///
    /// This is *containment*, not control flow: every child of every visited node
    /// is visited, whether or not it could execute.
    pub fn descendants(&self, root: ExprId) -> Descendants<'_> {
        Descendants {
            func: self,
            stack: vec![root],
        }
    }

    /// Replaces the node held at `location` with `replacement`.
    ///
    /// Together with the location map an analysis exposes, this lets a pass
    /// rewrite the tree in place. Doing so invalidates all outstanding analyses.
    ///
    /// # Panics
    ///
    /// Panics if the location does not name an occupied child slot; caller defect.
    pub fn replace_child(&mut self, location: NodeLocation, replacement: ExprId) {
        let Some(parent) = location.parent else {
            self.body = Some(replacement);
            return;
        };
        let slot = location.child;
        match self.expr_mut(parent) {
            Expr::Binary { left, right, .. } => match slot {
                0 => *left = replacement,
                1 => *right = replacement,
                _ => panic!("binary node has no child slot {slot}"),
            },
            Expr::Drop { value } | Expr::LocalSet { value, .. } if slot == 0 => {
                *value = replacement;
            }
            Expr::Loop { body, .. } if slot == 0 => *body = replacement,
            Expr::Block { children, .. } => {
                assert!(slot < children.len(), "block has no child slot {slot}");
                children[slot] = replacement;
            }
            Expr::If {
                condition,
                if_true,
                if_false,
            } => match slot {
                0 => *condition = replacement,
                1 => *if_true = replacement,
                2 if if_false.is_some() => *if_false = Some(replacement),
                _ => panic!("if node has no child slot {slot}"),
            },
            Expr::Br { condition, .. } if slot == 0 && condition.is_some() => {
                *condition = Some(replacement);
            }
            Expr::Return { value } if slot == 0 && value.is_some() => {
                *value = Some(replacement);
            }
            other => panic!("node {other:?} has no child slot {slot}"),
        }
    }

    fn write_expr(&self, f: &mut fmt::Formatter<'_>, id: ExprId, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self.expr(id) {
            Expr::Nop => writeln!(f, "{pad}nop"),
            Expr::Unreachable => writeln!(f, "{pad}unreachable"),
            Expr::Const(lit) => writeln!(f, "{pad}{lit}"),
            Expr::Binary { op, left, right } => {
                writeln!(f, "{pad}{op}")?;
                self.write_expr(f, *left, indent + 1)?;
                self.write_expr(f, *right, indent + 1)
            }
            Expr::Drop { value } => {
                writeln!(f, "{pad}drop")?;
                self.write_expr(f, *value, indent + 1)
            }
            Expr::LocalGet { index } => writeln!(f, "{pad}local.get {index}"),
            Expr::LocalSet { index, value } => {
                writeln!(f, "{pad}local.set {index}")?;
                self.write_expr(f, *value, indent + 1)
            }
            Expr::Block { name, children } => {
                match name {
                    Some(n) => writeln!(f, "{pad}block ${n}")?,
                    None => writeln!(f, "{pad}block")?,
                }
                for child in children {
                    self.write_expr(f, *child, indent + 1)?;
                }
                writeln!(f, "{pad}end")
            }
            Expr::Loop { name, body } => {
                match name {
                    Some(n) => writeln!(f, "{pad}loop ${n}")?,
                    None => writeln!(f, "{pad}loop")?,
                }
                self.write_expr(f, *body, indent + 1)?;
                writeln!(f, "{pad}end")
            }
            Expr::If {
                condition,
                if_true,
                if_false,
            } => {
                writeln!(f, "{pad}if")?;
                self.write_expr(f, *condition, indent + 1)?;
                writeln!(f, "{pad}then")?;
                self.write_expr(f, *if_true, indent + 1)?;
                if let Some(else_arm) = if_false {
                    writeln!(f, "{pad}else")?;
                    self.write_expr(f, *else_arm, indent + 1)?;
                }
                writeln!(f, "{pad}end")
            }
            Expr::Br { target, condition } => {
                match condition {
                    Some(c) => {
                        writeln!(f, "{pad}br_if ${target}")?;
                        self.write_expr(f, *c, indent + 1)
                    }
                    None => writeln!(f, "{pad}br ${target}"),
                }
            }
            Expr::Return { value } => {
                writeln!(f, "{pad}return")?;
                if let Some(v) = value {
                    self.write_expr(f, *v, indent + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func ${} (", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")?;
        if !self.vars.is_empty() {
            write!(f, " locals (")?;
            for (i, v) in self.vars.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, ")")?;
        }
        writeln!(f)?;
        if let Some(body) = self.body {
            self.write_expr(f, body, 1)?;
        }
        Ok(())
    }
}

/// Depth-first pre-order iterator over a subtree; see [`Function::descendants`].
pub struct Descendants<'a> {
    func: &'a Function,
    stack: Vec<ExprId>,
}

impl Iterator for Descendants<'_> {
    type Item = ExprId;

    fn next(&mut self) -> Option<ExprId> {
        let id = self.stack.pop()?;
        let children = self.func.expr(id).children();
        self.stack.extend(children.into_iter().rev());
        Some(id)
    }
}

/// Incremental construction of a [`Function`] body.
///
/// Every method allocates one node and returns its handle; [`Self::finish`] seals
/// the function with the given body root. Label resolution and local-index range
/// checks are deferred to control-flow reduction, where they surface as
/// [`crate::Error`] values.
///
/// # Examples
///
/// ```rust
/// use stackir::prelude::*;
///
/// // fn count(n: i32) { local i: i32; loop { i = i + 1; br_if $top (i < n) } }
/// let mut b = FunctionBuilder::new("count", vec![ValType::I32], vec![ValType::I32]);
/// let i1 = b.get(1);
/// let one = b.i32_const(1);
/// let inc = b.binary(BinaryOp::Add, i1, one);
/// let set = b.set(1, inc);
/// let i2 = b.get(1);
/// let n = b.get(0);
/// let cmp = b.binary(BinaryOp::LtS, i2, n);
/// let back = b.br_if("top", cmp);
/// let body = b.block(vec![set, back]);
/// let looped = b.loop_("top", body);
/// let func = b.finish(looped);
/// ```
pub struct FunctionBuilder {
    func: Function,
}

impl FunctionBuilder {
    /// Starts building a function with the given signature.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<ValType>, vars: Vec<ValType>) -> Self {
        FunctionBuilder {
            func: Function::new(name, params, vars),
        }
    }

    /// Allocates a `nop`.
    pub fn nop(&mut self) -> ExprId {
        self.func.alloc(Expr::Nop)
    }

    /// Allocates an `unreachable`.
    pub fn unreachable(&mut self) -> ExprId {
        self.func.alloc(Expr::Unreachable)
    }

    /// Allocates a constant.
    pub fn constant(&mut self, literal: Literal) -> ExprId {
        self.func.alloc(Expr::Const(literal))
    }

    /// Allocates an `i32` constant.
    pub fn i32_const(&mut self, value: i32) -> ExprId {
        self.constant(Literal::I32(value))
    }

    /// Allocates an `i64` constant.
    pub fn i64_const(&mut self, value: i64) -> ExprId {
        self.constant(Literal::I64(value))
    }

    /// Allocates a binary operation.
    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.func.alloc(Expr::Binary { op, left, right })
    }

    /// Allocates a `drop` of `value`.
    pub fn drop_(&mut self, value: ExprId) -> ExprId {
        self.func.alloc(Expr::Drop { value })
    }

    /// Allocates a read of slot `index`.
    pub fn get(&mut self, index: LocalIndex) -> ExprId {
        self.func.alloc(Expr::LocalGet { index })
    }

    /// Allocates a write of `value` to slot `index`.
    pub fn set(&mut self, index: LocalIndex, value: ExprId) -> ExprId {
        self.func.alloc(Expr::LocalSet { index, value })
    }

    /// Allocates an unlabeled block.
    pub fn block(&mut self, children: Vec<ExprId>) -> ExprId {
        self.func.alloc(Expr::Block {
            name: None,
            children,
        })
    }

    /// Allocates a labeled block; branches to the label jump to its end.
    pub fn named_block(&mut self, name: impl Into<String>, children: Vec<ExprId>) -> ExprId {
        self.func.alloc(Expr::Block {
            name: Some(name.into()),
            children,
        })
    }

    /// Allocates a labeled loop; branches to the label jump back to its start.
    pub fn loop_(&mut self, name: impl Into<String>, body: ExprId) -> ExprId {
        self.func.alloc(Expr::Loop {
            name: Some(name.into()),
            body,
        })
    }

    /// Allocates an `if` without an else arm.
    pub fn if_(&mut self, condition: ExprId, if_true: ExprId) -> ExprId {
        self.func.alloc(Expr::If {
            condition,
            if_true,
            if_false: None,
        })
    }

    /// Allocates an `if`/`else`.
    pub fn if_else(&mut self, condition: ExprId, if_true: ExprId, if_false: ExprId) -> ExprId {
        self.func.alloc(Expr::If {
            condition,
            if_true,
            if_false: Some(if_false),
        })
    }

    /// Allocates an unconditional branch to `target`.
    pub fn br(&mut self, target: impl Into<String>) -> ExprId {
        self.func.alloc(Expr::Br {
            target: target.into(),
            condition: None,
        })
    }

    /// Allocates a conditional branch to `target`.
    pub fn br_if(&mut self, target: impl Into<String>, condition: ExprId) -> ExprId {
        self.func.alloc(Expr::Br {
            target: target.into(),
            condition: Some(condition),
        })
    }

    /// Allocates a `return`.
    pub fn ret(&mut self, value: Option<ExprId>) -> ExprId {
        self.func.alloc(Expr::Return { value })
    }

    /// Seals the function with `body` as the root and returns it.
    #[must_use]
    pub fn finish(mut self, body: ExprId) -> Function {
        self.func.set_body(body);
        self.func
    }
}
