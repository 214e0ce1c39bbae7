//! Structured-tree to basic-block reduction.
//!
//! The walk follows execution order: operands before operations, a set's value
//! before the write. Control constructs fork, join and loop the current block:
//!
//! - `if` forks fresh blocks for its arms after the condition and joins them
//!   afterwards; a missing else arm links the fork block straight to the join.
//! - `loop` opens a fresh header block so branches to its label can wire back
//!   edges.
//! - branches to a `block` label collect as pending sources and are wired to a
//!   fresh block opened at the block's end.
//! - unconditional `br`, `return` and `unreachable` terminate the current block
//!   with no fallthrough; the walk continues with no current block, and nothing
//!   encountered in that state is recorded.
//!
//! Labels scope lexically, innermost shadowing outermost.

use std::collections::HashMap;

use crate::{
    analysis::cfg::{Action, BasicBlock, BlockId, ControlFlowGraph},
    ir::{Expr, ExprId, Function, LocalIndex, NodeLocation},
    Error, Result,
};

/// A lexically scoped branch target.
struct Scope {
    name: String,
    kind: ScopeKind,
}

enum ScopeKind {
    /// Branches jump forward to the block's end; sources collect until then.
    Block { pending: Vec<BlockId> },
    /// Branches jump back to the loop header. `None` when the loop itself sits
    /// in unreachable code and never got a header.
    Loop { header: Option<BlockId> },
}

pub(super) fn reduce(func: &Function) -> Result<ControlFlowGraph> {
    let body = func
        .body()
        .ok_or_else(|| Error::MissingBody(func.name().to_string()))?;

    let mut walker = Walker {
        func,
        blocks: vec![BasicBlock::default()],
        current: Some(BlockId(0)),
        scopes: Vec::new(),
        locations: HashMap::new(),
    };
    walker.visit(body, NodeLocation::root())?;

    Ok(ControlFlowGraph {
        blocks: walker.blocks,
        entry: BlockId(0),
        locations: walker.locations,
    })
}

struct Walker<'f> {
    func: &'f Function,
    blocks: Vec<BasicBlock>,
    /// The block under construction; `None` while walking unreachable code.
    current: Option<BlockId>,
    scopes: Vec<Scope>,
    locations: HashMap<ExprId, NodeLocation>,
}

impl Walker<'_> {
    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::default());
        id
    }

    fn link(&mut self, from: BlockId, to: BlockId) {
        self.blocks[to.index()].preds.push(from);
    }

    fn check_local(&self, index: LocalIndex) -> Result<()> {
        let count = self.func.num_locals();
        if index >= count {
            return Err(Error::InvalidLocal { index, count });
        }
        Ok(())
    }

    fn visit(&mut self, id: ExprId, loc: NodeLocation) -> Result<()> {
        let func = self.func;
        match func.expr(id) {
            Expr::Nop | Expr::Const(_) => {}

            Expr::Unreachable => {
                self.current = None;
            }

            Expr::Binary { left, right, .. } => {
                self.visit(*left, NodeLocation::child_of(id, 0))?;
                self.visit(*right, NodeLocation::child_of(id, 1))?;
            }

            Expr::Drop { value } => {
                self.visit(*value, NodeLocation::child_of(id, 0))?;
            }

            Expr::LocalGet { index } => {
                self.check_local(*index)?;
                if let Some(cur) = self.current {
                    self.blocks[cur.index()].actions.push(Action::Get {
                        expr: id,
                        local: *index,
                    });
                    self.locations.insert(id, loc);
                }
            }

            Expr::LocalSet { index, value } => {
                self.check_local(*index)?;
                self.visit(*value, NodeLocation::child_of(id, 0))?;
                if let Some(cur) = self.current {
                    self.blocks[cur.index()].actions.push(Action::Set {
                        expr: id,
                        local: *index,
                    });
                    self.locations.insert(id, loc);
                }
            }

            Expr::Block { name, children } => {
                if let Some(n) = name {
                    self.scopes.push(Scope {
                        name: n.clone(),
                        kind: ScopeKind::Block {
                            pending: Vec::new(),
                        },
                    });
                }
                for (i, child) in children.iter().enumerate() {
                    self.visit(*child, NodeLocation::child_of(id, i))?;
                }
                if name.is_some() {
                    let scope = self.scopes.pop().expect("scope stack imbalance");
                    let ScopeKind::Block { pending } = scope.kind else {
                        unreachable!("block scope popped as loop");
                    };
                    if !pending.is_empty() {
                        let join = self.new_block();
                        if let Some(cur) = self.current {
                            self.link(cur, join);
                        }
                        for src in pending {
                            self.link(src, join);
                        }
                        self.current = Some(join);
                    }
                }
            }

            Expr::Loop { name, body } => {
                let header = match self.current {
                    Some(cur) => {
                        let h = self.new_block();
                        self.link(cur, h);
                        self.current = Some(h);
                        Some(h)
                    }
                    None => None,
                };
                if let Some(n) = name {
                    self.scopes.push(Scope {
                        name: n.clone(),
                        kind: ScopeKind::Loop { header },
                    });
                }
                self.visit(*body, NodeLocation::child_of(id, 0))?;
                if name.is_some() {
                    self.scopes.pop();
                }
            }

            Expr::If {
                condition,
                if_true,
                if_false,
            } => {
                self.visit(*condition, NodeLocation::child_of(id, 0))?;
                let fork = self.current;

                if let Some(c) = fork {
                    let arm = self.new_block();
                    self.link(c, arm);
                    self.current = Some(arm);
                }
                self.visit(*if_true, NodeLocation::child_of(id, 1))?;
                let true_end = if fork.is_some() { self.current } else { None };

                match if_false {
                    Some(else_arm) => {
                        if let Some(c) = fork {
                            let arm = self.new_block();
                            self.link(c, arm);
                            self.current = Some(arm);
                        } else {
                            self.current = None;
                        }
                        self.visit(*else_arm, NodeLocation::child_of(id, 2))?;
                        let false_end = if fork.is_some() { self.current } else { None };

                        if fork.is_some() {
                            let join = self.new_block();
                            if let Some(t) = true_end {
                                self.link(t, join);
                            }
                            if let Some(e) = false_end {
                                self.link(e, join);
                            }
                            self.current = Some(join);
                        } else {
                            self.current = None;
                        }
                    }
                    None => {
                        if let Some(c) = fork {
                            let join = self.new_block();
                            self.link(c, join);
                            if let Some(t) = true_end {
                                self.link(t, join);
                            }
                            self.current = Some(join);
                        } else {
                            self.current = None;
                        }
                    }
                }
            }

            Expr::Br { target, condition } => {
                if let Some(c) = condition {
                    self.visit(*c, NodeLocation::child_of(id, 0))?;
                }
                // Labels are validated even in unreachable code.
                let scope_idx = self
                    .scopes
                    .iter()
                    .rposition(|s| s.name == *target)
                    .ok_or_else(|| Error::UnknownLabel {
                        label: target.clone(),
                    })?;
                if let Some(cur) = self.current {
                    match &mut self.scopes[scope_idx].kind {
                        ScopeKind::Loop { header } => {
                            if let Some(h) = *header {
                                self.blocks[h.index()].preds.push(cur);
                            }
                        }
                        ScopeKind::Block { pending } => pending.push(cur),
                    }
                    if condition.is_none() {
                        self.current = None;
                    } else {
                        let next = self.new_block();
                        self.link(cur, next);
                        self.current = Some(next);
                    }
                }
            }

            Expr::Return { value } => {
                if let Some(v) = value {
                    self.visit(*v, NodeLocation::child_of(id, 0))?;
                }
                // Locals do not survive the function boundary, so the edge out
                // of the function is not wired anywhere.
                self.current = None;
            }
        }
        Ok(())
    }
}
