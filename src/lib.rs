// Copyright 2025 The stackir contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # stackir
//!
//! Local-variable dataflow analysis for a structured stack-machine intermediate
//! representation, as used by ahead-of-time compiler pipelines.
//!
//! The centerpiece is the [`analysis::LocalGraph`]: given a function body expressed
//! as a nested expression tree with explicit variable reads ([`ir::Expr::LocalGet`])
//! and writes ([`ir::Expr::LocalSet`]), it computes, for every read, the exact set
//! of writes (or the implicit "never written" origin) that may supply its value at
//! runtime, without executing the program. On top of that map it offers derived
//! queries: provable value-equivalence of two reads, write→influenced-reads and
//! read→using-writes maps, and per-slot single-static-assignment detection.
//!
//! ## Quick Start
//!
//! ```rust
//! use stackir::prelude::*;
//!
//! // fn f(p: i32) { local x: i32; x = p + 1; return x; }
//! let mut b = FunctionBuilder::new("f", vec![ValType::I32], vec![ValType::I32]);
//! let p = b.get(0);
//! let one = b.i32_const(1);
//! let sum = b.binary(BinaryOp::Add, p, one);
//! let set = b.set(1, sum);
//! let x = b.get(1);
//! let ret = b.ret(Some(x));
//! let body = b.block(vec![set, ret]);
//! let func = b.finish(body);
//!
//! let graph = LocalGraph::new(&func)?;
//! // The read of x sees exactly the one write.
//! assert_eq!(graph.origins(x).len(), 1);
//! assert!(graph.origins(x).contains(&Origin::Set(set)));
//! // The read of p is supplied by the incoming parameter value.
//! assert!(graph.origins(p).contains(&Origin::Implicit));
//! # Ok::<(), stackir::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - The expression tree: arena-allocated [`ir::Expr`] nodes addressed by
//!   [`ir::ExprId`] handles, owned by a [`ir::Function`]; [`ir::Module`] as the
//!   function container; [`ir::FunctionBuilder`] for construction.
//! - [`analysis`] - [`analysis::ControlFlowGraph`] reduces the structured tree to
//!   basic blocks; [`analysis::LocalGraph`] runs the reaching-definitions fixpoint
//!   and answers queries; [`analysis::ModuleAnalysis`] fans the per-function
//!   analysis out across threads.
//! - [`prelude`] - Convenient re-exports of the commonly used types.
//! - [`Error`] and [`Result`] - Error handling for IR construction and control-flow
//!   reduction.
//!
//! ## Contracts
//!
//! A [`analysis::LocalGraph`] is computed eagerly and is final: its result maps are
//! never patched incrementally. A caller that mutates the analyzed tree, including
//! through the location map it exposes for in-place rewriting, invalidates every
//! outstanding result and must build a fresh graph. Within those bounds the
//! analysis is a bounded, deterministic, single-threaded pass; independent
//! functions can safely be analyzed on separate threads, which is exactly what
//! [`analysis::ModuleAnalysis`] does.

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use stackir::prelude::*;
///
/// let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I64]);
/// let v = b.i64_const(7);
/// let body = b.set(0, v);
/// let func = b.finish(body);
/// let graph = LocalGraph::new(&func)?;
/// # Ok::<(), stackir::Error>(())
/// ```
pub mod prelude;

/// The expression-tree intermediate representation.
///
/// Functions own their expression nodes in an arena; every node is addressed by a
/// stable [`ir::ExprId`] handle, which is also the identity the analyses key their
/// result maps by.
pub mod ir;

/// Control-flow reduction and local-variable dataflow analysis.
///
/// See [`analysis::LocalGraph`] for the reaching-definitions engine and its derived
/// queries, and [`analysis::ControlFlowGraph`] for the structured-tree reduction
/// that feeds it.
pub mod analysis;

/// `stackir` Result type.
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`], used consistently for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// `stackir` Error type.
///
/// Covers IR construction and control-flow reduction failures; see the variant
/// documentation for the full taxonomy.
pub use error::Error;
