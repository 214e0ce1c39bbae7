//! Dataflow analyses over function bodies.
//!
//! The entry points are [`LocalGraph`] for a single function and
//! [`ModuleAnalysis`] to run the same analysis over every function of a
//! [`Module`] in parallel.

pub mod cfg;
pub mod local_graph;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    ir::Module,
    Result,
};

pub use local_graph::{LocalGraph, Origin};

/// Per-function [`LocalGraph`]s for a whole module, built in parallel.
///
/// Functions are independent, so each graph is computed on its own rayon
/// task; the first malformed body aborts the run with its error.
pub struct ModuleAnalysis<'m> {
    graphs: DashMap<&'m str, LocalGraph<'m>>,
}

impl<'m> ModuleAnalysis<'m> {
    /// Analyzes every function of `module`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first function whose body fails to analyze.
    pub fn run(module: &'m Module) -> Result<Self> {
        let graphs = DashMap::new();
        module
            .functions()
            .par_iter()
            .try_for_each(|func| -> Result<()> {
                graphs.insert(func.name(), LocalGraph::new(func)?);
                Ok(())
            })?;
        Ok(ModuleAnalysis { graphs })
    }

    /// The graph of one function, by name.
    #[must_use]
    pub fn graph(&self, name: &str) -> Option<dashmap::mapref::one::Ref<'_, &'m str, LocalGraph<'m>>> {
        self.graphs.get(name)
    }

    /// Mutable access to one function's graph, e.g. to run the on-demand
    /// derived computations.
    #[must_use]
    pub fn graph_mut(
        &self,
        name: &str,
    ) -> Option<dashmap::mapref::one::RefMut<'_, &'m str, LocalGraph<'m>>> {
        self.graphs.get_mut(name)
    }

    /// Number of analyzed functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Whether no function was analyzed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Module, ValType};

    fn simple_function(name: &str) -> crate::ir::Function {
        let mut b = FunctionBuilder::new(name, vec![ValType::I32], vec![ValType::I32]);
        let c = b.i32_const(7);
        let w = b.set(1, c);
        let r = b.get(1);
        let d = b.drop_(r);
        let body = b.block(vec![w, d]);
        b.finish(body)
    }

    #[test]
    fn test_analyzes_every_function() {
        let mut module = Module::new("m");
        module.add_function(simple_function("a")).unwrap();
        module.add_function(simple_function("b")).unwrap();

        let analysis = ModuleAnalysis::run(&module).unwrap();
        assert_eq!(analysis.len(), 2);
        assert_eq!(analysis.graph("a").unwrap().read_count(), 1);
        assert!(analysis.graph("missing").is_none());
    }

    #[test]
    fn test_first_error_aborts() {
        let mut bad = FunctionBuilder::new("bad", vec![], vec![]);
        let br = bad.br("nowhere");
        let func = bad.finish(br);
        let mut module = Module::new("m");
        module.add_function(simple_function("good")).unwrap();
        module.add_function(func).unwrap();

        assert!(ModuleAnalysis::run(&module).is_err());
    }
}
