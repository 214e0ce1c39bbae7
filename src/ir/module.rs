//! Module: a named collection of functions.

use std::fmt;

use crate::{ir::Function, Error, Result};

/// A compilation unit holding functions, addressable by name.
///
/// Function names are unique within a module; registering a duplicate is an
/// error. The module is the unit that [`crate::analysis::ModuleAnalysis`] fans
/// out over when analyzing functions in parallel.
///
/// # Examples
///
/// ```rust
/// use stackir::prelude::*;
///
/// let mut b = FunctionBuilder::new("f", vec![], vec![ValType::I32]);
/// let v = b.i32_const(1);
/// let body = b.set(0, v);
/// let func = b.finish(body);
///
/// let mut module = Module::new("demo");
/// module.add_function(func)?;
/// assert!(module.function("f").is_some());
/// # Ok::<(), stackir::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    functions: Vec<Function>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFunction`] if a function of the same name is
    /// already present.
    pub fn add_function(&mut self, function: Function) -> Result<()> {
        if self.functions.iter().any(|f| f.name() == function.name()) {
            return Err(Error::DuplicateFunction(function.name().to_string()));
        }
        self.functions.push(function);
        Ok(())
    }

    /// Looks a function up by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Returns all functions, in registration order.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Returns the number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the module holds no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module ${} ({} functions)", self.name, self.len())?;
        for func in &self.functions {
            write!(f, "{func}")?;
        }
        Ok(())
    }
}
