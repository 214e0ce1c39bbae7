use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of IR construction and control-flow reduction. The
/// analyses themselves are total: once a [`crate::analysis::LocalGraph`] has been built,
/// queries never fail — invalid queries (a read that is not part of the analyzed function,
/// or a query before its compute step) are caller defects and panic loudly instead of
/// returning degraded data.
///
/// # Error Categories
///
/// ## IR Shape Errors
/// - [`Error::MissingBody`] - Analysis requested for a bodyless function
/// - [`Error::InvalidLocal`] - A variable operation references a slot outside the function's
///   local table
/// - [`Error::UnknownLabel`] - A branch targets a label with no enclosing block or loop
///
/// ## Module Errors
/// - [`Error::DuplicateFunction`] - Two functions registered under the same name
///
/// # Examples
///
/// ```rust
/// use stackir::{Error, prelude::*};
///
/// let mut builder = FunctionBuilder::new("broken", vec![ValType::I32], vec![]);
/// let body = builder.br("no-such-label");
/// let func = builder.finish(body);
///
/// match LocalGraph::new(&func) {
///     Err(Error::UnknownLabel { label }) => assert_eq!(label, "no-such-label"),
///     other => panic!("expected an unknown label error, got {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The function has no body to analyze.
    ///
    /// Imported or otherwise bodyless functions have no local state to track;
    /// requesting an analysis for one is an error rather than an empty result.
    #[error("Function '{0}' has no body")]
    MissingBody(String),

    /// A variable read or write references a slot index outside the function's
    /// combined parameter and local table.
    ///
    /// # Fields
    ///
    /// * `index` - The out-of-range slot index
    /// * `count` - The number of slots the function declares
    #[error("Local index {index} out of range (function declares {count} slots)")]
    InvalidLocal {
        /// The out-of-range slot index.
        index: u32,
        /// The number of slots the function declares.
        count: u32,
    },

    /// A branch targets a label that no enclosing block or loop declares.
    ///
    /// Labels scope lexically: a branch may only target a label on the path
    /// from the branch to the body root.
    #[error("Branch targets unbound label '{label}'")]
    UnknownLabel {
        /// The unresolved label name.
        label: String,
    },

    /// A function was registered in a module under an already-taken name.
    #[error("Module already contains a function named '{0}'")]
    DuplicateFunction(String),
}
