//! Compilation errors.

use thrum_foundation::Symbol;

use crate::typed::TypedSymbol;

/// Fatal compilation error.
///
/// No error is recovered within a stage; the first failure aborts the
/// compile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// A global name is not declared in the module.
    #[error("use of undeclared identifier `{0}`")]
    UndeclaredIdentifier(Symbol),

    /// The surface grammar accepts a construct the CFG deliberately
    /// rejects (function literals, lexical scopes).
    #[error("{0} are not supported")]
    Unsupported(&'static str),

    /// A failed intersection or subtype check.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The garbage-collection root is not in the package.
    #[error("undefined root function `{0}`")]
    UndefinedRoot(TypedSymbol),

    /// An operator sequence reached CFG construction; the lowering pass
    /// must run first.
    #[error("operator sequences must be lowered before CFG construction")]
    UnloweredOperatorSequence,

    /// A structurally invalid value graph (only reachable through parsed
    /// CFG input).
    #[error("malformed value graph: {0}")]
    MalformedGraph(String),
}
