//! Middle end of the Thrum toolchain: AST → typed CFG → bytecode.
//!
//! Source functions are templates. [`build`] reifies them into monomorphic
//! instances on demand, keyed by [`TypedSymbol`] (name plus full function
//! signature); [`gc`] drops instances unreachable from the entry point; and
//! [`codegen`] lowers the surviving control-flow graphs to the linear
//! bytecode executed by `thrum-vm`.
//!
//! # Design
//!
//! - [`types`] — the subtype lattice over scalar, vector, function and `Any`
//! - [`typed`] — typed symbols and name mangling
//! - [`cfg`] — value graphs and packages
//! - [`build`] — type-directed monomorphisation
//! - [`intrinsics`] — the shape-dispatched binary operator seeds
//! - [`gc`] — mark-and-sweep over package entries
//! - [`codegen`] — stack-slot assignment and instruction emission
//! - [`pipeline`] — the wired-together source-to-bytecode path
//! - [`sexpr`] — CFG s-expression serializer (golden files)

pub mod build;
pub mod cfg;
pub mod codegen;
pub mod error;
pub mod gc;
pub mod intrinsics;
pub mod pipeline;
pub mod sexpr;
pub mod typed;
pub mod types;

pub use build::build_cfg;
pub use pipeline::{compile, CompiledProgram, PipelineError};
pub use cfg::{Package, Value};
pub use codegen::codegen;
pub use error::CompileError;
pub use gc::gc;
pub use typed::TypedSymbol;
pub use types::{intersection, FunctionType, Type};
