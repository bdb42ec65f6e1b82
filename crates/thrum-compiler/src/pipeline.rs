//! The unified source-to-bytecode pipeline.
//!
//! Wires the stages together for hosts that just want to run a program:
//! parse, lower operator sequences, build the CFG rooted at `main`, prune
//! dead instances, and generate bytecode.
//!
//! The entry signature is negotiated: `main` is first requested at
//! `[vF32:vF32]`, and a scalar-returning body falls back to `[vF32:F32]`.
//! Both attempts use concrete result types so self-recursive entry points
//! resolve against their own in-progress package entry.

use thrum_foundation::Symbol;
use tracing::debug;

use crate::build::build_cfg;
use crate::cfg::Package;
use crate::codegen::codegen;
use crate::error::CompileError;
use crate::gc::gc;
use crate::typed::TypedSymbol;
use crate::types::{FunctionType, Type};

/// A fully compiled program, ready for the VM.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// The executable bytecode.
    pub package: thrum_vm::Package,
    /// The mangled label of the entry function.
    pub entry: Symbol,
    /// The entry function's typed symbol.
    pub root: TypedSymbol,
}

/// Pipeline-level failure: either accumulated parse diagnostics or a
/// compile error from a later stage.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("parse failed:\n{}", format_parse_errors(.0))]
    Parse(Vec<thrum_dsl::ParseError>),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

fn format_parse_errors(errors: &[thrum_dsl::ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compile `source` down to bytecode with `main` as the entry point.
pub fn compile(source: &str) -> Result<CompiledProgram, PipelineError> {
    let module = thrum_dsl::parse_module(source).map_err(PipelineError::Parse)?;
    let module = thrum_dsl::lower_module(module);
    let (mut package, root) = build_module(&module)?;
    gc(&mut package, &root)?;
    let output = codegen(&package)?;
    Ok(CompiledProgram {
        entry: Symbol::from(root.to_string()),
        package: output,
        root,
    })
}

/// Build a lowered module's CFG rooted at `main`, negotiating the entry
/// signature.
pub fn build_module(module: &thrum_dsl::Module) -> Result<(Package, TypedSymbol), PipelineError> {
    let main = Symbol::from("main");
    let vector = Type::f32().vector_version();

    let attempts = [
        FunctionType {
            result: vector.clone(),
            params: vec![vector.clone()],
        },
        FunctionType {
            result: Type::f32(),
            params: vec![vector],
        },
    ];

    let mut last = None;
    for attempt in attempts {
        match build_cfg(module, &main, &attempt) {
            Ok(built) => return Ok(built),
            Err(error @ CompileError::TypeMismatch(_)) => {
                debug!(signature = %attempt, %error, "entry signature rejected");
                last = Some(error);
            }
            Err(error) => return Err(error.into()),
        }
    }
    Err(last.expect("at least one attempt ran").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_entry_preferred() {
        let program = compile("main x = x + x ;").unwrap();
        assert_eq!(program.entry.as_str(), "main_[vF32:vF32]");
    }

    #[test]
    fn test_scalar_entry_fallback() {
        let program = compile("main x = 1.0 ;").unwrap();
        assert_eq!(program.entry.as_str(), "main_[vF32:F32]");
    }

    #[test]
    fn test_parse_errors_surface() {
        assert!(matches!(
            compile("main = ;"),
            Err(PipelineError::Parse(errors)) if errors.len() == 1
        ));
    }

    #[test]
    fn test_missing_main_is_undeclared() {
        assert!(matches!(
            compile("k = 4.0 ;"),
            Err(PipelineError::Compile(CompileError::UndeclaredIdentifier(_)))
        ));
    }
}
