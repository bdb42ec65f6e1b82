//! Integration test harness for Thrum.
//!
//! Drives the full pipeline — parse → lower → build CFG → GC → codegen →
//! VM — from source text, for end-to-end tests.

use thrum_compiler::{CompiledProgram, Package, TypedSymbol};
use thrum_vm::Frame;

/// A compiled program plus the pruned CFG package it came from.
pub struct TestHarness {
    program: CompiledProgram,
    cfg: Package,
}

impl TestHarness {
    /// Compile `source` with `main` as the entry point.
    ///
    /// # Panics
    ///
    /// Panics if any pipeline stage fails.
    pub fn from_source(source: &str) -> Self {
        let module = thrum_dsl::parse_module(source)
            .unwrap_or_else(|errors| panic!("parse failed: {errors:?}"));
        let module = thrum_dsl::lower_module(module);

        let (mut cfg, root) =
            thrum_compiler::pipeline::build_module(&module).expect("CFG construction failed");
        thrum_compiler::gc(&mut cfg, &root).expect("GC failed");
        let package = thrum_compiler::codegen(&cfg).expect("codegen failed");

        Self {
            program: CompiledProgram {
                entry: thrum_foundation::Symbol::from(root.to_string()),
                package,
                root,
            },
            cfg,
        }
    }

    /// Execute the program over `input` and return the output samples.
    pub fn call(&mut self, input: &[f32]) -> Vec<f32> {
        let frame = Frame::from_samples(input.to_vec());
        let output = thrum_vm::call(&mut self.program.package, &self.program.entry, &frame)
            .expect("execution failed");
        output.samples().to_vec()
    }

    /// The entry function's typed symbol.
    pub fn root(&self) -> &TypedSymbol {
        &self.program.root
    }

    /// The pruned CFG package.
    pub fn cfg(&self) -> &Package {
        &self.cfg
    }

    /// The compiled bytecode package.
    pub fn bytecode(&self) -> &thrum_vm::Package {
        &self.program.package
    }
}
