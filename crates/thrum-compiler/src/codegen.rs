//! Bytecode generation.
//!
//! Functions are laid out contiguously in package order; each is labelled
//! with its mangled typed symbol. Within a function the visitor emits
//! operands before the instruction consuming them (LIFO evaluation) and
//! tracks a model of the runtime stack depth so parameter references can
//! be addressed relative to the top.
//!
//! # Return placement
//!
//! A function's value must land on the slot of its deepest parameter, so
//! callers never see leftover callee state. Instructions that naturally
//! overwrite their operand slots (`call`, the arithmetic ops) carry the
//! parameter count as their pop count when they produce the return value;
//! the caller-supplied relocation offset cascades onto that count through
//! `ret` at run time. Value instructions with no operands (`push`, `copy`,
//! `ref_vec`) relocate through an explicit `drop_s`/`drop_v` instead.

use std::collections::BTreeSet;

use thrum_foundation::Symbol;
use thrum_vm::{Instruction, Opcode};
use tracing::{debug, trace};

use crate::cfg::{Package, Value};
use crate::error::CompileError;
use crate::typed::TypedSymbol;
use crate::types::FunctionType;

/// Lower a CFG package to a bytecode package.
pub fn codegen(package: &Package) -> Result<thrum_vm::Package, CompileError> {
    let mut output = thrum_vm::Package::new();

    for (symbol, root) in &package.functions {
        let label = Symbol::from(symbol.to_string());
        debug!(%label, offset = output.code.len(), "emitting function");
        output.symbols.insert(label, output.code.len() as u32);

        let mut function = FunctionContext::new(&symbol.ty);
        function.emit_value(&mut output.code, root, true)?;

        if !function.unused_params.is_empty() {
            trace!(%symbol, unused = ?function.unused_params, "parameters never referenced");
        }
    }

    Ok(output)
}

/// Per-function emission state.
struct FunctionContext<'a> {
    ty: &'a FunctionType,
    /// Model of how many values sit on the stack above the parameters at
    /// the current instruction. Invalid once the root node is emitted.
    stack_size: u32,
    /// Parameters with no reference emitted yet.
    unused_params: BTreeSet<usize>,
}

impl<'a> FunctionContext<'a> {
    fn new(ty: &'a FunctionType) -> Self {
        Self {
            ty,
            stack_size: 0,
            unused_params: (0..ty.arity()).collect(),
        }
    }

    fn arity(&self) -> u32 {
        self.ty.arity() as u32
    }

    fn emit_value(
        &mut self,
        code: &mut Vec<Instruction>,
        value: &Value,
        is_return: bool,
    ) -> Result<(), CompileError> {
        match value {
            Value::CallFunc { function, params } => {
                // Arguments in reverse order, so the first lands on top.
                for param in params.iter().rev() {
                    self.emit_value(code, param, false)?;
                }
                self.emit_value(code, function, false)?;

                let inst = Instruction::with_u32(Opcode::Call, self.pop_count(is_return));
                let vector = value.type_in(self.ty)?.is_vector();
                self.emit(code, inst, is_return, vector, false);
                self.pop_operands(params.len() as u32 + 1);
            }

            Value::BinaryOp { op, lhs, rhs } => {
                self.emit_value(code, rhs, false)?;
                self.emit_value(code, lhs, false)?;

                let inst = Instruction::with_u32(*op, self.pop_count(is_return));
                let vector = value.type_in(self.ty)?.is_vector();
                self.emit(code, inst, is_return, vector, false);
                self.pop_operands(2);
            }

            Value::FunctionRef { name, ty } => {
                let label = TypedSymbol::new(name.clone(), ty.clone()).to_string();
                let inst = Instruction::with_sym(Opcode::PushSym, Symbol::from(label));
                self.emit(code, inst, is_return, false, true);
                self.push_value();
            }

            Value::ParamRef(index) => {
                let vector = value.type_in(self.ty)?.is_vector();
                let opcode = if vector { Opcode::RefVec } else { Opcode::Copy };
                let inst = Instruction::with_u32(opcode, self.param_offset(*index));
                self.emit(code, inst, is_return, vector, true);
                self.unused_params.remove(index);
                self.push_value();
            }

            Value::FPValue(value) => {
                let inst = Instruction::with_f32(Opcode::Push, *value as f32);
                self.emit(code, inst, is_return, false, true);
                self.push_value();
            }
        }
        Ok(())
    }

    /// Slots the instruction must additionally overwrite when it produces
    /// the function's return value: every parameter slot.
    fn pop_count(&self, is_return: bool) -> u32 {
        if is_return {
            self.arity()
        } else {
            0
        }
    }

    /// Append `inst`, wrapped in return bookkeeping when it produces the
    /// function's value. Naturally-overwriting instructions carry their
    /// pop count themselves; the explicit-pop class relocates through a
    /// trailing drop (always emitted, since the caller's relocation offset
    /// is only known at run time).
    fn emit(
        &mut self,
        code: &mut Vec<Instruction>,
        inst: Instruction,
        is_return: bool,
        vector_return: bool,
        explicit_pop: bool,
    ) {
        if !is_return {
            code.push(inst);
            return;
        }

        if explicit_pop {
            let drop = if vector_return {
                Opcode::DropV
            } else {
                Opcode::DropS
            };
            code.push(inst);
            code.push(Instruction::bare(Opcode::Ret));
            code.push(Instruction::with_u32(drop, self.arity()));
        } else {
            code.push(Instruction::bare(Opcode::Ret));
            code.push(inst);
        }
        code.push(Instruction::bare(Opcode::Exit));
    }

    fn push_value(&mut self) {
        self.stack_size += 1;
    }

    /// Account for an instruction that consumes `count` operands and
    /// leaves one result in the lowest operand's slot.
    fn pop_operands(&mut self, count: u32) {
        self.stack_size -= count - 1;
    }

    /// Parameters sit below all intermediate values, deepest first.
    fn param_offset(&self, index: usize) -> u32 {
        self.stack_size + index as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_dsl::{lower_module, parse_module};

    use crate::build::build_cfg;
    use crate::gc::gc;
    use crate::types::Type;

    fn compile(source: &str) -> (thrum_vm::Package, String) {
        let module = lower_module(parse_module(source).unwrap());
        let root_type = FunctionType {
            result: Type::Any,
            params: vec![Type::f32().vector_version()],
        };
        let (mut package, root) = build_cfg(&module, &Symbol::from("main"), &root_type).unwrap();
        gc(&mut package, &root).unwrap();
        let output = codegen(&package).unwrap();
        (output, root.to_string())
    }

    fn function_range(package: &thrum_vm::Package, label: &str) -> Vec<Instruction> {
        let start = package.symbols[label] as usize;
        let end = package
            .symbols
            .values()
            .map(|&offset| offset as usize)
            .filter(|&offset| offset > start)
            .min()
            .unwrap_or(package.code.len());
        package.code[start..end].to_vec()
    }

    #[test]
    fn test_constant_function_drops_unused_vector_param() {
        let (package, root) = compile("main x = 1.0 ;");
        assert_eq!(root, "main_[vF32:F32]");
        assert_eq!(
            function_range(&package, &root),
            vec![
                Instruction::with_f32(Opcode::Push, 1.0),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::DropS, 1),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_vector_add_calls_vv_intrinsic() {
        let (package, root) = compile("main x = x + x ;");
        assert_eq!(
            function_range(&package, &root),
            vec![
                Instruction::with_u32(Opcode::RefVec, 1),
                Instruction::with_u32(Opcode::RefVec, 2),
                Instruction::with_sym(Opcode::PushSym, Symbol::from("+_[vF32:vF32:vF32]")),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::Call, 1),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_intrinsic_body_overwrites_its_params() {
        let (package, _) = compile("main x = x + x ;");
        assert_eq!(
            function_range(&package, "+_[vF32:vF32:vF32]"),
            vec![
                Instruction::with_u32(Opcode::RefVec, 2),
                Instruction::with_u32(Opcode::RefVec, 2),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::AddVv, 2),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_identity_relocates_through_drop_v() {
        let (package, _) = compile("id x = x ;\nmain x = id x ;");
        assert_eq!(
            function_range(&package, "id_[vF32:vF32]"),
            vec![
                Instruction::with_u32(Opcode::RefVec, 1),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::DropV, 1),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_nullary_value_keeps_relocating_drop() {
        // Even with no parameters, the explicit-pop class emits its drop:
        // the caller's relocation count is applied at run time.
        let (package, _) = compile("k = 4.0 ;\nmain x = k + x ;");
        assert_eq!(
            function_range(&package, "k_[F32]"),
            vec![
                Instruction::with_f32(Opcode::Push, 4.0),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::DropS, 0),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_call_arguments_emit_in_reverse() {
        let (package, root) = compile("k = 4.0 ;\nmain x = k + x ;");
        // Second argument (x) first, then the nullary k call, then +.
        assert_eq!(
            function_range(&package, &root),
            vec![
                Instruction::with_u32(Opcode::RefVec, 1),
                Instruction::with_sym(Opcode::PushSym, Symbol::from("k_[F32]")),
                Instruction::with_u32(Opcode::Call, 0),
                Instruction::with_sym(Opcode::PushSym, Symbol::from("+_[F32:vF32:vF32]")),
                Instruction::bare(Opcode::Ret),
                Instruction::with_u32(Opcode::Call, 1),
                Instruction::bare(Opcode::Exit),
            ]
        );
    }

    #[test]
    fn test_functions_emitted_in_package_order() {
        let (package, root) = compile("id x = x ;\nmain x = id x ;");
        let offsets: Vec<u32> = package.symbols.values().copied().collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
        assert!(package.symbols.contains_key(root.as_str()));
    }
}
