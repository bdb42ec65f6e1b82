//! Opcode set and bytecode packages.
//!
//! An instruction pairs an [`Opcode`] with a single [`Operand`]. Arithmetic
//! opcodes come in four shape variants (vector/scalar × vector/scalar);
//! their operand is the number of additional scalar slots to overwrite when
//! the instruction produces a function's return value (see the return
//! relocation scheme in [`crate::eval`]).

use indexmap::IndexMap;
use thrum_foundation::Symbol;

use crate::error::ExecError;

/// Instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Push the operand (scalar float or code offset) onto the scalar stack.
    Push,
    /// Resolve the symbol operand to a code offset, push it, and rewrite
    /// this instruction to a plain `Push` so later executions skip the
    /// lookup.
    PushSym,
    /// Push a copy of the n-th-from-top scalar slot.
    Copy,
    /// Push a weak reference to the vector referenced by the n-th-from-top
    /// slot.
    RefVec,
    /// Relocate the top scalar down `n + result_offset + 1` slots, dropping
    /// the slots underneath. The top slot must not be a vector reference.
    DropS,
    /// Like `DropS` for a top slot that is a vector reference; see the
    /// relocation rule in [`crate::eval`].
    DropV,
    /// Replace the top scalar with a newly-allocated vector filled with it.
    Fill,
    AddVv,
    AddSv,
    AddVs,
    AddSs,
    MulVv,
    MulSv,
    MulVs,
    MulSs,
    /// Pop the callee code offset and recurse into the interpreter; the
    /// operand is the callee's return relocation count.
    Call,
    /// Set the return relocation offset of the current function to the
    /// caller-supplied count.
    Ret,
    /// Return from the current function.
    Exit,
}

/// Mnemonic table, in opcode declaration order.
const MNEMONICS: &[(Opcode, &str)] = &[
    (Opcode::Push, "push"),
    (Opcode::PushSym, "push_sym"),
    (Opcode::Copy, "copy"),
    (Opcode::RefVec, "ref_vec"),
    (Opcode::DropS, "drop_s"),
    (Opcode::DropV, "drop_v"),
    (Opcode::Fill, "fill"),
    (Opcode::AddVv, "add_vv"),
    (Opcode::AddSv, "add_sv"),
    (Opcode::AddVs, "add_vs"),
    (Opcode::AddSs, "add_ss"),
    (Opcode::MulVv, "mul_vv"),
    (Opcode::MulSv, "mul_sv"),
    (Opcode::MulVs, "mul_vs"),
    (Opcode::MulSs, "mul_ss"),
    (Opcode::Call, "call"),
    (Opcode::Ret, "ret"),
    (Opcode::Exit, "exit"),
];

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        MNEMONICS
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, name)| *name)
            .expect("every opcode has a mnemonic")
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        MNEMONICS
            .iter()
            .find(|(_, mnemonic)| *mnemonic == name)
            .map(|(op, _)| *op)
    }

    /// True for the eight shape-dispatched binary arithmetic opcodes.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Opcode::AddVv
                | Opcode::AddSv
                | Opcode::AddVs
                | Opcode::AddSs
                | Opcode::MulVv
                | Opcode::MulSv
                | Opcode::MulVs
                | Opcode::MulSs
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    F32(f32),
    U32(u32),
    Sym(Symbol),
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn bare(op: Opcode) -> Self {
        Self {
            op,
            operand: Operand::None,
        }
    }

    pub fn with_u32(op: Opcode, value: u32) -> Self {
        Self {
            op,
            operand: Operand::U32(value),
        }
    }

    pub fn with_f32(op: Opcode, value: f32) -> Self {
        Self {
            op,
            operand: Operand::F32(value),
        }
    }

    pub fn with_sym(op: Opcode, symbol: Symbol) -> Self {
        Self {
            op,
            operand: Operand::Sym(symbol),
        }
    }

    /// The `u32` operand, or an error naming the opcode.
    pub fn u32_operand(&self) -> Result<u32, ExecError> {
        match self.operand {
            Operand::U32(value) => Ok(value),
            _ => Err(ExecError::InvalidOperand {
                op: self.op,
                expected: "a u32 operand",
            }),
        }
    }
}

/// A compiled bytecode package: one linear instruction stream plus the
/// label table mapping function symbols to their start offsets.
///
/// Labels are insertion-ordered so serialized listings are stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub code: Vec<Instruction>,
    pub symbols: IndexMap<Symbol, u32>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a label to its code offset.
    pub fn lookup(&self, symbol: &Symbol) -> Result<u32, ExecError> {
        self.symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| ExecError::UndefinedSymbol(symbol.clone()))
    }
}
