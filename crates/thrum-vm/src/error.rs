//! Runtime errors for bytecode execution.

use thrum_foundation::Symbol;

use crate::instruction::Opcode;
use crate::state::Slot;

/// Bytecode execution error.
///
/// The VM never recovers from these; the current call is abandoned and the
/// error is returned to the host.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecError {
    /// A `push_sym` operand (or the entry symbol) is not in the package.
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(Symbol),

    #[error("scalar stack underflow")]
    StackUnderflow,

    #[error("scalar stack overflow")]
    StackOverflow,

    #[error("vector stack overflow")]
    VectorOverflow,

    /// A strong reference was popped while its vector was not the topmost
    /// vector slot.
    #[error("vector stack popped out of LIFO order")]
    VectorOrder,

    /// A slot had the wrong tag for the executing instruction.
    #[error("expected {expected}, found {found:?}")]
    SlotMismatch { expected: &'static str, found: Slot },

    #[error("instruction `{op}` requires {expected}")]
    InvalidOperand { op: Opcode, expected: &'static str },

    #[error("instruction pointer {0} out of range")]
    BadInstPtr(u32),
}
