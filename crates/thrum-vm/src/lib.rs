//! Bytecode virtual machine for the Thrum toolchain.
//!
//! The VM executes linear bytecode produced by the compiler. It is a stack
//! machine with two stacks:
//!
//! - a *scalar stack* of tagged 8-byte slots (floats, code offsets, and
//!   references into the vector stack), and
//! - a *vector stack* of cache-aligned sample buffers sized by the current
//!   frame.
//!
//! # Design
//!
//! - [`instruction`] — opcode set, operands, bytecode packages
//! - [`state`] — stack primitives and the reference invariants
//! - [`eval`] — the interpreter loop and the public [`call`] entry point
//! - [`frame`] — boxed sample buffers for VM input/output
//! - [`sexpr`] — text form of bytecode listings and frames (golden files)
//!
//! Execution is single-threaded and never suspends; errors abort the current
//! call and are returned to the host.

pub mod error;
pub mod eval;
pub mod frame;
pub mod instruction;
pub mod sexpr;
pub mod state;

pub use error::ExecError;
pub use eval::{call, call_with_capacity, eval};
pub use frame::Frame;
pub use instruction::{Instruction, Opcode, Operand, Package};
pub use state::{Slot, VmState};
