//! The interpreter loop.
//!
//! # Return relocation
//!
//! A function's return value must land on the slot of its deepest argument
//! so callers never see leftover callee state. Instructions that naturally
//! overwrite their operand slots (the arithmetic ops and `call`) carry the
//! extra slots to consume — the enclosing function's arguments — as their
//! pop count when they produce its value; `ret` adds the caller-supplied
//! relocation count on top for whichever value-producing instruction
//! executes next. Values that do not consume operands (`push`, `copy`,
//! `ref_vec`) are relocated explicitly with `drop_s`/`drop_v`.

use tracing::{debug, trace};

use thrum_foundation::Symbol;

use crate::error::ExecError;
use crate::frame::Frame;
use crate::instruction::{Instruction, Opcode, Operand, Package};
use crate::state::{Slot, VmState};

/// Default per-stack slot capacity for [`call`].
pub const DEFAULT_STACK_SLOTS: usize = 16 * 1024;

/// Execute the function labelled `name`, passing `input` as its single
/// vector parameter, and box the produced value as a frame.
///
/// The input's sample count fixes the vector size for the whole call. On
/// return the top slot holds the result: a vector reference is copied out;
/// a scalar fills the output frame.
pub fn call(package: &mut Package, name: &Symbol, input: &Frame) -> Result<Frame, ExecError> {
    call_with_capacity(package, name, input, DEFAULT_STACK_SLOTS)
}

/// [`call`] with an explicit stack capacity (in slots, per stack).
pub fn call_with_capacity(
    package: &mut Package,
    name: &Symbol,
    input: &Frame,
    capacity: usize,
) -> Result<Frame, ExecError> {
    let entry = package.lookup(name)?;
    debug!(%name, entry, samples = input.len(), "vm call");

    let mut state = VmState::new(input.len(), capacity);
    let param = state.alloc()?;
    state.write_frame(param.vector_base()?, input.samples());

    eval(&mut state, package, entry, 0)?;

    let result = state.get(1)?;
    match result {
        Slot::Fp(value) => Ok(Frame::splat(value, input.len())),
        Slot::StrongRef(base) | Slot::WeakRef(base) => {
            Ok(Frame::from_samples(state.read_frame(base, input.len())))
        }
        Slot::Code(_) => Err(ExecError::SlotMismatch {
            expected: "a result value",
            found: result,
        }),
    }
}

/// Run instructions starting at `inst_ptr` until `exit`.
///
/// `pop_count` is the caller-supplied return relocation count; `ret`
/// transfers it into the local `result_offset`, which every value-producing
/// instruction afterwards adds to its own pop count.
pub fn eval(
    state: &mut VmState,
    package: &mut Package,
    inst_ptr: u32,
    pop_count: u32,
) -> Result<(), ExecError> {
    trace!(inst_ptr, pop_count, "eval");
    let mut ip = inst_ptr;
    let mut result_offset = 0u32;

    loop {
        let inst = package
            .code
            .get(ip as usize)
            .cloned()
            .ok_or(ExecError::BadInstPtr(ip))?;

        match inst.op {
            Opcode::Push => match inst.operand {
                Operand::F32(value) => state.push(Slot::Fp(value))?,
                Operand::U32(value) => state.push(Slot::Code(value))?,
                _ => {
                    return Err(ExecError::InvalidOperand {
                        op: inst.op,
                        expected: "an f32 or u32 operand",
                    })
                }
            },

            Opcode::PushSym => {
                let Operand::Sym(symbol) = &inst.operand else {
                    return Err(ExecError::InvalidOperand {
                        op: inst.op,
                        expected: "a symbol operand",
                    });
                };
                let offset = package.lookup(symbol)?;
                state.push(Slot::Code(offset))?;
                // Rewrite so later executions skip the lookup.
                package.code[ip as usize] = Instruction::with_u32(Opcode::Push, offset);
            }

            Opcode::Copy => {
                let slot = state.get(inst.u32_operand()?)?;
                state.push(slot)?;
            }

            Opcode::RefVec => {
                let slot = state.get(inst.u32_operand()?)?;
                let weak = state.reference(slot)?;
                state.push(weak)?;
            }

            Opcode::DropS => {
                let offset = inst.u32_operand()? + result_offset + 1;
                let src = state.get(1)?;
                if src.is_vector_ref() {
                    return Err(ExecError::SlotMismatch {
                        expected: "a non-reference slot for drop_s",
                        found: src,
                    });
                }
                state.pop_n(offset)?;
                state.push(src)?;
            }

            Opcode::DropV => {
                drop_vector(state, inst.u32_operand()? + result_offset)?;
            }

            Opcode::Fill => {
                let src = state.get(1)?;
                let Slot::Fp(value) = src else {
                    return Err(ExecError::SlotMismatch {
                        expected: "a scalar to fill from",
                        found: src,
                    });
                };
                state.pop()?;
                let out = state.alloc()?.vector_base()?;
                for index in 0..state.frame_samples() {
                    state.set_sample(out, index, value);
                }
            }

            Opcode::Call => {
                let callee = state.get(1)?;
                let Slot::Code(target) = callee else {
                    return Err(ExecError::SlotMismatch {
                        expected: "a code offset to call",
                        found: callee,
                    });
                };
                let ret_slot = inst.u32_operand()? + result_offset;
                state.pop()?;
                eval(state, package, target, ret_slot)?;
            }

            Opcode::AddVv => vector_vector(state, arith_pop(&inst, result_offset)?, add)?,
            Opcode::AddVs => vector_scalar(state, arith_pop(&inst, result_offset)?, add)?,
            Opcode::AddSv => scalar_vector(state, arith_pop(&inst, result_offset)?, add)?,
            Opcode::AddSs => scalar_scalar(state, arith_pop(&inst, result_offset)?, add)?,
            Opcode::MulVv => vector_vector(state, arith_pop(&inst, result_offset)?, mul)?,
            Opcode::MulVs => vector_scalar(state, arith_pop(&inst, result_offset)?, mul)?,
            Opcode::MulSv => scalar_vector(state, arith_pop(&inst, result_offset)?, mul)?,
            Opcode::MulSs => scalar_scalar(state, arith_pop(&inst, result_offset)?, mul)?,

            Opcode::Ret => result_offset = pop_count,

            Opcode::Exit => return Ok(()),
        }

        ip += 1;
    }
}

fn arith_pop(inst: &Instruction, result_offset: u32) -> Result<u32, ExecError> {
    Ok(inst.u32_operand()? + result_offset)
}

fn add(lhs: f32, rhs: f32) -> f32 {
    lhs + rhs
}

fn mul(lhs: f32, rhs: f32) -> f32 {
    lhs * rhs
}

/// Relocate the vector reference on top of the stack down `pop + 1` slots.
///
/// If the owning strong reference dies within the popped range, the buffer
/// dies with it and the value must be copied into a fresh allocation.
/// Otherwise the buffer survives and a fresh weak reference suffices.
fn drop_vector(state: &mut VmState, pop: u32) -> Result<(), ExecError> {
    let offset = pop + 1;
    let src = state.get(1)?;
    let base = src.vector_base()?;

    if state.strong_ref_in_top(offset, base)? {
        state.pop_n(offset)?;
        let out = state.alloc()?.vector_base()?;
        if out != base {
            for index in 0..state.frame_samples() {
                let value = state.sample(base, index);
                state.set_sample(out, index, value);
            }
        }
    } else {
        state.pop_n(offset)?;
        state.push(Slot::WeakRef(base))?;
    }
    Ok(())
}

// Arithmetic handlers. Each pops both operands plus the relocation count,
// then produces the result; operand reads go through indexed access because
// the result allocation may reuse a just-popped operand's buffer.

fn vector_vector(state: &mut VmState, pop: u32, op: fn(f32, f32) -> f32) -> Result<(), ExecError> {
    let lhs = state.get(1)?.vector_base()?;
    let rhs = state.get(2)?.vector_base()?;
    state.pop_n(2 + pop)?;

    let out = state.alloc()?.vector_base()?;
    for index in 0..state.frame_samples() {
        let value = op(state.sample(lhs, index), state.sample(rhs, index));
        state.set_sample(out, index, value);
    }
    Ok(())
}

fn vector_scalar(state: &mut VmState, pop: u32, op: fn(f32, f32) -> f32) -> Result<(), ExecError> {
    let lhs = state.get(1)?.vector_base()?;
    let rhs = state.get(2)?;
    let Slot::Fp(scalar) = rhs else {
        return Err(ExecError::SlotMismatch {
            expected: "a scalar right operand",
            found: rhs,
        });
    };
    state.pop_n(2 + pop)?;

    let out = state.alloc()?.vector_base()?;
    for index in 0..state.frame_samples() {
        let value = op(state.sample(lhs, index), scalar);
        state.set_sample(out, index, value);
    }
    Ok(())
}

fn scalar_vector(state: &mut VmState, pop: u32, op: fn(f32, f32) -> f32) -> Result<(), ExecError> {
    let lhs = state.get(1)?;
    let Slot::Fp(scalar) = lhs else {
        return Err(ExecError::SlotMismatch {
            expected: "a scalar left operand",
            found: lhs,
        });
    };
    let rhs = state.get(2)?.vector_base()?;
    state.pop_n(2 + pop)?;

    let out = state.alloc()?.vector_base()?;
    for index in 0..state.frame_samples() {
        let value = op(scalar, state.sample(rhs, index));
        state.set_sample(out, index, value);
    }
    Ok(())
}

fn scalar_scalar(state: &mut VmState, pop: u32, op: fn(f32, f32) -> f32) -> Result<(), ExecError> {
    let lhs = state.get(1)?;
    let rhs = state.get(2)?;
    match (lhs, rhs) {
        (Slot::Fp(a), Slot::Fp(b)) => {
            state.pop_n(2 + pop)?;
            state.push(Slot::Fp(op(a, b)))?;
            Ok(())
        }
        (Slot::Fp(_), found) => Err(ExecError::SlotMismatch {
            expected: "two scalar operands",
            found,
        }),
        (found, _) => Err(ExecError::SlotMismatch {
            expected: "two scalar operands",
            found,
        }),
    }
}
