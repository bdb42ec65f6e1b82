//! Typed control-flow graphs.
//!
//! Each monomorphic function has a rooted acyclic value graph. References
//! *between* functions are nominal — a [`Value::FunctionRef`] names its
//! target by typed symbol — so recursive functions are representable
//! without cycles in the value graphs themselves.

use indexmap::IndexMap;

use thrum_foundation::Symbol;
use thrum_vm::Opcode;

use crate::error::CompileError;
use crate::typed::TypedSymbol;
use crate::types::{intersection, FunctionType, Type};

/// A CFG value node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Literal; typed `F32` and narrowed to 32 bits at codegen.
    FPValue(f64),
    /// Parameter of the enclosing function, by ordinal.
    ParamRef(usize),
    /// Nominal reference to a monomorphic function.
    FunctionRef { name: Symbol, ty: FunctionType },
    /// Shape-dispatched binary arithmetic; `op` is one of the eight
    /// arithmetic opcodes.
    BinaryOp {
        op: Opcode,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    CallFunc {
        function: Box<Value>,
        params: Vec<Value>,
    },
}

impl Value {
    /// The type of this value inside a function of type `enclosing`.
    ///
    /// # Errors
    ///
    /// Fails on structurally invalid graphs (out-of-range parameter, call
    /// of a non-function, operands with no intersection) — reachable only
    /// through parsed CFG input, since construction checks these.
    pub fn type_in(&self, enclosing: &FunctionType) -> Result<Type, CompileError> {
        match self {
            Value::FPValue(_) => Ok(Type::f32()),
            Value::ParamRef(index) => {
                enclosing.params.get(*index).cloned().ok_or_else(|| {
                    CompileError::MalformedGraph(format!(
                        "parameter index {index} out of range for {enclosing}"
                    ))
                })
            }
            Value::FunctionRef { ty, .. } => Ok(Type::Function(Box::new(ty.clone()))),
            Value::BinaryOp { lhs, rhs, .. } => {
                let lhs = lhs.type_in(enclosing)?;
                let rhs = rhs.type_in(enclosing)?;
                intersection(&lhs, &rhs).ok_or_else(|| {
                    CompileError::TypeMismatch(format!(
                        "operand types `{lhs}` and `{rhs}` have no intersection"
                    ))
                })
            }
            Value::CallFunc { function, .. } => match function.type_in(enclosing)? {
                Type::Function(ft) => Ok(ft.result),
                other => Err(CompileError::MalformedGraph(format!(
                    "call target has non-function type `{other}`"
                ))),
            },
        }
    }
}

/// A set of monomorphic functions keyed by typed symbol.
///
/// Insertion order is preserved; codegen lays functions out in this order,
/// so compiled output is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub functions: IndexMap<TypedSymbol, Value>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }
}
