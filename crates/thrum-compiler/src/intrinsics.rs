//! Intrinsic binary operators.
//!
//! Every CFG package starts from these seeds: each of `+` and `*` in four
//! monomorphic variants, one per combination of scalar and vector
//! operands. User code reaches them purely through type-directed
//! resolution; the variant whose signature matches the call site's operand
//! types is the one selected.

use indexmap::IndexMap;

use thrum_foundation::Symbol;
use thrum_vm::Opcode;

use crate::cfg::Value;
use crate::typed::TypedSymbol;
use crate::types::{intersection, FunctionType, Type};

/// The seed package entries.
pub fn intrinsics() -> IndexMap<TypedSymbol, Value> {
    let scalar = Type::f32();
    let vector = scalar.vector_version();

    let mut functions = IndexMap::new();
    let operators = [
        (
            "+",
            [Opcode::AddVv, Opcode::AddSv, Opcode::AddVs, Opcode::AddSs],
        ),
        (
            "*",
            [Opcode::MulVv, Opcode::MulSv, Opcode::MulVs, Opcode::MulSs],
        ),
    ];

    for (name, opcodes) in operators {
        let shapes = [
            (vector.clone(), vector.clone()),
            (scalar.clone(), vector.clone()),
            (vector.clone(), scalar.clone()),
            (scalar.clone(), scalar.clone()),
        ];
        for (op, (lhs, rhs)) in opcodes.into_iter().zip(shapes) {
            add_binary_op(&mut functions, name, op, lhs, rhs);
        }
    }

    functions
}

fn add_binary_op(
    functions: &mut IndexMap<TypedSymbol, Value>,
    name: &str,
    op: Opcode,
    lhs: Type,
    rhs: Type,
) {
    let result = intersection(&lhs, &rhs).expect("operand shapes always intersect");
    let key = TypedSymbol::new(
        Symbol::from(name),
        FunctionType {
            result,
            params: vec![lhs, rhs],
        },
    );
    let root = Value::BinaryOp {
        op,
        lhs: Box::new(Value::ParamRef(0)),
        rhs: Box::new(Value::ParamRef(1)),
    };
    functions.insert(key, root);
}
