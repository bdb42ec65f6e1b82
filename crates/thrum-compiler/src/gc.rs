//! Dead-instance elimination.
//!
//! Monomorphisation over-approximates: intrinsic seeds and instances built
//! for since-abandoned signatures stay in the package. A mark-and-sweep
//! pass from the entry point drops every instance the compiled program can
//! never reach.

use indexmap::IndexSet;
use tracing::debug;

use crate::cfg::{Package, Value};
use crate::error::CompileError;
use crate::typed::TypedSymbol;

/// Remove every package entry not reachable from `root` through
/// `CallFunc`, `BinaryOp`, and `FunctionRef` edges.
///
/// # Errors
///
/// [`CompileError::UndefinedRoot`] if `root` is not in the package.
pub fn gc(package: &mut Package, root: &TypedSymbol) -> Result<(), CompileError> {
    let Some(start) = package.functions.get(root) else {
        return Err(CompileError::UndefinedRoot(root.clone()));
    };

    let mut marked = IndexSet::new();
    marked.insert(root.clone());
    mark(package, start, &mut marked);

    let before = package.functions.len();
    package.functions.retain(|key, _| marked.contains(key));
    debug!(
        kept = package.functions.len(),
        swept = before - package.functions.len(),
        "gc complete"
    );
    Ok(())
}

fn mark(package: &Package, value: &Value, marked: &mut IndexSet<TypedSymbol>) {
    match value {
        Value::CallFunc { function, params } => {
            mark(package, function, marked);
            for param in params {
                mark(package, param, marked);
            }
        }
        Value::BinaryOp { lhs, rhs, .. } => {
            mark(package, lhs, marked);
            mark(package, rhs, marked);
        }
        Value::FunctionRef { name, ty } => {
            let key = TypedSymbol::new(name.clone(), ty.clone());
            if marked.insert(key.clone()) {
                if let Some(root) = package.functions.get(&key) {
                    mark(package, root, marked);
                }
            }
        }
        Value::ParamRef(_) | Value::FPValue(_) => {}
    }
}
