//! Operator-sequence lowering.
//!
//! The parser produces flat infix runs; this pass rewrites them into
//! left-associative applications of the operator identifiers, so
//! `a + b * c` becomes `(* (+ a b) c)`. No precedence table is applied.

use crate::ast::{Declaration, Expr, Module};

/// Lower every declaration in a module.
pub fn lower_module(module: Module) -> Module {
    Module {
        declarations: module
            .declarations
            .into_iter()
            .map(|decl| Declaration {
                name: decl.name,
                value: lower_expr(decl.value),
            })
            .collect(),
    }
}

/// Recursively replace operator sequences with applications.
pub fn lower_expr(expr: Expr) -> Expr {
    match expr {
        Expr::OperatorSequence { lhs, terms } => {
            terms
                .into_iter()
                .fold(lower_expr(*lhs), |acc, term| Expr::Apply {
                    function: Box::new(Expr::Identifier(term.op)),
                    params: vec![acc, lower_expr(term.operand)],
                })
        }
        Expr::Apply { function, params } => Expr::Apply {
            function: Box::new(lower_expr(*function)),
            params: params.into_iter().map(lower_expr).collect(),
        },
        Expr::Function { params, value } => Expr::Function {
            params,
            value: Box::new(lower_expr(*value)),
        },
        Expr::LexicalScope { bindings, value } => Expr::LexicalScope {
            bindings: bindings
                .into_iter()
                .map(|decl| Declaration {
                    name: decl.name,
                    value: lower_expr(decl.value),
                })
                .collect(),
            value: Box::new(lower_expr(*value)),
        },
        atom @ (Expr::Scalar(_) | Expr::Identifier(_)) => atom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_foundation::Symbol;

    use crate::parser::parse_module;

    fn lower_body(source: &str) -> Expr {
        let module = lower_module(parse_module(source).unwrap());
        let Expr::Function { value, .. } = module.declarations[0].value.clone() else {
            panic!("expected function wrapper");
        };
        *value
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier(Symbol::from(name))
    }

    fn apply(op: &str, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Apply {
            function: Box::new(ident(op)),
            params: vec![lhs, rhs],
        }
    }

    #[test]
    fn test_left_associative_fold() {
        assert_eq!(
            lower_body("main x = x + x * x ;"),
            apply("*", apply("+", ident("x"), ident("x")), ident("x"))
        );
    }

    #[test]
    fn test_lowering_reaches_nested_operands() {
        assert_eq!(
            lower_body("main x = f (x + x) ;"),
            Expr::Apply {
                function: Box::new(ident("f")),
                params: vec![apply("+", ident("x"), ident("x"))],
            }
        );
    }

    #[test]
    fn test_atoms_unchanged() {
        assert_eq!(lower_body("k = 4.0 ;"), Expr::Scalar(4.0));
    }
}
