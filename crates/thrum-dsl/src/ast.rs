//! Untyped expression tree.
//!
//! The surface parser wraps every top-level declaration body in an
//! [`Expr::Function`] (possibly with zero parameters); declarations loaded
//! from AST s-expressions may bind any expression directly.

use thrum_foundation::Symbol;

/// An ordered list of top-level declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub declarations: Vec<Declaration>,
}

/// A named binding, at module level or inside a lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Symbol,
    pub value: Expr,
}

/// One term of a flat operator sequence: the operator and its right operand.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorTerm {
    pub op: Symbol,
    pub operand: Expr,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Scalar literal, e.g. `440.0`.
    Scalar(f64),
    Identifier(Symbol),
    /// Application `f a b c`.
    Apply {
        function: Box<Expr>,
        params: Vec<Expr>,
    },
    /// Function definition. Produced by the surface parser for every
    /// top-level declaration; function *literals* are rejected later during
    /// CFG construction.
    Function {
        params: Vec<Symbol>,
        value: Box<Expr>,
    },
    /// `((let a 1) … body)` — accepted by the grammar, rejected during CFG
    /// construction.
    LexicalScope {
        bindings: Vec<Declaration>,
        value: Box<Expr>,
    },
    /// Flat left-to-right infix run, e.g. `a + b * c`. Must be lowered to
    /// applications before CFG construction; precedence is not resolved
    /// here.
    OperatorSequence {
        lhs: Box<Expr>,
        terms: Vec<OperatorTerm>,
    },
}

impl Module {
    /// Declaration value bound to `name`, if any.
    pub fn lookup(&self, name: &Symbol) -> Option<&Expr> {
        self.declarations
            .iter()
            .find(|decl| decl.name == *name)
            .map(|decl| &decl.value)
    }
}
