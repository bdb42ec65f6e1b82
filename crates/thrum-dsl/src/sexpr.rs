//! AST s-expression serializer.
//!
//! Golden-file form of modules and expressions:
//!
//! ```text
//! (let k 4)
//! (let main (\ x (+ k x)))
//! ```
//!
//! - `(let name <expr>)` — declaration
//! - `(\ p1 p2 <expr>)` — function definition
//! - `((let n <e>) … <expr>)` — lexical scope
//! - `(<expr> <arg>…)` — application
//! - `(ops <lhs> <op> <rhs> [<op> <rhs>]…)` — flat operator sequence
//! - bare atoms — identifiers and scalar literals
//!
//! `parse(stringify(x))` is structurally equal to `x`.

use std::fmt;

use thrum_foundation::sexpr::{Error, Reader, Token};
use thrum_foundation::Symbol;

use crate::ast::{Declaration, Expr, Module, OperatorTerm};

/// Parse a module from s-expression text.
pub fn parse_module(source: &str) -> Result<Module, Error> {
    let mut reader = Reader::new(source)?;
    let mut declarations = Vec::new();
    while !reader.at_end() {
        declarations.push(parse_declaration(&mut reader)?);
    }
    Ok(Module { declarations })
}

/// Parse a single expression from s-expression text.
pub fn parse_expression(source: &str) -> Result<Expr, Error> {
    let mut reader = Reader::new(source)?;
    let expr = parse_expr(&mut reader)?;
    if !reader.at_end() {
        return Err(Error::new(
            "trailing input after expression",
            reader.current_span(),
        ));
    }
    Ok(expr)
}

fn parse_declaration(reader: &mut Reader) -> Result<Declaration, Error> {
    reader.expect_lparen()?;
    if !reader.eat_atom("let") {
        return Err(Error::new(
            "expected a `(let name value)` declaration",
            reader.current_span(),
        ));
    }
    let (name, _) = reader.expect_atom()?;
    let value = parse_expr(reader)?;
    reader.expect_rparen()?;
    Ok(Declaration {
        name: Symbol::from(name),
        value,
    })
}

fn parse_expr(reader: &mut Reader) -> Result<Expr, Error> {
    match reader.peek() {
        Some(Token::Atom(text)) => {
            reader.advance();
            Ok(atom_expr(text))
        }
        Some(Token::LParen) => parse_compound(reader),
        _ => Err(Error::new("expected an expression", reader.current_span())),
    }
}

fn atom_expr(text: &str) -> Expr {
    match text.parse::<f64>() {
        Ok(value) => Expr::Scalar(value),
        Err(_) => Expr::Identifier(Symbol::from(text)),
    }
}

fn parse_compound(reader: &mut Reader) -> Result<Expr, Error> {
    reader.expect_lparen()?;

    if reader.eat_atom("\\") {
        return parse_function(reader);
    }
    if reader.eat_atom("ops") {
        return parse_operator_sequence(reader);
    }
    if let Some(Token::LParen) = reader.peek() {
        // Either a lexical scope (`((let …)… body)`) or an application with
        // a compound head; a failed declaration parse backtracks to the
        // application case.
        let checkpoint = reader.checkpoint();
        if let Ok(binding) = parse_declaration(reader) {
            return parse_lexical_scope(reader, binding);
        }
        reader.restore(checkpoint);
    }
    parse_application(reader)
}

fn parse_function(reader: &mut Reader) -> Result<Expr, Error> {
    // Greedy parameter list; the final item is the body.
    let mut params = Vec::new();
    loop {
        match reader.peek() {
            Some(Token::Atom(text)) => {
                reader.advance();
                params.push(text);
            }
            Some(Token::LParen) => {
                let body = parse_compound(reader)?;
                reader.expect_rparen()?;
                return Ok(function_expr(params, body));
            }
            _ => break,
        }
    }
    let Some(body) = params.pop() else {
        return Err(Error::new(
            "function definition requires a body",
            reader.current_span(),
        ));
    };
    reader.expect_rparen()?;
    Ok(function_expr(params, atom_expr(body)))
}

fn function_expr(params: Vec<&str>, body: Expr) -> Expr {
    Expr::Function {
        params: params.into_iter().map(Symbol::from).collect(),
        value: Box::new(body),
    }
}

fn parse_lexical_scope(reader: &mut Reader, first: Declaration) -> Result<Expr, Error> {
    let mut bindings = vec![first];
    loop {
        if let Some(Token::LParen) = reader.peek() {
            let checkpoint = reader.checkpoint();
            if let Ok(binding) = parse_declaration(reader) {
                bindings.push(binding);
                continue;
            }
            reader.restore(checkpoint);
        }
        break;
    }
    let value = parse_expr(reader)?;
    reader.expect_rparen()?;
    Ok(Expr::LexicalScope {
        bindings,
        value: Box::new(value),
    })
}

fn parse_operator_sequence(reader: &mut Reader) -> Result<Expr, Error> {
    let lhs = parse_expr(reader)?;
    let mut terms = Vec::new();
    loop {
        match reader.peek() {
            Some(Token::RParen) => break,
            _ => {
                let (op, _) = reader.expect_atom()?;
                let operand = parse_expr(reader)?;
                terms.push(OperatorTerm {
                    op: Symbol::from(op),
                    operand,
                });
            }
        }
    }
    if terms.is_empty() {
        return Err(Error::new(
            "operator sequence requires at least one term",
            reader.current_span(),
        ));
    }
    reader.expect_rparen()?;
    Ok(Expr::OperatorSequence {
        lhs: Box::new(lhs),
        terms,
    })
}

fn parse_application(reader: &mut Reader) -> Result<Expr, Error> {
    let function = parse_expr(reader)?;
    let mut params = Vec::new();
    while !matches!(reader.peek(), Some(Token::RParen) | None) {
        params.push(parse_expr(reader)?);
    }
    if params.is_empty() {
        return Err(Error::new(
            "application requires at least one argument",
            reader.current_span(),
        ));
    }
    reader.expect_rparen()?;
    Ok(Expr::Apply {
        function: Box::new(function),
        params,
    })
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.declarations {
            writeln!(f, "{decl}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(let {} {})", self.name, self.value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Scalar(value) => write!(f, "{value}"),
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::Apply { function, params } => {
                write!(f, "({function}")?;
                for param in params {
                    write!(f, " {param}")?;
                }
                write!(f, ")")
            }
            Expr::Function { params, value } => {
                write!(f, "(\\")?;
                for param in params {
                    write!(f, " {param}")?;
                }
                write!(f, " {value})")
            }
            Expr::LexicalScope { bindings, value } => {
                write!(f, "(")?;
                for binding in bindings {
                    write!(f, "{binding} ")?;
                }
                write!(f, "{value})")
            }
            Expr::OperatorSequence { lhs, terms } => {
                write!(f, "(ops {lhs}")?;
                for term in terms {
                    write!(f, " {} {}", term.op, term.operand)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(source: &str) {
        let module = parse_module(source).unwrap();
        let reparsed = parse_module(&module.to_string()).unwrap();
        assert_eq!(module, reparsed);
    }

    #[test]
    fn test_parse_scalar_declaration() {
        let module = parse_module("(let k 4)").unwrap();
        assert_eq!(module.declarations[0].value, Expr::Scalar(4.0));
    }

    #[test]
    fn test_parse_function_definition() {
        let module = parse_module("(let main (\\ x x))").unwrap();
        assert_eq!(
            module.declarations[0].value,
            Expr::Function {
                params: vec![Symbol::from("x")],
                value: Box::new(Expr::Identifier(Symbol::from("x"))),
            }
        );
    }

    #[test]
    fn test_parse_application_of_operator() {
        let module = parse_module("(let main (\\ x (+ x x)))").unwrap();
        let Expr::Function { value, .. } = &module.declarations[0].value else {
            panic!("expected function");
        };
        assert!(matches!(**value, Expr::Apply { .. }));
    }

    #[test]
    fn test_parse_lexical_scope() {
        let module = parse_module("(let main ((let a 1) (let b 2) a))").unwrap();
        let Expr::LexicalScope { bindings, .. } = &module.declarations[0].value else {
            panic!("expected lexical scope");
        };
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_compound_head_application_backtracks() {
        let module = parse_module("(let main ((\\ x x) 1))").unwrap();
        let Expr::Apply { function, .. } = &module.declarations[0].value else {
            panic!("expected application");
        };
        assert!(matches!(**function, Expr::Function { .. }));
    }

    #[test]
    fn test_round_trips() {
        round_trip("(let k 4)");
        round_trip("(let main (\\ x (+ (f x 2.5) x)))");
        round_trip("(let main ((let a 1) (+ a a)))");
        round_trip("(let main (\\ x (ops x + x * x)))");
        round_trip("(let main (\\ x ((\\ y y) x)))");
    }

    #[test]
    fn test_surface_parse_matches_sexpr() {
        let surface = crate::parser::parse_module("main x = x + x ;").unwrap();
        let golden = parse_module("(let main (\\ x (ops x + x)))").unwrap();
        assert_eq!(surface, golden);
    }
}
