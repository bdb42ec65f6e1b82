//! Recursive-descent parser for Thrum source text.
//!
//! Declarations are `name param* = expression ;`. Expressions are scalar
//! literals, identifiers, parenthesised expressions, applications, and flat
//! operator sequences. Errors accumulate: a failed declaration records its
//! diagnostic and the parser resynchronizes at the next `;`.

mod error;
mod stream;

pub use error::{ParseError, ParseErrorKind};

use std::collections::HashSet;

use thrum_foundation::{Span, Symbol};
use tracing::debug;

use crate::ast::{Declaration, Expr, Module, OperatorTerm};
use crate::lexer::{lex, Token};
use stream::TokenStream;

/// Parse a whole module.
///
/// # Errors
///
/// Returns every diagnostic found; the module is rejected as a whole if any
/// declaration fails.
pub fn parse_module(source: &str) -> Result<Module, Vec<ParseError>> {
    let (tokens, mut errors) = lex(source);
    let end = Span::of_range(source, source.len()..source.len());
    let mut stream = TokenStream::new(&tokens, end);

    let mut declarations: Vec<Declaration> = Vec::new();
    let mut seen: HashSet<Symbol> = HashSet::new();

    while !stream.at_end() {
        let span = stream.current_span();
        match parse_declaration(&mut stream) {
            Ok(decl) => {
                if !seen.insert(decl.name.clone()) {
                    errors.push(ParseError::duplicate_name(decl.name.as_str(), span));
                } else {
                    declarations.push(decl);
                }
            }
            Err(error) => {
                errors.push(error);
                stream.synchronize();
            }
        }
    }

    if errors.is_empty() {
        debug!(declarations = declarations.len(), "parsed module");
        Ok(Module { declarations })
    } else {
        Err(errors)
    }
}

fn parse_declaration(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    let name = Symbol::from(stream.expect_ident("a declaration name")?);

    let mut params = Vec::new();
    while let Some(Token::Ident(param)) = stream.peek() {
        params.push(Symbol::from(param));
        stream.advance();
    }

    stream.expect_equals()?;
    let body = parse_expression(stream)?;
    stream.expect_semi()?;

    // Every top-level declaration is a function template; values are the
    // nullary case.
    Ok(Declaration {
        name,
        value: Expr::Function {
            params,
            value: Box::new(body),
        },
    })
}

fn parse_expression(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let lhs = parse_operand(stream)?;

    let mut terms = Vec::new();
    while let Some(Token::Operator(op)) = stream.peek() {
        stream.advance();
        let operand = parse_operand(stream)?;
        terms.push(OperatorTerm {
            op: Symbol::from(op),
            operand,
        });
    }

    if terms.is_empty() {
        Ok(lhs)
    } else {
        Ok(Expr::OperatorSequence {
            lhs: Box::new(lhs),
            terms,
        })
    }
}

fn parse_operand(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let head = parse_atom(stream)?;

    let mut args = Vec::new();
    while matches!(
        stream.peek(),
        Some(Token::Number(_) | Token::Ident(_) | Token::LParen)
    ) {
        args.push(parse_atom(stream)?);
    }

    if args.is_empty() {
        Ok(head)
    } else {
        Ok(Expr::Apply {
            function: Box::new(head),
            params: args,
        })
    }
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    match stream.peek() {
        Some(Token::Number(value)) => {
            stream.advance();
            Ok(Expr::Scalar(value))
        }
        Some(Token::Ident(name)) => {
            stream.advance();
            Ok(Expr::Identifier(Symbol::from(name)))
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_expression(stream)?;
            stream.expect_rparen()?;
            Ok(inner)
        }
        other => Err(ParseError::expected(
            "an expression",
            other,
            stream.current_span(),
        )),
    }
}
