//! Parse errors.

use std::fmt;

use thrum_foundation::Span;

use crate::lexer::Token;

/// A parse diagnostic with source location.
///
/// Errors accumulate across declarations (the parser recovers at the next
/// `;`) and fail the whole input together.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token or construct was expected and something else found.
    UnexpectedToken,
    /// Input ended while a declaration was incomplete.
    UnexpectedEof,
    /// A character no token can start with.
    UnrecognizedCharacter,
    /// Two module declarations share a name.
    DuplicateName,
}

impl ParseError {
    /// An "expected X, found Y" error.
    pub fn expected(what: &str, found: Option<Token<'_>>, span: Span) -> Self {
        let (kind, found) = match found {
            Some(token) => (ParseErrorKind::UnexpectedToken, describe(token)),
            None => (ParseErrorKind::UnexpectedEof, "end of input".to_string()),
        };
        Self {
            kind,
            span,
            message: format!("expected {what}, found {found}"),
        }
    }

    pub fn unrecognized_character(text: &str, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::UnrecognizedCharacter,
            span,
            message: format!("unrecognized character `{text}`"),
        }
    }

    pub fn duplicate_name(name: &str, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::DuplicateName,
            span,
            message: format!("duplicate declaration of `{name}`"),
        }
    }
}

fn describe(token: Token<'_>) -> String {
    match token {
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::Equals => "`=`".to_string(),
        Token::Semi => "`;`".to_string(),
        Token::Number(value) => format!("number `{value}`"),
        Token::Ident(name) => format!("identifier `{name}`"),
        Token::Operator(op) => format!("operator `{op}`"),
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for ParseError {}
