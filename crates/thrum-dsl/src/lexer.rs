//! Lexical analysis for Thrum source text.
//!
//! Identifiers begin with `_`, `'` or a lowercase letter and continue with
//! those plus uppercase letters and digits. Operators are runs of printable
//! characters that are neither identifier characters nor parentheses; `=`
//! and `;` stand alone as structural tokens but fold into longer operator
//! runs (`==` is an operator).

use logos::Logos;

use thrum_foundation::Span;

use crate::parser::ParseError;

/// One surface-syntax token.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    #[token("(", priority = 10)]
    LParen,
    #[token(")", priority = 10)]
    RParen,
    /// Declaration body marker.
    #[token("=", priority = 10)]
    Equals,
    /// Declaration terminator.
    #[token(";", priority = 10)]
    Semi,
    /// Scalar literal. Signs are not part of the literal; `-` is an
    /// ordinary operator character.
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[regex(r"[_'a-z][_'a-zA-Z0-9]*", |lex| lex.slice())]
    Ident(&'src str),
    #[regex(r#"[!#"$%&*+,\-./:;<=>?@\\^`|~]+"#, |lex| lex.slice())]
    Operator(&'src str),
}

/// Tokenize `source`, accumulating an error per unrecognized character.
pub fn lex(source: &str) -> (Vec<(Token<'_>, Span)>, Vec<ParseError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(token) = lexer.next() {
        let span = Span::of_range(source, lexer.span());
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(ParseError::unrecognized_character(lexer.slice(), span)),
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            tokens("main x = 1.0 ;"),
            vec![
                Token::Ident("main"),
                Token::Ident("x"),
                Token::Equals,
                Token::Number(1.0),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("x + y *. z"),
            vec![
                Token::Ident("x"),
                Token::Operator("+"),
                Token::Ident("y"),
                Token::Operator("*."),
                Token::Ident("z"),
            ]
        );
    }

    #[test]
    fn test_equals_folds_into_operator_runs() {
        assert_eq!(tokens("=="), vec![Token::Operator("==")]);
        assert_eq!(tokens("="), vec![Token::Equals]);
    }

    #[test]
    fn test_identifier_shapes() {
        assert_eq!(
            tokens("_x 'osc x2 aB"),
            vec![
                Token::Ident("_x"),
                Token::Ident("'osc"),
                Token::Ident("x2"),
                Token::Ident("aB"),
            ]
        );
    }

    #[test]
    fn test_scientific_literals() {
        assert_eq!(tokens("2.5e-3"), vec![Token::Number(2.5e-3)]);
    }

    #[test]
    fn test_unrecognized_character() {
        let (_, errors) = lex("main = Bad ;");
        assert_eq!(errors.len(), 1);
    }
}
