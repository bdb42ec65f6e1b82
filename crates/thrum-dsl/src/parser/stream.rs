//! Token stream with lookahead and declaration-boundary recovery.

use thrum_foundation::Span;

use crate::lexer::Token;
use crate::parser::ParseError;

pub struct TokenStream<'src, 'tok> {
    tokens: &'tok [(Token<'src>, Span)],
    pos: usize,
    end: Span,
}

impl<'src, 'tok> TokenStream<'src, 'tok> {
    pub fn new(tokens: &'tok [(Token<'src>, Span)], end: Span) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    pub fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    pub fn advance(&mut self) -> Option<(Token<'src>, Span)> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the current token, or of end-of-input.
    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| *span)
            .unwrap_or(self.end)
    }

    /// Consume an identifier or fail with `what` in the message.
    pub fn expect_ident(&mut self, what: &str) -> Result<&'src str, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            other => Err(ParseError::expected(what, other, self.current_span())),
        }
    }

    pub fn expect_equals(&mut self) -> Result<(), ParseError> {
        self.expect_structural(Token::Equals, "`=`")
    }

    pub fn expect_semi(&mut self) -> Result<(), ParseError> {
        self.expect_structural(Token::Semi, "`;`")
    }

    pub fn expect_rparen(&mut self) -> Result<(), ParseError> {
        self.expect_structural(Token::RParen, "`)`")
    }

    fn expect_structural(&mut self, token: Token<'src>, what: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(found) if found == token => {
                self.pos += 1;
                Ok(())
            }
            other => Err(ParseError::expected(what, other, self.current_span())),
        }
    }

    /// Skip past the next `;` so the parser can continue with the following
    /// declaration after an error.
    pub fn synchronize(&mut self) {
        while let Some((token, _)) = self.advance() {
            if token == Token::Semi {
                return;
            }
        }
    }
}
