//! S-expression reader shared by the golden-file serializers.
//!
//! The AST, CFG and type serializers all speak a whitespace-separated
//! s-expression surface. This module provides the common token layer: a
//! logos lexer over `(`, `)` and bare atoms, and a cursor with lookahead and
//! checkpointing for the per-stage tree parsers built on top of it.

use logos::Logos;

use crate::Span;

/// One s-expression token.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    /// Any run of non-whitespace, non-parenthesis characters.
    #[regex(r"[^\s()]+", |lex| lex.slice())]
    Atom(&'src str),
}

/// Error raised by a reader or by a tree parser built on one.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub message: String,
    pub span: Span,
}

impl Error {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.span)
    }
}

impl std::error::Error for Error {}

/// Token cursor with lookahead and backtracking.
///
/// Backtracking exists for the one genuinely ambiguous production in the
/// CFG/AST grammars (a parenthesised form that may be either a lexical
/// scope or an application); everything else is single-token lookahead.
pub struct Reader<'src> {
    tokens: Vec<(Token<'src>, Span)>,
    pos: usize,
    end: Span,
}

impl<'src> Reader<'src> {
    pub fn new(source: &'src str) -> Result<Self, Error> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            let span = Span::of_range(source, lexer.span());
            match token {
                Ok(token) => tokens.push((token, span)),
                Err(()) => return Err(Error::new("invalid character", span)),
            }
        }
        let end = Span::of_range(source, source.len()..source.len());
        Ok(Self {
            tokens,
            pos: 0,
            end,
        })
    }

    pub fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
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
        self.tokens.get(self.pos).map(|(_, s)| *s).unwrap_or(self.end)
    }

    /// Save the cursor position for later [`Reader::restore`].
    pub fn checkpoint(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    pub fn expect_lparen(&mut self) -> Result<(), Error> {
        match self.advance() {
            Some((Token::LParen, _)) => Ok(()),
            other => Err(self.unexpected("`(`", other)),
        }
    }

    pub fn expect_rparen(&mut self) -> Result<(), Error> {
        match self.advance() {
            Some((Token::RParen, _)) => Ok(()),
            other => Err(self.unexpected("`)`", other)),
        }
    }

    pub fn expect_atom(&mut self) -> Result<(&'src str, Span), Error> {
        match self.advance() {
            Some((Token::Atom(text), span)) => Ok((text, span)),
            other => Err(self.unexpected("an atom", other)),
        }
    }

    /// Consume the next token if it is the given atom.
    pub fn eat_atom(&mut self, text: &str) -> bool {
        if let Some(Token::Atom(found)) = self.peek() {
            if found == text {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn unexpected(&self, expected: &str, found: Option<(Token<'src>, Span)>) -> Error {
        match found {
            Some((token, span)) => {
                let found = match token {
                    Token::LParen => "`(`".to_string(),
                    Token::RParen => "`)`".to_string(),
                    Token::Atom(text) => format!("`{text}`"),
                };
                Error::new(format!("expected {expected}, found {found}"), span)
            }
            None => Error::new(format!("expected {expected}, found end of input"), self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let mut reader = Reader::new("(fp 1.5)").unwrap();
        assert_eq!(reader.peek(), Some(Token::LParen));
        reader.expect_lparen().unwrap();
        assert_eq!(reader.expect_atom().unwrap().0, "fp");
        assert_eq!(reader.expect_atom().unwrap().0, "1.5");
        reader.expect_rparen().unwrap();
        assert!(reader.at_end());
    }

    #[test]
    fn test_mangled_atoms_survive() {
        let mut reader = Reader::new("+_[vF32:vF32:vF32]").unwrap();
        assert_eq!(reader.expect_atom().unwrap().0, "+_[vF32:vF32:vF32]");
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut reader = Reader::new("(a b)").unwrap();
        let cp = reader.checkpoint();
        reader.expect_lparen().unwrap();
        reader.expect_atom().unwrap();
        reader.restore(cp);
        assert_eq!(reader.peek(), Some(Token::LParen));
    }

    #[test]
    fn test_unexpected_reports_span() {
        let mut reader = Reader::new(")").unwrap();
        let err = reader.expect_atom().unwrap_err();
        assert!(err.message.contains("expected an atom"));
    }
}
