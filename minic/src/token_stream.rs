//! Buffered stream of tokens for look ahead.
use crate::tokens::{Token, TokenKind};

use itertools::{multipeek, MultiPeek};
use std::{iter::Iterator, slice};

/// Cursor over a scanned token sequence that allows arbitrary look ahead.
///
/// The peek semantics are determined by the internal `MultiPeek`.
/// Calling `TokenStream::peek` is not idempotent, advancing a peek
/// cursor forward by one token for each `peek()` call. The cursor
/// can be reset explicitly using `TokenStream::reset_peek` or
/// implicitly by calling `TokenStream::advance`.
///
/// Once the tokens run out the stream keeps returning an end-of-source
/// token, so callers never observe a missing current token.
pub struct TokenStream<'a> {
    tokens: MultiPeek<slice::Iter<'a, Token>>,
    current: Option<&'a Token>,
    eof: Token,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let eof = tokens
            .last()
            .map(|token| Token::eof(token.pos))
            .unwrap_or_else(|| Token::eof(Default::default()));
        let mut iter = multipeek(tokens.iter());
        let current = iter.next();

        Self {
            tokens: iter,
            current,
            eof,
        }
    }

    /// The token under the cursor.
    #[inline]
    pub fn current(&self) -> &Token {
        self.current.unwrap_or(&self.eof)
    }

    #[inline]
    pub fn kind(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    pub fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    /// Consumes the current token regardless of type.
    ///
    /// Does nothing at the end of the stream.
    pub fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.current = self.tokens.next();
        }
        self.tokens.reset_peek();
        token
    }

    /// Consumes the current token if it matches the given token type.
    ///
    /// Returns the consumed token when matched. Does not consume
    /// the token if the types do not match.
    pub fn match_token(&mut self, token_kind: TokenKind) -> Option<Token> {
        if self.at(token_kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Look at the token following the peek cursor, advancing the peek cursor.
    ///
    /// The first call after a reset returns the token after the current one.
    pub fn peek(&mut self) -> TokenKind {
        self.tokens.peek().map(|token| token.kind).unwrap_or(TokenKind::Eof)
    }

    /// Set peek cursor back to the current cursor.
    pub fn reset_peek(&mut self) {
        self.tokens.reset_peek()
    }

    /// Kind of the token `n` places after the current one.
    pub fn peek_nth(&mut self, n: usize) -> TokenKind {
        self.reset_peek();
        let mut kind = self.kind();
        for _ in 0..n {
            kind = self.peek();
        }
        self.reset_peek();
        kind
    }

    /// Scans forward from the current token for the first token
    /// in `targets`, leaving the stream where it was.
    pub fn scan_for(&mut self, targets: &[TokenKind]) -> Option<TokenKind> {
        self.reset_peek();
        let mut kind = self.kind();
        let found = loop {
            if targets.contains(&kind) {
                break Some(kind);
            }
            if kind == TokenKind::Eof {
                break None;
            }
            kind = self.peek();
        };
        self.reset_peek();
        found
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lex::Lexer;

    #[test]
    fn test_peek_does_not_consume() {
        let tokens = Lexer::new("a = b;").scan().tokens;
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(stream.peek_nth(1), TokenKind::Eq);
        assert_eq!(stream.peek_nth(3), TokenKind::Semicolon);
        assert_eq!(stream.peek_nth(9), TokenKind::Eof);
        assert_eq!(stream.kind(), TokenKind::Ident);
        assert_eq!(stream.advance().lexeme, "a");
        assert_eq!(stream.kind(), TokenKind::Eq);
    }

    #[test]
    fn test_scan_for_declaration_kind() {
        let tokens = Lexer::new("int f ( void )").scan().tokens;
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(
            stream.scan_for(&[TokenKind::Semicolon, TokenKind::LeftParen]),
            Some(TokenKind::LeftParen)
        );
        assert_eq!(stream.scan_for(&[TokenKind::Semicolon]), None);
        assert_eq!(stream.current().lexeme, "int");
    }

    #[test]
    fn test_end_of_stream_is_sticky() {
        let tokens = Lexer::new("x").scan().tokens;
        let mut stream = TokenStream::new(&tokens);
        stream.advance();
        assert!(stream.at_end());
        stream.advance();
        stream.advance();
        assert!(stream.at_end());
        assert!(stream.match_token(TokenKind::Semicolon).is_none());
    }
}
