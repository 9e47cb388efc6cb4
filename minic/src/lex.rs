//! Lexical analysis (tokenizer)
use crate::{
    error::{check_phase, Diagnostic, MinicResult, Phase},
    tokens::{KeywordKind, Pos, Token, TokenKind},
};

use std::{fmt::Write, iter::Iterator, str::FromStr};

/// Formats tokens one per line, in the layout of the `.token` artifact.
///
/// The end-of-source token is left out.
pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut buf = String::new();
    for token in tokens.iter().filter(|token| token.kind != TokenKind::Eof) {
        // Writing to a string can't fail.
        let _ = writeln!(
            buf,
            "row:{},col: {}: {}: '{}'",
            token.pos.row,
            token.pos.col,
            token.kind.category(),
            token.lexeme
        );
    }
    buf
}

/// States of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    InIdentifier,
    InNumber,
    InComment,
    /// Operator whose meaning depends on the following character.
    NeedLookahead,
    Error,
    Done,
}

/// Lexical analyzer.
pub struct Lexer<'a> {
    source: SourceText<'a>,
    diagnostics: Vec<Diagnostic>,
    /// Set once the end-of-source token has been handed out.
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            diagnostics: vec![],
            done: false,
        }
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Scan the whole source into a token sequence ending with [`TokenKind::Eof`].
    pub fn scan(mut self) -> Scan {
        let mut tokens = vec![];
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        log::debug!("scanned {} tokens", tokens.len());

        Scan {
            tokens,
            diagnostics: self.diagnostics,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let mut state = State::Start;
        let mut kind = TokenKind::Eof;
        let mut lexeme = String::new();
        let mut token_start = self.source.pos();
        let mut error = "Invalid Token";

        while state != State::Done {
            match state {
                State::Start => match self.source.next_char() {
                    None => {
                        // Give end-of-source its own position.
                        token_start = self.source.pos();
                        state = State::Done;
                    }
                    Some(c) if c.is_ascii_whitespace() => {}
                    Some(c) => {
                        token_start = self.source.pos();
                        lexeme.push(c);
                        state = if c.is_ascii_alphabetic() {
                            State::InIdentifier
                        } else if c.is_ascii_digit() {
                            State::InNumber
                        } else if TokenKind::from_char(c).is_some() || c == '!' {
                            State::NeedLookahead
                        } else {
                            State::Error
                        };
                    }
                },
                State::InIdentifier => match self.source.next_char() {
                    Some(c) if c.is_ascii_alphabetic() => lexeme.push(c),
                    other => {
                        if other.is_some() {
                            self.source.put_back();
                        }
                        // A valid keyword parsed from the fragment makes the
                        // token a reserved word instead of a user identifier.
                        kind = KeywordKind::from_str(&lexeme)
                            .map(TokenKind::Keyword)
                            .unwrap_or(TokenKind::Ident);
                        state = State::Done;
                    }
                },
                State::InNumber => match self.source.next_char() {
                    Some(c) if c.is_ascii_digit() => lexeme.push(c),
                    other => {
                        if other.is_some() {
                            self.source.put_back();
                        }
                        kind = TokenKind::Number;
                        state = State::Done;
                    }
                },
                State::NeedLookahead => {
                    // Lexeme holds exactly the operator character.
                    let first = lexeme.chars().next().unwrap_or_default();
                    match (first, self.source.next_char()) {
                        ('/', Some('*')) => {
                            lexeme.push('*');
                            state = State::InComment;
                        }
                        (c, Some('=')) if TokenKind::from_char_eq(c).is_some() => {
                            lexeme.push('=');
                            kind = TokenKind::from_char_eq(c).unwrap_or(TokenKind::Invalid);
                            state = State::Done;
                        }
                        (c, other) => {
                            if other.is_some() {
                                self.source.put_back();
                            }
                            match TokenKind::from_char(c) {
                                Some(single) => {
                                    kind = single;
                                    state = State::Done;
                                }
                                // Lone `!`
                                None => state = State::Error,
                            }
                        }
                    }
                }
                State::InComment => match self.source.next_char() {
                    Some('*') => match self.source.next_char() {
                        Some('/') => {
                            lexeme.clear();
                            state = State::Start;
                        }
                        // The character may be the `*` of a closing `*/`.
                        Some(_) => {
                            self.source.put_back();
                        }
                        None => {
                            error = "Unterminated Comment";
                            state = State::Error;
                        }
                    },
                    Some(_) => {}
                    None => {
                        error = "Unterminated Comment";
                        state = State::Error;
                    }
                },
                State::Error => {
                    self.diagnostics.push(Diagnostic::report(
                        Phase::Lexical,
                        error,
                        lexeme.as_str(),
                        token_start,
                    ));
                    kind = TokenKind::Invalid;
                    state = State::Done;
                }
                State::Done => unreachable!(),
            }
        }

        if kind == TokenKind::Eof {
            self.done = true;
        }

        Token::new(kind, lexeme, token_start)
    }
}

/// Implement `Lexer` as an iterator for consuming tokens lazily.
///
/// The end-of-source token is yielded once, then the iterator is exhausted.
impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            None
        } else {
            Some(self.next_token())
        }
    }
}

/// Output of a full scan.
#[derive(Debug)]
pub struct Scan {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scan {
    /// Success flag of the lexical phase.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_result(self) -> MinicResult<Vec<Token>> {
        check_phase(Phase::Lexical, self.diagnostics)?;
        Ok(self.tokens)
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// Supports pushing back exactly one character: [`SourceText::put_back`]
/// undoes the most recent [`SourceText::next_char`] and nothing more.
pub(crate) struct SourceText<'a> {
    original: &'a str,
    cursor: Cursor,
    /// Cursor before the most recent read, consumed by `put_back`.
    previous: Option<Cursor>,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    /// Byte offset of the next character.
    offset: usize,
    /// Row of the last character read.
    row: u32,
    /// Column of the last character read. Zero before the first character of a row.
    col: u32,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            cursor: Cursor {
                offset: 0,
                row: 1,
                col: 0,
            },
            previous: None,
        }
    }

    /// Advance the cursor and return the next character.
    fn next_char(&mut self) -> Option<char> {
        self.previous = Some(self.cursor);

        let c = self.original[self.cursor.offset..].chars().next()?;
        self.cursor.offset += c.len_utf8();
        if c == '\n' {
            self.cursor.row += 1;
            self.cursor.col = 0;
        } else {
            self.cursor.col += 1;
        }
        Some(c)
    }

    /// Undo the most recent read, restoring its row and column.
    ///
    /// Returns false when there is nothing to undo, which happens
    /// when called twice without a read in between.
    fn put_back(&mut self) -> bool {
        match self.previous.take() {
            Some(cursor) => {
                self.cursor = cursor;
                true
            }
            None => false,
        }
    }

    /// Position of the character most recently read.
    fn pos(&self) -> Pos {
        Pos::new(self.cursor.row, self.cursor.col)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).map(|token| token.kind).collect()
    }

    #[test]
    fn test_pushback_single_step() {
        let mut source = SourceText::new("ab\nc");
        assert_eq!(source.next_char(), Some('a'));
        assert_eq!(source.next_char(), Some('b'));
        assert_eq!(source.pos(), Pos::new(1, 2));
        assert!(source.put_back());
        assert!(!source.put_back(), "only one character can be pushed back");
        assert_eq!(source.pos(), Pos::new(1, 1));
        assert_eq!(source.next_char(), Some('b'));
        assert_eq!(source.next_char(), Some('\n'));
        assert_eq!(source.next_char(), Some('c'));
        assert_eq!(source.pos(), Pos::new(2, 1));
        assert!(source.put_back());
        assert_eq!(source.next_char(), Some('c'));
        assert_eq!(source.next_char(), None);
        assert!(source.put_back());
        assert_eq!(source.next_char(), None);
    }

    #[test]
    #[rustfmt::skip]
    fn test_token_kinds() {
        use KeywordKind as K;
        use TokenKind as T;
        assert_eq!(
            kinds("int x[10]; if (a <= b) x = a != 3; else return;"),
            vec![
                T::Keyword(K::Int), T::Ident, T::LeftBracket, T::Number, T::RightBracket, T::Semicolon,
                T::Keyword(K::If), T::LeftParen, T::Ident, T::LtEq, T::Ident, T::RightParen,
                T::Ident, T::Eq, T::Ident, T::NotEq, T::Number, T::Semicolon,
                T::Keyword(K::Else), T::Keyword(K::Return), T::Semicolon,
                T::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("int main\n  x>=10;").scan().tokens;
        let positions: Vec<_> = tokens.iter().map(|t| (t.lexeme.as_str(), t.pos.row, t.pos.col)).collect();
        assert_eq!(
            positions,
            vec![("int", 1, 1), ("main", 1, 5), ("x", 2, 3), (">=", 2, 4), ("10", 2, 6), (";", 2, 8), ("", 2, 8)]
        );
    }

    #[test]
    fn test_identifiers_are_alphabetic() {
        let tokens = Lexer::new("abc12_d").scan().tokens;
        assert_eq!(tokens[0].lexeme, "abc");
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].lexeme, "12");
        assert_eq!(tokens[2].kind, TokenKind::Invalid);
        assert_eq!(tokens[3].lexeme, "d");
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("a /* b * c **/ / d"),
            vec![TokenKind::Ident, TokenKind::Slash, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(kinds("/**/"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_comment_spans_lines() {
        let tokens = Lexer::new("/* one\ntwo\n*/ x").scan().tokens;
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[0].pos, Pos::new(3, 4));
    }

    #[test]
    fn test_unterminated_comment() {
        let scan = Lexer::new("int x; /* never closed").scan();
        assert!(!scan.is_ok());
        assert_eq!(scan.diagnostics[0].message, "Unterminated Comment");
        assert_eq!(scan.diagnostics[0].pos, Pos::new(1, 8));
        assert_eq!(scan.tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_invalid_characters_continue_scan() {
        let scan = Lexer::new("a ! b @ c").scan();
        assert_eq!(scan.diagnostics.len(), 2);
        assert_eq!(
            scan.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Ident,
                TokenKind::Invalid,
                TokenKind::Ident,
                TokenKind::Invalid,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
        assert_eq!(scan.tokens[3].lexeme, "@");
    }

    #[test]
    fn test_dump_tokens() {
        let tokens = Lexer::new("int x;").scan().tokens;
        assert_eq!(
            dump_tokens(&tokens),
            "row:1,col: 1: KEYWORD: 'int'\nrow:1,col: 5: ID: 'x'\nrow:1,col: 6: SEMI: ';'\n"
        );
    }
}
