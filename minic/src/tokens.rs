use std::{fmt, str::FromStr};

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal source text of the token.
    pub lexeme: SmolStr,
    /// Position of the first character of the lexeme.
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<SmolStr>, pos: Pos) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            pos,
        }
    }

    pub fn eof(pos: Pos) -> Self {
        Self::new(TokenKind::Eof, "", pos)
    }

    /// Token attached to symbols that don't originate from source code.
    pub(crate) fn builtin(name: &str) -> Self {
        Self::new(TokenKind::Ident, name, Pos::default())
    }
}

/// One-based row and column in source text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    pub row: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plus,      // `+`
    Minus,     // `-`
    Star,      // `*`
    Slash,     // `/`
    Lt,        // `<`
    LtEq,      // `<=`
    Gt,        // `>`
    GtEq,      // `>=`
    EqEq,      // `==`
    NotEq,     // `!=`
    Eq,        // `=`
    Semicolon, // `;`
    Comma,     // `,`
    LeftParen,    // `(`
    RightParen,   // `)`
    LeftBracket,  // `[`
    RightBracket, // `]`
    LeftBrace,    // `{`
    RightBrace,   // `}`

    /// Number Literal
    Number,

    Ident,

    /// Identifier in the set of reserved words.
    Keyword(KeywordKind),

    /// Character sequence that isn't part of the language.
    Invalid,

    /// End-of-source
    Eof,
}

impl TokenKind {
    /// Category label used by the token dump.
    #[rustfmt::skip]
    pub fn category(&self) -> &'static str {
        use TokenKind as T;
        match self {
            T::Keyword(_)                                    => "KEYWORD",
            T::Plus | T::Minus                               => "ADDOP",
            T::Star | T::Slash                               => "MULOP",
            T::Lt | T::LtEq | T::Gt | T::GtEq
                | T::EqEq | T::NotEq                         => "RELOP",
            T::Eq                                            => "ASSIGN",
            T::Semicolon                                     => "SEMI",
            T::Comma                                         => "COMMA",
            T::LeftParen                                     => "LPAREN",
            T::RightParen                                    => "RPAREN",
            T::LeftBracket                                   => "LBRACKET",
            T::RightBracket                                  => "RBRACKET",
            T::LeftBrace                                     => "LBRACE",
            T::RightBrace                                    => "RBRACE",
            T::Number                                        => "NUM",
            T::Ident                                         => "ID",
            T::Invalid                                       => "INVALID",
            T::Eof                                           => "EOF",
        }
    }

    pub fn is_relational(&self) -> bool {
        use TokenKind as T;
        matches!(self, T::Lt | T::LtEq | T::Gt | T::GtEq | T::EqEq | T::NotEq)
    }

    pub fn is_additive(&self) -> bool {
        matches!(self, TokenKind::Plus | TokenKind::Minus)
    }

    pub fn is_multiplicative(&self) -> bool {
        matches!(self, TokenKind::Star | TokenKind::Slash)
    }

    /// Single character operators and punctuation.
    #[rustfmt::skip]
    pub(crate) fn from_char(c: char) -> Option<Self> {
        use TokenKind as T;
        match c {
            '+' => Some(T::Plus),
            '-' => Some(T::Minus),
            '*' => Some(T::Star),
            '/' => Some(T::Slash),
            '<' => Some(T::Lt),
            '>' => Some(T::Gt),
            '=' => Some(T::Eq),
            ';' => Some(T::Semicolon),
            ',' => Some(T::Comma),
            '(' => Some(T::LeftParen),
            ')' => Some(T::RightParen),
            '[' => Some(T::LeftBracket),
            ']' => Some(T::RightBracket),
            '{' => Some(T::LeftBrace),
            '}' => Some(T::RightBrace),
            _   => None,
        }
    }

    /// Operators spelled as a character followed by `=`.
    #[rustfmt::skip]
    pub(crate) fn from_char_eq(c: char) -> Option<Self> {
        use TokenKind as T;
        match c {
            '<' => Some(T::LtEq),
            '>' => Some(T::GtEq),
            '=' => Some(T::EqEq),
            '!' => Some(T::NotEq),
            _   => None,
        }
    }
}

impl fmt::Display for TokenKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind as T;
        match self {
            T::Plus         => write!(f, "+"),
            T::Minus        => write!(f, "-"),
            T::Star         => write!(f, "*"),
            T::Slash        => write!(f, "/"),
            T::Lt           => write!(f, "<"),
            T::LtEq         => write!(f, "<="),
            T::Gt           => write!(f, ">"),
            T::GtEq         => write!(f, ">="),
            T::EqEq         => write!(f, "=="),
            T::NotEq        => write!(f, "!="),
            T::Eq           => write!(f, "="),
            T::Semicolon    => write!(f, ";"),
            T::Comma        => write!(f, ","),
            T::LeftParen    => write!(f, "("),
            T::RightParen   => write!(f, ")"),
            T::LeftBracket  => write!(f, "["),
            T::RightBracket => write!(f, "]"),
            T::LeftBrace    => write!(f, "{{"),
            T::RightBrace   => write!(f, "}}"),
            T::Number       => write!(f, "number"),
            T::Ident        => write!(f, "identifier"),
            T::Keyword(kw)  => write!(f, "{}", kw),
            T::Invalid      => write!(f, "invalid"),
            T::Eof          => write!(f, "end of source"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    If,
    Else,
    While,
    Return,
    Void,
    Int,
}

impl fmt::Display for KeywordKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use KeywordKind as K;
        match self {
            K::If     => write!(f, "if"),
            K::Else   => write!(f, "else"),
            K::While  => write!(f, "while"),
            K::Return => write!(f, "return"),
            K::Void   => write!(f, "void"),
            K::Int    => write!(f, "int"),
        }
    }
}

impl FromStr for KeywordKind {
    type Err = ();

    #[rustfmt::skip]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use KeywordKind as K;
        match s {
            "if"     => Ok(K::If),
            "else"   => Ok(K::Else),
            "while"  => Ok(K::While),
            "return" => Ok(K::Return),
            "void"   => Ok(K::Void),
            "int"    => Ok(K::Int),
            _        => Err(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keyword_exact_match() {
        assert_eq!(KeywordKind::from_str("while"), Ok(KeywordKind::While));
        assert_eq!(KeywordKind::from_str("While"), Err(()));
        assert_eq!(KeywordKind::from_str("integer"), Err(()));
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenKind::Keyword(KeywordKind::Int).category(), "KEYWORD");
        assert_eq!(TokenKind::Minus.category(), "ADDOP");
        assert_eq!(TokenKind::Slash.category(), "MULOP");
        assert_eq!(TokenKind::NotEq.category(), "RELOP");
        assert_eq!(TokenKind::Eq.category(), "ASSIGN");
    }
}
