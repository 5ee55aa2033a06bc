//! Token definitions

use crate::span::Span;

/// One lexed token. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Token kinds for the Python lexer.
///
/// `Indent` carries the computed column width of the line's leading
/// whitespace; the parser, not the lexer, decides whether it opens a block,
/// continues one, or synthesizes dedents.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier (any non-keyword name, ASCII or Unicode)
    Ident(String),
    Keyword(Keyword),
    /// Numeric literal. `value` is the parsed numeric value; `is_int` is
    /// false for floats and exponent forms. The original text is kept so
    /// the generator can echo literals verbatim.
    Number {
        text: String,
        value: f64,
        is_int: bool,
    },
    /// String literal with its decoded value and prefix metadata.
    /// For f-strings the value is the raw body; interpolations are parsed
    /// by the parser, which knows how to build expressions.
    Str { value: String, prefix: StrPrefix },
    Op(Op),
    /// Column width of the leading whitespace of a new logical line.
    Indent(u32),
    Newline,
    /// `#` comment, text without the leading `#`.
    Comment(String),
    /// Lexical error; lexing continues after it.
    Error(String),
    Eof,
}

/// String-literal prefix metadata (`r"..."`, `b"..."`, `f"..."`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrPrefix {
    pub raw: bool,
    pub bytes: bool,
    pub fstring: bool,
}

/// Python keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Assert,
    Async,
    Await,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    False,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    None,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    True,
    Try,
    While,
    With,
    Yield,
}

/// Operators and delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    At,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Bitwise / shift
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Assignment
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,
    DoubleStarAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    Walrus,

    // Punctuation
    Arrow,
    Colon,
    Semicolon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Op {
    /// True for `(`, `[`, `{`.
    pub fn opens_bracket(self) -> bool {
        matches!(self, Op::LParen | Op::LBracket | Op::LBrace)
    }

    /// True for `)`, `]`, `}`.
    pub fn closes_bracket(self) -> bool {
        matches!(self, Op::RParen | Op::RBracket | Op::RBrace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_equality() {
        let t1 = Token::new(
            TokenKind::Number {
                text: "42".to_string(),
                value: 42.0,
                is_int: true,
            },
            Span::new(0, 2),
        );
        let t2 = t1.clone();
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_bracket_predicates() {
        assert!(Op::LParen.opens_bracket());
        assert!(Op::RBrace.closes_bracket());
        assert!(!Op::Comma.opens_bracket());
    }
}
