//! Lexer module - hand-written indentation-sensitive tokenizer
//!
//! Converts raw Python text into a flat token stream. Indentation is measured
//! at the start of every logical line and emitted as an `Indent` token carrying
//! the column count; the parser owns the indent stack and decides block
//! open/close from it. Lexical errors become `Error` tokens so lexing always
//! runs to the end of the input.

mod token;

pub use token::*;

use crate::span::Span;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How far a tab advances: to the next multiple of 8 columns.
const TAB_STOP: u32 = 8;

/// First-byte character classes for the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Ws,
    Newline,
    CarriageReturn,
    Hash,
    Backslash,
    Digit,
    Quote,
    IdentStart,
    Punct,
    NonAscii,
    Other,
}

/// 256-entry first-byte class table.
const CHAR_CLASS: [CharClass; 256] = {
    let mut table = [CharClass::Other; 256];
    let mut i = 0usize;
    while i < 256 {
        let b = i as u8;
        table[i] = match b {
            b' ' | b'\t' => CharClass::Ws,
            b'\n' => CharClass::Newline,
            b'\r' => CharClass::CarriageReturn,
            b'#' => CharClass::Hash,
            b'\\' => CharClass::Backslash,
            b'0'..=b'9' => CharClass::Digit,
            b'\'' | b'"' => CharClass::Quote,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => CharClass::IdentStart,
            b'+' | b'-' | b'*' | b'/' | b'%' | b'@' | b'=' | b'<' | b'>' | b'!' | b'&' | b'|'
            | b'^' | b'~' | b':' | b';' | b',' | b'.' | b'(' | b')' | b'[' | b']' | b'{'
            | b'}' => CharClass::Punct,
            0x80..=0xFF => CharClass::NonAscii,
            _ => CharClass::Other,
        };
        i += 1;
    }
    table
};

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    use Keyword::*;
    HashMap::from([
        ("and", And),
        ("as", As),
        ("assert", Assert),
        ("async", Async),
        ("await", Await),
        ("break", Break),
        ("class", Class),
        ("continue", Continue),
        ("def", Def),
        ("del", Del),
        ("elif", Elif),
        ("else", Else),
        ("except", Except),
        ("False", False),
        ("finally", Finally),
        ("for", For),
        ("from", From),
        ("global", Global),
        ("if", If),
        ("import", Import),
        ("in", In),
        ("is", Is),
        ("lambda", Lambda),
        ("None", None),
        ("nonlocal", Nonlocal),
        ("not", Not),
        ("or", Or),
        ("pass", Pass),
        ("raise", Raise),
        ("return", Return),
        ("True", True),
        ("try", Try),
        ("while", While),
        ("with", With),
        ("yield", Yield),
    ])
});

/// Tokenize Python source code. Always terminates with an `Eof` token.
pub fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.bytes.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn emit(&mut self, kind: TokenKind, start: usize) {
        self.tokens
            .push(Token::new(kind, Span::new(start as u32, self.pos as u32)));
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            if self.at_line_start {
                self.line_start();
                if self.pos >= self.bytes.len() {
                    break;
                }
            }
            self.scan_token();
        }
        let end = self.pos;
        self.emit(TokenKind::Eof, end);
    }

    /// Measure indentation at the start of a logical line. Blank lines and
    /// comment-only lines never produce an `Indent`; comment-only lines still
    /// emit their `Comment` token so the parser can attach documentation.
    fn line_start(&mut self) {
        loop {
            let mut cols = 0u32;
            let indent_start = self.pos;
            while let Some(b) = self.peek() {
                match b {
                    b' ' => {
                        cols += 1;
                        self.pos += 1;
                    }
                    b'\t' => {
                        cols = (cols / TAB_STOP + 1) * TAB_STOP;
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
            match self.peek() {
                Option::None => return,
                Some(b'\n') => {
                    self.pos += 1;
                }
                Some(b'\r') => {
                    self.pos += 1;
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'#') => {
                    self.scan_comment();
                    // consume the line terminator of the comment-only line
                    if self.peek() == Some(b'\r') {
                        self.pos += 1;
                    }
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                }
                Some(_) => {
                    self.emit(TokenKind::Indent(cols), indent_start);
                    self.at_line_start = false;
                    return;
                }
            }
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let b = match self.peek() {
            Some(b) => b,
            Option::None => return,
        };
        match CHAR_CLASS[b as usize] {
            CharClass::Ws => {
                self.pos += 1;
            }
            CharClass::Newline => {
                self.pos += 1;
                self.emit(TokenKind::Newline, start);
                self.at_line_start = true;
            }
            CharClass::CarriageReturn => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                self.emit(TokenKind::Newline, start);
                self.at_line_start = true;
            }
            CharClass::Backslash => {
                // backslash-newline joins logical lines
                match self.peek_at(1) {
                    Some(b'\n') => {
                        self.pos += 2;
                    }
                    Some(b'\r') => {
                        self.pos += 2;
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    _ => {
                        self.pos += 1;
                        self.emit(
                            TokenKind::Error("unexpected character '\\'".to_string()),
                            start,
                        );
                    }
                }
            }
            CharClass::Hash => {
                self.scan_comment();
            }
            CharClass::Digit => {
                self.scan_number();
            }
            CharClass::Quote => {
                self.scan_string(start, StrPrefix::default());
            }
            CharClass::IdentStart => {
                self.scan_ident_or_prefixed_string();
            }
            CharClass::Punct => {
                self.scan_operator();
            }
            CharClass::NonAscii => {
                self.scan_unicode_ident();
            }
            CharClass::Other => {
                let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                self.pos += ch.len_utf8();
                self.emit(
                    TokenKind::Error(format!("unexpected character '{ch}'")),
                    start,
                );
            }
        }
    }

    fn scan_comment(&mut self) {
        let start = self.pos;
        self.pos += 1; // '#'
        let text_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' || b == b'\r' {
                break;
            }
            self.pos += 1;
        }
        let text = self.text[text_start..self.pos].to_string();
        self.emit(TokenKind::Comment(text), start);
    }

    fn scan_ident_or_prefixed_string(&mut self) {
        let start = self.pos;
        // up to two prefix letters directly followed by a quote
        let mut prefix = StrPrefix::default();
        let mut prefix_len = 0usize;
        for off in 0..2 {
            match self.peek_at(off) {
                Some(b'r') | Some(b'R') if !prefix.raw => prefix.raw = true,
                Some(b'b') | Some(b'B') if !prefix.bytes => prefix.bytes = true,
                Some(b'f') | Some(b'F') if !prefix.fstring => prefix.fstring = true,
                _ => break,
            }
            prefix_len = off + 1;
        }
        if prefix_len > 0
            && matches!(self.peek_at(prefix_len), Some(b'\'') | Some(b'"'))
            && !(prefix.bytes && prefix.fstring)
        {
            self.pos += prefix_len;
            self.scan_string(start, prefix);
            return;
        }

        while let Some(b) = self.peek() {
            match CHAR_CLASS[b as usize] {
                CharClass::IdentStart | CharClass::Digit => self.pos += 1,
                CharClass::NonAscii => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    if ch.is_alphanumeric() {
                        self.pos += ch.len_utf8();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        let text = &self.text[start..self.pos];
        let kind = match KEYWORDS.get(text) {
            Some(kw) => TokenKind::Keyword(*kw),
            Option::None => TokenKind::Ident(text.to_string()),
        };
        self.emit(kind, start);
    }

    fn scan_unicode_ident(&mut self) {
        let start = self.pos;
        let first = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
        if !first.is_alphabetic() {
            self.pos += first.len_utf8();
            self.emit(
                TokenKind::Error(format!("unexpected character '{first}'")),
                start,
            );
            return;
        }
        for ch in self.text[self.pos..].chars() {
            if ch.is_alphanumeric() || ch == '_' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        let text = self.text[start..self.pos].to_string();
        self.emit(TokenKind::Ident(text), start);
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        if self.peek() == Some(b'0') {
            match self.peek_at(1) {
                Some(b'x') | Some(b'X') => return self.scan_based(start, 16),
                Some(b'o') | Some(b'O') => return self.scan_based(start, 8),
                Some(b'b') | Some(b'B') => return self.scan_based(start, 2),
                _ => {}
            }
        }
        let mut saw_dot = false;
        let mut saw_exp = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' if !saw_dot && !saw_exp => {
                    // a dot must be followed by a digit to stay numeric
                    if matches!(self.peek_at(1), Some(b'0'..=b'9')) {
                        saw_dot = true;
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                b'e' | b'E' if !saw_exp => {
                    let next = self.peek_at(1);
                    let digit_off = match next {
                        Some(b'+') | Some(b'-') => 2,
                        _ => 1,
                    };
                    if matches!(self.peek_at(digit_off), Some(b'0'..=b'9')) {
                        saw_exp = true;
                        self.pos += digit_off;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        let text = self.text[start..self.pos].to_string();
        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let is_int = !saw_dot && !saw_exp;
        if is_int && cleaned.len() > 1 && cleaned.starts_with('0') {
            self.emit(
                TokenKind::Error(format!("invalid leading zero in literal '{text}'")),
                start,
            );
            return;
        }
        match cleaned.parse::<f64>() {
            Ok(value) => self.emit(
                TokenKind::Number {
                    text,
                    value,
                    is_int,
                },
                start,
            ),
            Err(_) => self.emit(
                TokenKind::Error(format!("invalid numeric literal '{text}'")),
                start,
            ),
        }
    }

    fn scan_based(&mut self, start: usize, radix: u32) {
        self.pos += 2; // 0x / 0o / 0b
        let digits_start = self.pos;
        while let Some(b) = self.peek() {
            let ch = b as char;
            if ch == '_' || ch.is_digit(radix) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.text[start..self.pos].to_string();
        let digits: String = self.text[digits_start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if digits.is_empty() {
            self.emit(
                TokenKind::Error(format!("missing digits in literal '{text}'")),
                start,
            );
            return;
        }
        match u64::from_str_radix(&digits, radix) {
            Ok(v) => self.emit(
                TokenKind::Number {
                    text,
                    value: v as f64,
                    is_int: true,
                },
                start,
            ),
            Err(_) => self.emit(
                TokenKind::Error(format!("invalid numeric literal '{text}'")),
                start,
            ),
        }
    }

    /// Longest-match operator scan over the punctuation characters.
    fn scan_operator(&mut self) {
        let start = self.pos;
        let b = self.bytes[self.pos];
        let b1 = self.peek_at(1);
        let b2 = self.peek_at(2);
        let (op, len) = match (b, b1, b2) {
            (b'*', Some(b'*'), Some(b'=')) => (Op::DoubleStarAssign, 3),
            (b'/', Some(b'/'), Some(b'=')) => (Op::DoubleSlashAssign, 3),
            (b'<', Some(b'<'), Some(b'=')) => (Op::ShlAssign, 3),
            (b'>', Some(b'>'), Some(b'=')) => (Op::ShrAssign, 3),
            (b'*', Some(b'*'), _) => (Op::DoubleStar, 2),
            (b'/', Some(b'/'), _) => (Op::DoubleSlash, 2),
            (b'<', Some(b'<'), _) => (Op::Shl, 2),
            (b'>', Some(b'>'), _) => (Op::Shr, 2),
            (b'=', Some(b'='), _) => (Op::Eq, 2),
            (b'!', Some(b'='), _) => (Op::NotEq, 2),
            (b'<', Some(b'='), _) => (Op::LtEq, 2),
            (b'>', Some(b'='), _) => (Op::GtEq, 2),
            (b'+', Some(b'='), _) => (Op::PlusAssign, 2),
            (b'-', Some(b'='), _) => (Op::MinusAssign, 2),
            (b'*', Some(b'='), _) => (Op::StarAssign, 2),
            (b'/', Some(b'='), _) => (Op::SlashAssign, 2),
            (b'%', Some(b'='), _) => (Op::PercentAssign, 2),
            (b'&', Some(b'='), _) => (Op::AmpAssign, 2),
            (b'|', Some(b'='), _) => (Op::PipeAssign, 2),
            (b'^', Some(b'='), _) => (Op::CaretAssign, 2),
            (b'-', Some(b'>'), _) => (Op::Arrow, 2),
            (b':', Some(b'='), _) => (Op::Walrus, 2),
            (b'+', _, _) => (Op::Plus, 1),
            (b'-', _, _) => (Op::Minus, 1),
            (b'*', _, _) => (Op::Star, 1),
            (b'/', _, _) => (Op::Slash, 1),
            (b'%', _, _) => (Op::Percent, 1),
            (b'@', _, _) => (Op::At, 1),
            (b'=', _, _) => (Op::Assign, 1),
            (b'<', _, _) => (Op::Lt, 1),
            (b'>', _, _) => (Op::Gt, 1),
            (b'&', _, _) => (Op::Amp, 1),
            (b'|', _, _) => (Op::Pipe, 1),
            (b'^', _, _) => (Op::Caret, 1),
            (b'~', _, _) => (Op::Tilde, 1),
            (b':', _, _) => (Op::Colon, 1),
            (b';', _, _) => (Op::Semicolon, 1),
            (b',', _, _) => (Op::Comma, 1),
            (b'.', _, _) => (Op::Dot, 1),
            (b'(', _, _) => (Op::LParen, 1),
            (b')', _, _) => (Op::RParen, 1),
            (b'[', _, _) => (Op::LBracket, 1),
            (b']', _, _) => (Op::RBracket, 1),
            (b'{', _, _) => (Op::LBrace, 1),
            (b'}', _, _) => (Op::RBrace, 1),
            _ => {
                self.pos += 1;
                self.emit(
                    TokenKind::Error(format!("unexpected character '{}'", b as char)),
                    start,
                );
                return;
            }
        };
        self.pos += len;
        self.emit(TokenKind::Op(op), start);
    }

    /// Scan a string body after any prefix letters; `self.pos` is on the
    /// opening quote. Raw and f-string bodies are kept undecoded (f-string
    /// interpolations are parsed later by the parser).
    fn scan_string(&mut self, start: usize, prefix: StrPrefix) {
        let quote = self.bump().unwrap_or(b'"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }
        let body_start = self.pos;
        loop {
            match self.peek() {
                Option::None => {
                    self.emit(TokenKind::Error("unterminated string".to_string()), start);
                    return;
                }
                Some(b'\n') | Some(b'\r') if !triple => {
                    self.emit(TokenKind::Error("unterminated string".to_string()), start);
                    return;
                }
                Some(b'\\') if !prefix.raw => {
                    // skip the escaped character; decoding validates it
                    self.pos += 1;
                    if self.peek().is_some() {
                        let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                        self.pos += ch.len_utf8();
                    }
                }
                Some(b) if b == quote => {
                    if !triple {
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        break;
                    }
                    self.pos += 1;
                }
                Some(_) => {
                    let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                    self.pos += ch.len_utf8();
                }
            }
        }
        let body = &self.text[body_start..self.pos];
        self.pos += if triple { 3 } else { 1 };
        if prefix.raw || prefix.fstring {
            self.emit(
                TokenKind::Str {
                    value: body.to_string(),
                    prefix,
                },
                start,
            );
            return;
        }
        match decode_escapes(body) {
            Ok(value) => self.emit(TokenKind::Str { value, prefix }, start),
            Err(msg) => self.emit(TokenKind::Error(msg), start),
        }
    }
}

/// Decode standard Python escape sequences. Returns an error message for
/// malformed escapes (`\x` without two hex digits, unknown escape letter).
pub fn decode_escapes(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\n') => {} // escaped newline inside a string
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                match (hi, lo) {
                    (Some(h), Some(l)) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit() => {
                        let v = (h.to_digit(16).unwrap() * 16 + l.to_digit(16).unwrap()) as u8;
                        out.push(v as char);
                    }
                    _ => return Err("malformed \\x escape".to_string()),
                }
            }
            Some('u') => {
                let mut v = 0u32;
                for _ in 0..4 {
                    match chars.next().and_then(|c| c.to_digit(16)) {
                        Some(d) => v = v * 16 + d,
                        Option::None => return Err("malformed \\u escape".to_string()),
                    }
                }
                match char::from_u32(v) {
                    Some(ch) => out.push(ch),
                    Option::None => return Err("invalid \\u code point".to_string()),
                }
            }
            Some(other) => return Err(format!("unknown escape '\\{other}'")),
            Option::None => return Err("trailing backslash in string".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_empty() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_lex_simple_assignment() {
        let toks = kinds("x = 10\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Indent(0),
                TokenKind::Ident("x".to_string()),
                TokenKind::Op(Op::Assign),
                TokenKind::Number {
                    text: "10".to_string(),
                    value: 10.0,
                    is_int: true,
                },
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        let toks = kinds("def definition");
        assert_eq!(toks[1], TokenKind::Keyword(Keyword::Def));
        assert_eq!(toks[2], TokenKind::Ident("definition".to_string()));
    }

    #[test]
    fn test_lex_indent_columns() {
        let toks = lex("if a:\n    x = 1\n");
        let indents: Vec<u32> = toks
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Indent(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(indents, vec![0, 4]);
    }

    #[test]
    fn test_lex_tab_rounds_to_multiple_of_8() {
        let toks = lex("if a:\n\tx = 1\n  \ty = 2\n");
        let indents: Vec<u32> = toks
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Indent(c) => Some(c),
                _ => None,
            })
            .collect();
        // "\t" -> 8; "  \t" -> 2 then tab rounds up to 8
        assert_eq!(indents, vec![0, 8, 8]);
    }

    #[test]
    fn test_lex_blank_lines_produce_no_indent() {
        let toks = kinds("a = 1\n\n   \nb = 2\n");
        let indent_count = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Indent(_)))
            .count();
        assert_eq!(indent_count, 2);
    }

    #[test]
    fn test_lex_comment_only_line() {
        let toks = kinds("# heading\nx = 1\n");
        assert_eq!(toks[0], TokenKind::Comment(" heading".to_string()));
        assert_eq!(toks[1], TokenKind::Indent(0));
    }

    #[test]
    fn test_lex_trailing_comment() {
        let toks = kinds("x = 1  # note\n");
        assert!(toks.contains(&TokenKind::Comment(" note".to_string())));
    }

    #[test]
    fn test_lex_string_escapes() {
        let toks = kinds(r#"s = "a\tb\n""#);
        assert_eq!(
            toks[3],
            TokenKind::Str {
                value: "a\tb\n".to_string(),
                prefix: StrPrefix::default(),
            }
        );
    }

    #[test]
    fn test_lex_raw_string_keeps_backslashes() {
        let toks = kinds(r#"s = r"a\tb""#);
        assert_eq!(
            toks[3],
            TokenKind::Str {
                value: r"a\tb".to_string(),
                prefix: StrPrefix {
                    raw: true,
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_lex_triple_quote() {
        let toks = kinds("s = \"\"\"line1\nline2\"\"\"\n");
        assert_eq!(
            toks[3],
            TokenKind::Str {
                value: "line1\nline2".to_string(),
                prefix: StrPrefix::default(),
            }
        );
    }

    #[test]
    fn test_lex_fstring_keeps_raw_body() {
        let toks = kinds(r#"s = f"v={x}""#);
        assert_eq!(
            toks[3],
            TokenKind::Str {
                value: "v={x}".to_string(),
                prefix: StrPrefix {
                    fstring: true,
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_lex_unterminated_string_is_error_token() {
        let toks = kinds("s = \"oops\nx = 1\n");
        assert!(matches!(toks[3], TokenKind::Error(_)));
        // lexing continues on the next line
        assert!(toks.contains(&TokenKind::Ident("x".to_string())));
    }

    #[test]
    fn test_lex_numeric_bases() {
        let toks = kinds("a = 0xFF\nb = 0o17\nc = 0b101\n");
        let values: Vec<f64> = toks
            .iter()
            .filter_map(|k| match k {
                TokenKind::Number { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![255.0, 15.0, 5.0]);
    }

    #[test]
    fn test_lex_leading_zero_is_error() {
        let toks = kinds("a = 0123\n");
        assert!(toks.iter().any(|k| matches!(k, TokenKind::Error(_))));
    }

    #[test]
    fn test_lex_float_and_exponent() {
        let toks = kinds("a = 1.5\nb = 2e3\n");
        let nums: Vec<(f64, bool)> = toks
            .iter()
            .filter_map(|k| match k {
                TokenKind::Number { value, is_int, .. } => Some((*value, *is_int)),
                _ => None,
            })
            .collect();
        assert_eq!(nums, vec![(1.5, false), (2000.0, false)]);
    }

    #[test]
    fn test_lex_line_continuation() {
        let toks = kinds("a = 1 + \\\n    2\n");
        let newlines = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Newline))
            .count();
        assert_eq!(newlines, 1);
        let indents = toks
            .iter()
            .filter(|k| matches!(k, TokenKind::Indent(_)))
            .count();
        assert_eq!(indents, 1);
    }

    #[test]
    fn test_lex_two_char_operators() {
        let toks = kinds("a **= b // c != d\n");
        assert!(toks.contains(&TokenKind::Op(Op::DoubleStarAssign)));
        assert!(toks.contains(&TokenKind::Op(Op::DoubleSlash)));
        assert!(toks.contains(&TokenKind::Op(Op::NotEq)));
    }

    #[test]
    fn test_lex_unicode_identifier() {
        let toks = kinds("café = 1\n");
        assert!(toks.contains(&TokenKind::Ident("café".to_string())));
    }

    #[test]
    fn test_lex_spans_cover_source() {
        let src = "x = 10";
        let toks = lex(src);
        assert_eq!(toks[1].span, Span::new(0, 1));
        assert_eq!(toks[3].span, Span::new(4, 6));
    }
}
