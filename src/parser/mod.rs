//! Parser module - recursive-descent Python parser
//!
//! Consumes the lexer's token stream and builds the arena AST. Indentation is
//! enforced with an explicit stack of column widths; dedents are synthesized
//! by popping stack levels. Inside brackets, Newline/Indent tokens are
//! filtered out (implicit line joining) — the lexer emits them blindly and the
//! parser owns the bracket-depth counter.
//!
//! On any production error the parser records a diagnostic and resynchronizes
//! to the next statement boundary, leaving an `Error` placeholder node, so one
//! bad line never aborts the rest of the file. A diagnostic ceiling aborts
//! pathological cascades.

pub mod ast;

pub use ast::*;

use crate::diagnostics::{codes, Diagnostic, DiagnosticList, Phase, Severity};
use crate::lexer::{self, decode_escapes, Keyword, Op, Token, TokenKind};
use crate::span::Span;

/// Default ceiling on accumulated diagnostics before parsing aborts.
pub const DEFAULT_DIAG_LIMIT: usize = 100;

/// Result of parsing one file: the arena, the top-level statement list, and
/// every diagnostic recorded along the way.
#[derive(Debug)]
pub struct ParsedFile {
    pub ast: Ast,
    pub body: Vec<NodeId>,
    pub diagnostics: DiagnosticList,
    /// True when the diagnostic ceiling stopped the parse early.
    pub aborted: bool,
}

/// Lex and parse one source file.
pub fn parse(source: &str, file: Option<&str>) -> ParsedFile {
    parse_with_limit(source, file, DEFAULT_DIAG_LIMIT)
}

pub fn parse_with_limit(source: &str, file: Option<&str>, diag_limit: usize) -> ParsedFile {
    let tokens = lexer::lex(source);
    parse_tokens(source, file, tokens, diag_limit)
}

/// Parse a pre-lexed token stream.
pub fn parse_tokens(
    source: &str,
    file: Option<&str>,
    tokens: Vec<Token>,
    diag_limit: usize,
) -> ParsedFile {
    let mut parser = Parser {
        source,
        file,
        tokens,
        pos: 0,
        bracket_depth: 0,
        indent_stack: vec![0],
        ast: Ast::new(),
        diags: DiagnosticList::new(),
        diag_limit,
        aborted: false,
        pending_doc: Vec::new(),
        carried: Vec::new(),
    };
    let body = parser.parse_module();
    let mut ast = parser.ast;
    ast.assign_parents(&body);
    ParsedFile {
        ast,
        body,
        diagnostics: parser.diags,
        aborted: parser.aborted,
    }
}

/// Internal error marker; the diagnostic is recorded before returning it.
struct ParseFailure;

type PResult<T> = Result<T, ParseFailure>;

struct Parser<'a> {
    source: &'a str,
    file: Option<&'a str>,
    tokens: Vec<Token>,
    pos: usize,
    bracket_depth: u32,
    indent_stack: Vec<u32>,
    ast: Ast,
    diags: DiagnosticList,
    diag_limit: usize,
    aborted: bool,
    /// Comment lines seen since the last statement, candidates for the next
    /// `def`/`class` documentation.
    pending_doc: Vec<String>,
    /// Trailing statements of a semicolon-separated line, drained by the
    /// statement loop right after the first one.
    carried: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    // ----- token access -----

    fn raw_at(&self, pos: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[pos.min(last)]
    }

    /// Skip trivia at the cursor: comments always, Newline/Indent when inside
    /// brackets (implicit line joining).
    fn skip_trivia(&mut self) {
        loop {
            match &self.raw_at(self.pos).kind {
                TokenKind::Comment(_) => self.pos += 1,
                TokenKind::Newline | TokenKind::Indent(_) if self.bracket_depth > 0 => {
                    self.pos += 1
                }
                _ => break,
            }
        }
    }

    fn cur(&mut self) -> &Token {
        self.skip_trivia();
        self.raw_at(self.pos)
    }

    fn cur_kind(&mut self) -> TokenKind {
        self.cur().kind.clone()
    }

    fn cur_span(&mut self) -> Span {
        self.cur().span
    }

    fn bump(&mut self) -> Token {
        self.skip_trivia();
        let tok = self.raw_at(self.pos).clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        if let TokenKind::Op(op) = tok.kind {
            if op.opens_bracket() {
                self.bracket_depth += 1;
            } else if op.closes_bracket() {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
            }
        }
        tok
    }

    fn at_op(&mut self, op: Op) -> bool {
        matches!(self.cur().kind, TokenKind::Op(o) if o == op)
    }

    fn at_keyword(&mut self, kw: Keyword) -> bool {
        matches!(self.cur().kind, TokenKind::Keyword(k) if k == kw)
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Op, what: &str) -> PResult<Span> {
        if self.at_op(op) {
            Ok(self.bump().span)
        } else {
            let span = self.cur_span();
            Err(self.error(codes::SYNTAX, span, format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> PResult<(String, Span)> {
        match self.cur_kind() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok((name, span))
            }
            _ => {
                let span = self.cur_span();
                Err(self.error(codes::SYNTAX, span, format!("expected {what}")))
            }
        }
    }

    // ----- diagnostics -----

    fn error(&mut self, code: &'static str, span: Span, message: String) -> ParseFailure {
        self.push_diag(code, span, message);
        ParseFailure
    }

    fn push_diag(&mut self, code: &'static str, span: Span, message: String) {
        if self.diags.len() >= self.diag_limit {
            if !self.aborted {
                self.aborted = true;
                let diag = Diagnostic::new(
                    codes::TOO_MANY_ERRORS,
                    Severity::Error,
                    format!("too many errors ({}); giving up", self.diag_limit),
                    self.file,
                    span,
                    Phase::Parse,
                    self.source,
                );
                self.diags.add(diag);
            }
            return;
        }
        let phase = match code {
            codes::BAD_TOKEN
            | codes::UNTERMINATED_STRING
            | codes::BAD_ESCAPE
            | codes::BAD_NUMBER => Phase::Lex,
            _ => Phase::Parse,
        };
        self.diags.add(Diagnostic::new(
            code,
            Severity::Error,
            message,
            self.file,
            span,
            phase,
            self.source,
        ));
    }

    /// Discard tokens until the next statement boundary: a Newline at bracket
    /// depth zero (consumed) or end of input. Returns the skipped span.
    fn resync(&mut self, from: Span) -> Span {
        self.bracket_depth = 0;
        let mut end = from.end;
        loop {
            let tok = self.raw_at(self.pos).clone();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    end = tok.span.end;
                    self.pos += 1;
                    break;
                }
                _ => {
                    end = tok.span.end;
                    self.pos += 1;
                }
            }
        }
        Span::new(from.start, end.max(from.start))
    }

    // ----- statement level -----

    fn parse_module(&mut self) -> Vec<NodeId> {
        let body = self.parse_statements_at(0);
        // leftover tokens mean the indentation never returned to column 0
        if !self.aborted {
            loop {
                let tok = self.raw_at(self.pos).clone();
                match tok.kind {
                    TokenKind::Eof => break,
                    TokenKind::Comment(_) | TokenKind::Newline => self.pos += 1,
                    _ => {
                        self.push_diag(
                            codes::INDENT,
                            tok.span,
                            "unindent does not match any outer indentation level".to_string(),
                        );
                        self.resync(tok.span);
                    }
                }
            }
        }
        body
    }

    /// Parse statements whose lines sit exactly at `indent` columns. Returns
    /// when the line indentation drops below `indent` or input ends.
    fn parse_statements_at(&mut self, indent: u32) -> Vec<NodeId> {
        let mut stmts = Vec::new();
        while !self.aborted {
            match self.raw_at(self.pos).kind.clone() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.pos += 1;
                }
                TokenKind::Comment(text) => {
                    self.pos += 1;
                    self.pending_doc.push(text);
                }
                TokenKind::Indent(col) => {
                    if col < indent {
                        break;
                    }
                    if col > indent {
                        let span = self.raw_at(self.pos).span;
                        self.push_diag(codes::INDENT, span, "unexpected indent".to_string());
                        // parse the over-indented statement at this level
                    }
                    self.pos += 1;
                    if let Some(stmt) = self.parse_statement() {
                        stmts.push(stmt);
                    }
                    stmts.append(&mut self.carried);
                }
                _ => {
                    // mid-line position (first line of input or after resync)
                    if let Some(stmt) = self.parse_statement() {
                        stmts.push(stmt);
                    }
                    stmts.append(&mut self.carried);
                }
            }
        }
        stmts
    }

    /// Parse one statement (compound or a simple-statement line). Returns
    /// `None` only for lines that dissolve into nothing (e.g. a lone error
    /// already reported and consumed).
    fn parse_statement(&mut self) -> Option<NodeId> {
        let start = self.cur_span();
        let result = self.parse_statement_inner();
        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseFailure) => {
                let span = self.resync(start);
                Some(self.ast.add(NodeKind::Error, span))
            }
        }
    }

    fn parse_statement_inner(&mut self) -> PResult<NodeId> {
        if let TokenKind::Error(msg) = self.cur_kind() {
            let span = self.cur_span();
            self.pos += 1;
            let code = lex_error_code(&msg);
            return Err(self.error(code, span, msg));
        }
        match self.cur_kind() {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::With) => self.parse_with(),
            TokenKind::Keyword(Keyword::Def) => self.parse_def(Vec::new()),
            TokenKind::Keyword(Keyword::Class) => self.parse_class(Vec::new()),
            TokenKind::Op(Op::At) => self.parse_decorated(),
            TokenKind::Keyword(Keyword::Async) => {
                let span = self.cur_span();
                Err(self.error(
                    codes::UNSUPPORTED,
                    span,
                    "async functions are not supported".to_string(),
                ))
            }
            _ => self.parse_simple_line(),
        }
    }

    fn take_doc(&mut self) -> Option<String> {
        if self.pending_doc.is_empty() {
            return None;
        }
        Some(self.pending_doc.drain(..).collect::<Vec<_>>().join("\n"))
    }

    fn parse_decorated(&mut self) -> PResult<NodeId> {
        let mut decorators = Vec::new();
        while self.at_op(Op::At) {
            self.bump();
            let deco = self.parse_postfix()?;
            decorators.push(deco);
            if !matches!(self.cur_kind(), TokenKind::Newline | TokenKind::Eof) {
                let span = self.cur_span();
                return Err(self.error(codes::SYNTAX, span, "expected newline after decorator".into()));
            }
            self.bump_newline();
            // the Indent of the next decorator / def line
            if matches!(self.raw_at(self.pos).kind, TokenKind::Indent(_)) {
                self.pos += 1;
            }
        }
        match self.cur_kind() {
            TokenKind::Keyword(Keyword::Def) => self.parse_def(decorators),
            TokenKind::Keyword(Keyword::Class) => self.parse_class(decorators),
            _ => {
                let span = self.cur_span();
                Err(self.error(
                    codes::SYNTAX,
                    span,
                    "decorators must be followed by 'def' or 'class'".to_string(),
                ))
            }
        }
    }

    fn bump_newline(&mut self) {
        if matches!(self.raw_at(self.pos).kind, TokenKind::Newline) {
            self.pos += 1;
        } else {
            // trailing comment before the newline
            while matches!(self.raw_at(self.pos).kind, TokenKind::Comment(_)) {
                self.pos += 1;
            }
            if matches!(self.raw_at(self.pos).kind, TokenKind::Newline) {
                self.pos += 1;
            }
        }
    }

    fn parse_def(&mut self, decorators: Vec<NodeId>) -> PResult<NodeId> {
        let doc = self.take_doc();
        let start = self.cur_span();
        self.bump(); // def
        let (name, _) = self.expect_ident("function name")?;
        self.expect_op(Op::LParen, "'('")?;
        let params = self.parse_params()?;
        self.expect_op(Op::RParen, "')'")?;
        let return_annotation = if self.eat_op(Op::Arrow) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_op(Op::Colon, "':'")?;
        let (mut body, end) = self.parse_block(start)?;
        let doc = doc.or_else(|| self.take_docstring(&mut body));
        Ok(self.ast.add(
            NodeKind::FunctionDef {
                name,
                params,
                return_annotation,
                body,
                decorators,
                doc,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_class(&mut self, decorators: Vec<NodeId>) -> PResult<NodeId> {
        let doc = self.take_doc();
        let start = self.cur_span();
        self.bump(); // class
        let (name, _) = self.expect_ident("class name")?;
        let mut bases = Vec::new();
        if self.eat_op(Op::LParen) {
            while !self.at_op(Op::RParen) {
                bases.push(self.parse_expr()?);
                if !self.eat_op(Op::Comma) {
                    break;
                }
            }
            self.expect_op(Op::RParen, "')'")?;
        }
        self.expect_op(Op::Colon, "':'")?;
        let (mut body, end) = self.parse_block(start)?;
        let doc = doc.or_else(|| self.take_docstring(&mut body));
        Ok(self.ast.add(
            NodeKind::ClassDef {
                name,
                bases,
                body,
                decorators,
                doc,
            },
            Span::new(start.start, end),
        ))
    }

    /// Lift a leading string-literal expression statement out of a body and
    /// return it as documentation text.
    fn take_docstring(&mut self, body: &mut Vec<NodeId>) -> Option<String> {
        let first = *body.first()?;
        let value = match self.ast.kind(first) {
            NodeKind::ExprStmt { value } => *value,
            _ => return None,
        };
        let text = match self.ast.kind(value) {
            NodeKind::StringLit { value } => value.clone(),
            _ => return None,
        };
        body.remove(0);
        Some(text)
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.at_op(Op::RParen) {
            if self.at_op(Op::Star) || self.at_op(Op::DoubleStar) {
                let span = self.cur_span();
                return Err(self.error(
                    codes::UNSUPPORTED,
                    span,
                    "*args / **kwargs parameters are not supported".to_string(),
                ));
            }
            let (name, span) = self.expect_ident("parameter name")?;
            let annotation = if self.eat_op(Op::Colon) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let default = if self.eat_op(Op::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                annotation,
                default,
                span,
            });
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump(); // if / elif
        let test = self.parse_expr()?;
        self.expect_op(Op::Colon, "':'")?;
        let (body, mut end) = self.parse_block(start)?;
        let mut orelse = Vec::new();
        if self.at_next_line_keyword(Keyword::Elif) {
            self.consume_line_start();
            let elif = self.parse_if()?;
            end = self.ast.span(elif).end;
            orelse.push(elif);
        } else if self.at_next_line_keyword(Keyword::Else) {
            self.consume_line_start();
            self.bump(); // else
            self.expect_op(Op::Colon, "':'")?;
            let (else_body, else_end) = self.parse_block(start)?;
            orelse = else_body;
            end = else_end;
        }
        Ok(self.ast.add(
            NodeKind::If { test, body, orelse },
            Span::new(start.start, end),
        ))
    }

    /// Look ahead past Newline/Comment for an `Indent` at the current level
    /// followed by the given keyword (for `elif`/`else`/`except`/`finally`).
    fn at_next_line_keyword(&mut self, kw: Keyword) -> bool {
        let here = *self.indent_stack.last().unwrap_or(&0);
        let mut p = self.pos;
        loop {
            match &self.raw_at(p).kind {
                TokenKind::Newline | TokenKind::Comment(_) => p += 1,
                TokenKind::Indent(col) => {
                    if *col != here {
                        return false;
                    }
                    return matches!(self.raw_at(p + 1).kind, TokenKind::Keyword(k) if k == kw);
                }
                TokenKind::Keyword(k) if p == self.pos => return *k == kw,
                _ => return false,
            }
        }
    }

    /// Consume Newline/Comment/Indent up to the keyword checked by
    /// [`Self::at_next_line_keyword`].
    fn consume_line_start(&mut self) {
        loop {
            match self.raw_at(self.pos).kind {
                TokenKind::Newline | TokenKind::Comment(_) | TokenKind::Indent(_) => self.pos += 1,
                _ => break,
            }
        }
    }

    fn parse_while(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump();
        let test = self.parse_expr()?;
        self.expect_op(Op::Colon, "':'")?;
        let (body, mut end) = self.parse_block(start)?;
        let mut orelse = Vec::new();
        if self.at_next_line_keyword(Keyword::Else) {
            self.consume_line_start();
            self.bump();
            self.expect_op(Op::Colon, "':'")?;
            let (b, e) = self.parse_block(start)?;
            orelse = b;
            end = e;
        }
        Ok(self.ast.add(
            NodeKind::While { test, body, orelse },
            Span::new(start.start, end),
        ))
    }

    fn parse_for(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump();
        let target = self.parse_target_list()?;
        if !self.eat_keyword(Keyword::In) {
            let span = self.cur_span();
            return Err(self.error(codes::SYNTAX, span, "expected 'in'".to_string()));
        }
        let iter = self.parse_expr_or_tuple()?;
        self.expect_op(Op::Colon, "':'")?;
        let (body, mut end) = self.parse_block(start)?;
        let mut orelse = Vec::new();
        if self.at_next_line_keyword(Keyword::Else) {
            self.consume_line_start();
            self.bump();
            self.expect_op(Op::Colon, "':'")?;
            let (b, e) = self.parse_block(start)?;
            orelse = b;
            end = e;
        }
        Ok(self.ast.add(
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_try(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump();
        self.expect_op(Op::Colon, "':'")?;
        let (body, mut end) = self.parse_block(start)?;
        let mut handlers = Vec::new();
        while self.at_next_line_keyword(Keyword::Except) {
            self.consume_line_start();
            let h_start = self.cur_span();
            self.bump(); // except
            let exc_type = if self.at_op(Op::Colon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let name = if self.eat_keyword(Keyword::As) {
                Some(self.expect_ident("exception name")?.0)
            } else {
                None
            };
            self.expect_op(Op::Colon, "':'")?;
            let (h_body, h_end) = self.parse_block(h_start)?;
            end = h_end;
            handlers.push(ExceptHandler {
                exc_type,
                name,
                body: h_body,
                span: Span::new(h_start.start, h_end),
            });
        }
        let mut orelse = Vec::new();
        if self.at_next_line_keyword(Keyword::Else) {
            self.consume_line_start();
            self.bump();
            self.expect_op(Op::Colon, "':'")?;
            let (b, e) = self.parse_block(start)?;
            orelse = b;
            end = e;
        }
        let mut finally = Vec::new();
        if self.at_next_line_keyword(Keyword::Finally) {
            self.consume_line_start();
            self.bump();
            self.expect_op(Op::Colon, "':'")?;
            let (b, e) = self.parse_block(start)?;
            finally = b;
            end = e;
        }
        if handlers.is_empty() && finally.is_empty() {
            self.push_diag(
                codes::SYNTAX,
                start,
                "'try' needs at least one 'except' or 'finally'".to_string(),
            );
        }
        Ok(self.ast.add(
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finally,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_with(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump();
        let mut items = Vec::new();
        loop {
            let ctx = self.parse_expr()?;
            let alias = if self.eat_keyword(Keyword::As) {
                Some(self.parse_postfix()?)
            } else {
                None
            };
            items.push((ctx, alias));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::Colon, "':'")?;
        let (body, end) = self.parse_block(start)?;
        Ok(self
            .ast
            .add(NodeKind::With { items, body }, Span::new(start.start, end)))
    }

    /// Parse a suite after a compound-statement colon: either simple
    /// statements on the same line, or an indented block on the next lines.
    /// Returns the body and the end offset of its last statement.
    fn parse_block(&mut self, header: Span) -> PResult<(Vec<NodeId>, u32)> {
        // same-line suite
        if !matches!(self.cur_kind(), TokenKind::Newline | TokenKind::Eof) {
            let stmt = self.parse_simple_line()?;
            let mut body = vec![stmt];
            body.append(&mut self.carried);
            let end = self.ast.span(*body.last().unwrap()).end;
            return Ok((body, end));
        }
        self.bump_newline();
        let here = *self.indent_stack.last().unwrap_or(&0);
        // peek the indentation of the first block line
        let col = loop {
            match self.raw_at(self.pos).kind.clone() {
                TokenKind::Newline => self.pos += 1,
                TokenKind::Comment(text) => {
                    self.pos += 1;
                    self.pending_doc.push(text);
                }
                TokenKind::Indent(col) => break col,
                _ => break 0,
            }
        };
        if col <= here {
            self.push_diag(codes::INDENT, header, "expected an indented block".to_string());
            return Ok((Vec::new(), header.end));
        }
        self.indent_stack.push(col);
        let body = self.parse_statements_at(col);
        self.indent_stack.pop();
        // inconsistent dedent: the next line's indentation must match some
        // enclosing level
        if let TokenKind::Indent(next_col) = self.raw_at(self.pos).kind {
            if next_col < col && !self.indent_stack.contains(&next_col) && !self.aborted {
                let span = self.raw_at(self.pos).span;
                self.push_diag(
                    codes::INDENT,
                    span,
                    "unindent does not match any outer indentation level".to_string(),
                );
            }
        }
        let end = body
            .last()
            .map(|s| self.ast.span(*s).end)
            .unwrap_or(header.end);
        Ok((body, end))
    }

    /// One logical line of semicolon-separated simple statements. A single
    /// statement is returned as-is; multiple are returned as the last one with
    /// the earlier ones already added (callers collect them through the body
    /// list by parsing at statement level), so this wraps them in order.
    fn parse_simple_line(&mut self) -> PResult<NodeId> {
        let first = self.parse_simple_stmt()?;
        let mut stmts = vec![first];
        while self.eat_op(Op::Semicolon) {
            if matches!(self.cur_kind(), TokenKind::Newline | TokenKind::Eof) {
                break;
            }
            stmts.push(self.parse_simple_stmt()?);
        }
        if !matches!(self.cur_kind(), TokenKind::Newline | TokenKind::Eof) {
            let span = self.cur_span();
            let text = self.describe_current();
            return Err(self.error(codes::SYNTAX, span, format!("unexpected {text}")));
        }
        self.bump_newline();
        // additional statements of a semicolon line surface through `carried`
        self.carried.extend(stmts.into_iter().skip(1));
        Ok(first)
    }

    fn describe_current(&mut self) -> String {
        match self.cur_kind() {
            TokenKind::Ident(n) => format!("identifier '{n}'"),
            TokenKind::Keyword(k) => format!("keyword '{k:?}'").to_lowercase(),
            TokenKind::Op(o) => format!("token '{o:?}'"),
            TokenKind::Number { text, .. } => format!("number '{text}'"),
            TokenKind::Str { .. } => "string literal".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }

    fn parse_simple_stmt(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        match self.cur_kind() {
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                let value = if matches!(
                    self.cur_kind(),
                    TokenKind::Newline | TokenKind::Eof | TokenKind::Op(Op::Semicolon)
                ) {
                    None
                } else {
                    Some(self.parse_expr_or_tuple()?)
                };
                let end = value.map(|v| self.ast.span(v).end).unwrap_or(start.end);
                Ok(self
                    .ast
                    .add(NodeKind::Return { value }, Span::new(start.start, end)))
            }
            TokenKind::Keyword(Keyword::Pass) => {
                self.bump();
                Ok(self.ast.add(NodeKind::Pass, start))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                Ok(self.ast.add(NodeKind::Break, start))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                Ok(self.ast.add(NodeKind::Continue, start))
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.bump();
                let exc = if matches!(
                    self.cur_kind(),
                    TokenKind::Newline | TokenKind::Eof | TokenKind::Op(Op::Semicolon)
                ) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let end = exc.map(|v| self.ast.span(v).end).unwrap_or(start.end);
                Ok(self
                    .ast
                    .add(NodeKind::Raise { exc }, Span::new(start.start, end)))
            }
            TokenKind::Keyword(Keyword::Global) => {
                self.bump();
                let names = self.parse_name_list()?;
                Ok(self.ast.add(NodeKind::Global { names }, start))
            }
            TokenKind::Keyword(Keyword::Nonlocal) => {
                self.bump();
                let names = self.parse_name_list()?;
                Ok(self.ast.add(NodeKind::Nonlocal { names }, start))
            }
            TokenKind::Keyword(Keyword::Import) => {
                self.bump();
                let mut names = Vec::new();
                loop {
                    let module = self.parse_dotted_name()?;
                    let alias = if self.eat_keyword(Keyword::As) {
                        Some(self.expect_ident("alias")?.0)
                    } else {
                        None
                    };
                    names.push((module, alias));
                    if !self.eat_op(Op::Comma) {
                        break;
                    }
                }
                Ok(self.ast.add(NodeKind::Import { names }, start))
            }
            TokenKind::Keyword(Keyword::From) => {
                self.bump();
                let module = self.parse_dotted_name()?;
                if !self.eat_keyword(Keyword::Import) {
                    let span = self.cur_span();
                    return Err(self.error(codes::SYNTAX, span, "expected 'import'".to_string()));
                }
                let mut names = Vec::new();
                if self.eat_op(Op::Star) {
                    names.push(("*".to_string(), None));
                } else {
                    loop {
                        let (name, _) = self.expect_ident("imported name")?;
                        let alias = if self.eat_keyword(Keyword::As) {
                            Some(self.expect_ident("alias")?.0)
                        } else {
                            None
                        };
                        names.push((name, alias));
                        if !self.eat_op(Op::Comma) {
                            break;
                        }
                    }
                }
                Ok(self.ast.add(NodeKind::ImportFrom { module, names }, start))
            }
            TokenKind::Keyword(Keyword::Assert) => {
                self.bump();
                let test = self.parse_expr()?;
                let msg = if self.eat_op(Op::Comma) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let end = msg
                    .map(|m| self.ast.span(m).end)
                    .unwrap_or(self.ast.span(test).end);
                Ok(self
                    .ast
                    .add(NodeKind::Assert { test, msg }, Span::new(start.start, end)))
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.bump();
                let mut targets = vec![self.parse_expr()?];
                while self.eat_op(Op::Comma) {
                    targets.push(self.parse_expr()?);
                }
                Ok(self.ast.add(NodeKind::Del { targets }, start))
            }
            TokenKind::Keyword(Keyword::Yield) => {
                Err(self.error(codes::UNSUPPORTED, start, "generators are not supported".to_string()))
            }
            TokenKind::Keyword(Keyword::Await) => Err(self.error(
                codes::UNSUPPORTED,
                start,
                "async/await is not supported".to_string(),
            )),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_name_list(&mut self) -> PResult<Vec<String>> {
        let mut names = vec![self.expect_ident("name")?.0];
        while self.eat_op(Op::Comma) {
            names.push(self.expect_ident("name")?.0);
        }
        Ok(names)
    }

    fn parse_dotted_name(&mut self) -> PResult<String> {
        let mut name = self.expect_ident("module name")?.0;
        while self.at_op(Op::Dot) {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_ident("name")?.0);
        }
        Ok(name)
    }

    /// Expression statement, assignment (possibly chained), augmented
    /// assignment, or annotated assignment.
    fn parse_expr_statement(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let first = self.parse_expr_or_tuple()?;

        // annotated assignment: target ':' type ['=' value]
        if self.at_op(Op::Colon) {
            self.bump();
            let annotation = self.parse_expr()?;
            let value = if self.eat_op(Op::Assign) {
                Some(self.parse_expr_or_tuple()?)
            } else {
                None
            };
            let end = value
                .map(|v| self.ast.span(v).end)
                .unwrap_or(self.ast.span(annotation).end);
            return Ok(self.ast.add(
                NodeKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                },
                Span::new(start.start, end),
            ));
        }

        // augmented assignment
        if let TokenKind::Op(op) = self.cur_kind() {
            if let Some(bin) = aug_assign_op(op) {
                self.bump();
                let value = self.parse_expr_or_tuple()?;
                let end = self.ast.span(value).end;
                return Ok(self.ast.add(
                    NodeKind::AugAssign {
                        target: first,
                        op: bin,
                        value,
                    },
                    Span::new(start.start, end),
                ));
            }
        }

        // plain or chained assignment
        if self.at_op(Op::Assign) {
            let mut targets = vec![first];
            let mut value = {
                self.bump();
                self.parse_expr_or_tuple()?
            };
            while self.at_op(Op::Assign) {
                self.bump();
                targets.push(value);
                value = self.parse_expr_or_tuple()?;
            }
            let end = self.ast.span(value).end;
            return Ok(self.ast.add(
                NodeKind::Assign { targets, value },
                Span::new(start.start, end),
            ));
        }

        let end = self.ast.span(first).end;
        Ok(self
            .ast
            .add(NodeKind::ExprStmt { value: first }, Span::new(start.start, end)))
    }

    /// A `for`-target: one or more comma-separated postfix expressions,
    /// folded into a Tuple node when there are several.
    fn parse_target_list(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let first = self.parse_postfix()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_keyword(Keyword::In) {
                break;
            }
            elts.push(self.parse_postfix()?);
        }
        let end = self.ast.span(*elts.last().unwrap()).end;
        Ok(self
            .ast
            .add(NodeKind::Tuple { elts }, Span::new(start.start, end)))
    }

    /// Expression, or a bare comma-separated tuple (`a, b = ...`, `return a, b`).
    fn parse_expr_or_tuple(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let first = self.parse_expr()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if matches!(
                self.cur_kind(),
                TokenKind::Newline
                    | TokenKind::Eof
                    | TokenKind::Op(Op::Semicolon)
                    | TokenKind::Op(Op::Assign)
                    | TokenKind::Op(Op::Colon)
                    | TokenKind::Op(Op::RParen)
                    | TokenKind::Op(Op::RBracket)
                    | TokenKind::Op(Op::RBrace)
            ) {
                break;
            }
            elts.push(self.parse_expr()?);
        }
        let end = self.ast.span(*elts.last().unwrap()).end;
        Ok(self
            .ast
            .add(NodeKind::Tuple { elts }, Span::new(start.start, end)))
    }

    // ----- expression precedence ladder -----

    fn parse_expr(&mut self) -> PResult<NodeId> {
        if self.at_keyword(Keyword::Lambda) {
            return self.parse_lambda();
        }
        let start = self.cur_span();
        let body = self.parse_or()?;
        if self.eat_keyword(Keyword::If) {
            let test = self.parse_or()?;
            if !self.eat_keyword(Keyword::Else) {
                let span = self.cur_span();
                return Err(self.error(codes::SYNTAX, span, "expected 'else'".to_string()));
            }
            let orelse = self.parse_expr()?;
            let end = self.ast.span(orelse).end;
            return Ok(self.ast.add(
                NodeKind::IfExp { test, body, orelse },
                Span::new(start.start, end),
            ));
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        self.bump(); // lambda
        let mut params = Vec::new();
        while !self.at_op(Op::Colon) {
            let (name, span) = self.expect_ident("parameter name")?;
            let default = if self.eat_op(Op::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                annotation: None,
                default,
                span,
            });
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::Colon, "':'")?;
        let body = self.parse_expr()?;
        let end = self.ast.span(body).end;
        Ok(self
            .ast
            .add(NodeKind::Lambda { params, body }, Span::new(start.start, end)))
    }

    fn parse_or(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let first = self.parse_and()?;
        if !self.at_keyword(Keyword::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(Keyword::Or) {
            values.push(self.parse_and()?);
        }
        let end = self.ast.span(*values.last().unwrap()).end;
        Ok(self.ast.add(
            NodeKind::BoolExpr {
                op: BoolOpKind::Or,
                values,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_and(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let first = self.parse_not()?;
        if !self.at_keyword(Keyword::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(Keyword::And) {
            values.push(self.parse_not()?);
        }
        let end = self.ast.span(*values.last().unwrap()).end;
        Ok(self.ast.add(
            NodeKind::BoolExpr {
                op: BoolOpKind::And,
                values,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_not(&mut self) -> PResult<NodeId> {
        if self.at_keyword(Keyword::Not) {
            let start = self.cur_span();
            self.bump();
            let operand = self.parse_not()?;
            let end = self.ast.span(operand).end;
            return Ok(self.ast.add(
                NodeKind::UnaryExpr {
                    op: UnaryOp::Not,
                    operand,
                },
                Span::new(start.start, end),
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.cur_kind() {
                TokenKind::Op(Op::Eq) => CmpOp::Eq,
                TokenKind::Op(Op::NotEq) => CmpOp::NotEq,
                TokenKind::Op(Op::Lt) => CmpOp::Lt,
                TokenKind::Op(Op::LtEq) => CmpOp::LtE,
                TokenKind::Op(Op::Gt) => CmpOp::Gt,
                TokenKind::Op(Op::GtEq) => CmpOp::GtE,
                TokenKind::Keyword(Keyword::Is) => {
                    self.bump();
                    if self.eat_keyword(Keyword::Not) {
                        ops.push(CmpOp::IsNot);
                    } else {
                        ops.push(CmpOp::Is);
                    }
                    comparators.push(self.parse_bitor()?);
                    continue;
                }
                TokenKind::Keyword(Keyword::In) => CmpOp::In,
                TokenKind::Keyword(Keyword::Not) => {
                    // 'not in'
                    let save = self.pos;
                    self.bump();
                    if self.eat_keyword(Keyword::In) {
                        ops.push(CmpOp::NotIn);
                        comparators.push(self.parse_bitor()?);
                        continue;
                    }
                    self.pos = save;
                    break;
                }
                _ => break,
            };
            self.bump();
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        let end = self.ast.span(*comparators.last().unwrap()).end;
        Ok(self.ast.add(
            NodeKind::Compare {
                left,
                ops,
                comparators,
            },
            Span::new(start.start, end),
        ))
    }

    fn parse_bitor(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(&[(Op::Pipe, BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(&[(Op::Caret, BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(&[(Op::Amp, BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(
            &[(Op::Shl, BinOp::Shl), (Op::Shr, BinOp::Shr)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(
            &[(Op::Plus, BinOp::Add), (Op::Minus, BinOp::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> PResult<NodeId> {
        self.parse_left_assoc(
            &[
                (Op::Star, BinOp::Mul),
                (Op::Slash, BinOp::Div),
                (Op::DoubleSlash, BinOp::FloorDiv),
                (Op::Percent, BinOp::Mod),
                (Op::At, BinOp::MatMul),
            ],
            Self::parse_unary,
        )
    }

    fn parse_left_assoc(
        &mut self,
        table: &[(Op, BinOp)],
        next: fn(&mut Self) -> PResult<NodeId>,
    ) -> PResult<NodeId> {
        let start = self.cur_span();
        let mut left = next(self)?;
        'outer: loop {
            for (tok, bin) in table {
                if self.at_op(*tok) {
                    self.bump();
                    let right = next(self)?;
                    let end = self.ast.span(right).end;
                    left = self.ast.add(
                        NodeKind::BinExpr {
                            op: *bin,
                            left,
                            right,
                        },
                        Span::new(start.start, end),
                    );
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let op = match self.cur_kind() {
            TokenKind::Op(Op::Minus) => Some(UnaryOp::Neg),
            TokenKind::Op(Op::Plus) => Some(UnaryOp::Pos),
            TokenKind::Op(Op::Tilde) => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let end = self.ast.span(operand).end;
            return Ok(self
                .ast
                .add(NodeKind::UnaryExpr { op, operand }, Span::new(start.start, end)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let base = self.parse_postfix()?;
        if self.at_op(Op::DoubleStar) {
            self.bump();
            // right-associative
            let right = self.parse_unary()?;
            let end = self.ast.span(right).end;
            return Ok(self.ast.add(
                NodeKind::BinExpr {
                    op: BinOp::Pow,
                    left: base,
                    right,
                },
                Span::new(start.start, end),
            ));
        }
        Ok(base)
    }

    /// Postfix trailers: calls, subscripts, attribute access.
    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let mut value = self.parse_atom()?;
        loop {
            match self.cur_kind() {
                TokenKind::Op(Op::LParen) => {
                    self.bump();
                    let (args, keywords) = self.parse_call_args()?;
                    let close = self.expect_op(Op::RParen, "')'")?;
                    value = self.ast.add(
                        NodeKind::Call {
                            func: value,
                            args,
                            keywords,
                        },
                        Span::new(start.start, close.end),
                    );
                }
                TokenKind::Op(Op::LBracket) => {
                    self.bump();
                    let index = self.parse_subscript()?;
                    let close = self.expect_op(Op::RBracket, "']'")?;
                    value = self.ast.add(
                        NodeKind::Subscript { value, index },
                        Span::new(start.start, close.end),
                    );
                }
                TokenKind::Op(Op::Dot) => {
                    self.bump();
                    let (attr, attr_span) = self.expect_ident("attribute name")?;
                    value = self.ast.add(
                        NodeKind::Attribute { value, attr },
                        Span::new(start.start, attr_span.end),
                    );
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_call_args(&mut self) -> PResult<(Vec<NodeId>, Vec<(String, NodeId)>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.at_op(Op::RParen) {
            if self.at_op(Op::DoubleStar) {
                let span = self.cur_span();
                return Err(self.error(
                    codes::UNSUPPORTED,
                    span,
                    "**kwargs call arguments are not supported".to_string(),
                ));
            }
            // keyword argument: IDENT '=' expr (lookahead needed)
            if let TokenKind::Ident(name) = self.cur_kind() {
                self.skip_trivia();
                if matches!(self.raw_at(self.pos + 1).kind, TokenKind::Op(Op::Assign)) {
                    self.bump(); // name
                    self.bump(); // '='
                    let value = self.parse_expr()?;
                    keywords.push((name, value));
                    if !self.eat_op(Op::Comma) {
                        break;
                    }
                    continue;
                }
            }
            if !keywords.is_empty() {
                let span = self.cur_span();
                self.push_diag(
                    codes::SYNTAX,
                    span,
                    "positional argument after keyword argument".to_string(),
                );
            }
            args.push(self.parse_expr()?);
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        Ok((args, keywords))
    }

    fn parse_subscript(&mut self) -> PResult<NodeId> {
        let start = self.cur_span();
        let lower = if self.at_op(Op::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        if !self.at_op(Op::Colon) {
            // plain index; Python allows tuple subscripts for type hints
            let first = lower.unwrap();
            if self.at_op(Op::Comma) {
                let mut elts = vec![first];
                while self.eat_op(Op::Comma) {
                    if self.at_op(Op::RBracket) {
                        break;
                    }
                    elts.push(self.parse_expr()?);
                }
                let end = self.ast.span(*elts.last().unwrap()).end;
                return Ok(self
                    .ast
                    .add(NodeKind::Tuple { elts }, Span::new(start.start, end)));
            }
            return Ok(first);
        }
        self.bump(); // ':'
        let upper = if self.at_op(Op::RBracket) || self.at_op(Op::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let step = if self.eat_op(Op::Colon) {
            if self.at_op(Op::RBracket) {
                None
            } else {
                Some(self.parse_expr()?)
            }
        } else {
            None
        };
        let end = self.cur_span().start;
        Ok(self.ast.add(
            NodeKind::SliceExpr { lower, upper, step },
            Span::new(start.start, end),
        ))
    }

    fn parse_atom(&mut self) -> PResult<NodeId> {
        let tok = self.cur().clone();
        match tok.kind {
            TokenKind::Error(msg) => {
                self.pos += 1;
                let code = lex_error_code(&msg);
                Err(self.error(code, tok.span, msg))
            }
            TokenKind::Number {
                text,
                value,
                is_int,
            } => {
                self.bump();
                Ok(self.ast.add(
                    NodeKind::NumberLit {
                        value,
                        is_int,
                        text,
                    },
                    tok.span,
                ))
            }
            TokenKind::Str { value, prefix } => {
                self.bump();
                if prefix.fstring {
                    return self.parse_fstring(&value, tok.span);
                }
                // implicit concatenation of adjacent string literals
                let mut text = value;
                let mut span = tok.span;
                while let TokenKind::Str { value, prefix } = self.cur_kind() {
                    if prefix.fstring {
                        break;
                    }
                    let next = self.bump();
                    text.push_str(&value);
                    span = span.join(next.span);
                }
                Ok(self.ast.add(NodeKind::StringLit { value: text }, span))
            }
            TokenKind::Ident(id) => {
                self.bump();
                Ok(self.ast.add(NodeKind::Name { id }, tok.span))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(self.ast.add(NodeKind::BoolLit { value: true }, tok.span))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(self.ast.add(NodeKind::BoolLit { value: false }, tok.span))
            }
            TokenKind::Keyword(Keyword::None) => {
                self.bump();
                Ok(self.ast.add(NodeKind::NoneLit, tok.span))
            }
            TokenKind::Keyword(Keyword::Lambda) => self.parse_lambda(),
            TokenKind::Op(Op::LParen) => self.parse_paren(tok.span),
            TokenKind::Op(Op::LBracket) => self.parse_list(tok.span),
            TokenKind::Op(Op::LBrace) => self.parse_braced(tok.span),
            TokenKind::Op(Op::Walrus) => {
                self.bump();
                Err(self.error(
                    codes::UNSUPPORTED,
                    tok.span,
                    "assignment expressions (':=') are not supported".to_string(),
                ))
            }
            _ => {
                let text = self.describe_current();
                Err(self.error(codes::SYNTAX, tok.span, format!("unexpected {text}")))
            }
        }
    }

    fn parse_paren(&mut self, open: Span) -> PResult<NodeId> {
        self.bump(); // '('
        if self.at_op(Op::RParen) {
            let close = self.bump().span;
            return Ok(self
                .ast
                .add(NodeKind::Tuple { elts: Vec::new() }, open.join(close)));
        }
        let first = self.parse_expr()?;
        // generator expression
        if self.at_keyword(Keyword::For) {
            let generators = self.parse_comp_clauses()?;
            let close = self.expect_op(Op::RParen, "')'")?;
            return Ok(self.ast.add(
                NodeKind::Comp {
                    kind: CompKind::Generator,
                    elt: first,
                    generators,
                },
                open.join(close),
            ));
        }
        if self.at_op(Op::Comma) {
            let mut elts = vec![first];
            while self.eat_op(Op::Comma) {
                if self.at_op(Op::RParen) {
                    break;
                }
                elts.push(self.parse_expr()?);
            }
            let close = self.expect_op(Op::RParen, "')'")?;
            return Ok(self.ast.add(NodeKind::Tuple { elts }, open.join(close)));
        }
        self.expect_op(Op::RParen, "')'")?;
        // parenthesized expression: span already covers the inner node
        Ok(first)
    }

    fn parse_list(&mut self, open: Span) -> PResult<NodeId> {
        self.bump(); // '['
        if self.at_op(Op::RBracket) {
            let close = self.bump().span;
            return Ok(self
                .ast
                .add(NodeKind::ListLit { elts: Vec::new() }, open.join(close)));
        }
        let first = self.parse_expr()?;
        if self.at_keyword(Keyword::For) {
            let generators = self.parse_comp_clauses()?;
            let close = self.expect_op(Op::RBracket, "']'")?;
            return Ok(self.ast.add(
                NodeKind::Comp {
                    kind: CompKind::List,
                    elt: first,
                    generators,
                },
                open.join(close),
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBracket) {
                break;
            }
            elts.push(self.parse_expr()?);
        }
        let close = self.expect_op(Op::RBracket, "']'")?;
        Ok(self.ast.add(NodeKind::ListLit { elts }, open.join(close)))
    }

    fn parse_braced(&mut self, open: Span) -> PResult<NodeId> {
        self.bump(); // '{'
        if self.at_op(Op::RBrace) {
            let close = self.bump().span;
            return Ok(self.ast.add(
                NodeKind::DictLit {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
                open.join(close),
            ));
        }
        let first = self.parse_expr()?;
        if self.at_op(Op::Colon) {
            self.bump();
            let first_value = self.parse_expr()?;
            if self.at_keyword(Keyword::For) {
                let generators = self.parse_comp_clauses()?;
                let close = self.expect_op(Op::RBrace, "'}'")?;
                return Ok(self.ast.add(
                    NodeKind::DictComp {
                        key: first,
                        value: first_value,
                        generators,
                    },
                    open.join(close),
                ));
            }
            let mut keys = vec![first];
            let mut values = vec![first_value];
            while self.eat_op(Op::Comma) {
                if self.at_op(Op::RBrace) {
                    break;
                }
                keys.push(self.parse_expr()?);
                self.expect_op(Op::Colon, "':'")?;
                values.push(self.parse_expr()?);
            }
            let close = self.expect_op(Op::RBrace, "'}'")?;
            return Ok(self
                .ast
                .add(NodeKind::DictLit { keys, values }, open.join(close)));
        }
        if self.at_keyword(Keyword::For) {
            let generators = self.parse_comp_clauses()?;
            let close = self.expect_op(Op::RBrace, "'}'")?;
            return Ok(self.ast.add(
                NodeKind::Comp {
                    kind: CompKind::Set,
                    elt: first,
                    generators,
                },
                open.join(close),
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBrace) {
                break;
            }
            elts.push(self.parse_expr()?);
        }
        let close = self.expect_op(Op::RBrace, "'}'")?;
        Ok(self.ast.add(NodeKind::SetLit { elts }, open.join(close)))
    }

    fn parse_comp_clauses(&mut self) -> PResult<Vec<CompClause>> {
        let mut out = Vec::new();
        while self.at_keyword(Keyword::For) {
            self.bump();
            let target = self.parse_target_list()?;
            if !self.eat_keyword(Keyword::In) {
                let span = self.cur_span();
                return Err(self.error(codes::SYNTAX, span, "expected 'in'".to_string()));
            }
            let iter = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.at_keyword(Keyword::If) {
                self.bump();
                conditions.push(self.parse_or()?);
            }
            out.push(CompClause {
                target,
                iter,
                conditions,
            });
        }
        Ok(out)
    }

    // ----- f-strings -----

    /// Parse the raw body of an f-string into literal parts and interpolated
    /// expressions. `{{`/`}}` are literal braces; conversion (`!r`) and
    /// format-spec (`:...`) suffixes are unsupported and reported.
    fn parse_fstring(&mut self, body: &str, span: Span) -> PResult<NodeId> {
        let mut parts: Vec<String> = Vec::new();
        let mut exprs: Vec<NodeId> = Vec::new();
        let mut lit = String::new();
        let bytes = body.as_bytes();
        let mut i = 0usize;
        let base = self.fstring_body_offset(span);
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    lit.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    lit.push('}');
                    i += 2;
                }
                b'}' => {
                    self.push_diag(
                        codes::SYNTAX,
                        span,
                        "single '}' in f-string; use '}}'".to_string(),
                    );
                    i += 1;
                }
                b'{' => {
                    let frag_start = i + 1;
                    let mut depth = 1u32;
                    let mut j = frag_start;
                    while j < bytes.len() && depth > 0 {
                        match bytes[j] {
                            b'{' => depth += 1,
                            b'}' => depth -= 1,
                            _ => {}
                        }
                        if depth > 0 {
                            j += 1;
                        }
                    }
                    if depth > 0 {
                        self.push_diag(codes::SYNTAX, span, "unterminated '{' in f-string".to_string());
                        break;
                    }
                    let mut frag = &body[frag_start..j];
                    // detect unsupported !conversion / :format-spec suffixes
                    if let Some(bang) = frag.rfind('!') {
                        if bang + 2 == frag.len() {
                            self.push_diag(
                                codes::UNSUPPORTED,
                                span,
                                "f-string conversion suffixes are not supported".to_string(),
                            );
                            frag = &frag[..bang];
                        }
                    }
                    if let Some(colon) = find_format_spec_colon(frag) {
                        self.push_diag(
                            codes::UNSUPPORTED,
                            span,
                            "f-string format specs are not supported".to_string(),
                        );
                        frag = &frag[..colon];
                    }
                    match decode_escapes(&lit) {
                        Ok(decoded) => parts.push(decoded),
                        Err(_) => parts.push(std::mem::take(&mut lit)),
                    }
                    lit.clear();
                    if let Some(expr) = self.parse_fragment(frag, base + frag_start as u32) {
                        exprs.push(expr);
                    } else {
                        // keep parts/exprs consistent after an error
                        let err =
                            self.ast.add(NodeKind::Error, Span::at(base + frag_start as u32));
                        exprs.push(err);
                    }
                    i = j + 1;
                }
                _ => {
                    let ch = body[i..].chars().next().unwrap_or('\u{fffd}');
                    lit.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        match decode_escapes(&lit) {
            Ok(decoded) => parts.push(decoded),
            Err(_) => parts.push(lit),
        }
        Ok(self.ast.add(NodeKind::FString { parts, exprs }, span))
    }

    /// Byte offset of the f-string body within the source, computed from the
    /// token span by skipping prefix letters and the opening quote(s).
    fn fstring_body_offset(&self, span: Span) -> u32 {
        let text = &self.source[span.start as usize..span.end as usize];
        let q = text
            .find(|c| c == '"' || c == '\'')
            .unwrap_or(0);
        let quote = text.as_bytes().get(q).copied().unwrap_or(b'"');
        let triple = text.as_bytes().get(q + 1) == Some(&quote)
            && text.as_bytes().get(q + 2) == Some(&quote);
        span.start + q as u32 + if triple { 3 } else { 1 }
    }

    /// Parse one interpolation fragment as an expression, with spans shifted
    /// so diagnostics land inside the original f-string.
    fn parse_fragment(&mut self, frag: &str, base: u32) -> Option<NodeId> {
        let mut sub_tokens: Vec<Token> = lexer::lex(frag)
            .into_iter()
            .filter(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Indent(_) | TokenKind::Newline | TokenKind::Comment(_)
                )
            })
            .map(|mut t| {
                t.span = Span::new(t.span.start + base, t.span.end + base);
                t
            })
            .collect();
        if sub_tokens.len() <= 1 {
            self.push_diag(codes::SYNTAX, Span::at(base), "empty f-string expression".to_string());
            return None;
        }
        // temporarily swap the token stream and parse one expression
        let saved_tokens = std::mem::replace(&mut self.tokens, std::mem::take(&mut sub_tokens));
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_depth = std::mem::replace(&mut self.bracket_depth, 0);
        let result = self.parse_expr_or_tuple();
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.bracket_depth = saved_depth;
        result.ok()
    }
}

fn aug_assign_op(op: Op) -> Option<BinOp> {
    match op {
        Op::PlusAssign => Some(BinOp::Add),
        Op::MinusAssign => Some(BinOp::Sub),
        Op::StarAssign => Some(BinOp::Mul),
        Op::SlashAssign => Some(BinOp::Div),
        Op::DoubleSlashAssign => Some(BinOp::FloorDiv),
        Op::PercentAssign => Some(BinOp::Mod),
        Op::DoubleStarAssign => Some(BinOp::Pow),
        Op::AmpAssign => Some(BinOp::BitAnd),
        Op::PipeAssign => Some(BinOp::BitOr),
        Op::CaretAssign => Some(BinOp::BitXor),
        Op::ShlAssign => Some(BinOp::Shl),
        Op::ShrAssign => Some(BinOp::Shr),
        _ => None,
    }
}

/// Find the colon starting a format spec in an f-string fragment, ignoring
/// colons nested in brackets (slices, dicts, lambdas are rare but possible).
fn find_format_spec_colon(frag: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, b) in frag.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b':' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Pick the stable diagnostic code for a lexer error by its message shape.
fn lex_error_code(msg: &str) -> &'static str {
    if msg.contains("unterminated string") {
        codes::UNTERMINATED_STRING
    } else if msg.contains("escape") {
        codes::BAD_ESCAPE
    } else if msg.contains("literal") {
        codes::BAD_NUMBER
    } else {
        codes::BAD_TOKEN
    }
}

#[cfg(test)]
mod tests;
