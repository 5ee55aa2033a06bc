//! Diagnostics collection and output
//!
//! Every stage (lexer, parser, forward generator) pushes into one ordered
//! [`DiagnosticList`] per conversion run. Diagnostics are positioned as byte
//! offset + length; line/column are derived once at construction with a linear
//! scan over the source so downstream consumers can underline the exact span.

use crate::span::{line_col_of, Span};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lex,
    Parse,
    Convert,
    Emit,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub start: u32,
    pub length: u32,
    pub line: usize,
    pub column: usize,
    pub phase: Phase,
}

impl Diagnostic {
    /// Build a positioned diagnostic, resolving line/column from `source`.
    pub fn new(
        code: &'static str,
        severity: Severity,
        message: String,
        file: Option<&str>,
        span: Span,
        phase: Phase,
        source: &str,
    ) -> Self {
        let lc = line_col_of(source, span.start);
        Self {
            code,
            severity,
            message,
            file: file.map(|f| f.to_string()),
            start: span.start,
            length: span.len(),
            line: lc.line,
            column: lc.column,
            phase,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.start + self.length)
    }
}

/// Ordered list of diagnostics for one conversion run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DiagnosticList {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticList {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn add(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    pub fn extend(&mut self, other: DiagnosticList) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// One line per diagnostic: `[CODE] file:line:col message`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for diag in &self.diagnostics {
            let file = diag.file.as_deref().unwrap_or("<input>");
            out.push_str(&format!(
                "[{}] {}:{}:{} {}\n",
                diag.code, file, diag.line, diag.column, diag.message
            ));
        }
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
    }
}

// Diagnostic codes, grouped by phase. Codes are stable; messages are not.
pub mod codes {
    // Lexical
    pub const BAD_TOKEN: &str = "TSB-BAD-TOKEN";
    pub const UNTERMINATED_STRING: &str = "TSB-UNTERMINATED-STRING";
    pub const BAD_ESCAPE: &str = "TSB-BAD-ESCAPE";
    pub const BAD_NUMBER: &str = "TSB-BAD-NUMBER";

    // Syntactic
    pub const SYNTAX: &str = "TSB-SYNTAX";
    pub const INDENT: &str = "TSB-INDENT";
    pub const TOO_MANY_ERRORS: &str = "TSB-TOO-MANY-ERRORS";

    // Semantic / type
    pub const UNDEFINED_NAME: &str = "TSB-UNDEFINED-NAME";
    pub const TYPE_MISMATCH: &str = "TSB-TYPE-MISMATCH";
    pub const ARITY: &str = "TSB-ARITY";
    pub const UNSUPPORTED: &str = "TSB-UNSUPPORTED";
    pub const SCOPE: &str = "TSB-SCOPE";
    pub const SUPER_FIRST: &str = "TSB-SUPER-FIRST";

    // Engine advisories
    pub const FIXPOINT_CAP: &str = "TSB-FIXPOINT-CAP";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: &'static str, msg: &str) -> Diagnostic {
        Diagnostic::new(
            code,
            Severity::Error,
            msg.to_string(),
            Some("main.py"),
            Span::new(2, 5),
            Phase::Parse,
            "x\ny = $\n",
        )
    }

    #[test]
    fn test_diagnostic_line_col() {
        let d = sample(codes::SYNTAX, "unexpected token");
        assert_eq!(d.line, 2);
        assert_eq!(d.column, 1);
        assert_eq!(d.length, 3);
    }

    #[test]
    fn test_to_text_format() {
        let mut list = DiagnosticList::new();
        list.add(sample(codes::SYNTAX, "unexpected token"));
        assert_eq!(
            list.to_text(),
            "[TSB-SYNTAX] main.py:2:1 unexpected token\n"
        );
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let mut list = DiagnosticList::new();
        list.add(Diagnostic::new(
            codes::FIXPOINT_CAP,
            Severity::Warning,
            "type inference stopped early".to_string(),
            None,
            Span::at(0),
            Phase::Convert,
            "",
        ));
        assert!(!list.has_errors());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_to_json_contains_code() {
        let mut list = DiagnosticList::new();
        list.add(sample(codes::TYPE_MISMATCH, "number vs string"));
        let json = list.to_json();
        assert!(json.contains("TSB-TYPE-MISMATCH"));
        assert!(json.contains("\"severity\":\"error\""));
    }
}
