//! Tsubame - bidirectional Python <-> TypeScript-flavored source conversion
//!
//! The forward pipeline lexes and parses a restricted Python dialect into an
//! arena AST, resolves symbols against an externally supplied API surface,
//! infers types by iterative unification to a fixpoint, and generates typed
//! target source plus a source map. The reverse pipeline walks the same target
//! IR back into Python text. Ordinary user mistakes become positioned
//! [`diagnostics::Diagnostic`]s and conversion keeps going; only the reverse
//! emitter and the CLI boundary raise [`error::ConvertError`].

pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod pyemit;
pub mod semantic;
pub mod span;
pub mod tsgen;

pub use error::{ConvertError, Result};
pub use pyemit::PyEmitOptions;
pub use semantic::builtins::default_surface;

use crate::diagnostics::DiagnosticList;
use crate::ir::SourceMapEntry;
use crate::semantic::api::ApiSurface;
use serde::Serialize;
use std::sync::Arc;

/// Caller-supplied knobs for a forward conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Generation passes before type inference gives up refining.
    pub max_passes: usize,
    /// Diagnostic ceiling; exceeding it aborts the run as fatal.
    pub diagnostic_limit: usize,
    /// Optional IDE-style introspection request.
    pub query: Option<IdeQuery>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_passes: 5,
            diagnostic_limit: 100,
            query: None,
        }
    }
}

/// A cursor position plus the kind of answer wanted there.
#[derive(Debug, Clone)]
pub struct IdeQuery {
    pub position: u32,
    pub kind: QueryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Symbol,
    Signature,
    MemberCompletion,
    IdentifierCompletion,
}

/// Answer to an [`IdeQuery`]: the span the answer applies to and the
/// candidate symbols/texts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub begin_pos: u32,
    pub end_pos: u32,
    #[serde(rename = "candidateSymbols")]
    pub candidates: Vec<String>,
}

/// One converted file: generated text plus its source-map intervals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutput {
    pub name: String,
    pub text: String,
    pub source_map: Vec<SourceMapEntry>,
}

/// Everything a forward run produces. Diagnostics are ordered across files in
/// input order; `success` means no error-severity diagnostic anywhere.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResult {
    pub outputs: Vec<FileOutput>,
    pub success: bool,
    pub diagnostics: DiagnosticList,
    pub query_result: Option<QueryResult>,
}

/// Convert a set of Python source files against one shared API surface.
///
/// Never fails: syntax and type problems come back as diagnostics alongside
/// best-effort output for every file.
pub fn convert_py_to_ts(
    sources: &[(&str, &str)],
    surface: &Arc<ApiSurface>,
    options: &ConvertOptions,
) -> ConvertResult {
    let mut outputs = Vec::with_capacity(sources.len());
    let mut diagnostics = DiagnosticList::new();
    let mut query_result = None;
    for (name, text) in sources {
        let result = tsgen::generate(text, Some(name), surface, options);
        let (rendered, source_map) = ir::flatten(&result.stmts);
        diagnostics.extend(result.diagnostics);
        if query_result.is_none() {
            query_result = result.query;
        }
        outputs.push(FileOutput {
            name: name.to_string(),
            text: rendered,
            source_map,
        });
    }
    let success = !diagnostics.has_errors();
    ConvertResult {
        outputs,
        success,
        diagnostics,
        query_result,
    }
}

/// Emit Python for a target-language program.
///
/// The reverse direction has a narrower contract: a construct with no Python
/// equivalent raises instead of producing invalid output.
pub fn convert_ts_to_py(stmts: &[ir::TsStmt], options: &PyEmitOptions) -> Result<String> {
    pyemit::emit(stmts, options)
}
