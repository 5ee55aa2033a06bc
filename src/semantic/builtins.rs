//! Default API surface
//!
//! A small built-in surface for callers that pass none: the Python builtins
//! the converter maps by default (print/len/abs/min/max/str methods and the
//! math constants), expressed in the same entry format a host would supply.
//! Hosts replace this wholesale; nothing here is special-cased in the
//! generator.

use crate::semantic::api::{ApiEntry, ApiKind, ApiParam, ApiSurface};
use once_cell::sync::Lazy;
use std::sync::Arc;

static DEFAULT_SURFACE: Lazy<Arc<ApiSurface>> = Lazy::new(|| Arc::new(build_default_surface()));

/// The shared default surface. Read-only; safe to share across runs.
pub fn default_surface() -> Arc<ApiSurface> {
    DEFAULT_SURFACE.clone()
}

fn param(name: &str, ty: &str) -> ApiParam {
    ApiParam {
        name: name.to_string(),
        ty: ty.to_string(),
        default: None,
        optional: false,
    }
}

fn optional_param(name: &str, ty: &str, default: &str) -> ApiParam {
    ApiParam {
        name: name.to_string(),
        ty: ty.to_string(),
        default: Some(default.to_string()),
        optional: true,
    }
}

fn function(
    qname: &str,
    py: &str,
    params: Vec<ApiParam>,
    ret: &str,
    ts_override: Option<&str>,
    py_override: Option<&str>,
) -> ApiEntry {
    ApiEntry {
        qname: qname.to_string(),
        py_q_name: Some(py.to_string()),
        kind: ApiKind::Function,
        namespace: qname.rsplit_once('.').map(|(ns, _)| ns.to_string()),
        parameters: params,
        ret_type: Some(ret.to_string()),
        ts_override: ts_override.map(|s| s.to_string()),
        py_override: py_override.map(|s| s.to_string()),
        extends: Vec::new(),
        is_static: false,
        is_protected: false,
        is_instance: false,
    }
}

fn method(qname: &str, py: &str, params: Vec<ApiParam>, ret: &str) -> ApiEntry {
    let mut entry = function(qname, py, params, ret, None, None);
    entry.kind = ApiKind::Method;
    entry.is_instance = true;
    entry
}

fn variable(qname: &str, py: &str, ty: &str) -> ApiEntry {
    ApiEntry {
        qname: qname.to_string(),
        py_q_name: Some(py.to_string()),
        kind: ApiKind::Variable,
        namespace: qname.rsplit_once('.').map(|(ns, _)| ns.to_string()),
        parameters: Vec::new(),
        ret_type: Some(ty.to_string()),
        ts_override: None,
        py_override: None,
        extends: Vec::new(),
        is_static: true,
        is_protected: false,
        is_instance: false,
    }
}

fn build_default_surface() -> ApiSurface {
    let entries = vec![
        function(
            "console.log",
            "print",
            vec![param("msg", "any")],
            "void",
            Some("console.log($0)"),
            Some("print($0)"),
        ),
        function(
            "_py.len",
            "len",
            vec![param("obj", "any")],
            "number",
            Some("$0.length"),
            Some("len($0)"),
        ),
        function(
            "Math.abs",
            "abs",
            vec![param("x", "number")],
            "number",
            None,
            Some("abs($0)"),
        ),
        function(
            "Math.min",
            "min",
            vec![param("a", "number"), param("b", "number")],
            "number",
            None,
            Some("min($0, $1)"),
        ),
        function(
            "Math.max",
            "max",
            vec![param("a", "number"), param("b", "number")],
            "number",
            None,
            Some("max($0, $1)"),
        ),
        function(
            "Math.round",
            "round",
            vec![param("x", "number")],
            "number",
            None,
            Some("round($0)"),
        ),
        function(
            "Math.sqrt",
            "math.sqrt",
            vec![param("x", "number")],
            "number",
            None,
            None,
        ),
        function(
            "Math.floor",
            "math.floor",
            vec![param("x", "number")],
            "number",
            None,
            None,
        ),
        function(
            "Math.ceil",
            "math.ceil",
            vec![param("x", "number")],
            "number",
            None,
            None,
        ),
        function(
            "Math.randomRange",
            "random.randint",
            vec![param("min", "number"), param("max", "number")],
            "number",
            None,
            None,
        ),
        variable("Math.PI", "math.pi", "number"),
        variable("Math.E", "math.e", "number"),
        function(
            "_py.str",
            "str",
            vec![param("value", "any")],
            "string",
            Some("\"\" + $0"),
            Some("str($0)"),
        ),
        function(
            "parseInt",
            "int",
            vec![param("text", "any")],
            "number",
            None,
            Some("int($0)"),
        ),
        function(
            "parseFloat",
            "float",
            vec![param("text", "any")],
            "number",
            None,
            Some("float($0)"),
        ),
        function(
            "_py.range",
            "range",
            vec![
                param("start", "number"),
                optional_param("stop", "number", "0"),
                optional_param("step", "number", "1"),
            ],
            "number[]",
            None,
            None,
        ),
        // string methods
        method("String.toUpperCase", "str.upper", vec![], "string"),
        method("String.toLowerCase", "str.lower", vec![], "string"),
        method(
            "String.charAt",
            "str.char_at",
            vec![param("index", "number")],
            "string",
        ),
        method(
            "String.indexOf",
            "str.find",
            vec![param("needle", "string")],
            "number",
        ),
        method(
            "String.split",
            "str.split",
            vec![param("separator", "string")],
            "string[]",
        ),
        method("String.trim", "str.strip", vec![], "string"),
        // array methods
        method("Array.push", "list.append", vec![param("item", "T")], "void"),
        method("Array.pop", "list.pop", vec![], "T"),
        method(
            "Array.indexOf",
            "list.index",
            vec![param("item", "T")],
            "number",
        ),
        method(
            "Array.removeElement",
            "list.remove",
            vec![param("item", "T")],
            "boolean",
        ),
        method("Array.reverse", "list.reverse", vec![], "void"),
    ];
    ApiSurface { entries }
}
