//! Generator tests
//!
//! End-to-end over the forward pipeline: Python source in, flattened
//! target text and diagnostics out.

use crate::diagnostics::codes;
use crate::ir;
use crate::semantic::builtins::default_surface;
use crate::tsgen::{generate, FileResult};
use crate::{ConvertOptions, IdeQuery, QueryKind};
use pretty_assertions::assert_eq;

fn convert(source: &str) -> (String, FileResult) {
    convert_with(source, &ConvertOptions::default())
}

fn convert_with(source: &str, options: &ConvertOptions) -> (String, FileResult) {
    let surface = default_surface();
    let result = generate(source, Some("test.py"), &surface, options);
    let (text, _) = ir::flatten(&result.stmts);
    (text, result)
}

fn has_code(result: &FileResult, code: &str) -> bool {
    result.diagnostics.iter().any(|d| d.code == code)
}

#[test]
fn test_module_assignment_becomes_typed_let() {
    let (text, result) = convert("x = 1\n");
    assert_eq!(text, "let x: number = 1;\n");
    assert!(!result.diagnostics.has_errors());
}

#[test]
fn test_reassignment_is_not_redeclared() {
    let (text, _) = convert("x = 1\nx = 2\n");
    assert_eq!(text, "let x: number = 1;\nx = 2;\n");
}

#[test]
fn test_counted_loop_ascending() {
    let source = "for i in range(5):\n    print(i)\n";
    let (text, result) = convert(source);
    assert_eq!(text, "for (let i = 0; i < 5; i++) {\n    console.log(i);\n}\n");
    assert!(!result.diagnostics.has_errors());
}

#[test]
fn test_counted_loop_descending() {
    let source = "for i in range(10, 0, -1):\n    print(i)\n";
    let (text, _) = convert(source);
    assert!(text.contains("for (let i = 10; i > 0; i--) {"), "{text}");
}

#[test]
fn test_non_literal_step_falls_back_to_for_of() {
    let source = "step = 2\nfor i in range(0, 10, step):\n    print(i)\n";
    let (text, _) = convert(source);
    assert!(text.contains("for (const i of "), "{text}");
}

#[test]
fn test_print_becomes_console_log() {
    let (text, _) = convert("print(\"hi\")\n");
    assert_eq!(text, "console.log(\"hi\");\n");
}

#[test]
fn test_fstring_becomes_template_literal() {
    let source = "name = \"world\"\nprint(f\"hello {name}!\")\n";
    let (text, _) = convert(source);
    assert!(text.contains("console.log(`hello ${name}!`);"), "{text}");
}

#[test]
fn test_len_becomes_length_property() {
    let source = "items = [1, 2, 3]\nn = len(items)\n";
    let (text, _) = convert(source);
    assert!(text.contains("let items: number[] = [1, 2, 3];"), "{text}");
    assert!(text.contains("let n: number = items.length;"), "{text}");
}

#[test]
fn test_augmented_assignment() {
    let (text, _) = convert("total = 0\ntotal += 5\n");
    assert_eq!(text, "let total: number = 0;\ntotal += 5;\n");
}

#[test]
fn test_hoisting_across_branches() {
    let source = "\
flag = True
if flag:
    x = 1
else:
    x = 2
print(x)
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    // assigned in sibling branches and read afterwards: declared up front
    assert!(text.contains("let x: number;"), "{text}");
    assert!(text.contains("x = 1;"), "{text}");
    assert!(text.contains("x = 2;"), "{text}");
    assert!(!text.contains("let x: number = 1"), "{text}");
}

#[test]
fn test_function_types_inferred_from_body_and_calls() {
    let source = "\
def add(a, b):
    return a + b

r = add(1, 2)
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    assert!(
        text.contains("function add(a: number, b: number): number {"),
        "{text}"
    );
    assert!(text.contains("return a + b;"), "{text}");
    assert!(text.contains("let r: number = add(1, 2);"), "{text}");
}

#[test]
fn test_procedure_without_return_is_void() {
    let source = "\
def greet(name):
    print(name)
    print(name)
";
    let (text, _) = convert(source);
    assert!(text.contains("function greet(name)"), "{text}");
    assert!(text.contains(": void {"), "{text}");
}

#[test]
fn test_single_use_helper_is_inlined() {
    let source = "\
def setup():
    print(\"ready\")

setup()
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    assert!(!text.contains("function setup"), "{text}");
    assert!(text.contains("console.log(\"ready\");"), "{text}");
}

#[test]
fn test_twice_called_helper_stays_a_function() {
    let source = "\
def setup():
    print(\"ready\")

setup()
setup()
";
    let (text, _) = convert(source);
    assert!(text.contains("function setup"), "{text}");
    assert!(text.contains("setup();"), "{text}");
}

#[test]
fn test_class_with_constructor_and_method() {
    let source = "\
class Dog:
    def __init__(self, name):
        self.name = name

    def speak(self):
        return self.name

d = Dog(\"rex\")
print(d.speak())
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    assert!(text.contains("class Dog {"), "{text}");
    assert!(text.contains("name: string;"), "{text}");
    assert!(text.contains("constructor(name: string)"), "{text}");
    assert!(text.contains("this.name = name;"), "{text}");
    assert!(text.contains("speak(): string {"), "{text}");
    assert!(text.contains("let d: Dog = new Dog(\"rex\");"), "{text}");
}

#[test]
fn test_inheritance_and_super_lowering() {
    let source = "\
class Animal:
    def __init__(self, name):
        self.name = name

class Dog(Animal):
    def __init__(self, name):
        super().__init__(name)
        self.kind = \"dog\"
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    assert!(text.contains("class Dog extends Animal {"), "{text}");
    assert!(text.contains("super(name);"), "{text}");
}

#[test]
fn test_super_must_come_first_in_constructor() {
    let source = "\
class Animal:
    def __init__(self, name):
        self.name = name

class Dog(Animal):
    def __init__(self, name):
        self.kind = \"dog\"
        super().__init__(name)
";
    let (_, result) = convert(source);
    assert!(has_code(&result, codes::SUPER_FIRST));
}

#[test]
fn test_type_mismatch_is_reported() {
    let (_, result) = convert("x = 1\nx = \"two\"\n");
    assert!(has_code(&result, codes::TYPE_MISMATCH));
    assert!(result.diagnostics.has_errors());
}

#[test]
fn test_undefined_name_is_reported() {
    let (_, result) = convert("print(missing)\n");
    assert!(has_code(&result, codes::UNDEFINED_NAME));
}

#[test]
fn test_missing_argument_is_reported() {
    let source = "\
def add(a, b):
    return a + b

x = add(1)
";
    let (_, result) = convert(source);
    assert!(has_code(&result, codes::ARITY));
}

#[test]
fn test_pass_ceiling_warns_when_inference_is_unsettled() {
    let source = "\
def f():
    return g()

def g():
    return 1
";
    let options = ConvertOptions {
        max_passes: 1,
        ..Default::default()
    };
    let (_, result) = convert_with(source, &options);
    assert!(has_code(&result, codes::FIXPOINT_CAP));
}

#[test]
fn test_symbol_query_resolves_a_reference() {
    let source = "x = 1\nprint(x)\n";
    let options = ConvertOptions {
        query: Some(IdeQuery {
            position: 12,
            kind: QueryKind::Symbol,
        }),
        ..Default::default()
    };
    let (_, result) = convert_with(source, &options);
    let answer = result.query.expect("query should resolve");
    assert_eq!(answer.candidates, vec!["x".to_string()]);
}

#[test]
fn test_member_completion_lists_class_members() {
    let source = "\
class Dog:
    def __init__(self):
        self.name = \"rex\"

    def speak(self):
        return self.name

d = Dog()
print(d.name)
";
    let pos = source.rfind("d.name").unwrap() as u32 + 2;
    let options = ConvertOptions {
        query: Some(IdeQuery {
            position: pos,
            kind: QueryKind::MemberCompletion,
        }),
        ..Default::default()
    };
    let (_, result) = convert_with(source, &options);
    let answer = result.query.expect("query should resolve");
    assert!(answer.candidates.iter().any(|c| c == "name"), "{:?}", answer.candidates);
    assert!(answer.candidates.iter().any(|c| c == "speak"), "{:?}", answer.candidates);
}

#[test]
fn test_docstring_becomes_comment() {
    let source = "\
def greet():
    \"\"\"Say hello.\"\"\"
    print(\"hello\")

greet()
greet()
";
    let (text, _) = convert(source);
    assert!(text.contains("// Say hello."), "{text}");
}

#[test]
fn test_syntax_error_recovers_and_keeps_going() {
    let source = "x = = 1\ny = 2\n";
    let (text, result) = convert(source);
    assert!(has_code(&result, codes::SYNTAX));
    // the next statement still converts
    assert!(text.contains("let y: number = 2;"), "{text}");
}

#[test]
fn test_aborted_parse_reports_ceiling() {
    let mut source = String::new();
    for _ in 0..200 {
        source.push_str("x = = 1\n");
    }
    let (_, result) = convert(&source);
    assert!(result.aborted);
    assert!(has_code(&result, codes::TOO_MANY_ERRORS));
}

#[test]
fn test_conditional_expression() {
    let source = "x = 5\ny = \"pos\" if x > 0 else \"neg\"\n";
    let (text, _) = convert(source);
    assert!(text.contains("let y: string = x > 0 ? \"pos\" : \"neg\";"), "{text}");
}

#[test]
fn test_list_comprehension_becomes_map() {
    let source = "\
nums = [1, 2, 3]
doubled = [n * 2 for n in nums]
";
    let (text, result) = convert(source);
    assert!(!result.diagnostics.has_errors());
    assert!(text.contains(".map("), "{text}");
    assert!(text.contains("let doubled: number[]"), "{text}");
}

#[test]
fn test_while_with_break_and_continue() {
    let source = "\
n = 0
while True:
    n += 1
    if n > 10:
        break
    continue
";
    let (text, _) = convert(source);
    assert!(text.contains("while (true) {"), "{text}");
    assert!(text.contains("break;"), "{text}");
    assert!(text.contains("continue;"), "{text}");
}
