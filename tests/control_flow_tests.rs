mod common;

use common::{compile_err, compile_ok, method};
use jflowc::codegen::{CallTarget, Instr};

#[test]
fn test_unreachable_code_warned_once() {
    let source = r#"
class A {
    void g() { }
    void f() {
        return;
        g();
        g();
    }
}
"#;
    let out = compile_ok(source);
    let warnings: Vec<_> = out.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].span.start.line, 6);
    assert!(warnings[0].message.contains("unreachable"));
}

#[test]
fn test_dead_statements_are_not_generated() {
    let out = compile_ok("class A { void g() { } void f() { return; g(); } }");
    let f = method(&out, "A.f/0");
    let calls = f.count(|i| matches!(i, Instr::Call(CallTarget::Method(s)) if s == "A.g/0"));
    assert_eq!(calls, 0);
}

#[test]
fn test_break_ends_flow_inside_loop_body() {
    let out = compile_ok("class A { void g() { } void f(boolean c) { while (c) { break; g(); } g(); } }");
    assert_eq!(out.diagnostics.warning_count(), 1);
}

#[test]
fn test_code_after_loop_with_break_is_reachable() {
    let out = compile_ok("class A { int f(boolean c) { while (true) { if (c) break; } return 1; } }");
    assert_eq!(out.diagnostics.warning_count(), 0);
}

#[test]
fn test_infinite_loop_makes_following_code_unreachable() {
    let out = compile_ok("class A { void g() { } void f() { while (true) { g(); } g(); } }");
    assert_eq!(out.diagnostics.warning_count(), 1);
}

#[test]
fn test_missing_return_statement() {
    let message = compile_err("class A {\n  int f(boolean c) {\n    if (c) return 1;\n  }\n}");
    assert!(message.contains("missing return statement"), "{}", message);
}

#[test]
fn test_constant_condition_if_needs_no_return_after() {
    let out = compile_ok("class A { int f() { if (true) return 1; else return 2; } }");
    assert!(method(&out, "A.f/0").instrs.iter().any(|i| matches!(i, Instr::MoveToPrimary(_))));
}

#[test]
fn test_expression_statement_must_have_effect() {
    let message = compile_err("class A { void f(int a) { a + 1; } }");
    assert!(message.contains("not a statement"), "{}", message);
}

#[test]
fn test_errors_carry_source_position() {
    let message = compile_err("class A {\n  void f() {\n    break;\n  }\n}");
    assert!(message.contains("3:5: error: break outside switch or loop"), "{}", message);
}

#[test]
fn test_int_overflow_in_loop_condition_is_constant_true() {
    let out = compile_ok("class A { void g() { } void f() { while (2147483647 + 1 < 0) { g(); } g(); } }");
    assert_eq!(out.diagnostics.warning_count(), 1);
    let f = method(&out, "A.f/0");
    let calls = f.count(|i| matches!(i, Instr::Call(CallTarget::Method(s)) if s == "A.g/0"));
    assert_eq!(calls, 1);
}

#[test]
fn test_int_constant_overflow_wraps() {
    let out = compile_ok("class A { int f() { return 2147483647 + 1; } long g() { return 2147483647L + 1; } }");
    let consts = |symbol| -> Vec<i64> {
        method(&out, symbol)
            .instrs
            .iter()
            .filter_map(|i| match i {
                Instr::LoadConst { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    };
    assert_eq!(consts("A.f/0"), vec![-2147483648]);
    assert_eq!(consts("A.g/0"), vec![2147483648]);
}
