mod common;

use common::{compile_err, compile_ok, method};
use jflowc::codegen::Instr;

#[test]
fn test_switch_dispatch_compares_each_case() {
    let source = r#"
class A {
    int f(int k) {
        switch (k) {
            case 1:
                return 10;
            case 2:
            case 3:
                return 20;
            default:
                return 0;
        }
    }
}
"#;
    let out = compile_ok(source);
    assert_eq!(out.diagnostics.warning_count(), 0);
    let f = method(&out, "A.f/1");
    assert_eq!(f.cond_jumps(), 3);
    assert_eq!(f.count(|i| matches!(i, Instr::MoveToPrimary(_))), 3);
}

#[test]
fn test_switch_without_default_falls_out() {
    let out = compile_ok("class A { int f(int k) { switch (k) { case 1: return 1; } return 0; } }");
    assert_eq!(out.diagnostics.warning_count(), 0);
}

#[test]
fn test_switch_with_all_paths_returning_ends_flow() {
    let out = compile_ok("class A { void g() { } int f(int k) { switch (k) { case 1: return 1; default: return 2; } g(); } }");
    assert_eq!(out.diagnostics.warning_count(), 1);
}

#[test]
fn test_break_leaves_the_switch() {
    let out = compile_ok("class A { int f(int k) { switch (k) { case 1: break; default: return 2; } return 1; } }");
    assert_eq!(out.diagnostics.warning_count(), 0);
}

#[test]
fn test_case_label_errors() {
    assert!(compile_err("class A { void f(int k, int j) { switch (k) { case j: break; } } }").contains("case label must be an int constant"));
    assert!(compile_err("class A { void f(int k) { switch (k) { case 2: case 2: break; } } }").contains("duplicate case label 2"));
    assert!(compile_err("class A { void f(int k) { switch (k) { default: default: break; } } }").contains("duplicate default label"));
    assert!(compile_err("class A { void f(boolean b) { switch (b) { case 1: break; } } }").contains("switch selector must be int"));
}

#[test]
fn test_char_selector_is_accepted() {
    compile_ok("class A { int f(char c) { switch (c) { case 'a': return 1; } return 0; } }");
}
