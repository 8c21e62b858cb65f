mod common;

use common::{compile_ok, compile_with, method};
use jflowc::codegen::{FlowHint, Instr, RuntimeRoutine};
use jflowc::Config;

#[test]
fn test_counting_loop_end_to_end() {
    let source = r#"
class Counter {
    int f() {
        int i = 0;
        while (i < 3) {
            i = i + 1;
        }
        return i;
    }
}
"#;
    let out = compile_ok(source);
    let f = method(&out, "Counter.f/0");
    // entry jump to the condition and the return jump to the exit
    assert_eq!(f.jumps(), 2);
    assert_eq!(f.cond_jumps(), 1);
    assert_eq!(f.count(|i| matches!(i, Instr::MoveToPrimary(_))), 1);
    assert!(matches!(f.instrs.last(), Some(Instr::Ret { frame_size: 4 })));
    assert_eq!(f.hint_count(FlowHint::LoopStart), 1);
    assert_eq!(f.hint_count(FlowHint::LoopEnd), 1);
}

#[test]
fn test_do_while_has_no_entry_jump() {
    let out = compile_ok("class A { void f(boolean c) { do { } while (c); } }");
    let f = method(&out, "A.f/1");
    assert_eq!(f.jumps(), 0);
    assert_eq!(f.cond_jumps(), 1);
}

#[test]
fn test_infinite_loop_jumps_back_unconditionally() {
    let out = compile_ok("class A { void g() { } void f() { while (true) { g(); } } }");
    let f = method(&out, "A.f/0");
    assert_eq!(f.jumps(), 1);
    assert_eq!(f.cond_jumps(), 0);
}

#[test]
fn test_disabled_constant_false_assert_emits_nothing() {
    let config = Config::default().with_assertions(false);
    let out = compile_with("class A { void g() { } void f() { assert false; g(); } }", &config);
    let f = method(&out, "A.f/0");
    assert_eq!(f.instrs.len(), 1);
    assert_eq!(out.diagnostics.warning_count(), 1);
    assert!(!out.runtime.assert_used);
}

#[test]
fn test_enabled_assert_calls_runtime() {
    let config = Config::default().with_assertions(true);
    let out = compile_with("class A { void f(int x) { assert x > 0 : \"x must be positive\"; } }", &config);
    let f = method(&out, "A.f/1");
    assert_eq!(f.calls_to(RuntimeRoutine::AssertFailed), 1);
    assert_eq!(f.cond_jumps(), 1);
    assert!(f.instrs.iter().any(|i| matches!(i, Instr::LoadString { text, .. } if text == "x must be positive")));
    assert!(out.runtime.assert_used);

    let out = compile_with("class A { void f(int x) { assert x > 0; } }", &Config::default().with_assertions(false));
    assert_eq!(method(&out, "A.f/1").calls_to(RuntimeRoutine::AssertFailed), 0);
}

#[test]
fn test_word_size_changes_frame_layout() {
    let source = "class A { void f() { long a = 1; A b = null; } }";
    let narrow = compile_with(source, &Config::default().with_word_size(4));
    let wide = compile_with(source, &Config::default().with_word_size(8));
    assert!(matches!(method(&narrow, "A.f/0").instrs.last(), Some(Instr::Ret { frame_size: 12 })));
    assert!(matches!(method(&wide, "A.f/0").instrs.last(), Some(Instr::Ret { frame_size: 16 })));
}

#[test]
fn test_pointer_declared_in_loop_is_cleared_each_iteration() {
    let out = compile_ok("class A { void f(boolean c) { while (c) { A a; a = null; } } }");
    let f = method(&out, "A.f/1");
    assert_eq!(f.count(|i| matches!(i, Instr::ZeroLocal { .. })), 1);
}

#[test]
fn test_line_table_and_listing() {
    let out = compile_ok("class A {\n  int f() {\n    return 1;\n  }\n}");
    let f = method(&out, "A.f/0");
    assert!(f.lines.iter().any(|e| e.line == 3));
    let text = f.to_string();
    assert!(text.starts_with("A.f/0:"));
    assert!(text.contains("; line 3:5"));
}

#[test]
fn test_constructor_and_new() {
    let out = compile_ok("class P { int x; P() { x = 1; } } class A { P f() { return new P(); } }");
    let f = method(&out, "A.f/0");
    assert_eq!(f.count(|i| matches!(i, Instr::New { class, .. } if class == "P")), 1);
    assert!(f.instrs.iter().any(|i| matches!(i, Instr::Call(jflowc::codegen::CallTarget::Method(s)) if s == "P.<init>/0")));
    assert!(out.method("P.<init>/0").is_some());
}
