mod common;

use common::{compile_err, compile_ok};

#[test]
fn test_while_keeps_the_state_before_the_loop() {
    let message = compile_err("class A { int f(boolean c) { int x; while (c) { x = 1; } return x; } }");
    assert!(message.contains("variable 'x' might not have been initialized"), "{}", message);
    compile_ok("class A { int f(boolean c) { int x = 0; while (c) { x = x + 1; } return x; } }");
}

#[test]
fn test_do_while_body_runs_once() {
    compile_ok("class A { int f(boolean c) { int x; do { x = 1; } while (c); return x; } }");
}

#[test]
fn test_break_carries_its_state_to_the_block_end() {
    let source = r#"
class A {
    int f(boolean c) {
        int x;
        done: {
            if (c) {
                x = 1;
                break done;
            }
            x = 2;
        }
        return x;
    }
}
"#;
    compile_ok(source);

    let missing = "class A { int f(boolean c) { int x; done: { if (c) { break done; } x = 2; } return x; } }";
    assert!(compile_err(missing).contains("might not have been initialized"));
}

#[test]
fn test_throwing_branch_does_not_weaken_the_merge() {
    let source = r#"
class A {
    int f(boolean c) {
        int x;
        if (c) {
            x = 1;
        } else {
            throw new RuntimeException();
        }
        return x;
    }
}
"#;
    compile_ok(source);
}

#[test]
fn test_switch_needs_default_for_definite_assignment() {
    compile_ok("class A { int f(int k) { int x; switch (k) { case 1: x = 1; break; default: x = 2; } return x; } }");
    let message = compile_err("class A { int f(int k) { int x; switch (k) { case 1: x = 1; break; case 2: x = 2; } return x; } }");
    assert!(message.contains("might not have been initialized"), "{}", message);
}

#[test]
fn test_blank_final_must_be_written_on_every_constructor_path() {
    compile_ok("class A { final int x; A() { x = 1; } }");
    let message = compile_err("class A { final int x; boolean c; A() { if (c) x = 1; } }");
    assert!(message.contains("blank final field 'x' may not have been initialized"), "{}", message);
    let message = compile_err("class A { final int x; boolean c; A() { if (c) return; x = 1; } }");
    assert!(message.contains("blank final field 'x'"), "{}", message);
}

#[test]
fn test_assignments_inside_assert_do_not_count() {
    let message = compile_err("class A { int f() { int x; assert (x = 1) > 0; return x; } }");
    assert!(message.contains("might not have been initialized"), "{}", message);
}
