mod common;

use common::{body, compile_err, compile_ok, labeled, method, resolve};
use jflowc::ast::{BreakableId, BreakableKind, EndLoopStmt, MethodBody, StmtKind};

fn jumps(body: &MethodBody) -> Vec<&EndLoopStmt> {
    body.stmts
        .iter()
        .filter_map(|s| match &s.kind {
            StmtKind::EndLoop(e) => Some(e),
            _ => None,
        })
        .collect()
}

#[test]
fn test_continue_label_targets_outer_loop() {
    let source = r#"
class A {
    void f(boolean c, boolean d) {
        outer: while (c) {
            while (d) {
                continue outer;
            }
        }
    }
}
"#;
    let (program, _, diags) = resolve(source);
    assert!(!diags.has_errors(), "{}", diags.render_errors());
    let body = body(&program, "A", "f");
    let outer = labeled(body, "outer");
    assert_eq!(body.breakable(outer).kind, BreakableKind::Loop);

    let jumps = jumps(body);
    assert_eq!(jumps.len(), 1);
    assert_eq!(jumps[0].target, Some(outer));
    assert!(body.breakable(outer).marks.continued);
}

#[test]
fn test_unlabeled_continue_targets_innermost_loop() {
    let source = r#"
class A {
    void f(boolean c, boolean d) {
        outer: while (c) {
            while (d) {
                continue;
            }
        }
    }
}
"#;
    let (program, _, diags) = resolve(source);
    assert!(!diags.has_errors(), "{}", diags.render_errors());
    let body = body(&program, "A", "f");
    let outer = labeled(body, "outer");
    let inner = (0..body.breakables.len())
        .map(BreakableId)
        .find(|&id| id != outer && body.breakable(id).kind == BreakableKind::Loop)
        .expect("inner loop");

    let jumps = jumps(body);
    assert_eq!(jumps.len(), 1);
    assert_eq!(jumps[0].target, Some(inner));
    assert!(body.breakable(inner).marks.continued);
    assert!(!body.breakable(outer).marks.continued);
}

#[test]
fn test_break_label_marks_outer_loop_end() {
    let source = "class A { void f(boolean c) { outer: while (c) { while (true) { break outer; } } } }";
    let (program, _, diags) = resolve(source);
    assert!(!diags.has_errors());
    let body = body(&program, "A", "f");
    let outer = labeled(body, "outer");
    assert_eq!(jumps(body)[0].target, Some(outer));
    assert!(body.breakable(outer).marks.end_block);
}

#[test]
fn test_unlabeled_jumps_in_switch() {
    let source = r#"
class A {
    void f(boolean c, int k) {
        while (c) {
            switch (k) {
                case 1: break;
                case 2: continue;
            }
        }
    }
}
"#;
    let (program, _, diags) = resolve(source);
    assert!(!diags.has_errors(), "{}", diags.render_errors());
    let body = body(&program, "A", "f");
    let jumps = jumps(body);
    assert_eq!(jumps.len(), 2);
    let brk = jumps[0].target.map(|t| body.breakable(t).kind);
    let cont = jumps[1].target.map(|t| body.breakable(t).kind);
    assert_eq!(brk, Some(BreakableKind::Switch));
    assert_eq!(cont, Some(BreakableKind::Loop));
}

#[test]
fn test_continue_outer_emits_single_jump() {
    let source = "class A { void f(boolean c, boolean d) { outer: while (c) { while (d) { continue outer; } } } }";
    let out = compile_ok(source);
    let f = method(&out, "A.f/2");
    // two loop entry jumps and the continue
    assert_eq!(f.jumps(), 3);
    assert_eq!(f.cond_jumps(), 2);
}

#[test]
fn test_label_errors() {
    assert!(compile_err("class A { void f() { a: while (true) { break b; } } }").contains("undefined label 'b'"));
    let message = compile_err("class A { void f(int k) { s: switch (k) { case 1: continue s; } } }");
    assert!(message.contains("label 's' does not name a loop"), "{}", message);
}

#[test]
fn test_label_visible_only_inside_its_statement() {
    let message = compile_err("class A { void f(boolean c) { a: while (c) { } while (c) { break a; } } }");
    assert!(message.contains("undefined label 'a'"), "{}", message);
}
