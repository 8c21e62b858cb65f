mod common;

use common::{body, compile_err, compile_ok, method, resolve};
use jflowc::codegen::Instr;

#[test]
fn test_sibling_blocks_may_reuse_names() {
    let (program, _, diags) = resolve("class A { void f() { { int x = 1; } { int x = 2; } } }");
    assert!(!diags.has_errors(), "{}", diags.render_errors());
    let body = body(&program, "A", "f");
    let offsets: Vec<_> = body.locals.iter().map(|l| l.offset).collect();
    assert_eq!(offsets, vec![Some(-4), Some(-8)]);
    assert_eq!(body.frame_size, 8);
}

#[test]
fn test_local_is_visible_after_its_declaration_only() {
    let message = compile_err("class A { int f() { { int x = 1; } return x; } }");
    assert!(message.contains("cannot find symbol 'x'"), "{}", message);
}

#[test]
fn test_void_variables_are_rejected() {
    let message = compile_err("class A { void f() { void v; } }");
    assert!(message.contains("cannot have type void"), "{}", message);
}

#[test]
fn test_return_conversions() {
    let out = compile_ok("class A { long f(byte b) { return b; } }");
    let f = method(&out, "A.f/1");
    assert!(f.instrs.iter().any(|i| matches!(i, Instr::Extend { from: 1, to: 8, .. })));
    assert!(compile_err("class A { int f(long l) { return l; } }").contains("incompatible types"));
}

#[test]
fn test_interface_return_converts_object() {
    let source = "interface Shape { } class Box implements Shape { } class A { Shape f(Box b) { return b; } }";
    let out = compile_ok(source);
    let f = method(&out, "A.f/1");
    assert_eq!(f.count(|i| matches!(i, Instr::ToInterface { interface, .. } if interface == "Shape")), 1);
}

#[test]
fn test_empty_statements_are_harmless() {
    let out = compile_ok("class A { void f() { ; ; } }");
    assert_eq!(method(&out, "A.f/0").instrs.len(), 1);
}
