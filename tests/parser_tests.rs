mod common;

use common::body;
use jflowc::ast::{AstPrinter, BreakableKind, StmtKind};
use jflowc::parser::{parse_program, parse_programs};
use jflowc::Error;

#[test]
fn test_parse_units_and_members() {
    let source = r#"
interface Shape { int area(); }

public class Square implements Shape {
    final int side;

    public Square() {
        side = 2;
    }

    @CheckAssert
    public int area() {
        return side * side;
    }

    static native void halt();
}
"#;
    let program = parse_program(source).expect("Failed to parse");
    assert_eq!(program.units.len(), 2);
    assert!(program.units[0].is_interface);

    let square = program.unit("Square").unwrap();
    assert_eq!(square.interfaces.len(), 1);
    assert!(square.fields[0].modifiers.is_final);
    assert!(square.methods[0].is_ctor);
    assert!(square.methods[1].has_annotation("CheckAssert"));
    assert!(square.methods[2].body.is_none());
}

#[test]
fn test_loops_get_breakables_and_inner_blocks() {
    let program = parse_program("class A { void f(boolean c) { while (c) { } do { } while (c); } }").unwrap();
    let body = body(&program, "A", "f");
    let loops: Vec<_> = body.breakables.iter().filter(|b| b.kind == BreakableKind::Loop).collect();
    assert_eq!(loops.len(), 2);
    for lp in loops {
        let inner = lp.inner_block.expect("loop body block");
        assert_eq!(body.breakable(inner).outer.map(|o| body.breakable(o).kind), Some(BreakableKind::Loop));
    }
    let inclusive = body
        .stmts
        .iter()
        .filter(|s| matches!(&s.kind, StmtKind::While(w) if w.inclusive))
        .count();
    assert_eq!(inclusive, 1);
}

#[test]
fn test_multiple_declarators_share_one_statement() {
    let program = parse_program("class A { void f() { int a, b = 2, c; } }").unwrap();
    let body = body(&program, "A", "f");
    let decl = body
        .stmts
        .iter()
        .find_map(|s| match &s.kind {
            StmtKind::VarDecl(d) => Some(d),
            _ => None,
        })
        .unwrap();
    assert_eq!(decl.vars.len(), 3);
    assert!(decl.vars[1].init.is_some());
    assert_eq!(body.locals.len(), 3);
}

#[test]
fn test_parse_errors_have_positions() {
    let err = parse_program("class A {\n  void f() {\n    return\n  }\n}").unwrap_err();
    match err {
        Error::Parse { line, .. } => assert_eq!(line, 4),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_several_sources_form_one_program() {
    let program = parse_programs(&["class A { }", "class B extends A { }"]).unwrap();
    assert_eq!(program.units.len(), 2);
    assert!(program.unit("B").unwrap().superclass.is_some());
}

#[test]
fn test_printer_shows_structure() {
    let program = parse_program("class A { int f(int k) { switch (k) { case 1: return 1; default: break; } return 0; } }").unwrap();
    let text = AstPrinter::new().print(&program);
    assert!(text.contains("method int f(int k)"));
    assert!(text.contains("case 1:"));
    assert!(text.contains("default:"));
    assert!(text.contains("return 0;"));
}
