//! Parser module
//!
//! This module handles lexical analysis and parsing of source files into
//! units with per-method statement arenas.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use error::ParseError;
pub use lexer::{Lexer, LexicalToken, Token};
pub use parser::Parser;
pub use span::{HasSpan, LineIndex, Location, Span};

use crate::ast::Program;
use crate::common::error::Result;

/// Parse a source file into a program
pub fn parse_program(source: &str) -> Result<Program> {
    parser::parse(source)
}

/// Parse several source files into one program
pub fn parse_programs(sources: &[&str]) -> Result<Program> {
    let mut program = Program::default();
    for source in sources {
        program.extend(parse_program(source)?);
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BreakableKind, StmtKind};

    #[test]
    fn test_parse_simple_class() {
        let source = r#"
public class Counter {
    int count;

    public int next() {
        count = count + 1;
        return count;
    }
}
"#;
        let program = parse_program(source).expect("Failed to parse");
        assert_eq!(program.units.len(), 1);
        let unit = &program.units[0];
        assert_eq!(unit.fields.len(), 1);
        assert_eq!(unit.methods[0].name, "next");
    }

    #[test]
    fn test_body_ends_with_missing_return_sentinel() {
        let program = parse_program("class A { void f() { return; } }").unwrap();
        let body = program.units[0].methods[0].body.as_ref().unwrap();
        let StmtKind::Block(root) = &body.stmt(body.root).kind else {
            panic!("root is not a block");
        };
        let chain = body.chain(root.first);
        assert_eq!(chain.len(), 2);
        assert!(matches!(body.stmt(chain[1]).kind, StmtKind::MissingReturn));
    }

    #[test]
    fn test_labels_attach_in_declaration_order() {
        let src = "class A { void f() { A: B: while (true) { break A; } } }";
        let program = parse_program(src).unwrap();
        let body = program.units[0].methods[0].body.as_ref().unwrap();
        let lp = body
            .breakables
            .iter()
            .find(|b| b.kind == BreakableKind::Loop)
            .unwrap();
        assert_eq!(lp.labels, vec!["A".to_string(), "B".to_string()]);
        assert!(lp.inner_block.is_some());
        assert_eq!(lp.outer, body.root_breakable());
    }

    #[test]
    fn test_labeled_try_is_wrapped_in_block() {
        let src = "class A { void f() { T: try { break T; } catch (Exception e) { } } }";
        let program = parse_program(src).unwrap();
        let body = program.units[0].methods[0].body.as_ref().unwrap();
        let labeled = body.breakables.iter().find(|b| b.has_label("T")).unwrap();
        assert_eq!(labeled.kind, BreakableKind::Block);
        let try_brk = body
            .breakables
            .iter()
            .find(|b| b.kind == BreakableKind::Try)
            .unwrap();
        assert!(try_brk.labels.is_empty());
    }

    #[test]
    fn test_unsupported_constructs_are_rejected() {
        assert!(parse_program("class A { int x = 1; }").is_err());
        assert!(parse_program("class A { void f() { for (;;) {} } }").is_err());
        let err = parse_program("class A { void f() { try { } catch (Exception e) { } finally { } } }")
            .unwrap_err();
        assert!(err.to_string().contains("finally"));
    }
}
