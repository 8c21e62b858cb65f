use super::stmt::*;
use super::unit::{Method, Program, Unit};

/// Indented dump of units and their statement arenas
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, program: &Program) -> String {
        self.output.clear();
        for unit in &program.units {
            self.print_unit(unit);
        }
        std::mem::take(&mut self.output)
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn writeln(&mut self, s: &str) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn print_unit(&mut self, unit: &Unit) {
        let kind = if unit.is_interface { "interface" } else { "class" };
        let mut head = format!("{} {}", kind, unit.name);
        if let Some(sup) = &unit.superclass {
            head.push_str(&format!(" extends {}", sup));
        }
        if !unit.interfaces.is_empty() {
            let names: Vec<String> = unit.interfaces.iter().map(|i| i.to_string()).collect();
            head.push_str(&format!(" implements {}", names.join(", ")));
        }
        self.writeln(&head);
        self.indent();
        for field in &unit.fields {
            self.writeln(&format!("field {} {}", field.type_ref, field.name));
        }
        for method in &unit.methods {
            self.print_method(method);
        }
        self.dedent();
    }

    fn print_method(&mut self, method: &Method) {
        let params: Vec<String> = method.params.iter().map(|p| format!("{} {}", p.type_ref, p.name)).collect();
        let head = if method.is_ctor {
            format!("constructor {}({})", method.name, params.join(", "))
        } else {
            format!("method {} {}({})", method.ret, method.name, params.join(", "))
        };
        self.writeln(&head);
        if let Some(body) = &method.body {
            self.indent();
            self.print_stmt(body, body.root);
            self.dedent();
        }
    }

    fn print_chain(&mut self, body: &MethodBody, first: Option<StmtId>) {
        for id in body.chain(first) {
            self.print_stmt(body, id);
        }
    }

    fn labels(body: &MethodBody, brk: BreakableId) -> String {
        body.breakable(brk).labels.iter().map(|l| format!("{}: ", l)).collect()
    }

    fn print_stmt(&mut self, body: &MethodBody, id: StmtId) {
        let stmt = body.stmt(id);
        match &stmt.kind {
            StmtKind::Empty => self.writeln(";"),
            StmtKind::Expr(e) => self.writeln(&format!("{};", e)),
            StmtKind::VarDecl(d) => {
                for var in &d.vars {
                    let local = body.local(var.local);
                    match &var.init {
                        Some(init) => self.writeln(&format!("{} {} = {};", local.type_ref, local.name, init)),
                        None => self.writeln(&format!("{} {};", local.type_ref, local.name)),
                    }
                }
            }
            StmtKind::Block(b) => {
                self.writeln(&format!("{}{{", Self::labels(body, b.brk)));
                self.indent();
                self.print_chain(body, b.first);
                self.dedent();
                self.writeln("}");
            }
            StmtKind::If(s) => {
                self.writeln(&format!("if {}", s.cond));
                self.indent();
                self.print_stmt(body, s.then_branch);
                self.dedent();
                if let Some(e) = s.else_branch {
                    self.writeln("else");
                    self.indent();
                    self.print_stmt(body, e);
                    self.dedent();
                }
            }
            StmtKind::While(w) => {
                let labels = Self::labels(body, w.brk);
                if w.inclusive {
                    self.writeln(&format!("{}do", labels));
                } else {
                    self.writeln(&format!("{}while {}", labels, w.cond));
                }
                self.indent();
                self.print_stmt(body, w.body);
                self.dedent();
                if w.inclusive {
                    self.writeln(&format!("while {};", w.cond));
                }
            }
            StmtKind::Switch(s) => {
                self.writeln(&format!("{}switch {}", Self::labels(body, s.brk), s.selector));
                self.indent();
                for case in &s.cases {
                    match &case.value {
                        Some(v) => self.writeln(&format!("case {}:", v)),
                        None => self.writeln("default:"),
                    }
                    self.indent();
                    self.print_chain(body, case.first);
                    self.dedent();
                }
                self.dedent();
            }
            StmtKind::Try(t) => {
                self.writeln("try");
                self.indent();
                self.print_stmt(body, t.body);
                self.dedent();
                for c in &t.catches {
                    self.writeln(&format!("catch {} {}", c.class, body.local(c.local).name));
                    self.indent();
                    self.print_stmt(body, c.body);
                    self.dedent();
                }
            }
            StmtKind::Return(r) => match &r.value {
                Some(v) => self.writeln(&format!("return {};", v)),
                None => self.writeln("return;"),
            },
            StmtKind::Throw(t) => self.writeln(&format!("throw {};", t.value)),
            StmtKind::EndLoop(e) => {
                let word = if e.wants_continue { "continue" } else { "break" };
                match &e.label {
                    Some(label) => self.writeln(&format!("{} {};", word, label)),
                    None => self.writeln(&format!("{};", word)),
                }
            }
            StmtKind::MissingReturn => {}
            StmtKind::Assert(a) => match &a.message {
                Some(m) => self.writeln(&format!("assert {} : {};", a.cond, m)),
                None => self.writeln(&format!("assert {};", a.cond)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_prints_labels_and_nesting() {
        let program = parse_program("class A { void f(int n) { outer: while (n > 0) { n = n - 1; continue outer; } } }").unwrap();
        let text = AstPrinter::new().print(&program);
        assert!(text.contains("class A"));
        assert!(text.contains("outer: while (n > 0)"));
        assert!(text.contains("continue outer;"));
    }
}
