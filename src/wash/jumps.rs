//! Non-local exits: `return`, `throw`, `break` and `continue`

use super::attr::MethodResolver;
use super::flow::FlowState;
use super::{WashError, WashErrorKind, WashResult};
use crate::ast::{BreakableId, BreakableKind, EndLoopStmt, ReturnStmt, ThrowStmt, Type};
use crate::parser::Span;

impl MethodResolver<'_> {
    pub(super) fn resolve_return(&mut self, r: &mut ReturnStmt, span: Span, flow: FlowState) -> WashResult<FlowState> {
        match r.value.as_mut() {
            Some(_) if self.ctx.is_ctor => {
                return Err(WashError::new(span, WashErrorKind::ReturnValueInConstructor));
            }
            Some(_) if self.ctx.ret == Type::Void => {
                return Err(WashError::new(span, WashErrorKind::ReturnValueInVoid));
            }
            Some(value) => {
                self.resolve_expr(value)?;
                let ret = self.ctx.ret.clone();
                self.coerce(value, &ret)?;
            }
            None if !self.ctx.is_ctor && self.ctx.ret != Type::Void => {
                return Err(WashError::new(span, WashErrorKind::MissingReturnValue(self.ctx.ret.to_string())));
            }
            None => {}
        }
        if self.ctx.is_ctor {
            self.check_finals(span)?;
        }
        self.assign_all();
        Ok(flow.unreachable_next())
    }

    pub(super) fn resolve_throw(&mut self, t: &mut ThrowStmt, flow: FlowState) -> WashResult<FlowState> {
        self.resolve_expr(&mut t.value)?;
        let class = match &t.value.ty {
            Type::Class(name) if self.table.is_throwable(name) => name.clone(),
            other => return Err(WashError::new(t.value.span, WashErrorKind::NotThrowable(other.to_string()))),
        };
        self.check_thrown(&class, t.value.span)?;
        if !flow.dead_code {
            self.runtime.throw_used = true;
        }
        self.assign_all();
        Ok(flow.unreachable_next())
    }

    pub(super) fn resolve_end_loop(&mut self, e: &mut EndLoopStmt, span: Span, flow: FlowState) -> WashResult<FlowState> {
        let target = self.find_jump_target(e, span)?;
        e.target = Some(target);

        // jumps in dead code bind their target but leave no marks
        if !flow.dead_code {
            let (kind, inner) = {
                let b = self.body.breakable(target);
                (b.kind, b.inner_block)
            };
            let marks = &mut self.body.breakable_mut(target).marks;
            if e.wants_continue {
                marks.continued = true;
            } else {
                marks.end_block = true;
            }
            match kind {
                BreakableKind::Loop => {
                    if let Some(inner) = inner {
                        self.body.breakable_mut(inner).marks.shortcut = true;
                    }
                }
                _ => self.body.breakable_mut(target).marks.shortcut = true,
            }
            self.record_jump(target, e.wants_continue);
        }

        log::trace!(
            "{} at {} targets {} #{}",
            if e.wants_continue { "continue" } else { "break" },
            span.start,
            self.body.breakable(target).kind,
            target.0
        );
        self.assign_all();
        Ok(flow.unreachable_next())
    }

    fn find_jump_target(&self, e: &EndLoopStmt, span: Span) -> WashResult<BreakableId> {
        let found = match &e.label {
            None => self
                .body
                .outward(e.outer)
                .find(|id| self.body.breakable(*id).is_break_cont_dest(false, e.wants_continue))
                .ok_or_else(|| {
                    let kind = if e.wants_continue {
                        WashErrorKind::ContinueOutsideLoop
                    } else {
                        WashErrorKind::BreakOutsideSwitchOrLoop
                    };
                    WashError::new(span, kind)
                })?,
            Some(label) => self
                .body
                .outward(e.outer)
                .find(|id| self.body.breakable(*id).has_label(label))
                .ok_or_else(|| WashError::new(span, WashErrorKind::UndefinedLabel(label.clone())))?,
        };
        if !self.body.breakable(found).is_break_cont_dest(e.label.is_some(), e.wants_continue) {
            let label = e.label.clone().unwrap_or_default();
            return Err(WashError::new(span, WashErrorKind::ContinueTargetNotLoop(label)));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BreakableKind, StmtKind};
    use crate::common::{Config, Diagnostics};
    use crate::parser::parse_program;
    use crate::wash::resolve_program;

    fn errors(src: &str) -> String {
        let mut program = parse_program(src).expect("Failed to parse");
        let mut diags = Diagnostics::new();
        resolve_program(&mut program, &Config::default(), &mut diags);
        diags.render_errors()
    }

    #[test]
    fn test_break_and_continue_need_a_target() {
        assert!(errors("class A { void f() { break; } }").contains("break outside switch or loop"));
        assert!(errors("class A { void f(int k) { switch (k) { case 1: continue; } } }").contains("continue outside of loop"));
        assert!(errors("class A { void f() { while (true) { break nowhere; } } }").contains("undefined label 'nowhere'"));
    }

    #[test]
    fn test_labeled_block_accepts_break_only() {
        assert!(errors("class A { void f(boolean c) { done: { if (c) break done; } } }").is_empty());
        assert!(errors("class A { void f(boolean c) { done: { if (c) continue done; } } }")
            .contains("label 'done' does not name a loop"));
    }

    #[test]
    fn test_continue_marks_inner_block_shortcut() {
        let mut program = parse_program("class A { void f(boolean c) { while (c) { continue; } } }").unwrap();
        let mut diags = Diagnostics::new();
        resolve_program(&mut program, &Config::default(), &mut diags);
        let body = program.units[0].methods[0].body.as_ref().unwrap();
        let lp = body.breakables.iter().find(|b| b.kind == BreakableKind::Loop).unwrap();
        assert!(lp.marks.continued);
        assert!(!lp.marks.shortcut);
        let inner = lp.inner_block.unwrap();
        assert!(body.breakable(inner).marks.shortcut);
        let bound = body.stmts.iter().any(|s| matches!(&s.kind, StmtKind::EndLoop(e) if e.target.is_some()));
        assert!(bound);
    }

    #[test]
    fn test_checked_throw_must_be_handled() {
        let decl = "class Failure extends Exception { } ";
        assert!(errors(&format!("{}class A {{ void f() {{ throw new Failure(); }} }}", decl)).contains("unreported exception"));
        assert!(errors(&format!("{}class A {{ void f() throws Exception {{ throw new Failure(); }} }}", decl)).is_empty());
        assert!(errors(&format!(
            "{}class A {{ void f() {{ try {{ throw new Failure(); }} catch (Failure e) {{ }} }} }}",
            decl
        ))
        .is_empty());
        assert!(errors("class A { void f() { throw new RuntimeException(); } }").is_empty());
    }

    #[test]
    fn test_return_value_rules() {
        assert!(errors("class A { void f() { return 1; } }").contains("void result type"));
        assert!(errors("class A { A() { return 1; } }").contains("from a constructor"));
        assert!(errors("class A { int f() { return; } }").contains("missing return value"));
        assert!(errors("class A { final int x; A() { return; } }").contains("blank final field 'x'"));
    }
}
