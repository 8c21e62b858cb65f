//! Local variable declarations
//!
//! A declaration splices its variables into the visible variable list and
//! records where it put them. Resolving the same declaration again first
//! takes them back out, so the list ends up exactly as after one pass.

use super::attr::MethodResolver;
use super::flow::FlowState;
use super::{WashError, WashErrorKind, WashResult};
use crate::ast::{Declarator, LocalId, SpliceToken, Type, VarDeclStmt};

impl MethodResolver<'_> {
    pub(super) fn resolve_var_decl(&mut self, d: &mut VarDeclStmt, flow: FlowState) -> WashResult<FlowState> {
        let at = match d.splice.take() {
            Some(token) => self.undo_splice(token, &d.vars),
            None => self.scope.len(),
        };
        for (i, var) in d.vars.iter_mut().enumerate() {
            let ty = self.bind_local(var.local)?;
            if let Some(init) = var.init.as_mut() {
                self.resolve_expr(init)?;
                self.coerce(init, &ty)?;
                self.body.local_mut(var.local).written = true;
            }
            // later declarators already see the earlier ones
            self.scope.insert(at + i, var.local);
        }
        d.splice = Some(SpliceToken { at, count: d.vars.len() });
        Ok(flow)
    }

    /// Remove what an earlier pass spliced in; returns where to splice again
    fn undo_splice(&mut self, token: SpliceToken, vars: &[Declarator]) -> usize {
        let ids: Vec<LocalId> = vars.iter().map(|v| v.local).collect();
        let end = token.at + token.count;
        if end <= self.scope.len() && self.scope[token.at..end] == ids[..] {
            self.scope.drain(token.at..end);
            return token.at;
        }
        self.scope.retain(|id| !ids.contains(id));
        self.scope.len()
    }

    /// Type a local and give it a frame slot; it starts out unassigned
    pub(super) fn bind_local(&mut self, id: LocalId) -> WashResult<Type> {
        let (name, type_ref, span) = {
            let local = self.body.local(id);
            (local.name.clone(), local.type_ref.clone(), local.span)
        };
        let ty = self.table.resolve_type(&type_ref)?;
        if ty == Type::Void {
            return Err(WashError::new(span, WashErrorKind::VoidVariable(name)));
        }
        if self.lookup_local(&name).is_some() || self.ctx.params.iter().any(|p| p.name == name) {
            return Err(WashError::new(span, WashErrorKind::DuplicateVariable(name)));
        }

        if self.body.local(id).offset.is_none() {
            self.body.frame_size += self.config.align(ty.size(self.config.word_size));
            let offset = -(self.body.frame_size as i32);
            self.body.local_mut(id).offset = Some(offset);
            log::trace!("local '{}' at {}", name, offset);
        }
        let local = self.body.local_mut(id);
        local.ty = ty.clone();
        local.written = false;
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{StmtId, StmtKind};
    use crate::common::{Config, Diagnostics};
    use crate::parser::parse_program;
    use crate::wash::{MethodCtx, MethodResolver, TypeTable, NO_FLOWCHANGE};

    #[test]
    fn test_resolving_a_declaration_twice_leaves_one_copy() {
        let mut program = parse_program("class A { void f() { int a = 1; long b = 2, c; } }").unwrap();
        let config = Config::default();
        let table = TypeTable::build(&program, &config).unwrap();
        let sig = table.class("A").unwrap().methods[0].clone();
        let mut diags = Diagnostics::new();
        let body = program.units[0].methods[0].body.as_mut().unwrap();
        let decls: Vec<StmtId> = (0..body.stmts.len())
            .map(StmtId)
            .filter(|id| matches!(body.stmt(*id).kind, StmtKind::VarDecl(_)))
            .collect();
        assert_eq!(decls.len(), 2);

        let mut r = MethodResolver::new(&table, &config, &mut diags, MethodCtx::new("A", &sig, false), body);
        for id in &decls {
            r.resolve_stmt(*id, NO_FLOWCHANGE).unwrap();
        }
        let once = r.scope().to_vec();
        assert_eq!(once.len(), 3);

        for id in &decls {
            r.resolve_stmt(*id, NO_FLOWCHANGE).unwrap();
        }
        assert_eq!(r.scope(), &once[..]);
        drop(r);
        assert_eq!(body.frame_size, 20);
        assert_eq!(body.locals[1].offset, Some(-12));
    }

    #[test]
    fn test_names_may_not_shadow_locals_or_parameters() {
        let mut program = parse_program("class A { void f(int p) { int p = 1; } }").unwrap();
        let mut diags = Diagnostics::new();
        crate::wash::resolve_program(&mut program, &Config::default(), &mut diags);
        assert!(diags.render_errors().contains("variable 'p' is already defined"));

        let mut program = parse_program("class A { void f() { int x; { int x; } } }").unwrap();
        let mut diags = Diagnostics::new();
        crate::wash::resolve_program(&mut program, &Config::default(), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }
}
