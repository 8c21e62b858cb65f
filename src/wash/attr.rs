//! Attribution of method bodies
//!
//! `MethodResolver` walks the statement arena of one method. Every statement
//! goes through `resolve_stmt`, which handles the unreachable-code warning
//! and then dispatches on the statement kind. The kind is moved out of the
//! arena while it is resolved so nested statements can be reached through
//! the same `&mut MethodBody`.
//!
//! Loops live in `loops`, non-local exits in `jumps`, declarations in
//! `var_def`, assertions in `assert` and expressions in `expr`.

use std::collections::{HashMap, HashSet};

use super::enter::{MethodSig, TypeTable};
use super::flow::{DefState, FlowState, NO_FLOWCHANGE};
use super::try_catch::{TryFrame, TryStack};
use super::{RuntimeUse, WashError, WashErrorKind, WashResult};
use crate::ast::*;
use crate::common::consts::EXC_FRAME_WORDS;
use crate::common::{Config, Diagnostics};
use crate::parser::Span;

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    pub offset: i32,
}

/// What the resolver needs to know about the enclosing method
#[derive(Debug, Clone)]
pub struct MethodCtx {
    pub unit: String,
    pub name: String,
    pub ret: Type,
    pub is_ctor: bool,
    pub is_static: bool,
    pub throws: Vec<String>,
    pub params: Vec<ParamInfo>,
    /// `@CheckAssert` on the method or its class
    pub check_assert: bool,
}

impl MethodCtx {
    pub fn new(unit: &str, sig: &MethodSig, check_assert: bool) -> Self {
        let params = sig
            .params
            .iter()
            .zip(&sig.param_offsets)
            .map(|((name, ty), offset)| ParamInfo { name: name.clone(), ty: ty.clone(), offset: *offset })
            .collect();
        Self {
            unit: unit.to_string(),
            name: sig.name.clone(),
            ret: sig.ret.clone(),
            is_ctor: sig.is_ctor,
            is_static: sig.is_static,
            throws: sig.throws.clone(),
            params,
            check_assert,
        }
    }
}

/// Blank final field of the class, tracked inside constructors
#[derive(Debug, Clone)]
pub(super) struct FinalSlot {
    pub name: String,
    pub written: bool,
}

pub struct MethodResolver<'a> {
    pub(super) table: &'a TypeTable,
    pub(super) config: &'a Config,
    pub(super) diags: &'a mut Diagnostics,
    pub(super) ctx: MethodCtx,
    pub(super) body: &'a mut MethodBody,
    /// Locals visible at the current point, in declaration order
    pub(super) scope: Vec<LocalId>,
    pub(super) finals: Vec<FinalSlot>,
    pub(super) tries: TryStack,
    pub(super) runtime: RuntimeUse,
    /// Assignment state at reachable breaks, per target
    pub(super) break_states: HashMap<BreakableId, DefState>,
    /// Assignment state at reachable continues, per target
    pub(super) cont_states: HashMap<BreakableId, DefState>,
}

/// Resolve one method body
pub fn resolve_method(
    table: &TypeTable,
    config: &Config,
    diags: &mut Diagnostics,
    ctx: MethodCtx,
    method: &mut Method,
) -> WashResult<RuntimeUse> {
    let Some(body) = method.body.as_mut() else {
        return Ok(RuntimeUse::default());
    };
    log::debug!("resolving {}.{}", ctx.unit, ctx.name);
    let mut resolver = MethodResolver::new(table, config, diags, ctx, body);
    resolver.resolve_body()?;
    Ok(resolver.runtime)
}

impl<'a> MethodResolver<'a> {
    pub fn new(
        table: &'a TypeTable,
        config: &'a Config,
        diags: &'a mut Diagnostics,
        ctx: MethodCtx,
        body: &'a mut MethodBody,
    ) -> Self {
        let finals = if ctx.is_ctor {
            table
                .class(&ctx.unit)
                .map(|c| {
                    c.fields
                        .iter()
                        .filter(|f| f.is_final)
                        .map(|f| FinalSlot { name: f.name.clone(), written: false })
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Self {
            table,
            config,
            diags,
            ctx,
            body,
            scope: Vec::new(),
            finals,
            tries: TryStack::new(),
            runtime: RuntimeUse::default(),
            break_states: HashMap::new(),
            cont_states: HashMap::new(),
        }
    }

    /// Resolve the root block with an empty flow state
    pub fn resolve_body(&mut self) -> WashResult<FlowState> {
        let root = self.body.root;
        self.resolve_stmt(root, NO_FLOWCHANGE)
    }

    pub fn scope(&self) -> &[LocalId] {
        &self.scope
    }

    pub fn runtime(&self) -> RuntimeUse {
        self.runtime
    }

    pub fn resolve_stmt(&mut self, id: StmtId, flow: FlowState) -> WashResult<FlowState> {
        let mut flow = flow;
        let span = self.body.stmt(id).span;
        if flow.next_is_unreachable {
            flow.next_is_unreachable = false;
            let sentinel = matches!(self.body.stmt(id).kind, StmtKind::MissingReturn);
            if !flow.dead_code && !sentinel {
                self.diags.warn(span, "unreachable code");
            }
            flow.dead_code = true;
        }
        self.body.stmt_mut(id).dead = flow.dead_code;

        let mut kind = std::mem::replace(&mut self.body.stmt_mut(id).kind, StmtKind::Empty);
        if self.config.debug {
            log::debug!("{}.{}: {} at {}", self.ctx.unit, self.ctx.name, kind.name(), span.start);
        }
        let result = self.resolve_kind(&mut kind, span, flow);
        self.body.stmt_mut(id).kind = kind;
        result
    }

    fn resolve_kind(&mut self, kind: &mut StmtKind, span: Span, flow: FlowState) -> WashResult<FlowState> {
        match kind {
            StmtKind::Empty => Ok(flow),
            StmtKind::Expr(e) => self.resolve_expr_stmt(e, flow),
            StmtKind::VarDecl(d) => self.resolve_var_decl(d, flow),
            StmtKind::Block(b) => self.resolve_block(b, flow),
            StmtKind::If(s) => self.resolve_if(s, flow),
            StmtKind::While(w) => self.resolve_while(w, flow),
            StmtKind::Switch(s) => self.resolve_switch(s, flow),
            StmtKind::Try(t) => self.resolve_try(t, flow),
            StmtKind::Return(r) => self.resolve_return(r, span, flow),
            StmtKind::Throw(t) => self.resolve_throw(t, flow),
            StmtKind::EndLoop(e) => self.resolve_end_loop(e, span, flow),
            StmtKind::MissingReturn => self.resolve_missing_return(span, flow),
            StmtKind::Assert(a) => self.resolve_assert(a, flow),
        }
    }

    pub(super) fn resolve_chain(&mut self, first: Option<StmtId>, flow: FlowState) -> WashResult<FlowState> {
        let mut flow = flow;
        let mut cur = first;
        while let Some(id) = cur {
            flow = self.resolve_stmt(id, flow)?;
            cur = self.body.stmt(id).next;
        }
        Ok(flow)
    }

    // Definite assignment bookkeeping

    pub(super) fn def_state(&self) -> DefState {
        DefState {
            locals: self.body.locals.iter().map(|l| l.written).collect(),
            finals: self.finals.iter().map(|f| f.written).collect(),
        }
    }

    pub(super) fn restore_def_state(&mut self, state: &DefState) {
        for (i, local) in self.body.locals.iter_mut().enumerate() {
            local.written = state.locals.get(i).copied().unwrap_or(false);
        }
        for (i, slot) in self.finals.iter_mut().enumerate() {
            slot.written = state.finals.get(i).copied().unwrap_or(false);
        }
    }

    /// Everything counts as assigned where control cannot arrive
    pub(super) fn assign_all(&mut self) {
        self.body.locals.iter_mut().for_each(|l| l.written = true);
        self.finals.iter_mut().for_each(|f| f.written = true);
    }

    /// Forget marks and jump states left by an earlier resolution
    pub(super) fn begin_breakable(&mut self, brk: BreakableId) {
        self.body.breakable_mut(brk).marks = JumpMarks::default();
        self.break_states.remove(&brk);
        self.cont_states.remove(&brk);
    }

    /// Assignment state after a breakable: the fall-through state met with
    /// the state at every break that targets it
    pub(super) fn finish_breakable(&mut self, brk: BreakableId, fallthrough: Option<DefState>) {
        let taken = self.break_states.remove(&brk);
        match DefState::meet_all(fallthrough.into_iter().chain(taken)) {
            Some(state) => self.restore_def_state(&state),
            None => self.assign_all(),
        }
    }

    pub(super) fn record_jump(&mut self, target: BreakableId, wants_continue: bool) {
        let state = self.def_state();
        let map = if wants_continue { &mut self.cont_states } else { &mut self.break_states };
        map.entry(target).and_modify(|s| s.meet(&state)).or_insert(state);
    }

    pub(super) fn check_finals(&self, span: Span) -> WashResult<()> {
        match self.finals.iter().find(|f| !f.written) {
            Some(slot) => Err(WashError::new(span, WashErrorKind::BlankFinalNotWritten(slot.name.clone()))),
            None => Ok(()),
        }
    }

    /// A checked exception is handled by an active catch or the throws list
    pub(super) fn is_handled(&self, class: &str) -> bool {
        self.tries.catcher(self.table, class).is_some()
            || self.ctx.throws.iter().any(|t| self.table.is_subclass(class, t))
    }

    pub(super) fn check_thrown(&self, class: &str, span: Span) -> WashResult<()> {
        if self.table.is_checked(class) && !self.is_handled(class) {
            return Err(WashError::new(span, WashErrorKind::UnhandledException(class.to_string())));
        }
        Ok(())
    }

    pub(super) fn resolve_condition(&mut self, cond: &mut Expr) -> WashResult<()> {
        self.resolve_expr(cond)?;
        if !cond.ty.is_boolean() {
            return Err(WashError::new(cond.span, WashErrorKind::ConditionNotBoolean(cond.ty.to_string())));
        }
        Ok(())
    }

    // Statement kinds without a module of their own

    fn resolve_expr_stmt(&mut self, e: &mut Expr, flow: FlowState) -> WashResult<FlowState> {
        if !e.is_statement_expr() {
            return Err(WashError::new(e.span, WashErrorKind::NotAStatement));
        }
        self.resolve_expr(e)?;
        Ok(flow)
    }

    fn resolve_missing_return(&mut self, span: Span, flow: FlowState) -> WashResult<FlowState> {
        if flow.is_unreachable() {
            return Ok(flow);
        }
        if self.ctx.is_ctor {
            self.check_finals(span)?;
        } else if self.ctx.ret != Type::Void {
            return Err(WashError::new(span, WashErrorKind::MissingReturn));
        }
        Ok(flow)
    }

    fn resolve_block(&mut self, b: &BlockStmt, flow: FlowState) -> WashResult<FlowState> {
        self.begin_breakable(b.brk);
        let depth = self.scope.len();
        let out = self.resolve_chain(b.first, flow)?;
        self.scope.truncate(depth);

        let fallthrough = (!out.is_unreachable()).then(|| self.def_state());
        self.finish_breakable(b.brk, fallthrough);
        if self.body.breakable(b.brk).marks.end_block {
            return Ok(FlowState::reachable_after(flow));
        }
        Ok(FlowState { inside_loop: flow.inside_loop, ..out })
    }

    fn resolve_if(&mut self, s: &mut IfStmt, flow: FlowState) -> WashResult<FlowState> {
        self.resolve_condition(&mut s.cond)?;
        let constant = s.cond.const_value().and_then(Const::as_bool);
        let pre = self.def_state();

        // a constant condition picks one branch; the other is resolved as
        // dead code and takes no part in the merge
        let then_skipped = constant == Some(false);
        let else_skipped = constant == Some(true);
        let then_in = if then_skipped { flow.dead() } else { flow };
        let else_in = if else_skipped { flow.dead() } else { flow };

        if then_skipped {
            self.assign_all();
        }
        let then_out = self.resolve_stmt(s.then_branch, then_in)?;
        let then_state = self.def_state();
        self.restore_def_state(&pre);
        if else_skipped {
            self.assign_all();
        }
        let else_out = match s.else_branch {
            Some(e) => self.resolve_stmt(e, else_in)?,
            None => else_in,
        };
        let else_state = self.def_state();

        let mut outs = Vec::with_capacity(2);
        let mut states = Vec::with_capacity(2);
        for (out, state, skipped) in [(then_out, then_state, then_skipped), (else_out, else_state, else_skipped)] {
            if skipped {
                continue;
            }
            if !out.is_unreachable() {
                states.push(state);
            }
            outs.push(out);
        }
        match DefState::meet_all(states) {
            Some(merged) => self.restore_def_state(&merged),
            None => self.assign_all(),
        }
        Ok(FlowState::join(flow, &outs))
    }

    fn resolve_switch(&mut self, s: &mut SwitchStmt, flow: FlowState) -> WashResult<FlowState> {
        self.resolve_expr(&mut s.selector)?;
        if !matches!(s.selector.ty, Type::Byte | Type::Short | Type::Char | Type::Int) {
            return Err(WashError::new(s.selector.span, WashErrorKind::SwitchSelectorNotInt(s.selector.ty.to_string())));
        }
        self.coerce(&mut s.selector, &Type::Int)?;

        let mut seen = HashSet::new();
        let mut has_default = false;
        for case in s.cases.iter_mut() {
            match &mut case.value {
                None if has_default => return Err(WashError::new(case.span, WashErrorKind::DuplicateDefault)),
                None => has_default = true,
                Some(v) => {
                    self.resolve_expr(v)?;
                    let value = v
                        .const_value()
                        .and_then(Const::as_int)
                        .filter(|_| v.ty.is_integral() && v.ty != Type::Long)
                        .ok_or_else(|| WashError::new(v.span, WashErrorKind::CaseNotConstant))?;
                    self.coerce(v, &Type::Int)?;
                    if !seen.insert(value) {
                        return Err(WashError::new(v.span, WashErrorKind::DuplicateCaseLabel(value)));
                    }
                }
            }
        }

        self.begin_breakable(s.brk);
        let pre = self.def_state();
        let depth = self.scope.len();
        // every case label is a fresh entry point
        let mut last = flow;
        for case in &s.cases {
            self.restore_def_state(&pre);
            last = self.resolve_chain(case.first, flow)?;
        }
        self.scope.truncate(depth);

        let falls = !last.is_unreachable();
        let mut exits = Vec::new();
        if falls {
            exits.push(self.def_state());
        }
        if !has_default {
            exits.push(pre);
        }
        self.finish_breakable(s.brk, DefState::meet_all(exits));

        if falls || !has_default || self.body.breakable(s.brk).marks.end_block {
            return Ok(FlowState::reachable_after(flow));
        }
        Ok(FlowState { inside_loop: flow.inside_loop, ..last })
    }

    fn resolve_try(&mut self, t: &mut TryStmt, flow: FlowState) -> WashResult<FlowState> {
        let mut catches = Vec::with_capacity(t.catches.len());
        for c in &t.catches {
            match self.table.resolve_type(&c.class)? {
                Type::Class(name) if self.table.is_throwable(&name) => catches.push(name),
                _ => {
                    return Err(WashError::new(c.class.span, WashErrorKind::CatchNotThrowable(c.class.name.clone())))
                }
            }
        }

        self.begin_breakable(t.brk);
        // unmatched exceptions are rethrown
        if !flow.dead_code {
            self.runtime.throw_used = true;
        }
        if self.body.breakable(t.brk).frame_offset.is_none() {
            self.body.frame_size += EXC_FRAME_WORDS * self.config.word_size;
            let offset = -(self.body.frame_size as i32);
            self.body.breakable_mut(t.brk).frame_offset = Some(offset);
        }

        let pre = self.def_state();
        self.tries.push(TryFrame { brk: t.brk, catches });
        let body_out = self.resolve_stmt(t.body, flow);
        self.tries.pop();
        let body_out = body_out?;

        let mut outs = vec![body_out];
        let mut states = Vec::new();
        if !body_out.is_unreachable() {
            states.push(self.def_state());
        }
        for c in &t.catches {
            self.restore_def_state(&pre);
            let depth = self.scope.len();
            self.bind_local(c.local)?;
            self.body.local_mut(c.local).written = true;
            self.scope.push(c.local);
            let out = self.resolve_stmt(c.body, FlowState::reachable_after(flow))?;
            self.scope.truncate(depth);
            if !out.is_unreachable() {
                states.push(self.def_state());
            }
            outs.push(out);
        }
        match DefState::meet_all(states) {
            Some(merged) => self.restore_def_state(&merged),
            None => self.assign_all(),
        }
        Ok(FlowState::join(flow, &outs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn resolve(src: &str) -> (Result<(), WashError>, Diagnostics) {
        let mut program = parse_program(src).expect("Failed to parse");
        let config = Config::default();
        let table = TypeTable::build(&program, &config).expect("type table");
        let mut diags = Diagnostics::new();
        let unit = &mut program.units[0];
        let name = unit.name.clone();
        let sig = table.class(&name).unwrap().methods[0].clone();
        let ctx = MethodCtx::new(&name, &sig, false);
        let result = resolve_method(&table, &config, &mut diags, ctx, &mut unit.methods[0]).map(|_| ());
        (result, diags)
    }

    #[test]
    fn test_if_without_else_keeps_following_code_reachable() {
        let (r, d) = resolve("class A { int f(boolean c) { if (c) return 1; return 2; } }");
        assert!(r.is_ok());
        assert_eq!(d.warning_count(), 0);
    }

    #[test]
    fn test_if_with_both_branches_returning_ends_flow() {
        let (r, d) = resolve("class A { int f(boolean c) { if (c) return 1; else return 2; } }");
        assert!(r.is_ok());
        assert_eq!(d.warning_count(), 0);
    }

    #[test]
    fn test_definite_assignment_through_both_branches() {
        let (r, _) = resolve("class A { int f(boolean c) { int x; if (c) x = 1; else x = 2; return x; } }");
        assert!(r.is_ok());
        let (r, _) = resolve("class A { int f(boolean c) { int x; if (c) x = 1; return x; } }");
        assert_eq!(r.unwrap_err().kind, WashErrorKind::UninitializedVariable("x".into()));
    }

    #[test]
    fn test_switch_without_default_may_fall_out() {
        let (r, _) = resolve(
            "class A { int f(int k) { switch (k) { case 1: return 1; case 2: return 2; } return 0; } }",
        );
        assert!(r.is_ok());
        let (r, _) = resolve("class A { void f(int k) { switch (k) { case 1: case 1: break; } } }");
        assert_eq!(r.unwrap_err().kind, WashErrorKind::DuplicateCaseLabel(1));
    }

    #[test]
    fn test_missing_return_is_reported_at_closing_brace() {
        let (r, _) = resolve("class A { int f(boolean c) { if (c) return 1; } }");
        let e = r.unwrap_err();
        assert_eq!(e.kind, WashErrorKind::MissingReturn);
        assert_eq!(e.span.start.line, 1);
    }
}
