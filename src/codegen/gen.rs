//! Statement generation
//!
//! `MethodGen` walks a resolved method body and drives an `Architecture`.
//! Break and continue destinations are bound on the breakables while their
//! statement is generated and cleared right after. Statements resolution
//! marked dead are skipped.

use super::arch::{Architecture, CallTarget, FlowHint, Label, Reg, RuntimeRoutine};
use super::error::{CodeGenError, CodeGenResult};
use crate::ast::*;
use crate::common::Config;
use crate::wash::{MethodSig, TypeTable};

pub struct MethodGen<'a, A: Architecture> {
    pub(super) arch: &'a mut A,
    pub(super) config: &'a Config,
    pub(super) table: &'a TypeTable,
    stmts: &'a [Stmt],
    breakables: &'a mut [Breakable],
    pub(super) locals: &'a [LocalVar],
    /// Offset and size of each parameter
    pub(super) params: Vec<(i32, u32)>,
    root: StmtId,
    frame_size: u32,
}

impl<'a, A: Architecture> MethodGen<'a, A> {
    pub fn new(
        arch: &'a mut A,
        config: &'a Config,
        table: &'a TypeTable,
        sig: &MethodSig,
        body: &'a mut MethodBody,
    ) -> Self {
        let MethodBody { stmts, breakables, locals, root, frame_size } = body;
        let params = sig
            .params
            .iter()
            .zip(&sig.param_offsets)
            .map(|((_, ty), offset)| (*offset, ty.size(config.word_size)))
            .collect();
        Self {
            arch,
            config,
            table,
            stmts: stmts.as_slice(),
            breakables: breakables.as_mut_slice(),
            locals: locals.as_slice(),
            params,
            root: *root,
            frame_size: *frame_size,
        }
    }

    /// Generate the body followed by the shared epilogue
    pub fn gen_method(&mut self) -> CodeGenResult<()> {
        self.gen_stat(self.root)?;
        self.arch.gen_ret(self.frame_size);
        Ok(())
    }

    pub(super) fn word_size(&self) -> u32 {
        self.config.word_size
    }

    pub(super) fn local_slot(&self, id: LocalId) -> CodeGenResult<(i32, u32)> {
        let local = &self.locals[id.0];
        let offset = local
            .offset
            .ok_or_else(|| CodeGenError::unresolved(format!("local '{}'", local.name)))?;
        Ok((offset, local.ty.size(self.word_size())))
    }

    pub fn gen_stat(&mut self, id: StmtId) -> CodeGenResult<()> {
        let stmts = self.stmts;
        let stmt = &stmts[id.0];
        if stmt.dead {
            return Ok(());
        }
        if !matches!(stmt.kind, StmtKind::MissingReturn) {
            self.arch.gen_source_hint(stmt.span.start.line, stmt.span.start.column);
        }
        match &stmt.kind {
            StmtKind::Empty | StmtKind::MissingReturn => Ok(()),
            StmtKind::Expr(e) => self.with_reg(|g, r| g.gen_expr(e, r)),
            StmtKind::VarDecl(d) => self.gen_var_decl(d),
            StmtKind::Block(b) => self.gen_block(b),
            StmtKind::If(s) => self.gen_if(s),
            StmtKind::While(w) => self.gen_loop(w),
            StmtKind::Switch(s) => self.gen_switch(s),
            StmtKind::Try(t) => self.gen_try(t),
            StmtKind::Return(r) => self.gen_return(r),
            StmtKind::Throw(t) => self.with_reg(|g, r| {
                g.gen_expr(&t.value, r)?;
                g.gen_runtime_call(RuntimeRoutine::DoThrow, r)
            }),
            StmtKind::EndLoop(e) => self.gen_end_loop(e),
            StmtKind::Assert(a) => self.gen_assert(a),
        }
    }

    pub fn gen_stats(&mut self, first: Option<StmtId>) -> CodeGenResult<()> {
        let mut cur = first;
        while let Some(id) = cur {
            self.gen_stat(id)?;
            cur = self.stmts[id.0].next;
        }
        Ok(())
    }

    /// Run `f` with a scratch register released afterwards
    pub(super) fn with_reg<T>(&mut self, f: impl FnOnce(&mut Self, Reg) -> CodeGenResult<T>) -> CodeGenResult<T> {
        let point = self.arch.prepare_free_reg();
        let reg = self.arch.alloc_reg()?;
        let result = f(self, reg);
        self.arch.dealloc_restore_reg(point);
        result
    }

    /// Call a runtime routine with one argument
    fn gen_runtime_call(&mut self, routine: RuntimeRoutine, arg: Reg) -> CodeGenResult<()> {
        if !self.config.dynamic_memory {
            self.arch.gen_push(arg);
            self.arch.gen_call(CallTarget::Runtime(routine));
            return Ok(());
        }
        self.with_reg(|g, ctx| {
            g.arch.gen_load_runtime_ctx(ctx);
            g.arch.gen_push(ctx);
            g.arch.gen_push(arg);
            g.arch.gen_call(CallTarget::RuntimeIndirect { routine, ctx });
            Ok(())
        })
    }

    /// Unwind from `from` outward up to `stop_at`, exclusive
    fn gen_cleanup(&mut self, from: BreakableId, stop_at: Option<BreakableId>) -> CodeGenResult<()> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            if Some(id) == stop_at {
                break;
            }
            let b = &self.breakables[id.0];
            if b.kind == BreakableKind::Try && b.frame_active {
                let offset = b.frame_offset.ok_or_else(|| CodeGenError::unresolved("exception frame"))?;
                self.arch.gen_exc_frame_pop(offset);
            }
            cur = b.outer;
        }
        Ok(())
    }

    fn root_exit(&self) -> CodeGenResult<Label> {
        self.breakables
            .iter()
            .find(|b| b.outer.is_none())
            .and_then(|b| b.break_dest)
            .ok_or(CodeGenError::MissingDestination { stmt: "return", which: "exit" })
    }

    fn gen_var_decl(&mut self, d: &VarDeclStmt) -> CodeGenResult<()> {
        for var in &d.vars {
            let (offset, size) = self.local_slot(var.local)?;
            match &var.init {
                Some(init) => self.with_reg(|g, r| {
                    g.gen_expr(init, r)?;
                    g.arch.gen_store_local(offset, r, size);
                    Ok(())
                })?,
                // pointers declared in a loop start out null on every iteration
                None if d.force_reinit && self.locals[var.local.0].ty.is_pointer() => {
                    self.arch.gen_zero_local(offset, size)
                }
                None => {}
            }
        }
        Ok(())
    }

    fn gen_block(&mut self, b: &BlockStmt) -> CodeGenResult<()> {
        // only the method body and blocks left by a jump need an end label
        let needs_end = {
            let brk = &self.breakables[b.brk.0];
            brk.outer.is_none() || brk.marks.shortcut
        };
        let end = needs_end.then(|| self.arch.new_label());
        self.breakables[b.brk.0].break_dest = end;
        self.arch.gen_flow_hint(FlowHint::BlockStart);
        self.gen_stats(b.first)?;
        if let Some(end) = end {
            self.arch.place_label(end)?;
        }
        self.arch.gen_flow_hint(FlowHint::BlockEnd);
        self.breakables[b.brk.0].break_dest = None;
        Ok(())
    }

    fn gen_if(&mut self, s: &IfStmt) -> CodeGenResult<()> {
        match s.cond.const_value().and_then(Const::as_bool) {
            Some(true) => return self.gen_stat(s.then_branch),
            Some(false) => return s.else_branch.map_or(Ok(()), |e| self.gen_stat(e)),
            None => {}
        }
        let otherwise = self.arch.new_label();
        self.arch.gen_flow_hint(FlowHint::CondStart);
        self.gen_cond_jmp(&s.cond, false, otherwise)?;
        self.arch.gen_flow_hint(FlowHint::CondEnd);
        self.gen_stat(s.then_branch)?;
        match s.else_branch {
            Some(else_branch) => {
                let end = self.arch.new_label();
                self.arch.gen_jmp(end);
                self.arch.place_label(otherwise)?;
                self.gen_stat(else_branch)?;
                self.arch.place_label(end)?;
            }
            None => self.arch.place_label(otherwise)?,
        }
        Ok(())
    }

    fn gen_loop(&mut self, w: &WhileStmt) -> CodeGenResult<()> {
        let constant = w.cond.const_value().and_then(Const::as_bool);
        if !w.inclusive && constant == Some(false) {
            return Ok(());
        }

        let top = self.arch.new_label();
        let cont = self.arch.new_label();
        let brk = self.arch.new_label();
        let lp = &mut self.breakables[w.brk.0];
        lp.break_dest = Some(brk);
        lp.cont_dest = Some(cont);

        self.arch.gen_flow_hint(FlowHint::LoopStart);
        if !w.inclusive && constant != Some(true) {
            self.arch.gen_jmp(cont);
        }
        self.arch.place_label(top)?;
        self.gen_stat(w.body)?;
        self.arch.place_label(cont)?;
        self.arch.gen_flow_hint(FlowHint::CondStart);
        match constant {
            Some(true) => self.arch.gen_jmp(top),
            Some(false) => {}
            None => self.gen_cond_jmp(&w.cond, true, top)?,
        }
        self.arch.gen_flow_hint(FlowHint::CondEnd);
        self.arch.place_label(brk)?;
        self.arch.gen_flow_hint(FlowHint::LoopEnd);

        let lp = &mut self.breakables[w.brk.0];
        lp.break_dest = None;
        lp.cont_dest = None;
        Ok(())
    }

    fn gen_switch(&mut self, s: &SwitchStmt) -> CodeGenResult<()> {
        let end = self.arch.new_label();
        let entries: Vec<Label> = s.cases.iter().map(|_| self.arch.new_label()).collect();
        self.breakables[s.brk.0].break_dest = Some(end);

        self.with_reg(|g, sel| {
            g.gen_expr(&s.selector, sel)?;
            for (case, entry) in s.cases.iter().zip(&entries) {
                let Some(value) = case.value.as_ref().and_then(Expr::const_value) else {
                    continue;
                };
                g.with_reg(|g, t| {
                    g.arch.gen_load_const(t, value.bits());
                    g.arch.gen_binary(BinaryOp::Eq, t, sel);
                    g.arch.gen_cond_jmp(t, true, *entry);
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        let fallback = s
            .cases
            .iter()
            .zip(&entries)
            .find(|(c, _)| c.value.is_none())
            .map_or(end, |(_, l)| *l);
        self.arch.gen_jmp(fallback);

        for (case, entry) in s.cases.iter().zip(entries) {
            self.arch.place_label(entry)?;
            self.gen_stats(case.first)?;
        }
        self.arch.place_label(end)?;
        self.breakables[s.brk.0].break_dest = None;
        Ok(())
    }

    fn gen_try(&mut self, t: &TryStmt) -> CodeGenResult<()> {
        let offset = self.breakables[t.brk.0]
            .frame_offset
            .ok_or_else(|| CodeGenError::unresolved("exception frame"))?;
        let handler = self.arch.new_label();
        let end = self.arch.new_label();

        self.arch.gen_exc_frame_push(offset, handler);
        self.breakables[t.brk.0].frame_active = true;
        let body = self.gen_stat(t.body);
        self.breakables[t.brk.0].frame_active = false;
        body?;
        self.arch.gen_exc_frame_pop(offset);
        self.arch.gen_jmp(end);

        self.arch.place_label(handler)?;
        for c in &t.catches {
            let next = self.arch.new_label();
            let (slot, size) = self.local_slot(c.local)?;
            self.with_reg(|g, r| {
                g.arch.gen_load_exception(r, offset);
                g.arch.gen_class_test_jmp(r, &c.class.name, next);
                g.arch.gen_store_local(slot, r, size);
                Ok(())
            })?;
            self.gen_stat(c.body)?;
            self.arch.gen_jmp(end);
            self.arch.place_label(next)?;
        }
        // no clause matched
        self.with_reg(|g, r| {
            g.arch.gen_load_exception(r, offset);
            g.gen_runtime_call(RuntimeRoutine::DoThrow, r)
        })?;
        self.arch.place_label(end)
    }

    fn gen_return(&mut self, r: &ReturnStmt) -> CodeGenResult<()> {
        let exit = self.root_exit()?;
        match &r.value {
            Some(value) => self.with_reg(|g, reg| {
                g.gen_expr(value, reg)?;
                g.gen_cleanup(r.outer, None)?;
                g.arch.gen_move_to_primary(reg);
                Ok(())
            })?,
            None => self.gen_cleanup(r.outer, None)?,
        }
        self.arch.gen_jmp(exit);
        Ok(())
    }

    fn gen_end_loop(&mut self, e: &EndLoopStmt) -> CodeGenResult<()> {
        let (stmt, which) = if e.wants_continue { ("continue", "continue") } else { ("break", "break") };
        let target = e.target.ok_or_else(|| CodeGenError::unresolved(format!("{} target", stmt)))?;
        self.gen_cleanup(e.outer, Some(target))?;
        let b = &self.breakables[target.0];
        let dest = if e.wants_continue { b.cont_dest } else { b.break_dest };
        let dest = dest.ok_or(CodeGenError::MissingDestination { stmt, which })?;
        self.arch.gen_jmp(dest);
        Ok(())
    }

    fn gen_assert(&mut self, a: &AssertStmt) -> CodeGenResult<()> {
        if !a.encode || a.cond.is_const_true() {
            return Ok(());
        }
        let skip = self.arch.new_label();
        self.gen_cond_jmp(&a.cond, true, skip)?;
        self.with_reg(|g, r| {
            match &a.message {
                Some(message) => g.gen_expr(message, r)?,
                None => g.arch.gen_load_const(r, 0),
            }
            g.gen_runtime_call(RuntimeRoutine::AssertFailed, r)
        })?;
        self.arch.place_label(skip)
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::listing::{Instr, MethodCode};
    use crate::codegen::{generate_program, RuntimeRoutine};
    use crate::common::{Config, Diagnostics};
    use crate::parser::parse_program;
    use crate::wash::resolve_program;

    fn gen(src: &str, config: &Config) -> Vec<MethodCode> {
        let mut program = parse_program(src).expect("Failed to parse");
        let mut diags = Diagnostics::new();
        let res = resolve_program(&mut program, config, &mut diags);
        assert!(!diags.has_errors(), "{}", diags.render_errors());
        generate_program(&mut program, &res, config).expect("generation")
    }

    #[test]
    fn test_return_jumps_to_shared_exit_before_ret() {
        let code = gen("class A { int f() { return 7; } }", &Config::default());
        let f = &code[0];
        assert!(matches!(f.instrs.last(), Some(Instr::Ret { .. })));
        assert_eq!(f.count(|i| matches!(i, Instr::MoveToPrimary(_))), 1);
        assert_eq!(f.jumps(), 1);
    }

    #[test]
    fn test_block_end_label_only_when_left_early() {
        let plain = gen("class A { void g() { } void f() { { g(); } } }", &Config::default());
        let f = plain.iter().find(|m| m.name == "A.f/0").expect("A.f/0");
        assert_eq!(f.labels.len(), 1);

        let left = gen(
            "class A { void g() { } void f(boolean c) { done: { if (c) break done; g(); } } }",
            &Config::default(),
        );
        let f = left.iter().find(|m| m.name == "A.f/1").expect("A.f/1");
        // method exit, the labeled block end and the if's skip label
        assert_eq!(f.labels.len(), 3);
    }

    #[test]
    fn test_constant_false_while_emits_nothing() {
        let code = gen("class A { void f() { while (false) { f(); } } }", &Config::default());
        assert_eq!(code[0].instrs.len(), 1);
    }

    #[test]
    fn test_throw_goes_through_runtime_table_with_dynamic_memory() {
        let src = "class A { void f() { throw new RuntimeException(); } }";
        let code = gen(src, &Config::default());
        assert_eq!(code[0].calls_to(RuntimeRoutine::DoThrow), 1);
        assert_eq!(code[0].count(|i| matches!(i, Instr::LoadRuntimeCtx(_))), 0);

        let code = gen(src, &Config::default().with_dynamic_memory(true));
        assert_eq!(code[0].count(|i| matches!(i, Instr::LoadRuntimeCtx(_))), 1);
        assert_eq!(code[0].calls_to(RuntimeRoutine::DoThrow), 1);
    }

    #[test]
    fn test_break_out_of_try_pops_the_frame() {
        let src = "class A { void f(boolean c) { out: try { if (c) break out; } catch (RuntimeException e) { } } }";
        let code = gen(src, &Config::default());
        let pops = code[0].count(|i| matches!(i, Instr::ExcFramePop { .. }));
        assert_eq!(pops, 2);
        assert_eq!(code[0].count(|i| matches!(i, Instr::ExcFramePush { .. })), 1);
    }
}
