//! Expression generation
//!
//! Values are computed into a caller-provided register. Conditions jump
//! directly; `&&`, `||` and `!` are split into jumps instead of being
//! materialized.

use super::arch::{Architecture, CallTarget, Label, Reg};
use super::error::{CodeGenError, CodeGenResult};
use super::gen::MethodGen;
use crate::ast::*;

impl<A: Architecture> MethodGen<'_, A> {
    pub(super) fn gen_expr(&mut self, e: &Expr, dst: Reg) -> CodeGenResult<()> {
        if let Some(value) = e.const_value() {
            self.arch.gen_load_const(dst, value.bits());
            return Ok(());
        }
        let word = self.word_size();
        match &e.kind {
            ExprKind::Literal(Literal::Str(text)) => self.arch.gen_load_string(dst, text),
            ExprKind::Literal(lit) => return Err(CodeGenError::unexpected(format!("literal {:?}", lit))),
            ExprKind::Name(name) => return Err(CodeGenError::unresolved(format!("name '{}'", name))),
            ExprKind::Local(id) => {
                let (offset, size) = self.local_slot(*id)?;
                self.arch.gen_load_local(dst, offset, size);
            }
            ExprKind::Param(index) => {
                let (offset, size) = self.param_slot(*index)?;
                self.arch.gen_load_local(dst, offset, size);
            }
            ExprKind::Field { name, offset } => {
                let offset = offset.ok_or_else(|| CodeGenError::unresolved(format!("field '{}'", name)))?;
                let size = e.ty.size(word);
                self.with_reg(|g, this| {
                    g.arch.gen_load_this(this);
                    g.arch.gen_load_field(dst, this, offset, size);
                    Ok(())
                })?;
            }
            ExprKind::This => self.arch.gen_load_this(dst),
            ExprKind::Unary { op, operand } => {
                self.gen_expr(operand, dst)?;
                self.arch.gen_unary(*op, dst);
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                let done = self.arch.new_label();
                let stop_when = *op == BinaryOp::OrOr;
                self.gen_expr(lhs, dst)?;
                self.arch.gen_cond_jmp(dst, stop_when, done);
                self.gen_expr(rhs, dst)?;
                self.arch.place_label(done)?;
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.gen_expr(lhs, dst)?;
                self.with_reg(|g, t| {
                    g.gen_expr(rhs, t)?;
                    g.arch.gen_binary(*op, dst, t);
                    Ok(())
                })?;
            }
            ExprKind::Assign { target, value } => {
                self.gen_expr(value, dst)?;
                self.gen_store(target, dst)?;
            }
            ExprKind::Call { name, args, symbol, is_static } => {
                let symbol = symbol
                    .clone()
                    .ok_or_else(|| CodeGenError::unresolved(format!("call of '{}'", name)))?;
                if !*is_static {
                    self.with_reg(|g, this| {
                        g.arch.gen_load_this(this);
                        g.arch.gen_push(this);
                        Ok(())
                    })?;
                }
                for arg in args {
                    self.with_reg(|g, r| {
                        g.gen_expr(arg, r)?;
                        g.arch.gen_push(r);
                        Ok(())
                    })?;
                }
                self.arch.gen_call(CallTarget::Method(symbol));
                if e.ty != Type::Void {
                    self.arch.gen_move_from_primary(dst);
                }
            }
            ExprKind::New { class } => {
                self.arch.gen_new(dst, class);
                if let Ok(Some(ctor)) = self.table.find_default_ctor(class) {
                    self.arch.gen_push(dst);
                    self.arch.gen_call(CallTarget::Method(ctor.symbol.clone()));
                }
            }
            ExprKind::ToInterface { value, interface } => {
                self.gen_expr(value, dst)?;
                let class = value.ty.class_name().unwrap_or_default();
                self.arch.gen_to_interface(dst, class, interface);
            }
            ExprKind::Convert { value } => {
                self.gen_expr(value, dst)?;
                self.arch.gen_extend(dst, value.ty.size(word), e.ty.size(word));
            }
        }
        Ok(())
    }

    fn param_slot(&self, index: usize) -> CodeGenResult<(i32, u32)> {
        self.params
            .get(index)
            .copied()
            .ok_or_else(|| CodeGenError::unexpected(format!("parameter #{}", index)))
    }

    fn gen_store(&mut self, target: &Expr, src: Reg) -> CodeGenResult<()> {
        match &target.kind {
            ExprKind::Local(id) => {
                let (offset, size) = self.local_slot(*id)?;
                self.arch.gen_store_local(offset, src, size);
            }
            ExprKind::Param(index) => {
                let (offset, size) = self.param_slot(*index)?;
                self.arch.gen_store_local(offset, src, size);
            }
            ExprKind::Field { name, offset } => {
                let offset = offset.ok_or_else(|| CodeGenError::unresolved(format!("field '{}'", name)))?;
                let size = target.ty.size(self.word_size());
                self.with_reg(|g, this| {
                    g.arch.gen_load_this(this);
                    g.arch.gen_store_field(this, offset, src, size);
                    Ok(())
                })?;
            }
            _ => return Err(CodeGenError::unexpected(format!("assignment to {}", target))),
        }
        Ok(())
    }

    /// Jump to `target` when `cond` evaluates to `when`
    pub(super) fn gen_cond_jmp(&mut self, cond: &Expr, when: bool, target: Label) -> CodeGenResult<()> {
        if let Some(value) = cond.const_value().and_then(Const::as_bool) {
            if value == when {
                self.arch.gen_jmp(target);
            }
            return Ok(());
        }
        match &cond.kind {
            ExprKind::Unary { op: UnaryOp::Not, operand } => self.gen_cond_jmp(operand, !when, target),
            ExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                // `a && b` is false as soon as `a` is; `a || b` true as soon as `a` is
                let decided_by_lhs = *op == BinaryOp::OrOr;
                if when == decided_by_lhs {
                    self.gen_cond_jmp(lhs, when, target)?;
                    self.gen_cond_jmp(rhs, when, target)
                } else {
                    let skip = self.arch.new_label();
                    self.gen_cond_jmp(lhs, decided_by_lhs, skip)?;
                    self.gen_cond_jmp(rhs, when, target)?;
                    self.arch.place_label(skip)
                }
            }
            _ => self.with_reg(|g, r| {
                g.gen_expr(cond, r)?;
                g.arch.gen_cond_jmp(r, when, target);
                Ok(())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::generate_program;
    use crate::codegen::listing::Instr;
    use crate::common::{Config, Diagnostics};
    use crate::parser::parse_program;
    use crate::wash::resolve_program;

    fn instrs(src: &str) -> Vec<Instr> {
        let mut program = parse_program(src).expect("Failed to parse");
        let mut diags = Diagnostics::new();
        let config = Config::default();
        let res = resolve_program(&mut program, &config, &mut diags);
        assert!(!diags.has_errors(), "{}", diags.render_errors());
        generate_program(&mut program, &res, &config).unwrap().pop().unwrap().instrs
    }

    #[test]
    fn test_short_circuit_conditions_become_jumps() {
        let code = instrs("class A { void g() { } void f(boolean a, boolean b) { if (a && b) g(); } }");
        let cond = code.iter().filter(|i| i.is_cond_jump()).count();
        assert_eq!(cond, 2);
        assert!(!code.iter().any(|i| matches!(i, Instr::Binary { .. })));
    }

    #[test]
    fn test_widening_extends_the_register() {
        let code = instrs("class A { long f(int a) { return a; } }");
        assert!(code.iter().any(|i| matches!(i, Instr::Extend { from: 4, to: 8, .. })));
    }

    #[test]
    fn test_instance_call_pushes_receiver_then_arguments() {
        let code = instrs("class A { int g(int x) { return x; } int f() { return g(3); } }");
        let pushes = code.iter().filter(|i| matches!(i, Instr::Push(_))).count();
        assert_eq!(pushes, 2);
        assert!(code.iter().any(|i| matches!(i, Instr::MoveFromPrimary(_))));
    }
}
