//! Expression resolution
//!
//! Binds names to locals, parameters and fields, types every node and
//! inserts `Convert` and `ToInterface` nodes where a value is widened.

use super::attr::MethodResolver;
use super::enter::Compat;
use super::{WashError, WashErrorKind, WashResult};
use crate::ast::*;
use crate::common::consts::STRING;
use crate::parser::Span;

fn promoted(a: &Type, b: &Type) -> Type {
    if *a == Type::Long || *b == Type::Long {
        Type::Long
    } else {
        Type::Int
    }
}

/// Replace `e` by a conversion node wrapping it
fn wrap(e: &mut Expr, ty: Type, make: impl FnOnce(Box<Expr>) -> ExprKind) {
    let span = e.span;
    let inner = std::mem::replace(e, Expr::new(ExprKind::This, span));
    *e = Expr { kind: make(Box::new(inner)), ty, span };
}

impl MethodResolver<'_> {
    pub(super) fn lookup_local(&self, name: &str) -> Option<LocalId> {
        self.scope.iter().rev().copied().find(|id| self.body.local(*id).name == name)
    }

    fn lookup_param(&self, name: &str) -> Option<usize> {
        self.ctx.params.iter().position(|p| p.name == name)
    }

    pub(super) fn resolve_expr(&mut self, e: &mut Expr) -> WashResult<()> {
        let span = e.span;
        let ty = match &mut e.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Bool(_) => Type::Boolean,
                Literal::Int(_) => Type::Int,
                Literal::Long(_) => Type::Long,
                Literal::Char(_) => Type::Char,
                Literal::Str(_) => Type::Class(STRING.to_string()),
                Literal::Null => Type::Null(NullKind::Unspecialized),
            },
            ExprKind::Name(name) => {
                let name = std::mem::take(name);
                let (kind, ty) = self.resolve_name(&name, span)?;
                e.kind = kind;
                ty
            }
            ExprKind::Local(id) => self.read_local(*id, span)?,
            ExprKind::Param(index) => self.ctx.params[*index].ty.clone(),
            ExprKind::Field { name, offset } => {
                let (at, ty) = self.field_access(name, span)?;
                *offset = Some(at);
                ty
            }
            ExprKind::This => {
                if self.ctx.is_static {
                    return Err(WashError::new(span, WashErrorKind::StaticContext("this".into())));
                }
                Type::Class(self.ctx.unit.clone())
            }
            ExprKind::Unary { op, operand } => {
                self.resolve_expr(operand)?;
                match op {
                    UnaryOp::Not if operand.ty.is_boolean() => Type::Boolean,
                    UnaryOp::Neg | UnaryOp::BitNot if operand.ty.is_integral() => {
                        let ty = promoted(&operand.ty, &Type::Int);
                        self.coerce(operand, &ty)?;
                        ty
                    }
                    _ => {
                        let op = match op {
                            UnaryOp::Not => "!",
                            UnaryOp::Neg => "-",
                            UnaryOp::BitNot => "~",
                        };
                        return Err(WashError::new(
                            span,
                            WashErrorKind::OperatorMismatch { op, ty: operand.ty.to_string() },
                        ));
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => self.resolve_binary(*op, lhs, rhs, span)?,
            ExprKind::Assign { target, value } => {
                let ty = self.resolve_lvalue(target)?;
                self.resolve_expr(value)?;
                self.coerce(value, &ty)?;
                self.mark_written(target);
                ty
            }
            ExprKind::Call { name, args, symbol, is_static } => {
                let table = self.table;
                let sig = table
                    .find_method(&self.ctx.unit, name, args.len())
                    .ok_or_else(|| WashError::new(span, WashErrorKind::UnknownMethod { name: name.clone(), arity: args.len() }))?;
                if self.ctx.is_static && !sig.is_static {
                    return Err(WashError::new(span, WashErrorKind::StaticContext(format!("method '{}'", name))));
                }
                for (arg, (_, param_ty)) in args.iter_mut().zip(&sig.params) {
                    self.resolve_expr(arg)?;
                    self.coerce(arg, param_ty)?;
                }
                for thrown in &sig.throws {
                    self.check_thrown(thrown, span)?;
                }
                *symbol = Some(sig.symbol.clone());
                *is_static = sig.is_static;
                sig.ret.clone()
            }
            ExprKind::New { class } => {
                let table = self.table;
                let info = table
                    .class(class)
                    .ok_or_else(|| WashError::new(span, WashErrorKind::UnknownClass(class.clone())))?;
                if info.is_interface || info.is_abstract {
                    return Err(WashError::new(span, WashErrorKind::CannotInstantiate(class.clone())));
                }
                match table.find_default_ctor(class) {
                    Ok(Some(ctor)) => {
                        for thrown in &ctor.throws {
                            self.check_thrown(thrown, span)?;
                        }
                    }
                    Ok(None) => {}
                    Err(()) => {
                        return Err(WashError::new(span, WashErrorKind::UnknownMethod { name: class.clone(), arity: 0 }))
                    }
                }
                Type::Class(class.clone())
            }
            // already resolved once; only the operand is checked again
            ExprKind::ToInterface { value, .. } | ExprKind::Convert { value } => {
                self.resolve_expr(value)?;
                e.ty.clone()
            }
        };
        e.ty = ty;
        Ok(())
    }

    fn resolve_name(&mut self, name: &str, span: Span) -> WashResult<(ExprKind, Type)> {
        if let Some(id) = self.lookup_local(name) {
            return Ok((ExprKind::Local(id), self.read_local(id, span)?));
        }
        if let Some(index) = self.lookup_param(name) {
            return Ok((ExprKind::Param(index), self.ctx.params[index].ty.clone()));
        }
        let (offset, ty) = self.field_access(name, span)?;
        Ok((ExprKind::Field { name: name.to_string(), offset: Some(offset) }, ty))
    }

    fn read_local(&self, id: LocalId, span: Span) -> WashResult<Type> {
        let local = self.body.local(id);
        if !local.written {
            return Err(WashError::new(span, WashErrorKind::UninitializedVariable(local.name.clone())));
        }
        Ok(local.ty.clone())
    }

    fn field_access(&self, name: &str, span: Span) -> WashResult<(u32, Type)> {
        let field = self
            .table
            .find_field(&self.ctx.unit, name)
            .ok_or_else(|| WashError::new(span, WashErrorKind::UnknownVariable(name.to_string())))?;
        if self.ctx.is_static {
            return Err(WashError::new(span, WashErrorKind::StaticContext(format!("field '{}'", name))));
        }
        Ok((field.offset, field.ty.clone()))
    }

    /// Resolve an assignment target without requiring it to be assigned
    fn resolve_lvalue(&mut self, target: &mut Expr) -> WashResult<Type> {
        let span = target.span;
        let name = match &target.kind {
            ExprKind::Name(n) => n.clone(),
            ExprKind::Field { name, .. } => {
                let name = name.clone();
                let (offset, ty) = self.field_access(&name, span)?;
                self.check_final_store(&name, span)?;
                target.kind = ExprKind::Field { name, offset: Some(offset) };
                target.ty = ty.clone();
                return Ok(ty);
            }
            ExprKind::Local(id) => {
                target.ty = self.body.local(*id).ty.clone();
                return Ok(target.ty.clone());
            }
            ExprKind::Param(index) => {
                target.ty = self.ctx.params[*index].ty.clone();
                return Ok(target.ty.clone());
            }
            _ => return Err(WashError::new(span, WashErrorKind::InvalidAssignmentTarget)),
        };

        let (kind, ty) = if let Some(id) = self.lookup_local(&name) {
            (ExprKind::Local(id), self.body.local(id).ty.clone())
        } else if let Some(index) = self.lookup_param(&name) {
            (ExprKind::Param(index), self.ctx.params[index].ty.clone())
        } else {
            let (offset, ty) = self.field_access(&name, span)?;
            self.check_final_store(&name, span)?;
            (ExprKind::Field { name, offset: Some(offset) }, ty)
        };
        target.kind = kind;
        target.ty = ty.clone();
        Ok(ty)
    }

    /// Final fields are only written by constructors of their own class
    fn check_final_store(&self, name: &str, span: Span) -> WashResult<()> {
        let own = self.finals.iter().any(|f| f.name == name);
        let is_final = self.table.find_field(&self.ctx.unit, name).map_or(false, |f| f.is_final);
        if is_final && !own {
            return Err(WashError::new(span, WashErrorKind::FinalFieldAssignment(name.to_string())));
        }
        Ok(())
    }

    fn mark_written(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Local(id) => self.body.local_mut(*id).written = true,
            ExprKind::Field { name, .. } => {
                if let Some(slot) = self.finals.iter_mut().find(|f| f.name == *name) {
                    slot.written = true;
                }
            }
            _ => {}
        }
    }

    fn resolve_binary(&mut self, op: BinaryOp, lhs: &mut Expr, rhs: &mut Expr, span: Span) -> WashResult<Type> {
        let mismatch = |ty: &Type| WashError::new(span, WashErrorKind::OperatorMismatch { op: op.symbol(), ty: ty.to_string() });

        if op.is_short_circuit() {
            self.resolve_expr(lhs)?;
            if !lhs.ty.is_boolean() {
                return Err(mismatch(&lhs.ty));
            }
            // the right operand may not run
            let before = self.def_state();
            self.resolve_expr(rhs)?;
            self.restore_def_state(&before);
            if !rhs.ty.is_boolean() {
                return Err(mismatch(&rhs.ty));
            }
            return Ok(Type::Boolean);
        }

        self.resolve_expr(lhs)?;
        self.resolve_expr(rhs)?;
        let (l, r) = (lhs.ty.clone(), rhs.ty.clone());

        if l.is_integral() && r.is_integral() {
            let ty = promoted(&l, &r);
            self.coerce(lhs, &ty)?;
            self.coerce(rhs, &ty)?;
            return Ok(if op.is_comparison() { Type::Boolean } else { ty });
        }

        match op {
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Eq | BinaryOp::Ne
                if l.is_boolean() && r.is_boolean() =>
            {
                Ok(Type::Boolean)
            }
            BinaryOp::Eq | BinaryOp::Ne if l.is_pointer() && r.is_pointer() => {
                match (l.is_null(), r.is_null()) {
                    (true, true) => {
                        lhs.ty = Type::Null(NullKind::Plain);
                        rhs.ty = Type::Null(NullKind::Plain);
                    }
                    (true, false) => self.coerce(lhs, &r)?,
                    (false, true) => self.coerce(rhs, &l)?,
                    (false, false) => {
                        let related = self.table.compare(&l, &r, None) != Compat::NotPossible
                            || self.table.compare(&r, &l, None) != Compat::NotPossible;
                        if !related || l.is_far() != r.is_far() {
                            return Err(WashError::type_mismatch(span, &l, &r));
                        }
                    }
                }
                Ok(Type::Boolean)
            }
            _ => Err(mismatch(if l.is_integral() { &r } else { &l })),
        }
    }

    /// Make `e` fit a slot of type `declared`, wrapping it where needed
    pub(super) fn coerce(&mut self, e: &mut Expr, declared: &Type) -> WashResult<()> {
        if e.ty == Type::Void {
            return Err(WashError::new(e.span, WashErrorKind::VoidValue));
        }
        if e.ty.is_null() {
            return match declared.null_kind_for() {
                Some(kind) => {
                    e.ty = Type::Null(kind);
                    Ok(())
                }
                None => Err(WashError::new(e.span, WashErrorKind::NullNotAllowed(declared.to_string()))),
            };
        }
        match self.table.compare(declared, &e.ty, e.const_value()) {
            Compat::Equal => Ok(()),
            Compat::SafeWiden | Compat::ConstNarrow if declared.is_integral() => {
                wrap(e, declared.clone(), |value| ExprKind::Convert { value });
                Ok(())
            }
            Compat::SafeWiden => Ok(()),
            Compat::ObjectToInterface => {
                let interface = declared.class_name().unwrap_or_default().to_string();
                wrap(e, declared.clone(), |value| ExprKind::ToInterface { value, interface });
                Ok(())
            }
            Compat::ConstNarrow | Compat::NotPossible => Err(WashError::type_mismatch(e.span, declared, &e.ty)),
        }
    }
}
