//! Wash phase - type table construction and method resolution
//!
//! `enter` builds the type table from all parsed units. Every method body is
//! then resolved once by a `MethodResolver`, which type-checks expressions,
//! threads the flow state through the statement chain, binds break and
//! continue targets and lays out the method frame. A unit with any error is
//! excluded from code generation.

use std::collections::HashSet;

use crate::ast::{Program, Type};
use crate::common::{Config, Diagnostics};
use crate::parser::Span;

mod assert;
pub mod attr;
pub mod enter;
mod expr;
pub mod flow;
mod jumps;
mod loops;
pub mod try_catch;
mod var_def;

pub use attr::{MethodCtx, MethodResolver, ParamInfo};
pub use enter::{ClassInfo, Compat, FieldInfo, MethodSig, TypeTable};
pub use flow::{DefState, FlowState, NO_FLOWCHANGE};
pub use try_catch::{TryFrame, TryStack};

pub type WashResult<T> = Result<T, WashError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WashErrorKind {
    // Type table
    #[error("duplicate class '{0}'")]
    DuplicateClass(String),
    #[error("cannot find class '{0}'")]
    UnknownClass(String),
    #[error("cyclic inheritance involving '{0}'")]
    CyclicInheritance(String),
    #[error("class '{class}' cannot extend interface '{interface}'")]
    ExtendsInterface { class: String, interface: String },
    #[error("'{0}' is not an interface")]
    NotAnInterface(String),
    #[error("duplicate field '{0}'")]
    DuplicateField(String),
    #[error("duplicate method '{name}' with {arity} parameter(s)")]
    DuplicateMethod { name: String, arity: usize },
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("cannot find type '{0}'")]
    UnknownType(String),
    #[error("'{0}' is not a throwable class")]
    NotThrowable(String),
    #[error("{0} are not supported")]
    Unsupported(&'static str),

    // Statements
    #[error("incompatible types: {found} cannot be converted to {expected}")]
    TypeMismatch { expected: String, found: String },
    #[error("condition must be boolean, found {0}")]
    ConditionNotBoolean(String),
    #[error("cannot return a value from a method with void result type")]
    ReturnValueInVoid,
    #[error("cannot return a value from a constructor")]
    ReturnValueInConstructor,
    #[error("missing return value, method returns {0}")]
    MissingReturnValue(String),
    #[error("missing return statement")]
    MissingReturn,
    #[error("null cannot be converted to {0}")]
    NullNotAllowed(String),
    #[error("blank final field '{0}' may not have been initialized")]
    BlankFinalNotWritten(String),
    #[error("unreported exception '{0}'; must be caught or declared to be thrown")]
    UnhandledException(String),
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("break outside switch or loop")]
    BreakOutsideSwitchOrLoop,
    #[error("continue outside of loop")]
    ContinueOutsideLoop,
    #[error("label '{0}' does not name a loop; cannot continue it")]
    ContinueTargetNotLoop(String),
    #[error("variable '{0}' is already defined in this method")]
    DuplicateVariable(String),
    #[error("variable '{0}' cannot have type void")]
    VoidVariable(String),
    #[error("assert message must be a String, found {0}")]
    AssertMessageNotString(String),
    #[error("not a statement")]
    NotAStatement,
    #[error("switch selector must be int, found {0}")]
    SwitchSelectorNotInt(String),
    #[error("case label must be an int constant")]
    CaseNotConstant,
    #[error("duplicate case label {0}")]
    DuplicateCaseLabel(i64),
    #[error("duplicate default label")]
    DuplicateDefault,
    #[error("catch parameter type '{0}' is not a throwable class")]
    CatchNotThrowable(String),

    // Expressions
    #[error("cannot find symbol '{0}'")]
    UnknownVariable(String),
    #[error("variable '{0}' might not have been initialized")]
    UninitializedVariable(String),
    #[error("cannot find method '{name}' with {arity} argument(s)")]
    UnknownMethod { name: String, arity: usize },
    #[error("{0} cannot be referenced from a static context")]
    StaticContext(String),
    #[error("cannot assign a value to final field '{0}'")]
    FinalFieldAssignment(String),
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("bad operand type {ty} for operator '{op}'")]
    OperatorMismatch { op: &'static str, ty: String },
    #[error("cannot instantiate '{0}'")]
    CannotInstantiate(String),
    #[error("'void' value used in expression")]
    VoidValue,
}

/// Positioned user error raised while resolving
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct WashError {
    pub span: Span,
    pub kind: WashErrorKind,
}

impl WashError {
    pub fn new(span: Span, kind: WashErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn type_mismatch(span: Span, expected: &Type, found: &Type) -> Self {
        Self::new(
            span,
            WashErrorKind::TypeMismatch { expected: expected.to_string(), found: found.to_string() },
        )
    }
}

/// Runtime support routines a program needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeUse {
    pub assert_used: bool,
    pub throw_used: bool,
}

impl RuntimeUse {
    pub fn merge(&mut self, other: RuntimeUse) {
        self.assert_used |= other.assert_used;
        self.throw_used |= other.throw_used;
    }
}

/// Outcome of resolving a whole program
#[derive(Debug)]
pub struct Resolution {
    pub table: TypeTable,
    pub runtime: RuntimeUse,
    /// Units with at least one error; they are not generated
    pub failed_units: HashSet<String>,
}

impl Resolution {
    pub fn unit_ok(&self, name: &str) -> bool {
        !self.failed_units.contains(name)
    }
}

/// Resolve every method body of the program
///
/// Errors are reported to `diags`; resolution of a method stops at its first
/// error while the other methods are still resolved.
pub fn resolve_program(program: &mut Program, config: &Config, diags: &mut Diagnostics) -> Resolution {
    let table = match TypeTable::build(program, config) {
        Ok(table) => table,
        Err(e) => {
            diags.error(e.span, e.to_string());
            return Resolution {
                table: TypeTable::builtin(config),
                runtime: RuntimeUse::default(),
                failed_units: program.units.iter().map(|u| u.name.clone()).collect(),
            };
        }
    };

    let mut runtime = RuntimeUse::default();
    let mut failed_units = HashSet::new();
    for unit in program.units.iter_mut() {
        let unit_name = unit.name.clone();
        let unit_assert = unit.has_annotation(crate::common::consts::CHECK_ASSERT_MARKER);
        let mut ok = true;
        for (index, method) in unit.methods.iter_mut().enumerate() {
            if method.body.is_none() {
                continue;
            }
            let Some(sig) = table.class(&unit_name).and_then(|c| c.methods.get(index)) else {
                continue;
            };
            let ctx = MethodCtx::new(&unit_name, sig, unit_assert || method.has_annotation(crate::common::consts::CHECK_ASSERT_MARKER));
            match attr::resolve_method(&table, config, diags, ctx, method) {
                Ok(used) => runtime.merge(used),
                Err(e) => {
                    log::debug!("{}.{}: {}", unit_name, method.name, e);
                    diags.error(e.span, e.to_string());
                    ok = false;
                }
            }
        }
        if !ok {
            failed_units.insert(unit_name);
        }
    }

    log::debug!(
        "resolved {} units, {} failed",
        program.units.len(),
        failed_units.len()
    );
    Resolution { table, runtime, failed_units }
}
