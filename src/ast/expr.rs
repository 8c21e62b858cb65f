use std::fmt;

use super::stmt::LocalId;
use super::types::Type;
use crate::parser::{HasSpan, Span};

/// Literal values as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Long(i64),
    Char(u16),
    Str(String),
    Null,
}

/// Compile-time constant value of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Const {
    Bool(bool),
    Int(i64),
    Null,
}

impl Const {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Const::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Const::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Value as loaded into a register
    pub fn bits(self) -> i64 {
        match self {
            Const::Bool(b) => b as i64,
            Const::Int(v) => v,
            Const::Null => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::AndAnd | BinaryOp::OrOr)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAnd => "&&",
            BinaryOp::OrOr => "||",
        }
    }
}

/// Expression node; `ty` is filled in by resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Simple name before resolution decides local, parameter or field
    Name(String),
    Local(LocalId),
    Param(usize),
    /// Instance field of `this`; `offset` is bound by resolution
    Field { name: String, offset: Option<u32> },
    This,
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// Call of a method of the enclosing class; `symbol` is bound by resolution
    Call { name: String, args: Vec<Expr>, symbol: Option<String>, is_static: bool },
    New { class: String },
    /// Class reference widened to an interface reference
    ToInterface { value: Box<Expr>, interface: String },
    /// Integral widening to `ty`
    Convert { value: Box<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, ty: Type::Unresolved, span }
    }

    pub fn literal(lit: Literal, span: Span) -> Self {
        Self::new(ExprKind::Literal(lit), span)
    }

    /// Constant value, folded through operators on constants
    pub fn const_value(&self) -> Option<Const> {
        match &self.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Bool(b) => Some(Const::Bool(*b)),
                Literal::Int(v) | Literal::Long(v) => Some(Const::Int(*v)),
                Literal::Char(c) => Some(Const::Int(*c as i64)),
                Literal::Null => Some(Const::Null),
                Literal::Str(_) => None,
            },
            ExprKind::Unary { op, operand } => {
                let v = operand.const_value()?;
                let folded = match (op, v) {
                    (UnaryOp::Not, Const::Bool(b)) => Const::Bool(!b),
                    (UnaryOp::Neg, Const::Int(i)) => Const::Int(i.wrapping_neg()),
                    (UnaryOp::BitNot, Const::Int(i)) => Const::Int(!i),
                    _ => return None,
                };
                Some(self.narrow(folded))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let folded = fold_binary(*op, lhs.const_value()?, rhs.const_value()?)?;
                Some(self.narrow(folded))
            }
            ExprKind::Convert { value } => value.const_value(),
            _ => None,
        }
    }

    /// Integral results wrap to 32 bits unless the expression is a `long`
    fn narrow(&self, value: Const) -> Const {
        match value {
            Const::Int(v) if !self.is_long_valued() => Const::Int(v as i32 as i64),
            other => other,
        }
    }

    /// Before resolution the width follows the operands
    fn is_long_valued(&self) -> bool {
        match (&self.ty, &self.kind) {
            (Type::Long, _) => true,
            (Type::Unresolved, ExprKind::Literal(Literal::Long(_))) => true,
            (Type::Unresolved, ExprKind::Unary { operand, .. }) => operand.is_long_valued(),
            (Type::Unresolved, ExprKind::Binary { lhs, rhs, .. }) => lhs.is_long_valued() || rhs.is_long_valued(),
            _ => false,
        }
    }

    pub fn is_const_true(&self) -> bool {
        self.const_value() == Some(Const::Bool(true))
    }

    pub fn is_const_false(&self) -> bool {
        self.const_value() == Some(Const::Bool(false))
    }

    /// Expressions that may stand alone as a statement
    pub fn is_statement_expr(&self) -> bool {
        matches!(self.kind, ExprKind::Assign { .. } | ExprKind::Call { .. } | ExprKind::New { .. })
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(Literal::Null))
    }
}

fn fold_binary(op: BinaryOp, a: Const, b: Const) -> Option<Const> {
    use BinaryOp::*;
    Some(match (a, b) {
        (Const::Int(x), Const::Int(y)) => match op {
            Add => Const::Int(x.wrapping_add(y)),
            Sub => Const::Int(x.wrapping_sub(y)),
            Mul => Const::Int(x.wrapping_mul(y)),
            Div | Rem if y == 0 => return None,
            Div => Const::Int(x.wrapping_div(y)),
            Rem => Const::Int(x.wrapping_rem(y)),
            BitAnd => Const::Int(x & y),
            BitOr => Const::Int(x | y),
            BitXor => Const::Int(x ^ y),
            Eq => Const::Bool(x == y),
            Ne => Const::Bool(x != y),
            Lt => Const::Bool(x < y),
            Le => Const::Bool(x <= y),
            Gt => Const::Bool(x > y),
            Ge => Const::Bool(x >= y),
            AndAnd | OrOr => return None,
        },
        (Const::Bool(x), Const::Bool(y)) => match op {
            AndAnd | BitAnd => Const::Bool(x && y),
            OrOr | BitOr => Const::Bool(x || y),
            BitXor | Ne => Const::Bool(x != y),
            Eq => Const::Bool(x == y),
            _ => return None,
        },
        (Const::Null, Const::Null) => match op {
            Eq => Const::Bool(true),
            Ne => Const::Bool(false),
            _ => return None,
        },
        _ => return None,
    })
}

impl HasSpan for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Bool(b) => write!(f, "{}", b),
                Literal::Int(v) => write!(f, "{}", v),
                Literal::Long(v) => write!(f, "{}L", v),
                Literal::Char(c) => match char::from_u32(*c as u32) {
                    Some(ch) => write!(f, "{:?}", ch),
                    None => write!(f, "'\\u{:04x}'", c),
                },
                Literal::Str(s) => write!(f, "{:?}", s),
                Literal::Null => write!(f, "null"),
            },
            ExprKind::Name(n) => write!(f, "{}", n),
            ExprKind::Local(id) => write!(f, "local#{}", id.0),
            ExprKind::Param(i) => write!(f, "param#{}", i),
            ExprKind::Field { name, .. } => write!(f, "this.{}", name),
            ExprKind::This => write!(f, "this"),
            ExprKind::Unary { op, operand } => {
                let sym = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                };
                write!(f, "{}{}", sym, operand)
            }
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            ExprKind::Assign { target, value } => write!(f, "{} = {}", target, value),
            ExprKind::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            ExprKind::New { class } => write!(f, "new {}()", class),
            ExprKind::ToInterface { value, interface } => write!(f, "({}) {}", interface, value),
            ExprKind::Convert { value } => write!(f, "({}) {}", self.ty, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Box<Expr> {
        Box::new(Expr::literal(Literal::Int(v), Span::default()))
    }

    #[test]
    fn test_folds_comparisons_of_constants() {
        let e = Expr::new(ExprKind::Binary { op: BinaryOp::Lt, lhs: int(1), rhs: int(2) }, Span::default());
        assert_eq!(e.const_value(), Some(Const::Bool(true)));
        assert!(e.is_const_true());
    }

    #[test]
    fn test_division_by_zero_is_not_constant() {
        let e = Expr::new(ExprKind::Binary { op: BinaryOp::Div, lhs: int(1), rhs: int(0) }, Span::default());
        assert_eq!(e.const_value(), None);
    }

    #[test]
    fn test_int_arithmetic_wraps_to_32_bits() {
        let sum = Expr::new(ExprKind::Binary { op: BinaryOp::Add, lhs: int(2147483647), rhs: int(1) }, Span::default());
        assert_eq!(sum.const_value(), Some(Const::Int(-2147483648)));

        let lt = Expr::new(ExprKind::Binary { op: BinaryOp::Lt, lhs: Box::new(sum), rhs: int(0) }, Span::default());
        assert!(lt.is_const_true());

        let neg = Expr::new(ExprKind::Unary { op: UnaryOp::Neg, operand: int(-2147483648) }, Span::default());
        assert_eq!(neg.const_value(), Some(Const::Int(-2147483648)));
    }

    #[test]
    fn test_long_arithmetic_keeps_64_bits() {
        let long = |v| Box::new(Expr::literal(Literal::Long(v), Span::default()));
        let sum = Expr::new(ExprKind::Binary { op: BinaryOp::Add, lhs: long(2147483647), rhs: int(1) }, Span::default());
        assert_eq!(sum.const_value(), Some(Const::Int(2147483648)));

        let div = Expr::new(ExprKind::Binary { op: BinaryOp::Div, lhs: long(i64::MIN), rhs: long(-1) }, Span::default());
        assert_eq!(div.const_value(), Some(Const::Int(i64::MIN)));
    }

    #[test]
    fn test_names_are_not_constant() {
        let e = Expr::new(ExprKind::Name("x".into()), Span::default());
        assert_eq!(e.const_value(), None);
        assert!(!e.is_statement_expr());
    }
}
