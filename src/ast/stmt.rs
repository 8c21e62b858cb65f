//! Statement arena of one method body
//!
//! Statements and breakables live in separate arenas owned by the
//! `MethodBody`. A block owns the chain of its statements through `next`
//! links; breakables refer outward through `outer` indices, which always
//! end at the method's root block.

use std::fmt;

use super::expr::Expr;
use super::types::{Type, TypeRef};
use crate::codegen::arch::Label;
use crate::parser::{HasSpan, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakableId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub usize);

#[derive(Debug, Clone)]
pub struct Stmt {
    pub span: Span,
    pub next: Option<StmtId>,
    /// Set by resolution when the statement can never execute
    pub dead: bool,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { span, next: None, dead: false, kind }
    }
}

impl HasSpan for Stmt {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Empty,
    Expr(Expr),
    VarDecl(VarDeclStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    EndLoop(EndLoopStmt),
    /// Sentinel closing every method body
    MissingReturn,
    Assert(AssertStmt),
}

impl StmtKind {
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Empty => "empty",
            StmtKind::Expr(_) => "expression",
            StmtKind::VarDecl(_) => "var-decl",
            StmtKind::Block(_) => "block",
            StmtKind::If(_) => "if",
            StmtKind::While(w) if w.inclusive => "do-while",
            StmtKind::While(_) => "while",
            StmtKind::Switch(_) => "switch",
            StmtKind::Try(_) => "try",
            StmtKind::Return(_) => "return",
            StmtKind::Throw(_) => "throw",
            StmtKind::EndLoop(e) if e.wants_continue => "continue",
            StmtKind::EndLoop(_) => "break",
            StmtKind::MissingReturn => "missing-return",
            StmtKind::Assert(_) => "assert",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub brk: BreakableId,
    pub first: Option<StmtId>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: StmtId,
    pub else_branch: Option<StmtId>,
}

/// `while` (exclusive) or `do ... while` (inclusive) loop
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub brk: BreakableId,
    pub cond: Expr,
    pub body: StmtId,
    pub inclusive: bool,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default`
    pub value: Option<Expr>,
    pub first: Option<StmtId>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub brk: BreakableId,
    pub selector: Expr,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub class: TypeRef,
    pub local: LocalId,
    /// Block statement; its breakable sits outside the try
    pub body: StmtId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub brk: BreakableId,
    /// Block statement nested inside the try breakable
    pub body: StmtId,
    pub catches: Vec<CatchClause>,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub outer: BreakableId,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub value: Expr,
}

/// `break` or `continue`
#[derive(Debug, Clone)]
pub struct EndLoopStmt {
    pub outer: BreakableId,
    pub label: Option<String>,
    pub wants_continue: bool,
    /// Bound by resolution
    pub target: Option<BreakableId>,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub local: LocalId,
    pub init: Option<Expr>,
}

/// Region of the method variable list filled by the first resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceToken {
    pub at: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub vars: Vec<Declarator>,
    pub splice: Option<SpliceToken>,
    /// Declared inside a loop: uninitialized pointers are zeroed per iteration
    pub force_reinit: bool,
}

#[derive(Debug, Clone)]
pub struct AssertStmt {
    pub cond: Expr,
    pub message: Option<Expr>,
    /// Set by resolution when code has to be emitted
    pub encode: bool,
}

/// Local variable record, referenced by `LocalId`
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub type_ref: TypeRef,
    pub ty: Type,
    /// Frame-pointer relative, assigned once by the first resolution
    pub offset: Option<i32>,
    pub written: bool,
    pub span: Span,
}

impl LocalVar {
    pub fn new(name: impl Into<String>, type_ref: TypeRef, span: Span) -> Self {
        Self {
            name: name.into(),
            type_ref,
            ty: Type::Unresolved,
            offset: None,
            written: false,
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakableKind {
    Block,
    Loop,
    Switch,
    Try,
}

/// Jumps recorded against a breakable during resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpMarks {
    /// A reachable `break` targets this breakable
    pub end_block: bool,
    /// A reachable `continue` targets this breakable
    pub continued: bool,
    /// The block is left early by a jump
    pub shortcut: bool,
}

#[derive(Debug, Clone)]
pub struct Breakable {
    pub outer: Option<BreakableId>,
    pub labels: Vec<String>,
    pub kind: BreakableKind,
    pub stmt: StmtId,
    pub marks: JumpMarks,
    pub break_dest: Option<Label>,
    pub cont_dest: Option<Label>,
    /// Block directly forming a loop body
    pub inner_block: Option<BreakableId>,
    /// Try only: the exception frame is pushed while the body is generated
    pub frame_active: bool,
    /// Try only: exception frame slot
    pub frame_offset: Option<i32>,
}

impl Breakable {
    pub fn new(kind: BreakableKind, outer: Option<BreakableId>, stmt: StmtId) -> Self {
        Self {
            outer,
            labels: Vec::new(),
            kind,
            stmt,
            marks: JumpMarks::default(),
            break_dest: None,
            cont_dest: None,
            inner_block: None,
            frame_active: false,
            frame_offset: None,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Whether a `break` (or `continue`) may stop at this breakable
    pub fn is_break_cont_dest(&self, labeled_search: bool, wants_continue: bool) -> bool {
        match self.kind {
            BreakableKind::Loop => true,
            BreakableKind::Block => labeled_search && !wants_continue,
            BreakableKind::Switch => !wants_continue,
            BreakableKind::Try => false,
        }
    }
}

/// Statement and breakable arenas of one method
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub stmts: Vec<Stmt>,
    pub breakables: Vec<Breakable>,
    pub locals: Vec<LocalVar>,
    /// Root block; its breakable has no outer breakable
    pub root: StmtId,
    /// Bytes of locals and exception frames, set by resolution
    pub frame_size: u32,
}

impl MethodBody {
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.0]
    }

    pub fn breakable(&self, id: BreakableId) -> &Breakable {
        &self.breakables[id.0]
    }

    pub fn breakable_mut(&mut self, id: BreakableId) -> &mut Breakable {
        &mut self.breakables[id.0]
    }

    pub fn local(&self, id: LocalId) -> &LocalVar {
        &self.locals[id.0]
    }

    pub fn local_mut(&mut self, id: LocalId) -> &mut LocalVar {
        &mut self.locals[id.0]
    }

    /// The only breakable without an outer breakable
    pub fn root_breakable(&self) -> Option<BreakableId> {
        self.breakables.iter().position(|b| b.outer.is_none()).map(BreakableId)
    }

    /// Statement ids of a chain starting at `first`
    pub fn chain(&self, first: Option<StmtId>) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut cur = first;
        while let Some(id) = cur {
            out.push(id);
            cur = self.stmt(id).next;
        }
        out
    }

    /// Breakables from `from` outward to the root, `from` included
    pub fn outward(&self, from: BreakableId) -> Outward<'_> {
        Outward { body: self, cur: Some(from) }
    }
}

pub struct Outward<'a> {
    body: &'a MethodBody,
    cur: Option<BreakableId>,
}

impl<'a> Iterator for Outward<'a> {
    type Item = BreakableId;

    fn next(&mut self) -> Option<BreakableId> {
        let id = self.cur?;
        self.cur = self.body.breakable(id).outer;
        Some(id)
    }
}

impl fmt::Display for BreakableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BreakableKind::Block => "block",
            BreakableKind::Loop => "loop",
            BreakableKind::Switch => "switch",
            BreakableKind::Try => "try",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_and_continue_targets_by_kind() {
        let b = |kind| Breakable::new(kind, None, StmtId(0));
        let lp = b(BreakableKind::Loop);
        assert!(lp.is_break_cont_dest(false, true));
        assert!(lp.is_break_cont_dest(false, false));

        let block = b(BreakableKind::Block);
        assert!(!block.is_break_cont_dest(false, false));
        assert!(block.is_break_cont_dest(true, false));
        assert!(!block.is_break_cont_dest(true, true));

        let sw = b(BreakableKind::Switch);
        assert!(sw.is_break_cont_dest(false, false));
        assert!(!sw.is_break_cont_dest(true, true));

        assert!(!b(BreakableKind::Try).is_break_cont_dest(true, false));
    }
}
