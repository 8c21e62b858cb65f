//! Target architecture interface
//!
//! Statement and expression generators only talk to this trait. Registers
//! are handed out between a `prepare_free_reg` restore point and the
//! matching `dealloc_restore_reg`; labels are unlinked placeholders until
//! placed.

use std::fmt;

use super::error::CodeGenResult;
use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// Register state to return to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePoint(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowHint {
    BlockStart,
    BlockEnd,
    LoopStart,
    LoopEnd,
    CondStart,
    CondEnd,
}

/// Runtime support routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeRoutine {
    DoThrow,
    AssertFailed,
}

impl RuntimeRoutine {
    pub fn name(self) -> &'static str {
        match self {
            RuntimeRoutine::DoThrow => "DoThrow",
            RuntimeRoutine::AssertFailed => "AssertFailed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// Method of a compiled unit, by symbol
    Method(String),
    /// Runtime routine linked into the image
    Runtime(RuntimeRoutine),
    /// Runtime routine reached through the runtime unit table
    RuntimeIndirect { routine: RuntimeRoutine, ctx: Reg },
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTarget::Method(sym) => write!(f, "{}", sym),
            CallTarget::Runtime(r) => write!(f, "{}", r.name()),
            CallTarget::RuntimeIndirect { routine, ctx } => write!(f, "[{}].{}", ctx, routine.name()),
        }
    }
}

pub trait Architecture {
    // Registers
    fn prepare_free_reg(&mut self) -> RestorePoint;
    fn alloc_reg(&mut self) -> CodeGenResult<Reg>;
    fn dealloc_restore_reg(&mut self, point: RestorePoint);

    // Labels and jumps
    fn new_label(&mut self) -> Label;
    fn place_label(&mut self, label: Label) -> CodeGenResult<()>;
    fn gen_jmp(&mut self, target: Label);
    /// Jump when `reg` holds `when`
    fn gen_cond_jmp(&mut self, reg: Reg, when: bool, target: Label);

    // Values
    fn gen_load_const(&mut self, dst: Reg, value: i64);
    fn gen_load_string(&mut self, dst: Reg, text: &str);
    fn gen_load_local(&mut self, dst: Reg, offset: i32, size: u32);
    fn gen_store_local(&mut self, offset: i32, src: Reg, size: u32);
    fn gen_zero_local(&mut self, offset: i32, size: u32);
    fn gen_load_this(&mut self, dst: Reg);
    fn gen_load_field(&mut self, dst: Reg, obj: Reg, offset: u32, size: u32);
    fn gen_store_field(&mut self, obj: Reg, offset: u32, src: Reg, size: u32);
    fn gen_unary(&mut self, op: UnaryOp, reg: Reg);
    fn gen_binary(&mut self, op: BinaryOp, dst: Reg, src: Reg);
    fn gen_extend(&mut self, reg: Reg, from_size: u32, to_size: u32);
    fn gen_new(&mut self, dst: Reg, class: &str);
    fn gen_to_interface(&mut self, reg: Reg, class: &str, interface: &str);

    // Calls
    fn gen_push(&mut self, reg: Reg);
    fn gen_call(&mut self, target: CallTarget);
    fn gen_load_runtime_ctx(&mut self, dst: Reg);
    fn gen_move_to_primary(&mut self, src: Reg);
    fn gen_move_from_primary(&mut self, dst: Reg);

    // Exception frames
    fn gen_exc_frame_push(&mut self, offset: i32, handler: Label);
    fn gen_exc_frame_pop(&mut self, offset: i32);
    fn gen_load_exception(&mut self, dst: Reg, offset: i32);
    /// Jump when `reg` is not an instance of `class`
    fn gen_class_test_jmp(&mut self, reg: Reg, class: &str, target: Label);

    // Hints and epilogue
    fn gen_flow_hint(&mut self, hint: FlowHint);
    fn gen_source_hint(&mut self, line: usize, column: usize);
    fn gen_ret(&mut self, frame_size: u32);
}
