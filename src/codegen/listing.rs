//! Recording backend
//!
//! `Listing` implements `Architecture` by recording instructions with
//! virtual registers. Labels, flow hints and the line table are kept as
//! side tables indexed by instruction position, so only real instructions
//! land in `instrs`.

use std::collections::BTreeMap;
use std::fmt;

use super::arch::{Architecture, CallTarget, FlowHint, Label, Reg, RestorePoint, RuntimeRoutine};
use super::error::{CodeGenError, CodeGenResult};
use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Jmp(Label),
    CondJmp { reg: Reg, when: bool, target: Label },
    LoadConst { dst: Reg, value: i64 },
    LoadString { dst: Reg, text: String },
    LoadLocal { dst: Reg, offset: i32, size: u32 },
    StoreLocal { offset: i32, src: Reg, size: u32 },
    ZeroLocal { offset: i32, size: u32 },
    LoadThis(Reg),
    LoadField { dst: Reg, obj: Reg, offset: u32, size: u32 },
    StoreField { obj: Reg, offset: u32, src: Reg, size: u32 },
    Unary { op: UnaryOp, reg: Reg },
    Binary { op: BinaryOp, dst: Reg, src: Reg },
    Extend { reg: Reg, from: u32, to: u32 },
    New { dst: Reg, class: String },
    ToInterface { reg: Reg, class: String, interface: String },
    Push(Reg),
    Call(CallTarget),
    LoadRuntimeCtx(Reg),
    MoveToPrimary(Reg),
    MoveFromPrimary(Reg),
    ExcFramePush { offset: i32, handler: Label },
    ExcFramePop { offset: i32 },
    LoadException { dst: Reg, offset: i32 },
    ClassTestJmp { reg: Reg, class: String, target: Label },
    Ret { frame_size: u32 },
}

impl Instr {
    pub fn is_jump(&self) -> bool {
        matches!(self, Instr::Jmp(_))
    }

    pub fn is_cond_jump(&self) -> bool {
        matches!(self, Instr::CondJmp { .. })
    }

    pub fn calls_routine(&self, routine: RuntimeRoutine) -> bool {
        match self {
            Instr::Call(CallTarget::Runtime(r)) => *r == routine,
            Instr::Call(CallTarget::RuntimeIndirect { routine: r, .. }) => *r == routine,
            _ => false,
        }
    }
}

fn unary_mnemonic(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "not",
        UnaryOp::Neg => "neg",
        UnaryOp::BitNot => "inv",
    }
}

fn binary_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Rem => "rem",
        BinaryOp::BitAnd | BinaryOp::AndAnd => "and",
        BinaryOp::BitOr | BinaryOp::OrOr => "or",
        BinaryOp::BitXor => "xor",
        BinaryOp::Eq => "seteq",
        BinaryOp::Ne => "setne",
        BinaryOp::Lt => "setlt",
        BinaryOp::Le => "setle",
        BinaryOp::Gt => "setgt",
        BinaryOp::Ge => "setge",
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Jmp(l) => write!(f, "jmp {}", l),
            Instr::CondJmp { reg, when, target } => {
                write!(f, "{} {}, {}", if *when { "jnz" } else { "jz" }, reg, target)
            }
            Instr::LoadConst { dst, value } => write!(f, "ldc {}, {}", dst, value),
            Instr::LoadString { dst, text } => write!(f, "lds {}, {:?}", dst, text),
            Instr::LoadLocal { dst, offset, size } => write!(f, "ld{} {}, [fp{:+}]", size, dst, offset),
            Instr::StoreLocal { offset, src, size } => write!(f, "st{} [fp{:+}], {}", size, offset, src),
            Instr::ZeroLocal { offset, size } => write!(f, "clr{} [fp{:+}]", size, offset),
            Instr::LoadThis(dst) => write!(f, "ldthis {}", dst),
            Instr::LoadField { dst, obj, offset, size } => write!(f, "ld{} {}, [{}+{}]", size, dst, obj, offset),
            Instr::StoreField { obj, offset, src, size } => write!(f, "st{} [{}+{}], {}", size, obj, offset, src),
            Instr::Unary { op, reg } => write!(f, "{} {}", unary_mnemonic(*op), reg),
            Instr::Binary { op, dst, src } => write!(f, "{} {}, {}", binary_mnemonic(*op), dst, src),
            Instr::Extend { reg, from, to } => write!(f, "ext{}to{} {}", from, to, reg),
            Instr::New { dst, class } => write!(f, "new {}, {}", dst, class),
            Instr::ToInterface { reg, class, interface } => write!(f, "toif {}, {}->{}", reg, class, interface),
            Instr::Push(reg) => write!(f, "push {}", reg),
            Instr::Call(target) => write!(f, "call {}", target),
            Instr::LoadRuntimeCtx(dst) => write!(f, "ldctx {}", dst),
            Instr::MoveToPrimary(src) => write!(f, "mov rv, {}", src),
            Instr::MoveFromPrimary(dst) => write!(f, "mov {}, rv", dst),
            Instr::ExcFramePush { offset, handler } => write!(f, "excpush [fp{:+}], {}", offset, handler),
            Instr::ExcFramePop { offset } => write!(f, "excpop [fp{:+}]", offset),
            Instr::LoadException { dst, offset } => write!(f, "ldexc {}, [fp{:+}]", dst, offset),
            Instr::ClassTestJmp { reg, class, target } => write!(f, "jnotinst {}, {}, {}", reg, class, target),
            Instr::Ret { frame_size } => write!(f, "ret {}", frame_size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub pos: usize,
    pub line: usize,
    pub column: usize,
}

/// Finished code of one method
#[derive(Debug, Clone)]
pub struct MethodCode {
    pub name: String,
    pub instrs: Vec<Instr>,
    pub labels: BTreeMap<Label, usize>,
    pub hints: Vec<(usize, FlowHint)>,
    pub lines: Vec<LineEntry>,
}

impl MethodCode {
    pub fn count(&self, pred: impl Fn(&Instr) -> bool) -> usize {
        self.instrs.iter().filter(|i| pred(i)).count()
    }

    pub fn jumps(&self) -> usize {
        self.count(Instr::is_jump)
    }

    pub fn cond_jumps(&self) -> usize {
        self.count(Instr::is_cond_jump)
    }

    pub fn calls_to(&self, routine: RuntimeRoutine) -> usize {
        self.count(|i| i.calls_routine(routine))
    }

    pub fn hint_count(&self, hint: FlowHint) -> usize {
        self.hints.iter().filter(|(_, h)| *h == hint).count()
    }

    /// Position a label was placed at
    pub fn label_pos(&self, label: Label) -> Option<usize> {
        self.labels.get(&label).copied()
    }
}

impl fmt::Display for MethodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        let mut hints = self.hints.iter().peekable();
        let mut lines = self.lines.iter().peekable();
        for pos in 0..=self.instrs.len() {
            while let Some(entry) = lines.next_if(|e| e.pos == pos) {
                writeln!(f, "    ; line {}:{}", entry.line, entry.column)?;
            }
            while let Some((_, hint)) = hints.next_if(|(p, _)| *p == pos) {
                writeln!(f, "    ; {:?}", hint)?;
            }
            for (label, _) in self.labels.iter().filter(|(_, p)| **p == pos) {
                writeln!(f, "{}:", label)?;
            }
            if let Some(instr) = self.instrs.get(pos) {
                writeln!(f, "    {}", instr)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LabelState {
    pos: Option<usize>,
    referenced: bool,
}

/// Recording backend for one method
pub struct Listing {
    name: String,
    registers: u16,
    instrs: Vec<Instr>,
    labels: Vec<LabelState>,
    hints: Vec<(usize, FlowHint)>,
    lines: Vec<LineEntry>,
    live: u64,
}

impl Listing {
    pub fn new(name: impl Into<String>, registers: u16) -> Self {
        Self {
            name: name.into(),
            registers: registers.min(64),
            instrs: Vec::new(),
            labels: Vec::new(),
            hints: Vec::new(),
            lines: Vec::new(),
            live: 0,
        }
    }

    pub fn live_registers(&self) -> u32 {
        self.live.count_ones()
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    fn emit(&mut self, instr: Instr) {
        log::trace!("{}: {}", self.name, instr);
        self.instrs.push(instr);
    }

    fn reference(&mut self, label: Label) {
        if let Some(state) = self.labels.get_mut(label.0 as usize) {
            state.referenced = true;
        }
    }

    /// Check balance and label placement, then hand out the code
    pub fn finish(self) -> CodeGenResult<MethodCode> {
        if self.live != 0 {
            return Err(CodeGenError::RegisterLeak { method: self.name, count: self.live.count_ones() });
        }
        let mut labels = BTreeMap::new();
        for (i, state) in self.labels.iter().enumerate() {
            match state.pos {
                Some(pos) => {
                    labels.insert(Label(i as u32), pos);
                }
                None if state.referenced => return Err(CodeGenError::UnplacedLabel(i as u32)),
                None => {}
            }
        }
        Ok(MethodCode {
            name: self.name,
            instrs: self.instrs,
            labels,
            hints: self.hints,
            lines: self.lines,
        })
    }
}

impl Architecture for Listing {
    fn prepare_free_reg(&mut self) -> RestorePoint {
        RestorePoint(self.live)
    }

    fn alloc_reg(&mut self) -> CodeGenResult<Reg> {
        let free = (0..self.registers).find(|r| self.live & (1u64 << r) == 0);
        match free {
            Some(r) => {
                self.live |= 1u64 << r;
                Ok(Reg(r))
            }
            None => Err(CodeGenError::OutOfRegisters { available: self.registers }),
        }
    }

    fn dealloc_restore_reg(&mut self, point: RestorePoint) {
        self.live = point.0;
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() as u32 - 1)
    }

    fn place_label(&mut self, label: Label) -> CodeGenResult<()> {
        let pos = self.instrs.len();
        match self.labels.get_mut(label.0 as usize) {
            Some(state) if state.pos.is_none() => {
                state.pos = Some(pos);
                Ok(())
            }
            Some(_) => Err(CodeGenError::LabelPlacedTwice(label.0)),
            None => Err(CodeGenError::unexpected(format!("unknown label {}", label))),
        }
    }

    fn gen_jmp(&mut self, target: Label) {
        self.reference(target);
        self.emit(Instr::Jmp(target));
    }

    fn gen_cond_jmp(&mut self, reg: Reg, when: bool, target: Label) {
        self.reference(target);
        self.emit(Instr::CondJmp { reg, when, target });
    }

    fn gen_load_const(&mut self, dst: Reg, value: i64) {
        self.emit(Instr::LoadConst { dst, value });
    }

    fn gen_load_string(&mut self, dst: Reg, text: &str) {
        self.emit(Instr::LoadString { dst, text: text.to_string() });
    }

    fn gen_load_local(&mut self, dst: Reg, offset: i32, size: u32) {
        self.emit(Instr::LoadLocal { dst, offset, size });
    }

    fn gen_store_local(&mut self, offset: i32, src: Reg, size: u32) {
        self.emit(Instr::StoreLocal { offset, src, size });
    }

    fn gen_zero_local(&mut self, offset: i32, size: u32) {
        self.emit(Instr::ZeroLocal { offset, size });
    }

    fn gen_load_this(&mut self, dst: Reg) {
        self.emit(Instr::LoadThis(dst));
    }

    fn gen_load_field(&mut self, dst: Reg, obj: Reg, offset: u32, size: u32) {
        self.emit(Instr::LoadField { dst, obj, offset, size });
    }

    fn gen_store_field(&mut self, obj: Reg, offset: u32, src: Reg, size: u32) {
        self.emit(Instr::StoreField { obj, offset, src, size });
    }

    fn gen_unary(&mut self, op: UnaryOp, reg: Reg) {
        self.emit(Instr::Unary { op, reg });
    }

    fn gen_binary(&mut self, op: BinaryOp, dst: Reg, src: Reg) {
        self.emit(Instr::Binary { op, dst, src });
    }

    fn gen_extend(&mut self, reg: Reg, from_size: u32, to_size: u32) {
        self.emit(Instr::Extend { reg, from: from_size, to: to_size });
    }

    fn gen_new(&mut self, dst: Reg, class: &str) {
        self.emit(Instr::New { dst, class: class.to_string() });
    }

    fn gen_to_interface(&mut self, reg: Reg, class: &str, interface: &str) {
        self.emit(Instr::ToInterface { reg, class: class.to_string(), interface: interface.to_string() });
    }

    fn gen_push(&mut self, reg: Reg) {
        self.emit(Instr::Push(reg));
    }

    fn gen_call(&mut self, target: CallTarget) {
        self.emit(Instr::Call(target));
    }

    fn gen_load_runtime_ctx(&mut self, dst: Reg) {
        self.emit(Instr::LoadRuntimeCtx(dst));
    }

    fn gen_move_to_primary(&mut self, src: Reg) {
        self.emit(Instr::MoveToPrimary(src));
    }

    fn gen_move_from_primary(&mut self, dst: Reg) {
        self.emit(Instr::MoveFromPrimary(dst));
    }

    fn gen_exc_frame_push(&mut self, offset: i32, handler: Label) {
        self.reference(handler);
        self.emit(Instr::ExcFramePush { offset, handler });
    }

    fn gen_exc_frame_pop(&mut self, offset: i32) {
        self.emit(Instr::ExcFramePop { offset });
    }

    fn gen_load_exception(&mut self, dst: Reg, offset: i32) {
        self.emit(Instr::LoadException { dst, offset });
    }

    fn gen_class_test_jmp(&mut self, reg: Reg, class: &str, target: Label) {
        self.reference(target);
        self.emit(Instr::ClassTestJmp { reg, class: class.to_string(), target });
    }

    fn gen_flow_hint(&mut self, hint: FlowHint) {
        self.hints.push((self.instrs.len(), hint));
    }

    fn gen_source_hint(&mut self, line: usize, column: usize) {
        let pos = self.instrs.len();
        if let Some(last) = self.lines.last_mut() {
            if last.pos == pos {
                *last = LineEntry { pos, line, column };
                return;
            }
        }
        self.lines.push(LineEntry { pos, line, column });
    }

    fn gen_ret(&mut self, frame_size: u32) {
        self.emit(Instr::Ret { frame_size });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_point_releases_everything_allocated_after_it() {
        let mut l = Listing::new("t", 8);
        let outer = l.prepare_free_reg();
        let a = l.alloc_reg().unwrap();
        let inner = l.prepare_free_reg();
        let b = l.alloc_reg().unwrap();
        assert_ne!(a, b);
        l.dealloc_restore_reg(inner);
        assert_eq!(l.live_registers(), 1);
        assert_eq!(l.alloc_reg().unwrap(), b);
        l.dealloc_restore_reg(outer);
        assert_eq!(l.live_registers(), 0);
    }

    #[test]
    fn test_running_out_of_registers_is_an_error() {
        let mut l = Listing::new("t", 2);
        l.alloc_reg().unwrap();
        l.alloc_reg().unwrap();
        assert_eq!(l.alloc_reg(), Err(CodeGenError::OutOfRegisters { available: 2 }));
    }

    #[test]
    fn test_finish_detects_leaks_and_dangling_labels() {
        let mut l = Listing::new("leak", 4);
        l.alloc_reg().unwrap();
        assert!(matches!(l.finish(), Err(CodeGenError::RegisterLeak { count: 1, .. })));

        let mut l = Listing::new("dangling", 4);
        let target = l.new_label();
        l.gen_jmp(target);
        assert_eq!(l.finish().unwrap_err(), CodeGenError::UnplacedLabel(0));
    }

    #[test]
    fn test_labels_and_hints_are_side_tables() {
        let mut l = Listing::new("m", 4);
        let top = l.new_label();
        l.gen_flow_hint(FlowHint::LoopStart);
        l.place_label(top).unwrap();
        l.gen_jmp(top);
        assert!(l.place_label(top).is_err());
        let code = l.finish().unwrap();
        assert_eq!(code.instrs.len(), 1);
        assert_eq!(code.label_pos(top), Some(0));
        assert_eq!(code.hint_count(FlowHint::LoopStart), 1);
        assert!(code.to_string().contains("jmp L0"));
    }
}
