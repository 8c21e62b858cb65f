//! Active try regions of the method being resolved

use super::enter::TypeTable;
use crate::ast::BreakableId;

/// One try body currently being resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryFrame {
    pub brk: BreakableId,
    /// Class names of the catch clauses, in source order
    pub catches: Vec<String>,
}

/// Try frames pushed while their bodies are resolved, innermost last
#[derive(Debug, Clone, Default)]
pub struct TryStack {
    frames: Vec<TryFrame>,
}

impl TryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: TryFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<TryFrame> {
        self.frames.pop()
    }

    /// Innermost frame with a clause catching `class`
    pub fn catcher(&self, table: &TypeTable, class: &str) -> Option<&TryFrame> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.catches.iter().any(|c| table.is_subclass(class, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Config;

    #[test]
    fn test_innermost_matching_frame_catches() {
        let table = TypeTable::builtin(&Config::default());
        let mut stack = TryStack::new();
        stack.push(TryFrame { brk: BreakableId(1), catches: vec!["Throwable".into()] });
        stack.push(TryFrame { brk: BreakableId(2), catches: vec!["RuntimeException".into()] });

        assert_eq!(stack.catcher(&table, "RuntimeException").map(|f| f.brk), Some(BreakableId(2)));
        assert_eq!(stack.catcher(&table, "Exception").map(|f| f.brk), Some(BreakableId(1)));
        stack.pop();
        stack.pop();
        assert!(stack.catcher(&table, "Exception").is_none());
    }
}
