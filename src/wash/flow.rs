//! Flow state threaded through statement resolution
//!
//! Reachability travels as a `FlowState` value from statement to statement.
//! Definite assignment lives in the local records and the final-field
//! tracker; `DefState` snapshots it where paths split and join.

/// Reachability facts threaded through a statement chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowState {
    /// Resolving inside a loop body
    pub inside_loop: bool,
    /// The previous statement never completes normally; the next one
    /// reports "unreachable code" and clears this flag
    pub next_is_unreachable: bool,
    /// Code that never executes and is not generated
    pub dead_code: bool,
}

pub const NO_FLOWCHANGE: FlowState = FlowState {
    inside_loop: false,
    next_is_unreachable: false,
    dead_code: false,
};

impl FlowState {
    pub fn in_loop(self) -> Self {
        Self { inside_loop: true, ..self }
    }

    pub fn unreachable_next(self) -> Self {
        Self { next_is_unreachable: true, ..self }
    }

    pub fn dead(self) -> Self {
        Self { dead_code: true, ..self }
    }

    pub fn is_unreachable(self) -> bool {
        self.next_is_unreachable || self.dead_code
    }

    /// State after a statement whose exit is reachable again
    pub fn reachable_after(incoming: FlowState) -> Self {
        Self { next_is_unreachable: false, ..incoming }
    }

    /// Join the outcomes of alternative paths that started from `incoming`
    pub fn join(incoming: FlowState, outcomes: &[FlowState]) -> Self {
        if outcomes.iter().any(|o| !o.is_unreachable()) {
            return Self::reachable_after(incoming);
        }
        // a path that just ended still owes the warning to the next statement
        let pending = !incoming.dead_code && outcomes.iter().any(|o| o.next_is_unreachable);
        Self {
            inside_loop: incoming.inside_loop,
            next_is_unreachable: pending,
            dead_code: !pending,
        }
    }
}

/// Definite-assignment snapshot: one flag per local, one per blank final
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefState {
    pub locals: Vec<bool>,
    pub finals: Vec<bool>,
}

impl DefState {
    /// Keep only what is assigned on both paths
    pub fn meet(&mut self, other: &DefState) {
        meet_flags(&mut self.locals, &other.locals);
        meet_flags(&mut self.finals, &other.finals);
    }

    /// Meet of all states, `None` when there are none
    pub fn meet_all<I: IntoIterator<Item = DefState>>(states: I) -> Option<DefState> {
        states.into_iter().reduce(|mut acc, s| {
            acc.meet(&s);
            acc
        })
    }
}

fn meet_flags(a: &mut Vec<bool>, b: &[bool]) {
    if b.len() < a.len() {
        a.truncate(b.len());
    }
    for (x, y) in a.iter_mut().zip(b) {
        *x &= *y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_reachable_if_any_path_is() {
        let out = FlowState::join(NO_FLOWCHANGE, &[NO_FLOWCHANGE.unreachable_next(), NO_FLOWCHANGE]);
        assert_eq!(out, NO_FLOWCHANGE);
    }

    #[test]
    fn test_join_of_ended_paths_keeps_pending_warning() {
        let ended = NO_FLOWCHANGE.unreachable_next();
        let warned = NO_FLOWCHANGE.dead();
        let out = FlowState::join(NO_FLOWCHANGE, &[ended, warned]);
        assert!(out.next_is_unreachable);
        assert!(!out.dead_code);

        let out = FlowState::join(NO_FLOWCHANGE, &[warned, warned]);
        assert!(out.dead_code && !out.next_is_unreachable);
    }

    #[test]
    fn test_meet_keeps_common_assignments() {
        let mut a = DefState { locals: vec![true, true, false], finals: vec![true] };
        let b = DefState { locals: vec![true, false, true], finals: vec![false] };
        a.meet(&b);
        assert_eq!(a.locals, vec![true, false, false]);
        assert_eq!(a.finals, vec![false]);
    }
}
