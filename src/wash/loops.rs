//! `while` and `do ... while` resolution

use super::attr::MethodResolver;
use super::flow::{DefState, FlowState};
use super::WashResult;
use crate::ast::{Const, WhileStmt};

impl MethodResolver<'_> {
    pub(super) fn resolve_while(&mut self, w: &mut WhileStmt, flow: FlowState) -> WashResult<FlowState> {
        self.begin_breakable(w.brk);
        if w.inclusive {
            self.resolve_inclusive(w, flow)
        } else {
            self.resolve_exclusive(w, flow)
        }
    }

    /// Condition first; the body may run zero times
    fn resolve_exclusive(&mut self, w: &mut WhileStmt, flow: FlowState) -> WashResult<FlowState> {
        self.resolve_condition(&mut w.cond)?;
        let constant = w.cond.const_value().and_then(Const::as_bool);

        let pre = self.def_state();
        let body_in = match constant {
            Some(false) => {
                self.assign_all();
                flow.in_loop().dead()
            }
            _ => flow.in_loop(),
        };
        self.resolve_stmt(w.body, body_in)?;
        self.cont_states.remove(&w.brk);

        // leaving through the condition sees the state from before the body
        self.restore_def_state(&pre);
        let fallthrough = (constant != Some(true)).then_some(pre);
        let marks = self.body.breakable(w.brk).marks;
        self.finish_breakable(w.brk, fallthrough);

        if constant == Some(true) && !marks.end_block {
            return Ok(flow.unreachable_next());
        }
        Ok(FlowState::reachable_after(flow))
    }

    /// Body first, then the condition
    fn resolve_inclusive(&mut self, w: &mut WhileStmt, flow: FlowState) -> WashResult<FlowState> {
        let body_out = self.resolve_stmt(w.body, flow.in_loop())?;
        let marks = self.body.breakable(w.brk).marks;

        let falls = !body_out.is_unreachable();
        let at_cond = falls.then(|| self.def_state());
        let continued = self.cont_states.remove(&w.brk);
        match DefState::meet_all(at_cond.into_iter().chain(continued)) {
            Some(state) => self.restore_def_state(&state),
            None => self.assign_all(),
        }
        let cond_reachable = falls || marks.continued;

        self.resolve_condition(&mut w.cond)?;
        let constant = w.cond.const_value().and_then(Const::as_bool);
        let exits = cond_reachable && constant != Some(true);
        let fallthrough = exits.then(|| self.def_state());
        self.finish_breakable(w.brk, fallthrough);

        if exits || marks.end_block {
            return Ok(FlowState::reachable_after(flow));
        }
        Ok(flow.unreachable_next())
    }
}
