//! `assert` resolution
//!
//! Condition and message are always checked. Encoding needs either the
//! `@CheckAssert` marker or globally enabled assertions; a constant-false
//! condition is never encoded and ends the flow.

use super::attr::MethodResolver;
use super::flow::FlowState;
use super::{WashError, WashErrorKind, WashResult};
use crate::ast::{AssertStmt, Type};
use crate::common::consts::STRING;

impl MethodResolver<'_> {
    pub(super) fn resolve_assert(&mut self, a: &mut AssertStmt, flow: FlowState) -> WashResult<FlowState> {
        // nothing assigned inside an assert counts afterwards
        let before = self.def_state();
        self.resolve_condition(&mut a.cond)?;
        if let Some(message) = a.message.as_mut() {
            self.resolve_expr(message)?;
            let string = Type::Class(STRING.to_string());
            if message.ty != string && !message.ty.is_null() {
                return Err(WashError::new(message.span, WashErrorKind::AssertMessageNotString(message.ty.to_string())));
            }
            self.coerce(message, &string)?;
        }
        self.restore_def_state(&before);

        if a.cond.is_const_false() {
            a.encode = false;
            self.assign_all();
            return Ok(flow.unreachable_next());
        }

        a.encode = self.ctx.check_assert || self.config.assertions;
        if a.encode && !flow.dead_code {
            self.runtime.assert_used = true;
        }
        Ok(flow)
    }
}
