//! Best-effort execution: every nested command is attempted

use std::sync::Arc;

use super::{rollback_in_reverse, run_nested_do, NestedExecution, NestedRollback, NestedScope};
use crate::context::{ContextHandle, StateChangedListener};

/// Runs nested commands in registration order without transfer or
/// cancellation; a failure does not prevent later commands from running.
#[derive(Debug, Clone, Copy, Default)]
pub struct Independent;

impl NestedExecution for Independent {
    fn name(&self) -> &'static str {
        "independent"
    }

    fn execute_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> Vec<ContextHandle> {
        for (index, handle) in contexts.iter().enumerate() {
            run_nested_do(scope, index, handle, listener);
        }
        contexts
    }

    fn rollback_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> NestedRollback {
        rollback_in_reverse(scope, contexts, listener)
    }
}
