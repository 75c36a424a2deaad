//! Side effects bound to nested command outcomes
//!
//! The action executor is notified once when a nested context reaches `Done`
//! (commit) and once when it reaches `Undone` (rollback). Composites attach an
//! [`ActionExecutorListener`] to each nested context for the duration of a
//! do or undo pass.

use std::sync::Arc;

use schola_core_types::ActionContext;

use crate::context::{Context, State, StateChangedListener};

/// Commit / rollback side effects of nested commands
///
/// Both methods run inside a state transition of the nested context, with
/// that context's handle locked. They must not lock any [`ContextHandle`] of
/// the composite being executed: the nested context's own handle, its peers,
/// or the handles reachable through the composite's macro or nested
/// parameters. Doing so deadlocks. Read what you need from `context`.
///
/// [`ContextHandle`]: crate::context::ContextHandle
pub trait ActionExecutor: Send + Sync {
    fn commit_action(&self, action: &ActionContext, context: &Context);
    fn rollback_action(&self, action: &ActionContext, context: &Context);
}

/// Executor that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActionExecutor;

impl ActionExecutor for NoopActionExecutor {
    fn commit_action(&self, _action: &ActionContext, _context: &Context) {}
    fn rollback_action(&self, _action: &ActionContext, _context: &Context) {}
}

/// Executor that only logs the commit / rollback points
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActionExecutor;

impl ActionExecutor for TracingActionExecutor {
    fn commit_action(&self, action: &ActionContext, context: &Context) {
        tracing::info!(
            action = action.action_name(),
            request_id = %action.request_id(),
            command_id = context.command_id(),
            context_id = %context.id(),
            "commit action"
        );
    }

    fn rollback_action(&self, action: &ActionContext, context: &Context) {
        tracing::info!(
            action = action.action_name(),
            request_id = %action.request_id(),
            command_id = context.command_id(),
            context_id = %context.id(),
            "rollback action"
        );
    }
}

/// Bridges context transitions to an [`ActionExecutor`]
pub struct ActionExecutorListener {
    executor: Arc<dyn ActionExecutor>,
    action: ActionContext,
}

impl ActionExecutorListener {
    pub fn new(executor: Arc<dyn ActionExecutor>, action: ActionContext) -> Self {
        Self { executor, action }
    }
}

impl StateChangedListener for ActionExecutorListener {
    fn state_changed(&self, context: &Context, previous: State, current: State) {
        match (previous, current) {
            (State::Work, State::Done) => self.executor.commit_action(&self.action, context),
            (State::Work, State::Undone) => self.executor.rollback_action(&self.action, context),
            _ => {}
        }
    }
}
