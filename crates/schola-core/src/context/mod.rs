//! Execution context of one command invocation
//!
//! A `Context` is the per-call control-flow object of the engine: it holds
//! the redo parameter the command runs with, the undo parameter its do-step
//! leaves behind, the result or the failure, and the ordered history of
//! states it went through. Every transition notifies the registered
//! listeners synchronously.
//!
//! Contexts nested inside a composite are shared through a `ContextHandle`
//! so the composite's redo and undo parameters observe the same state. Each
//! handle is locked by exactly one do / undo invocation at a time.

mod listener;
mod parameter;
mod state;

pub use listener::StateChangedListener;
pub use parameter::{MacroCommandParameter, Parameter, Payload};
pub use state::State;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::{CommandError, Result};

/// Shared, lockable context (element of a composite's nested collection)
pub type ContextHandle = Arc<Mutex<Context>>;

pub struct Context {
    id: Uuid,
    command_id: String,
    state: State,
    redo_parameter: Option<Parameter>,
    undo_parameter: Option<Parameter>,
    result: Option<Payload>,
    exception: Option<CommandError>,
    history: Vec<State>,
    started_at: Option<DateTime<Utc>>,
    duration: Option<Duration>,
    undoing: bool,
    listeners: Vec<Arc<dyn StateChangedListener>>,
}

impl Context {
    /// Create a context in `Init` for the command `command_id`
    pub fn new(command_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            command_id: command_id.into(),
            state: State::Init,
            redo_parameter: None,
            undo_parameter: None,
            result: None,
            exception: None,
            history: Vec::new(),
            started_at: None,
            duration: None,
            undoing: false,
            listeners: Vec::new(),
        }
    }

    /// Create a context already in `Ready` with its redo parameter
    pub fn ready(command_id: impl Into<String>, redo: impl Into<Parameter>) -> Self {
        let mut ctx = Self::new(command_id);
        ctx.redo_parameter = Some(redo.into());
        // Init -> Ready is always legal once the parameter is present
        let _ = ctx.transition(State::Ready);
        ctx
    }

    /// Create a failed context (context creation was impossible)
    pub fn failed(command_id: impl Into<String>, error: CommandError) -> Self {
        let mut ctx = Self::new(command_id);
        let _ = ctx.fail(error);
        ctx
    }

    pub fn into_handle(self) -> ContextHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// True while an undo pass is running or after it started
    pub fn is_undoing(&self) -> bool {
        self.undoing
    }

    pub fn redo_parameter(&self) -> Option<&Parameter> {
        self.redo_parameter.as_ref()
    }

    /// Mutable access to the redo parameter, only before execution starts
    pub fn redo_parameter_mut(&mut self) -> Option<&mut Parameter> {
        if self.state == State::Ready {
            self.redo_parameter.as_mut()
        } else {
            None
        }
    }

    pub fn undo_parameter(&self) -> Option<&Parameter> {
        self.undo_parameter.as_ref()
    }

    pub fn result(&self) -> Option<&Payload> {
        self.result.as_ref()
    }

    pub fn exception(&self) -> Option<&CommandError> {
        self.exception.as_ref()
    }

    /// States entered, in order
    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Set the redo parameter of an `Init` context and move it to `Ready`
    ///
    /// # Errors
    ///
    /// `AlreadySet` if the context already has a redo parameter.
    pub fn set_redo_parameter(&mut self, parameter: impl Into<Parameter>) -> Result<()> {
        if self.redo_parameter.is_some() {
            return Err(self.already_set("redo parameter"));
        }
        if !self.state.can_transition(State::Ready, self.undoing) {
            return Err(self.illegal(State::Ready));
        }
        self.redo_parameter = Some(parameter.into());
        self.transition(State::Ready)
    }

    /// Record compensation data while the do-step runs
    ///
    /// # Errors
    ///
    /// `Precondition` outside of a forward `Work`, `AlreadySet` on a second call.
    pub fn set_undo_parameter(&mut self, parameter: impl Into<Parameter>) -> Result<()> {
        if self.state != State::Work || self.undoing {
            return Err(CommandError::Precondition {
                command_id: self.command_id.clone(),
                operation: "set undo parameter of",
                state: self.state,
            });
        }
        if self.undo_parameter.is_some() {
            return Err(self.already_set("undo parameter"));
        }
        self.undo_parameter = Some(parameter.into());
        Ok(())
    }

    /// `Ready` -> `Work`
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless the context is `Ready`.
    pub fn start_work(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(self.illegal(State::Work));
        }
        self.transition(State::Work)
    }

    /// Store the result of the do-step; `Work` -> `Done`
    ///
    /// # Errors
    ///
    /// `AlreadySet` if a result exists, `IllegalTransition` outside a forward `Work`.
    pub fn set_result(&mut self, result: Payload) -> Result<()> {
        if self.result.is_some() {
            return Err(self.already_set("result"));
        }
        if !self.state.can_transition(State::Done, self.undoing) {
            return Err(self.illegal(State::Done));
        }
        self.result = Some(result);
        self.transition(State::Done)
    }

    /// Store a failure; any non-terminal state -> `Fail`
    ///
    /// A failing undo drops the result of the earlier do, keeping result and
    /// exception mutually exclusive.
    ///
    /// # Errors
    ///
    /// `AlreadySet` if an exception exists, `IllegalTransition` from a
    /// terminal state or from a `Done` that is not being undone.
    pub fn fail(&mut self, error: CommandError) -> Result<()> {
        if self.exception.is_some() {
            return Err(self.already_set("exception"));
        }
        if !self.state.can_transition(State::Fail, self.undoing) {
            return Err(self.illegal(State::Fail));
        }
        self.result = None;
        self.exception = Some(error);
        self.transition(State::Fail)
    }

    /// Skip a context that never started; `Ready` -> `Cancel`
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless the context is `Ready`.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(self.illegal(State::Cancel));
        }
        self.transition(State::Cancel)
    }

    /// Begin compensation; `Done` -> `Work`
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless the context is `Done`.
    pub fn start_undo(&mut self) -> Result<()> {
        if self.state != State::Done {
            return Err(self.illegal(State::Work));
        }
        self.undoing = true;
        self.transition(State::Work)
    }

    /// Compensation succeeded; `Work` -> `Undone`
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless an undo is in progress.
    pub fn mark_undone(&mut self) -> Result<()> {
        if !self.state.can_transition(State::Undone, self.undoing) {
            return Err(self.illegal(State::Undone));
        }
        self.transition(State::Undone)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StateChangedListener>) {
        self.listeners.push(listener);
    }

    /// Remove a listener previously added (compared by pointer)
    pub fn remove_listener(&mut self, listener: &Arc<dyn StateChangedListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    fn transition(&mut self, to: State) -> Result<()> {
        let from = self.state;
        if !from.can_transition(to, self.undoing) {
            return Err(self.illegal(to));
        }

        let now = Utc::now();
        if to == State::Work && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if matches!(to, State::Done | State::Undone | State::Fail | State::Cancel) {
            self.duration = self.started_at.map(|started| now - started);
        }

        self.state = to;
        self.history.push(to);

        tracing::trace!(
            command_id = %self.command_id,
            context_id = %self.id,
            from = from.as_str(),
            to = to.as_str(),
            "context state changed"
        );

        self.notify(from, to);
        Ok(())
    }

    fn notify(&self, from: State, to: State) {
        for listener in &self.listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.state_changed(self, from, to)));
            if outcome.is_err() {
                tracing::warn!(
                    command_id = %self.command_id,
                    context_id = %self.id,
                    from = from.as_str(),
                    to = to.as_str(),
                    "state listener panicked; transition kept"
                );
            }
        }
    }

    fn illegal(&self, to: State) -> CommandError {
        CommandError::IllegalTransition {
            command_id: self.command_id.clone(),
            from: self.state,
            to,
        }
    }

    fn already_set(&self, what: &'static str) -> CommandError {
        CommandError::AlreadySet {
            command_id: self.command_id.clone(),
            what,
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("command_id", &self.command_id)
            .field("state", &self.state)
            .field("redo_parameter", &self.redo_parameter)
            .field("undo_parameter", &self.undo_parameter)
            .field("result", &self.result)
            .field("exception", &self.exception)
            .field("history", &self.history)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn working(id: &str) -> Context {
        let mut ctx = Context::ready(id, json!({"name": "Ann"}));
        ctx.start_work().unwrap();
        ctx
    }

    #[test]
    fn test_ready_records_history() {
        let ctx = Context::ready("person.save", json!(1));
        assert_eq!(ctx.state(), State::Ready);
        assert_eq!(ctx.history(), &[State::Ready]);
        assert!(ctx.started_at().is_none());
    }

    #[test]
    fn test_result_moves_work_to_done() {
        let mut ctx = working("person.save");
        ctx.set_result(json!({"id": 7})).unwrap();

        assert_eq!(ctx.state(), State::Done);
        assert_eq!(ctx.result(), Some(&json!({"id": 7})));
        assert!(ctx.duration().is_some());
        assert_eq!(ctx.history(), &[State::Ready, State::Work, State::Done]);
    }

    #[test]
    fn test_result_set_only_once() {
        let mut ctx = working("person.save");
        ctx.set_result(json!(1)).unwrap();
        let err = ctx.set_result(json!(2)).unwrap_err();
        assert!(matches!(err, CommandError::AlreadySet { what: "result", .. }));
        assert_eq!(ctx.result(), Some(&json!(1)));
    }

    #[test]
    fn test_result_rejected_outside_work() {
        let mut ctx = Context::ready("person.save", json!(1));
        let err = ctx.set_result(json!(2)).unwrap_err();
        assert!(matches!(err, CommandError::IllegalTransition { .. }));
        assert!(ctx.result().is_none());
        assert_eq!(ctx.state(), State::Ready);
    }

    #[test]
    fn test_failed_undo_clears_result() {
        let mut ctx = working("person.save");
        ctx.set_undo_parameter(json!(7)).unwrap();
        ctx.set_result(json!({"id": 7})).unwrap();
        ctx.start_undo().unwrap();
        ctx.fail(CommandError::undo_failed("person.save", "locked"))
            .unwrap();

        assert_eq!(ctx.state(), State::Fail);
        assert!(ctx.result().is_none());
        assert!(ctx.exception().is_some());
    }

    #[test]
    fn test_done_cannot_fail_without_undo() {
        let mut ctx = working("person.save");
        ctx.set_result(json!(1)).unwrap();
        assert!(ctx.fail(CommandError::failed("person.save", "late")).is_err());
        assert_eq!(ctx.state(), State::Done);
        assert!(ctx.exception().is_none());
    }

    #[test]
    fn test_undo_parameter_only_during_forward_work() {
        let mut ctx = Context::ready("person.save", json!(1));
        assert!(ctx.set_undo_parameter(json!(1)).is_err());
        ctx.start_work().unwrap();
        ctx.set_undo_parameter(json!(1)).unwrap();
        assert!(ctx.set_undo_parameter(json!(2)).is_err());
    }

    #[test]
    fn test_cancel_only_from_ready() {
        let mut ctx = working("person.save");
        assert!(ctx.cancel().is_err());

        let mut ready = Context::ready("person.save", json!(1));
        ready.cancel().unwrap();
        assert_eq!(ready.state(), State::Cancel);
    }

    #[test]
    fn test_redo_parameter_mut_only_when_ready() {
        let mut ctx = Context::ready("person.save", json!(1));
        assert!(ctx.redo_parameter_mut().is_some());
        ctx.start_work().unwrap();
        assert!(ctx.redo_parameter_mut().is_none());
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let mut ctx = Context::new("person.save");
        ctx.add_listener(Arc::new(|_: &Context, _: State, _: State| panic!("listener bug")));

        ctx.set_redo_parameter(json!(1)).unwrap();
        assert_eq!(ctx.state(), State::Ready);
    }

    #[test]
    fn test_remove_listener_by_pointer() {
        let mut ctx = Context::new("person.save");
        let listener: Arc<dyn StateChangedListener> = Arc::new(|_: &Context, _: State, _: State| {});
        ctx.add_listener(listener.clone());
        assert!(ctx.remove_listener(&listener));
        assert!(!ctx.remove_listener(&listener));
    }
}
