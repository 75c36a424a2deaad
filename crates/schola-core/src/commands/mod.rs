//! Command contract
//!
//! A command owns no per-call state: every invocation works on the
//! `Context` created by the command's own factory. Business leaves usually
//! implement [`AtomicCommand`] and get wrapped in a [`Leaf`]; composites
//! implement [`Command`] directly.

mod atomic;
mod nested;

pub use atomic::{AtomicCommand, DoOutcome, Leaf};
pub use nested::{DefaultPreparer, KeyedInputPreparer, NestedCommand, NestedContextPreparer};

use std::any::Any;

use schola_core_types::ActionContext;

use crate::context::{Context, Payload, State};
use crate::errors::{CommandError, Result};

/// Unit of work with a do-step and an optional undo-step
///
/// `do_command` and `undo_command` return `Err` only for precondition
/// violations (wrong context state, missing undo parameter); the context is
/// then left untouched. Every other failure is recorded on the context,
/// which ends in `Fail`.
pub trait Command: Send + Sync {
    fn id(&self) -> &str;

    /// Build a `Ready` context for `input`, or a `Fail` context carrying a
    /// `CannotCreateContext` error.
    fn create_context(&self, input: Payload) -> Context;

    /// # Errors
    ///
    /// `Precondition` if `context` is not `Ready`.
    fn do_command(&self, context: &mut Context, action: &ActionContext) -> Result<()>;

    /// # Errors
    ///
    /// `Precondition` if `context` is not `Done`, `MissingUndoParameter` if
    /// the do-step left nothing to compensate with, `NotUndoable` for
    /// commands without an undo-step.
    fn undo_command(&self, context: &mut Context, action: &ActionContext) -> Result<()>;

    fn is_undoable(&self) -> bool {
        true
    }

    /// Roll back whatever a failed do-step left applied inside `context`.
    ///
    /// Returns the compensation failure, if any. Leaves apply nothing when
    /// their do-step fails, so the default does nothing; composites roll back
    /// their completed nested contexts.
    fn compensate(&self, _context: &Context, _action: &ActionContext) -> Option<CommandError> {
        None
    }

    /// Create a context for `input` and run the do-step on it when it is ready.
    ///
    /// The returned context is `Done` or `Fail`.
    fn execute(&self, input: Payload, action: &ActionContext) -> Context {
        let mut context = self.create_context(input);
        if context.state() == State::Ready {
            // a fresh Ready context always satisfies the precondition
            let _ = self.do_command(&mut context, action);
        }
        context
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
