//! Leaf commands written as plain do / undo functions

use std::panic::{catch_unwind, AssertUnwindSafe};

use schola_core_types::ActionContext;

use super::{panic_message, Command};
use crate::context::{Context, Payload, State};
use crate::errors::{CommandError, Result};

/// What a successful do-step produced
#[derive(Debug, Clone, PartialEq)]
pub struct DoOutcome {
    pub result: Payload,
    pub undo: Option<Payload>,
}

impl DoOutcome {
    /// Result only; the command cannot be compensated for this call
    pub fn new(result: Payload) -> Self {
        Self { result, undo: None }
    }

    pub fn with_undo(result: Payload, undo: Payload) -> Self {
        Self {
            result,
            undo: Some(undo),
        }
    }
}

/// Business logic of a leaf command, free of any state handling
pub trait AtomicCommand: Send + Sync {
    fn id(&self) -> &str;

    /// Reject inputs this command cannot work with. The reason ends up in a
    /// `CannotCreateContext` error.
    fn check_input(&self, _input: &Payload) -> std::result::Result<(), String> {
        Ok(())
    }

    /// # Errors
    ///
    /// Any business failure; it is recorded on the context.
    fn execute_do(&self, input: &Payload, action: &ActionContext) -> Result<DoOutcome>;

    /// # Errors
    ///
    /// Any compensation failure; it is recorded on the context.
    fn execute_undo(&self, undo: &Payload, action: &ActionContext) -> Result<()>;

    fn is_undoable(&self) -> bool {
        true
    }
}

/// Adapter driving the context state machine around an [`AtomicCommand`]
pub struct Leaf<C> {
    inner: C,
}

impl<C: AtomicCommand> Leaf<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: AtomicCommand> Command for Leaf<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn create_context(&self, input: Payload) -> Context {
        let id = self.inner.id();
        if input.is_null() {
            return Context::failed(id, CommandError::cannot_create(id, "input is null"));
        }
        match self.inner.check_input(&input) {
            Ok(()) => Context::ready(id, input),
            Err(reason) => Context::failed(id, CommandError::cannot_create(id, reason)),
        }
    }

    fn do_command(&self, context: &mut Context, action: &ActionContext) -> Result<()> {
        if context.state() != State::Ready {
            return Err(CommandError::Precondition {
                command_id: self.id().to_string(),
                operation: "do",
                state: context.state(),
            });
        }

        let input = context
            .redo_parameter()
            .and_then(|p| p.as_value())
            .cloned();
        context.start_work()?;

        let Some(input) = input else {
            return context.fail(CommandError::MissingRedoParameter {
                command_id: self.id().to_string(),
            });
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| self.inner.execute_do(&input, action)));
        match outcome {
            Ok(Ok(DoOutcome { result, undo })) => {
                if let Some(undo) = undo {
                    context.set_undo_parameter(undo)?;
                }
                context.set_result(result)
            }
            Ok(Err(err)) => {
                tracing::debug!(command_id = self.id(), error = %err, "do-step failed");
                context.fail(err)
            }
            Err(payload) => context.fail(CommandError::Panicked {
                command_id: self.id().to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn undo_command(&self, context: &mut Context, action: &ActionContext) -> Result<()> {
        if !self.inner.is_undoable() {
            return Err(CommandError::NotUndoable {
                command_id: self.id().to_string(),
            });
        }
        if context.state() != State::Done {
            return Err(CommandError::Precondition {
                command_id: self.id().to_string(),
                operation: "undo",
                state: context.state(),
            });
        }
        let Some(undo) = context
            .undo_parameter()
            .and_then(|p| p.as_value())
            .cloned()
        else {
            return Err(CommandError::MissingUndoParameter {
                command_id: self.id().to_string(),
            });
        };

        context.start_undo()?;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.inner.execute_undo(&undo, action)));
        match outcome {
            Ok(Ok(())) => context.mark_undone(),
            Ok(Err(err)) => {
                tracing::debug!(command_id = self.id(), error = %err, "undo-step failed");
                context.fail(err)
            }
            Err(payload) => context.fail(CommandError::Panicked {
                command_id: self.id().to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn is_undoable(&self) -> bool {
        self.inner.is_undoable()
    }
}
