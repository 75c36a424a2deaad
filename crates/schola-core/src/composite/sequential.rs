//! Stop-the-line execution in registration order

use std::sync::Arc;

use super::{
    cancel_nested, rollback_in_reverse, run_nested_do, NestedExecution, NestedRollback,
    NestedScope,
};
use crate::context::{ContextHandle, Parameter, Payload, State, StateChangedListener};
use crate::errors::CommandError;

/// Feeds the result of one nested command into the redo parameter of the next
///
/// Runs while the next context is still `Ready`. An `Err` fails that context
/// with `TransferFailed` and stops the sequence.
pub trait ResultTransfer: Send + Sync {
    fn transfer(&self, previous: &Payload, next: &mut Parameter) -> Result<(), String>;
}

/// Leaves the next input untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransfer;

impl ResultTransfer for NoTransfer {
    fn transfer(&self, _previous: &Payload, _next: &mut Parameter) -> Result<(), String> {
        Ok(())
    }
}

/// The previous result becomes the next input
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceInput;

impl ResultTransfer for ReplaceInput {
    fn transfer(&self, previous: &Payload, next: &mut Parameter) -> Result<(), String> {
        match next {
            Parameter::Value(value) => {
                *value = previous.clone();
                Ok(())
            }
            _ => Err("next input is not a plain value".to_string()),
        }
    }
}

/// The previous result is stored under `field` of the next (object) input
#[derive(Debug, Clone)]
pub struct InsertField {
    field: String,
}

impl InsertField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl ResultTransfer for InsertField {
    fn transfer(&self, previous: &Payload, next: &mut Parameter) -> Result<(), String> {
        match next {
            Parameter::Value(Payload::Object(map)) => {
                map.insert(self.field.clone(), previous.clone());
                Ok(())
            }
            _ => Err(format!(
                "cannot insert field '{}': next input is not an object",
                self.field
            )),
        }
    }
}

impl<F> ResultTransfer for F
where
    F: Fn(&Payload, &mut Payload) -> Result<(), String> + Send + Sync,
{
    fn transfer(&self, previous: &Payload, next: &mut Parameter) -> Result<(), String> {
        match next {
            Parameter::Value(value) => self(previous, value),
            _ => Err("next input is not a plain value".to_string()),
        }
    }
}

/// Runs nested commands one at a time in registration order
///
/// The first failure cancels every later context; earlier ones stay `Done`
/// until the composite is undone or compensated.
#[derive(Clone)]
pub struct Sequential {
    transfer: Arc<dyn ResultTransfer>,
}

impl Default for Sequential {
    fn default() -> Self {
        Self {
            transfer: Arc::new(NoTransfer),
        }
    }
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transfer(transfer: impl ResultTransfer + 'static) -> Self {
        Self {
            transfer: Arc::new(transfer),
        }
    }

    /// Rewrite the redo parameter of `contexts[index]`; false when the
    /// transfer failed and the context is now `Fail`.
    fn transfer_into(
        &self,
        scope: &NestedScope<'_>,
        index: usize,
        handle: &ContextHandle,
        previous: &Payload,
    ) -> bool {
        let mut ctx = handle.lock();
        if ctx.state() != State::Ready {
            return true;
        }
        let outcome = match ctx.redo_parameter_mut() {
            Some(parameter) => self.transfer.transfer(previous, parameter),
            None => Err("no redo parameter".to_string()),
        };
        match outcome {
            Ok(()) => {
                tracing::debug!(
                    composite_id = scope.composite_id,
                    from = index - 1,
                    to = index,
                    "result transferred"
                );
                true
            }
            Err(reason) => {
                let command_id = ctx.command_id().to_string();
                let _ = ctx.fail(CommandError::TransferFailed { command_id, reason });
                false
            }
        }
    }
}

impl NestedExecution for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn execute_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> Vec<ContextHandle> {
        let mut previous: Option<Payload> = None;
        let mut stopped = false;

        for (index, handle) in contexts.iter().enumerate() {
            if stopped {
                cancel_nested(scope, index, handle);
                continue;
            }
            if let Some(result) = previous.take() {
                if !self.transfer_into(scope, index, handle, &result) {
                    stopped = true;
                    continue;
                }
            }
            match run_nested_do(scope, index, handle, listener) {
                State::Done => previous = handle.lock().result().cloned(),
                _ => stopped = true,
            }
        }

        if previous.is_some() {
            tracing::debug!(
                composite_id = scope.composite_id,
                "last nested result kept, nothing to transfer into"
            );
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
