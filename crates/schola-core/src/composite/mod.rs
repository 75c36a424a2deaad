//! Composite (macro) commands
//!
//! A composite fans its input out to one context per nested command, runs
//! the nested do-steps through a [`NestedExecution`] strategy and rolls them
//! back in reverse on undo. The strategy decides ordering, transfer of
//! intermediate results and failure handling; everything else (state
//! bookkeeping, result aggregation, logging) lives here.
//!
//! Strategies shipped with the crate:
//! - [`Sequential`]: registration order, stop-the-line on failure, optional
//!   result transfer between neighbours
//! - [`Parallel`]: one task per nested command on a [`WorkerPool`],
//!   cooperative cancellation and eager compensation of succeeded peers
//! - [`Independent`]: registration order, every nested command attempted
//!
//! [`WorkerPool`]: crate::pool::WorkerPool

mod parallel;
mod plain;
mod sequential;

pub use parallel::Parallel;
pub use plain::Independent;
pub use sequential::{InsertField, NoTransfer, ReplaceInput, ResultTransfer, Sequential};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use schola_core_types::schema::{OP_COMPENSATE, OP_CREATE_CONTEXT, OP_DO, OP_UNDO};
use schola_core_types::ActionContext;

use crate::action::{ActionExecutor, ActionExecutorListener, NoopActionExecutor};
use crate::commands::{
    panic_message, Command, DefaultPreparer, NestedCommand, NestedContextPreparer,
};
use crate::context::{
    Context, ContextHandle, MacroCommandParameter, Parameter, Payload, State,
    StateChangedListener,
};
use crate::errors::{CommandError, Result};
use crate::pool::WorkerPool;
use crate::{log_op_end, log_op_error, log_op_start};

/// Immutable view of the composite handed to a strategy
pub struct NestedScope<'a> {
    pub composite_id: &'a str,
    pub nested: &'a [NestedCommand],
    pub action: &'a ActionContext,
}

/// Outcome of a rollback pass
pub struct NestedRollback {
    pub contexts: Vec<ContextHandle>,
    /// Last compensation failure observed in walk order
    pub failure: Option<CommandError>,
}

/// Extension point deciding how nested contexts are driven
///
/// `contexts[i]` belongs to `scope.nested[i]`. Implementations never return
/// errors: every failure ends up on a nested context (do) or in
/// [`NestedRollback::failure`] (undo). The listener must be attached to each
/// nested context while its command runs; [`run_nested_do`] and
/// [`run_nested_undo`] do that.
pub trait NestedExecution: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    fn execute_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> Vec<ContextHandle>;

    fn rollback_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> NestedRollback;
}

/// Which nested result becomes the composite's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultPolicy {
    #[default]
    LastNested,
    /// Result of the nested command registered at this position
    Nested(usize),
}

pub struct CompositeCommand<E> {
    id: String,
    nested: Vec<NestedCommand>,
    strategy: E,
    preparer: Arc<dyn NestedContextPreparer>,
    result_policy: ResultPolicy,
    executor: Arc<dyn ActionExecutor>,
}

pub type SequentialCommand = CompositeCommand<Sequential>;
pub type ParallelCommand = CompositeCommand<Parallel>;
pub type IndependentCommand = CompositeCommand<Independent>;

impl CompositeCommand<Sequential> {
    pub fn sequential(id: impl Into<String>) -> Self {
        Self::new(id, Sequential::default())
    }
}

impl CompositeCommand<Parallel> {
    pub fn parallel(id: impl Into<String>, pool: Arc<dyn WorkerPool>) -> Self {
        Self::new(id, Parallel::new(pool))
    }
}

impl CompositeCommand<Independent> {
    pub fn independent(id: impl Into<String>) -> Self {
        Self::new(id, Independent)
    }
}

impl<E: NestedExecution> CompositeCommand<E> {
    pub fn new(id: impl Into<String>, strategy: E) -> Self {
        Self {
            id: id.into(),
            nested: Vec::new(),
            strategy,
            preparer: Arc::new(DefaultPreparer),
            result_policy: ResultPolicy::default(),
            executor: Arc::new(NoopActionExecutor),
        }
    }

    /// Register a nested command; registration order is the do order
    pub fn with_nested(mut self, nested: NestedCommand) -> Self {
        self.nested.push(nested);
        self
    }

    pub fn with_preparer(mut self, preparer: impl NestedContextPreparer + 'static) -> Self {
        self.preparer = Arc::new(preparer);
        self
    }

    pub fn with_result_policy(mut self, policy: ResultPolicy) -> Self {
        self.result_policy = policy;
        self
    }

    pub fn with_action_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn nested(&self) -> &[NestedCommand] {
        &self.nested
    }

    pub fn strategy(&self) -> &E {
        &self.strategy
    }

    /// Roll back the `Done` nested contexts of a composite that ended in
    /// `Fail`. The composite context stays `Fail`. Nested composites that
    /// failed part way are compensated recursively.
    ///
    /// Returns the surfaced compensation failure, if any. Calling it again
    /// is harmless: already compensated contexts are skipped.
    ///
    /// # Errors
    ///
    /// `Precondition` if `context` is not `Fail`, `MissingUndoParameter` if
    /// the failure happened before any nested command ran.
    pub fn compensate_failed(
        &self,
        context: &Context,
        action: &ActionContext,
    ) -> Result<Option<CommandError>> {
        if context.state() != State::Fail {
            return Err(self.precondition("compensate", context.state()));
        }
        let contexts = self.captured_contexts(context)?;

        log_op_start!(
            OP_COMPENSATE,
            command_id = self.id.as_str(),
            context_id = %context.id(),
            request_id = %action.request_id()
        );
        let start = Instant::now();

        let rollback = self.rollback(contexts, action);
        let duration_ms = elapsed_ms(start);
        match &rollback.failure {
            Some(err) => log_op_error!(
                OP_COMPENSATE,
                err,
                duration_ms = duration_ms,
                command_id = self.id.as_str()
            ),
            None => log_op_end!(
                OP_COMPENSATE,
                duration_ms = duration_ms,
                command_id = self.id.as_str()
            ),
        }
        Ok(rollback.failure)
    }

    fn scope<'a>(&'a self, action: &'a ActionContext) -> NestedScope<'a> {
        NestedScope {
            composite_id: &self.id,
            nested: &self.nested,
            action,
        }
    }

    fn listener(&self, action: &ActionContext) -> Arc<dyn StateChangedListener> {
        Arc::new(ActionExecutorListener::new(
            self.executor.clone(),
            action.clone(),
        ))
    }

    fn precondition(&self, operation: &'static str, state: State) -> CommandError {
        CommandError::Precondition {
            command_id: self.id.clone(),
            operation,
            state,
        }
    }

    /// Nested collection stored as undo parameter by the do pass
    fn captured_contexts(&self, context: &Context) -> Result<Vec<ContextHandle>> {
        match context.undo_parameter().and_then(Parameter::as_nested) {
            Some(nested) if nested.len() == self.nested.len() => Ok(nested.to_vec()),
            _ => Err(CommandError::MissingUndoParameter {
                command_id: self.id.clone(),
            }),
        }
    }

    fn run_do(&self, context: &mut Context, action: &ActionContext) -> Result<()> {
        let contexts = context
            .redo_parameter()
            .and_then(Parameter::as_macro)
            .map(|p| p.nested_contexts().to_vec());
        context.start_work()?;

        let Some(contexts) = contexts else {
            return context.fail(CommandError::MissingRedoParameter {
                command_id: self.id.clone(),
            });
        };
        if self.nested.is_empty() {
            return context.fail(CommandError::EmptyComposite {
                command_id: self.id.clone(),
            });
        }
        if contexts.len() != self.nested.len() {
            return context.fail(CommandError::NestedCountMismatch {
                command_id: self.id.clone(),
                expected: self.nested.len(),
                actual: contexts.len(),
            });
        }

        let listener = self.listener(action);
        let scope = self.scope(action);
        let contexts = match catch_unwind(AssertUnwindSafe(|| {
            self.strategy.execute_nested(&scope, contexts, &listener)
        })) {
            Ok(contexts) => contexts,
            Err(payload) => {
                return context.fail(CommandError::Panicked {
                    command_id: self.id.clone(),
                    message: panic_message(payload.as_ref()),
                })
            }
        };

        context.set_undo_parameter(Parameter::Nested(contexts.clone()))?;
        if let Some(err) = first_do_failure(&contexts) {
            return context.fail(err);
        }

        let states: Vec<State> = contexts.iter().map(|h| h.lock().state()).collect();
        if states.iter().any(|s| *s != State::Done) {
            return context.fail(CommandError::Internal {
                message: format!(
                    "nested pass of '{}' ended without failure in states {:?}",
                    self.id, states
                ),
            });
        }

        match self.aggregate(&contexts) {
            Ok(result) => context.set_result(result),
            Err(err) => context.fail(err),
        }
    }

    fn aggregate(&self, contexts: &[ContextHandle]) -> Result<Payload> {
        let index = match self.result_policy {
            ResultPolicy::LastNested => contexts.len().saturating_sub(1),
            ResultPolicy::Nested(index) => index,
        };
        contexts
            .get(index)
            .and_then(|h| h.lock().result().cloned())
            .ok_or_else(|| CommandError::Internal {
                message: format!(
                    "result policy of '{}' selects nested #{} which has no result",
                    self.id, index
                ),
            })
    }

    fn rollback(&self, contexts: Vec<ContextHandle>, action: &ActionContext) -> NestedRollback {
        let listener = self.listener(action);
        let scope = self.scope(action);
        let fallback = contexts.clone();
        match catch_unwind(AssertUnwindSafe(|| {
            self.strategy.rollback_nested(&scope, contexts, &listener)
        })) {
            Ok(rollback) => rollback,
            Err(payload) => NestedRollback {
                contexts: fallback,
                failure: Some(CommandError::Panicked {
                    command_id: self.id.clone(),
                    message: panic_message(payload.as_ref()),
                }),
            },
        }
    }
}

impl<E: NestedExecution> Command for CompositeCommand<E> {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_context(&self, input: Payload) -> Context {
        log_op_start!(
            OP_CREATE_CONTEXT,
            command_id = self.id.as_str(),
            nested_len = self.nested.len()
        );
        let start = Instant::now();

        let mut contexts = Vec::with_capacity(self.nested.len());
        let mut first_failure = None;
        for (index, nested) in self.nested.iter().enumerate() {
            let ctx = self.preparer.prepare(&self.id, nested, &input);
            if ctx.state() != State::Ready && first_failure.is_none() {
                first_failure = Some(ctx.exception().cloned().unwrap_or_else(|| {
                    CommandError::NestedContextNotReady {
                        command_id: self.id.clone(),
                        index,
                        state: ctx.state(),
                    }
                }));
            }
            contexts.push(ctx.into_handle());
        }

        let duration_ms = elapsed_ms(start);
        match first_failure {
            Some(err) => {
                log_op_error!(
                    OP_CREATE_CONTEXT,
                    &err,
                    duration_ms = duration_ms,
                    command_id = self.id.as_str()
                );
                Context::failed(self.id.as_str(), err)
            }
            None => {
                log_op_end!(
                    OP_CREATE_CONTEXT,
                    duration_ms = duration_ms,
                    command_id = self.id.as_str()
                );
                Context::ready(
                    self.id.as_str(),
                    Parameter::Macro(MacroCommandParameter::new(input, contexts)),
                )
            }
        }
    }

    fn do_command(&self, context: &mut Context, action: &ActionContext) -> Result<()> {
        if context.state() != State::Ready {
            return Err(self.precondition("do", context.state()));
        }

        log_op_start!(
            OP_DO,
            command_id = self.id.as_str(),
            context_id = %context.id(),
            request_id = %action.request_id(),
            strategy = self.strategy.name(),
            nested_len = self.nested.len()
        );
        let start = Instant::now();

        if let Err(err) = self.run_do(context, action) {
            // bookkeeping failure after the precondition held
            if context.state() == State::Work {
                let _ = context.fail(CommandError::Internal {
                    message: err.to_string(),
                });
            }
        }

        let duration_ms = elapsed_ms(start);
        match context.exception() {
            Some(err) => log_op_error!(
                OP_DO,
                err,
                duration_ms = duration_ms,
                command_id = self.id.as_str()
            ),
            None => log_op_end!(OP_DO, duration_ms = duration_ms, command_id = self.id.as_str()),
        }
        Ok(())
    }

    fn undo_command(&self, context: &mut Context, action: &ActionContext) -> Result<()> {
        if context.state() != State::Done {
            return Err(self.precondition("undo", context.state()));
        }
        let contexts = self.captured_contexts(context)?;

        log_op_start!(
            OP_UNDO,
            command_id = self.id.as_str(),
            context_id = %context.id(),
            request_id = %action.request_id(),
            strategy = self.strategy.name()
        );
        let start = Instant::now();

        context.start_undo()?;
        let rollback = self.rollback(contexts, action);
        let outcome = match rollback.failure {
            None => context.mark_undone(),
            Some(err) => context.fail(err),
        };

        let duration_ms = elapsed_ms(start);
        match context.exception() {
            Some(err) => log_op_error!(
                OP_UNDO,
                err,
                duration_ms = duration_ms,
                command_id = self.id.as_str()
            ),
            None => log_op_end!(OP_UNDO, duration_ms = duration_ms, command_id = self.id.as_str()),
        }
        outcome
    }

    fn is_undoable(&self) -> bool {
        self.nested.iter().any(|n| n.command().is_undoable())
    }

    fn compensate(&self, context: &Context, action: &ActionContext) -> Option<CommandError> {
        match self.compensate_failed(context, action) {
            Ok(failure) => failure,
            Err(err) => {
                // failed before any nested command ran
                tracing::debug!(
                    command_id = self.id.as_str(),
                    error = %err,
                    "nothing to compensate"
                );
                None
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// First do-step failure in registration order
///
/// Contexts that failed while being compensated are ignored; their do-step
/// succeeded.
fn first_do_failure(contexts: &[ContextHandle]) -> Option<CommandError> {
    contexts.iter().find_map(|handle| {
        let ctx = handle.lock();
        if ctx.state() == State::Fail && !ctx.is_undoing() {
            ctx.exception().cloned()
        } else {
            None
        }
    })
}

/// Run the do-step of nested command `index` on its context
///
/// Returns the state the context ended in. A context that is not `Ready`
/// is failed with `NestedContextNotReady` when its state allows it and is
/// never executed.
pub fn run_nested_do(
    scope: &NestedScope<'_>,
    index: usize,
    handle: &ContextHandle,
    listener: &Arc<dyn StateChangedListener>,
) -> State {
    let mut ctx = handle.lock();
    let state = ctx.state();
    if state != State::Ready {
        let err = CommandError::NestedContextNotReady {
            command_id: scope.composite_id.to_string(),
            index,
            state,
        };
        if ctx.fail(err).is_err() {
            tracing::warn!(
                composite_id = scope.composite_id,
                index,
                state = state.as_str(),
                "nested context skipped"
            );
        }
        return ctx.state();
    }

    let command = scope.nested[index].command();
    ctx.add_listener(listener.clone());
    let outcome = catch_unwind(AssertUnwindSafe(|| command.do_command(&mut ctx, scope.action)));
    ctx.remove_listener(listener);

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err),
        Err(payload) => Some(CommandError::Panicked {
            command_id: command.id().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    };
    if let Some(err) = failure {
        if !ctx.state().is_terminal() && ctx.state() != State::Done {
            let _ = ctx.fail(err);
        }
    }
    ctx.state()
}

/// Run the undo-step of nested command `index` on its context
///
/// `Done` contexts are undone. `Fail` contexts are handed to
/// [`Command::compensate`] so a nested composite that failed part way rolls
/// back its own completed work. Everything else is skipped, as are commands
/// that are not undoable and `Done` contexts without undo data. Returns the
/// compensation failure, if any.
pub fn run_nested_undo(
    scope: &NestedScope<'_>,
    index: usize,
    handle: &ContextHandle,
    listener: &Arc<dyn StateChangedListener>,
) -> Option<CommandError> {
    let command = scope.nested[index].command();
    let mut ctx = handle.lock();
    let failure = match ctx.state() {
        State::Done => undo_done(scope, command, &mut ctx, listener),
        State::Fail => {
            let outcome = catch_unwind(AssertUnwindSafe(|| command.compensate(&ctx, scope.action)));
            outcome.unwrap_or_else(|payload| {
                Some(CommandError::Panicked {
                    command_id: command.id().to_string(),
                    message: panic_message(payload.as_ref()),
                })
            })
        }
        state => {
            tracing::debug!(
                composite_id = scope.composite_id,
                command_id = command.id(),
                state = state.as_str(),
                "compensation skipped"
            );
            None
        }
    };
    if let Some(err) = &failure {
        tracing::warn!(
            composite_id = scope.composite_id,
            command_id = command.id(),
            error = %err,
            "compensation failed"
        );
    }
    failure
}

fn undo_done(
    scope: &NestedScope<'_>,
    command: &Arc<dyn Command>,
    ctx: &mut Context,
    listener: &Arc<dyn StateChangedListener>,
) -> Option<CommandError> {
    if !command.is_undoable() {
        tracing::debug!(
            composite_id = scope.composite_id,
            command_id = command.id(),
            "compensation skipped, command not undoable"
        );
        return None;
    }
    if ctx.undo_parameter().is_none() {
        tracing::debug!(
            composite_id = scope.composite_id,
            command_id = command.id(),
            "compensation skipped, no undo data for this call"
        );
        return None;
    }

    ctx.add_listener(listener.clone());
    let outcome = catch_unwind(AssertUnwindSafe(|| command.undo_command(ctx, scope.action)));
    ctx.remove_listener(listener);

    match outcome {
        Ok(Ok(())) => ctx
            .exception()
            .filter(|_| ctx.state() == State::Fail)
            .cloned(),
        Ok(Err(err)) => Some(err),
        Err(payload) => {
            let err = CommandError::Panicked {
                command_id: command.id().to_string(),
                message: panic_message(payload.as_ref()),
            };
            if ctx.state() == State::Work {
                let _ = ctx.fail(err.clone());
            }
            Some(err)
        }
    }
}

/// Cancel a context that was never started
pub fn cancel_nested(scope: &NestedScope<'_>, index: usize, handle: &ContextHandle) {
    let mut ctx = handle.lock();
    if ctx.cancel().is_err() {
        tracing::debug!(
            composite_id = scope.composite_id,
            index,
            state = ctx.state().as_str(),
            "nested context not cancellable"
        );
    }
}

/// Undo `contexts` one by one, last registered first
///
/// The walk never stops; the last failure observed is surfaced.
pub fn rollback_in_reverse(
    scope: &NestedScope<'_>,
    contexts: Vec<ContextHandle>,
    listener: &Arc<dyn StateChangedListener>,
) -> NestedRollback {
    let mut failure = None;
    for (index, handle) in contexts.iter().enumerate().rev() {
        if let Some(err) = run_nested_undo(scope, index, handle, listener) {
            failure = Some(err);
        }
    }
    NestedRollback { contexts, failure }
}
