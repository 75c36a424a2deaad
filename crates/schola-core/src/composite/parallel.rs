//! Concurrent execution on a worker pool

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    cancel_nested, run_nested_do, run_nested_undo, NestedExecution, NestedRollback, NestedScope,
};
use crate::context::{ContextHandle, State, StateChangedListener};
use crate::errors::CommandError;
use crate::pool::{PoolTask, WorkerPool};

/// Runs every nested command as its own pool task and joins them
///
/// A task that starts after a peer failed cancels its context instead of
/// running. Once all tasks joined, peers that reached `Done` are undone and
/// nested composites that failed part way are compensated, all within the
/// same do call, so a failed parallel composite leaves nothing applied.
#[derive(Clone)]
pub struct Parallel {
    pool: Arc<dyn WorkerPool>,
}

impl Parallel {
    pub fn new(pool: Arc<dyn WorkerPool>) -> Self {
        Self { pool }
    }

    /// Undo every `Done` context and compensate every `Fail` one through the
    /// pool, submitted last-first.
    /// Returns the failure of the lowest index.
    fn undo_all(
        &self,
        scope: &NestedScope<'_>,
        contexts: &[ContextHandle],
        listener: &Arc<dyn StateChangedListener>,
    ) -> Option<CommandError> {
        let failures: Mutex<Vec<(usize, CommandError)>> = Mutex::new(Vec::new());
        let tasks: Vec<PoolTask<'_>> = contexts
            .iter()
            .enumerate()
            .rev()
            .map(|(index, handle)| {
                let failures = &failures;
                Box::new(move || {
                    if let Some(err) = run_nested_undo(scope, index, handle, listener) {
                        failures.lock().push((index, err));
                    }
                }) as PoolTask<'_>
            })
            .collect();
        self.pool.run_all(tasks);

        failures
            .into_inner()
            .into_iter()
            .min_by_key(|(index, _)| *index)
            .map(|(_, err)| err)
    }
}

impl NestedExecution for Parallel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn execute_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> Vec<ContextHandle> {
        let failed = AtomicBool::new(false);
        let tasks: Vec<PoolTask<'_>> = contexts
            .iter()
            .enumerate()
            .map(|(index, handle)| {
                let failed = &failed;
                Box::new(move || {
                    if failed.load(Ordering::SeqCst) {
                        cancel_nested(scope, index, handle);
                        return;
                    }
                    if run_nested_do(scope, index, handle, listener) != State::Done {
                        failed.store(true, Ordering::SeqCst);
                    }
                }) as PoolTask<'_>
            })
            .collect();
        self.pool.run_all(tasks);

        if failed.load(Ordering::SeqCst) {
            tracing::debug!(
                composite_id = scope.composite_id,
                "nested failure, compensating completed peers"
            );
            if let Some(err) = self.undo_all(scope, &contexts, listener) {
                tracing::warn!(
                    composite_id = scope.composite_id,
                    error = %err,
                    "eager compensation incomplete"
                );
            }
        }
        contexts
    }

    fn rollback_nested(
        &self,
        scope: &NestedScope<'_>,
        contexts: Vec<ContextHandle>,
        listener: &Arc<dyn StateChangedListener>,
    ) -> NestedRollback {
        let failure = self.undo_all(scope, &contexts, listener);
        NestedRollback { contexts, failure }
    }
}
