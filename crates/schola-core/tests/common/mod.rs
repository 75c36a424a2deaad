//! Shared test doubles
//!
//! Every double keeps its state per instance; tests build their own
//! `Journal` and hand clones to the commands they register.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use schola_core::action::ActionExecutor;
use schola_core::context::StateChangedListener;
use schola_core::errors::Result;
use schola_core::{ActionContext, AtomicCommand, CommandError, Context, DoOutcome, Payload, State};
use serde_json::json;

/// Ordered record of what the doubles did
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
    inputs: Arc<Mutex<Vec<(String, Payload)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Entries starting with `prefix` ("do:", "undo:", "create:")
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Inputs the do-step of `id` was called with
    pub fn inputs_of(&self, id: &str) -> Vec<Payload> {
        self.inputs
            .lock()
            .iter()
            .filter(|(who, _)| who == id)
            .map(|(_, input)| input.clone())
            .collect()
    }

    fn record_input(&self, id: &str, input: &Payload) {
        self.inputs.lock().push((id.to_string(), input.clone()));
    }
}

/// Configurable business leaf
pub struct Step {
    id: String,
    journal: Journal,
    fail_do: bool,
    fail_undo: bool,
    reject_input: bool,
    undoable: bool,
    delay: Option<Duration>,
}

impl Step {
    pub fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_string(),
            journal: journal.clone(),
            fail_do: false,
            fail_undo: false,
            reject_input: false,
            undoable: true,
            delay: None,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_do = true;
        self
    }

    pub fn failing_undo(mut self) -> Self {
        self.fail_undo = true;
        self
    }

    pub fn rejecting_input(mut self) -> Self {
        self.reject_input = true;
        self
    }

    pub fn not_undoable(mut self) -> Self {
        self.undoable = false;
        self
    }

    pub fn slow(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

/// Result produced by `Step` `id`
pub fn result_of(id: &str) -> Payload {
    json!(format!("{}:done", id))
}

pub fn do_failure(id: &str) -> CommandError {
    CommandError::failed(id, "injected failure")
}

pub fn undo_failure(id: &str) -> CommandError {
    CommandError::undo_failed(id, "injected undo failure")
}

impl AtomicCommand for Step {
    fn id(&self) -> &str {
        &self.id
    }

    fn check_input(&self, _input: &Payload) -> std::result::Result<(), String> {
        self.journal.record(format!("create:{}", self.id));
        if self.reject_input {
            Err("input rejected".to_string())
        } else {
            Ok(())
        }
    }

    fn execute_do(&self, input: &Payload, _action: &ActionContext) -> Result<DoOutcome> {
        self.journal.record(format!("do:{}", self.id));
        self.journal.record_input(&self.id, input);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_do {
            return Err(do_failure(&self.id));
        }
        Ok(DoOutcome::with_undo(result_of(&self.id), json!(self.id)))
    }

    fn execute_undo(&self, _undo: &Payload, _action: &ActionContext) -> Result<()> {
        self.journal.record(format!("undo:{}", self.id));
        if self.fail_undo {
            return Err(undo_failure(&self.id));
        }
        Ok(())
    }

    fn is_undoable(&self) -> bool {
        self.undoable
    }
}

/// Action executor writing "commit:<id>" / "rollback:<id>" into a journal
pub struct RecordingExecutor {
    journal: Journal,
}

impl RecordingExecutor {
    pub fn new(journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
        })
    }
}

impl ActionExecutor for RecordingExecutor {
    fn commit_action(&self, _action: &ActionContext, context: &Context) {
        self.journal.record(format!("commit:{}", context.command_id()));
    }

    fn rollback_action(&self, _action: &ActionContext, context: &Context) {
        self.journal
            .record(format!("rollback:{}", context.command_id()));
    }
}

/// Listener keeping every notification it receives
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<(String, State, State)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<(String, State, State)> {
        self.seen.lock().clone()
    }

    /// New states in notification order
    pub fn entered(&self) -> Vec<State> {
        self.seen.lock().iter().map(|(_, _, to)| *to).collect()
    }
}

impl StateChangedListener for RecordingListener {
    fn state_changed(&self, context: &Context, previous: State, current: State) {
        self.seen
            .lock()
            .push((context.command_id().to_string(), previous, current));
    }
}

pub fn action() -> ActionContext {
    ActionContext::new("test.action")
}

/// States of the nested contexts held in a composite's redo parameter
pub fn nested_states(context: &Context) -> Vec<State> {
    context
        .redo_parameter()
        .and_then(|p| p.as_macro())
        .map(|m| m.nested_contexts().iter().map(|h| h.lock().state()).collect())
        .unwrap_or_default()
}
