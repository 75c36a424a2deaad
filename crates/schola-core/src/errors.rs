use crate::context::State;
use schola_core_types::RequestId;
use thiserror::Error;

/// Result type alias using CommandError
pub type Result<T> = std::result::Result<T, CommandError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used by log lines, tests and
/// callers that need to branch on a failure without matching every
/// `CommandError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Context lifecycle
    CannotCreateContext,
    IllegalTransition,
    AlreadySet,
    MissingParameter,

    // Execution
    CommandFailed,
    UndoFailed,
    NotUndoable,
    TransferFailed,
    Panicked,

    // Orchestration
    NestedNotReady,
    NestedMismatch,
    EmptyComposite,
    Precondition,

    // Configuration / resources
    Config,
    WorkerPool,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::CannotCreateContext => "ERR_CANNOT_CREATE_CONTEXT",
            ExErrorKind::IllegalTransition => "ERR_ILLEGAL_TRANSITION",
            ExErrorKind::AlreadySet => "ERR_ALREADY_SET",
            ExErrorKind::MissingParameter => "ERR_MISSING_PARAMETER",
            ExErrorKind::CommandFailed => "ERR_COMMAND_FAILED",
            ExErrorKind::UndoFailed => "ERR_UNDO_FAILED",
            ExErrorKind::NotUndoable => "ERR_NOT_UNDOABLE",
            ExErrorKind::TransferFailed => "ERR_TRANSFER_FAILED",
            ExErrorKind::Panicked => "ERR_PANICKED",
            ExErrorKind::NestedNotReady => "ERR_NESTED_NOT_READY",
            ExErrorKind::NestedMismatch => "ERR_NESTED_MISMATCH",
            ExErrorKind::EmptyComposite => "ERR_EMPTY_COMPOSITE",
            ExErrorKind::Precondition => "ERR_PRECONDITION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::WorkerPool => "ERR_WORKER_POOL",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the command the failure belongs to, so
/// log lines and API responses can be built without string parsing.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    command_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            command_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = Some(id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn command_id(&self) -> Option<&str> {
        self.command_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(command_id) = &self.command_id {
            write!(f, " (command_id: {})", command_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Every failure the engine records on a context or returns to a caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    // ===== Context creation =====
    #[error("Cannot create command context for '{command_id}': {reason}")]
    CannotCreateContext { command_id: String, reason: String },

    // ===== State machine =====
    #[error("Illegal state transition for '{command_id}': {from} -> {to}")]
    IllegalTransition {
        command_id: String,
        from: State,
        to: State,
    },

    #[error("{what} already set on context of '{command_id}'")]
    AlreadySet {
        command_id: String,
        what: &'static str,
    },

    #[error("Redo parameter missing or malformed for '{command_id}'")]
    MissingRedoParameter { command_id: String },

    #[error("Undo parameter missing or malformed for '{command_id}'")]
    MissingUndoParameter { command_id: String },

    // ===== Execution =====
    #[error("Command '{command_id}' failed: {message}")]
    ExecutionFailed { command_id: String, message: String },

    #[error("Undo of '{command_id}' failed: {message}")]
    UndoFailed { command_id: String, message: String },

    #[error("Command '{command_id}' cannot be undone")]
    NotUndoable { command_id: String },

    #[error("Transfer of previous result into '{command_id}' failed: {reason}")]
    TransferFailed { command_id: String, reason: String },

    #[error("Command '{command_id}' panicked: {message}")]
    Panicked { command_id: String, message: String },

    // ===== Orchestration =====
    #[error("Nested context #{index} of '{command_id}' is not ready (state {state})")]
    NestedContextNotReady {
        command_id: String,
        index: usize,
        state: State,
    },

    #[error("Composite '{command_id}' expected {expected} nested contexts, found {actual}")]
    NestedCountMismatch {
        command_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Composite '{command_id}' has no nested commands")]
    EmptyComposite { command_id: String },

    #[error("Cannot {operation} '{command_id}' in state {state}")]
    Precondition {
        command_id: String,
        operation: &'static str,
        state: State,
    },

    // ===== Configuration / resources =====
    #[error("Invalid engine configuration: {message}")]
    Config { message: String },

    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CommandError {
    /// Business failure raised by a command's do-step
    pub fn failed(command_id: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::ExecutionFailed {
            command_id: command_id.into(),
            message: message.into(),
        }
    }

    /// Business failure raised by a command's undo-step
    pub fn undo_failed(command_id: impl Into<String>, message: impl Into<String>) -> Self {
        CommandError::UndoFailed {
            command_id: command_id.into(),
            message: message.into(),
        }
    }

    pub fn cannot_create(command_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CommandError::CannotCreateContext {
            command_id: command_id.into(),
            reason: reason.into(),
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            CommandError::CannotCreateContext { .. } => ExErrorKind::CannotCreateContext,
            CommandError::IllegalTransition { .. } => ExErrorKind::IllegalTransition,
            CommandError::AlreadySet { .. } => ExErrorKind::AlreadySet,
            CommandError::MissingRedoParameter { .. } | CommandError::MissingUndoParameter { .. } => {
                ExErrorKind::MissingParameter
            }
            CommandError::ExecutionFailed { .. } => ExErrorKind::CommandFailed,
            CommandError::UndoFailed { .. } => ExErrorKind::UndoFailed,
            CommandError::NotUndoable { .. } => ExErrorKind::NotUndoable,
            CommandError::TransferFailed { .. } => ExErrorKind::TransferFailed,
            CommandError::Panicked { .. } => ExErrorKind::Panicked,
            CommandError::NestedContextNotReady { .. } => ExErrorKind::NestedNotReady,
            CommandError::NestedCountMismatch { .. } => ExErrorKind::NestedMismatch,
            CommandError::EmptyComposite { .. } => ExErrorKind::EmptyComposite,
            CommandError::Precondition { .. } => ExErrorKind::Precondition,
            CommandError::Config { .. } => ExErrorKind::Config,
            CommandError::WorkerPool { .. } => ExErrorKind::WorkerPool,
            CommandError::Internal { .. } => ExErrorKind::Internal,
        }
    }

    /// Identifier of the command the failure belongs to, if any
    pub fn command_id(&self) -> Option<&str> {
        match self {
            CommandError::CannotCreateContext { command_id, .. }
            | CommandError::IllegalTransition { command_id, .. }
            | CommandError::AlreadySet { command_id, .. }
            | CommandError::MissingRedoParameter { command_id }
            | CommandError::MissingUndoParameter { command_id }
            | CommandError::ExecutionFailed { command_id, .. }
            | CommandError::UndoFailed { command_id, .. }
            | CommandError::NotUndoable { command_id }
            | CommandError::TransferFailed { command_id, .. }
            | CommandError::Panicked { command_id, .. }
            | CommandError::NestedContextNotReady { command_id, .. }
            | CommandError::NestedCountMismatch { command_id, .. }
            | CommandError::EmptyComposite { command_id }
            | CommandError::Precondition { command_id, .. } => Some(command_id),
            CommandError::Config { .. }
            | CommandError::WorkerPool { .. }
            | CommandError::Internal { .. } => None,
        }
    }
}

impl From<CommandError> for ExError {
    fn from(err: CommandError) -> Self {
        let ex = ExError::new(err.kind()).with_message(err.to_string());
        match err.command_id() {
            Some(id) => ex.with_command_id(id),
            None => ex,
        }
    }
}

impl From<&CommandError> for ExError {
    fn from(err: &CommandError) -> Self {
        err.clone().into()
    }
}
