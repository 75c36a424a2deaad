#![allow(clippy::unwrap_used, clippy::expect_used)]

use schola_core::{CommandError, ExError, ExErrorKind, State};

#[test]
fn test_every_kind_has_unique_code() {
    let kinds = [
        ExErrorKind::CannotCreateContext,
        ExErrorKind::IllegalTransition,
        ExErrorKind::AlreadySet,
        ExErrorKind::MissingParameter,
        ExErrorKind::CommandFailed,
        ExErrorKind::UndoFailed,
        ExErrorKind::NotUndoable,
        ExErrorKind::TransferFailed,
        ExErrorKind::Panicked,
        ExErrorKind::NestedNotReady,
        ExErrorKind::NestedMismatch,
        ExErrorKind::EmptyComposite,
        ExErrorKind::Precondition,
        ExErrorKind::Config,
        ExErrorKind::WorkerPool,
        ExErrorKind::Internal,
    ];
    let mut codes: Vec<&str> = kinds.iter().map(|k| k.code()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), kinds.len());
    assert!(codes.iter().all(|c| c.starts_with("ERR_")));
}

#[test]
fn test_precondition_error_message_names_state() {
    let err = CommandError::Precondition {
        command_id: "order.place".to_string(),
        operation: "undo",
        state: State::Ready,
    };

    assert_eq!(err.to_string(), "Cannot undo 'order.place' in state READY");
    assert_eq!(err.kind(), ExErrorKind::Precondition);
    assert_eq!(err.command_id(), Some("order.place"));
}

#[test]
fn test_cannot_create_context_converts_to_ex_error() {
    let err = CommandError::cannot_create("address.save", "input is null");
    let ex: ExError = (&err).into();

    assert_eq!(ex.code(), "ERR_CANNOT_CREATE_CONTEXT");
    assert_eq!(ex.command_id(), Some("address.save"));
    assert!(ex.to_string().contains("input is null"));
}

#[test]
fn test_ex_error_builder_keeps_op() {
    let ex = ExError::new(ExErrorKind::WorkerPool)
        .with_op("composite.do")
        .with_command_id("par");

    assert_eq!(ex.op(), Some("composite.do"));
    assert_eq!(
        ex.to_string(),
        "[ERR_WORKER_POOL] in operation 'composite.do' (command_id: par)"
    );
}
