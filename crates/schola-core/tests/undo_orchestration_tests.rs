//! Undo Orchestration Tests
//!
//! ## Scenarios Covered
//!
//! 1. Undo of a composite that never reached DONE fails fast, touching nothing
//! 2. Undo without a captured nested collection fails fast
//! 3. Compensation of a failed composite keeps it FAIL
//! 4. Macro-of-macros do and undo order
//! 5. Compensation descends into nested composites that failed part way,
//!    sequential and parallel

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{action, nested_states, Journal, Step};
use std::sync::Arc;

use schola_core::{
    Command, CommandError, CompositeCommand, Context, IndependentCommand, InlineWorkerPool,
    NestedCommand, State,
};
use serde_json::json;

fn abc(journal: &Journal) -> IndependentCommand {
    CompositeCommand::independent("abc")
        .with_nested(NestedCommand::atomic(Step::new("a", journal)))
        .with_nested(NestedCommand::atomic(Step::new("b", journal)))
        .with_nested(NestedCommand::atomic(Step::new("c", journal)))
}

#[test]
fn test_undo_of_never_done_composite_fails_fast() {
    // GIVEN a composite context that was created but never executed
    let journal = Journal::new();
    let composite = abc(&journal);
    let mut ctx = composite.create_context(json!({}));

    // WHEN undo is requested
    let err = composite.undo_command(&mut ctx, &action()).unwrap_err();

    // THEN it is rejected and no nested command was touched
    assert!(matches!(
        err,
        CommandError::Precondition { operation: "undo", state: State::Ready, .. }
    ));
    assert_eq!(ctx.state(), State::Ready);
    assert!(journal.with_prefix("undo:").is_empty());
    assert_eq!(nested_states(&ctx), vec![State::Ready, State::Ready, State::Ready]);
}

#[test]
fn test_undo_of_failed_composite_is_rejected() {
    let journal = Journal::new();
    let composite = CompositeCommand::sequential("ab")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("b", &journal).failing()));
    let mut ctx = composite.execute(json!({}), &action());

    assert!(composite.undo_command(&mut ctx, &action()).is_err());
    assert_eq!(ctx.state(), State::Fail);
    assert!(journal.with_prefix("undo:").is_empty());
}

#[test]
fn test_undo_without_nested_collection_fails_fast() {
    // GIVEN a done context that carries no undo parameter
    let journal = Journal::new();
    let composite = abc(&journal);
    let mut ctx = Context::ready("abc", json!({}));
    ctx.start_work().unwrap();
    ctx.set_result(json!("forged")).unwrap();

    // WHEN undo is requested
    let err = composite.undo_command(&mut ctx, &action()).unwrap_err();

    // THEN the missing parameter is reported and the context stays done
    assert!(matches!(err, CommandError::MissingUndoParameter { .. }));
    assert_eq!(ctx.state(), State::Done);
    assert!(journal.with_prefix("undo:").is_empty());
}

#[test]
fn test_compensate_failed_rolls_back_done_nested() {
    // GIVEN a sequence that failed on its last command
    let journal = Journal::new();
    let composite = CompositeCommand::sequential("abc")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("b", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("c", &journal).failing()));
    let ctx = composite.execute(json!({}), &action());
    assert_eq!(ctx.state(), State::Fail);

    // WHEN it is compensated
    let failure = composite.compensate_failed(&ctx, &action()).unwrap();

    // THEN the completed commands were undone in reverse and the composite stays FAIL
    assert!(failure.is_none());
    assert_eq!(journal.with_prefix("undo:"), vec!["undo:b", "undo:a"]);
    assert_eq!(nested_states(&ctx), vec![State::Undone, State::Undone, State::Fail]);
    assert_eq!(ctx.state(), State::Fail);

    // AND a second compensation finds nothing left to undo
    assert!(composite.compensate_failed(&ctx, &action()).unwrap().is_none());
    assert_eq!(journal.with_prefix("undo:").len(), 2);
}

#[test]
fn test_compensate_failed_requires_failed_context() {
    let journal = Journal::new();
    let composite = abc(&journal);
    let ctx = composite.execute(json!({}), &action());

    let err = composite.compensate_failed(&ctx, &action()).unwrap_err();
    assert!(matches!(err, CommandError::Precondition { operation: "compensate", .. }));
}

#[test]
fn test_compensate_failed_without_nested_pass() {
    // creation failed: nothing ran, nothing to compensate
    let journal = Journal::new();
    let composite = CompositeCommand::sequential("a")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal).rejecting_input()));
    let ctx = composite.create_context(json!({}));

    let err = composite.compensate_failed(&ctx, &action()).unwrap_err();
    assert!(matches!(err, CommandError::MissingUndoParameter { .. }));
}

#[test]
fn test_macro_of_macros_undoes_inner_first() {
    // GIVEN an outer sequence [a, inner[b, c]]
    let journal = Journal::new();
    let inner = CompositeCommand::sequential("inner")
        .with_nested(NestedCommand::atomic(Step::new("b", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("c", &journal)));
    let outer = CompositeCommand::sequential("outer")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::composite(inner));

    // WHEN it is executed and undone
    let mut ctx = outer.execute(json!({}), &action());
    assert_eq!(ctx.state(), State::Done);
    assert_eq!(ctx.result(), Some(&common::result_of("c")));
    outer.undo_command(&mut ctx, &action()).unwrap();

    // THEN the nested composite behaves as a single reversible unit
    assert_eq!(ctx.state(), State::Undone);
    assert_eq!(
        journal.with_prefix("do:").into_iter().chain(journal.with_prefix("undo:")).collect::<Vec<_>>(),
        vec!["do:a", "do:b", "do:c", "undo:c", "undo:b", "undo:a"]
    );
}

/// States of the nested contexts of the composite registered at `index`
fn inner_states(context: &Context, index: usize) -> Vec<State> {
    let nested = context
        .redo_parameter()
        .and_then(|p| p.as_macro())
        .map(|m| m.nested_contexts()[index].clone())
        .expect("composite context");
    let inner = nested.lock();
    nested_states(&inner)
}

#[test]
fn test_inner_macro_failure_propagates_and_compensates() {
    // GIVEN an inner sequence that fails after b1 completed
    let journal = Journal::new();
    let inner = CompositeCommand::sequential("inner")
        .with_nested(NestedCommand::atomic(Step::new("b1", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("b2", &journal).failing()));
    let outer = CompositeCommand::sequential("outer")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::composite(inner))
        .with_nested(NestedCommand::atomic(Step::new("c", &journal)));

    let ctx = outer.execute(json!({}), &action());

    assert_eq!(ctx.exception(), Some(&common::do_failure("b2")));
    assert_eq!(nested_states(&ctx), vec![State::Done, State::Fail, State::Cancel]);
    assert_eq!(inner_states(&ctx, 1), vec![State::Done, State::Fail]);

    // WHEN the failed outer composite is compensated
    let failure = outer.compensate_failed(&ctx, &action()).unwrap();

    // THEN the completed work inside the failed inner composite is rolled back too
    assert!(failure.is_none());
    assert_eq!(ctx.state(), State::Fail);
    assert_eq!(journal.with_prefix("undo:"), vec!["undo:b1", "undo:a"]);
    assert_eq!(nested_states(&ctx), vec![State::Undone, State::Fail, State::Cancel]);
    assert_eq!(inner_states(&ctx, 1), vec![State::Undone, State::Fail]);

    // AND a second pass finds nothing left to undo
    assert!(outer.compensate_failed(&ctx, &action()).unwrap().is_none());
    assert_eq!(journal.with_prefix("undo:").len(), 2);
}

#[test]
fn test_inner_macro_compensation_failure_is_surfaced() {
    let journal = Journal::new();
    let inner = CompositeCommand::sequential("inner")
        .with_nested(NestedCommand::atomic(Step::new("b1", &journal).failing_undo()))
        .with_nested(NestedCommand::atomic(Step::new("b2", &journal).failing()));
    let outer = CompositeCommand::sequential("outer")
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::composite(inner));
    let ctx = outer.execute(json!({}), &action());

    let failure = outer.compensate_failed(&ctx, &action()).unwrap();

    assert_eq!(failure, Some(common::undo_failure("b1")));
    assert_eq!(journal.with_prefix("undo:"), vec!["undo:b1", "undo:a"]);
    assert_eq!(nested_states(&ctx), vec![State::Undone, State::Fail]);
}

#[test]
fn test_parallel_outer_compensates_failed_inner_macro_eagerly() {
    // GIVEN a parallel composite holding a sequence that fails after b1
    let journal = Journal::new();
    let inner = CompositeCommand::sequential("inner")
        .with_nested(NestedCommand::atomic(Step::new("b1", &journal)))
        .with_nested(NestedCommand::atomic(Step::new("b2", &journal).failing()));
    let outer = CompositeCommand::parallel("outer", Arc::new(InlineWorkerPool))
        .with_nested(NestedCommand::atomic(Step::new("a", &journal)))
        .with_nested(NestedCommand::composite(inner));

    // WHEN it executes
    let ctx = outer.execute(json!({}), &action());

    // THEN nothing is left applied, inner work included
    assert_eq!(ctx.state(), State::Fail);
    assert_eq!(ctx.exception(), Some(&common::do_failure("b2")));
    assert_eq!(journal.with_prefix("undo:"), vec!["undo:b1", "undo:a"]);
    assert_eq!(nested_states(&ctx), vec![State::Undone, State::Fail]);
    assert_eq!(inner_states(&ctx, 1), vec![State::Undone, State::Fail]);
}
