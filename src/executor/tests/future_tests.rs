//! Futures: deferred resolution, await, gather, partial resumes

use pretty_assertions::assert_eq;

use super::helpers::{compile_with, expect_exception};
use crate::error::UsageError;
use crate::snapshot::{ExternalResult, FutureSnapshot, Progress};
use crate::value::{CallId, ExcKind, ExceptionValue, Value};

/// Drive a program whose external calls are all answered "pending",
/// until it blocks on its futures.
fn start_pending(source: &str, externals: &[&str]) -> (Vec<CallId>, FutureSnapshot) {
    let program = compile_with(source, &[], externals);
    let mut progress = program.start(vec![]).unwrap();
    loop {
        match progress {
            Progress::FunctionCall {
                call_id,
                mut snapshot,
                ..
            } => {
                progress = snapshot.resume(call_id, ExternalResult::Future).unwrap();
            }
            Progress::AwaitingFutures { pending, snapshot } => return (pending, snapshot),
            other => panic!("expected to block on futures, got {other:?}"),
        }
    }
}

#[test]
fn await_of_a_pending_future_blocks() {
    let (pending, mut snapshot) = start_pending("await fetch()", &["fetch"]);
    assert_eq!(pending.len(), 1);
    assert_eq!(snapshot.pending_call_ids(), &pending[..]);

    let done = snapshot
        .resume(vec![(pending[0], ExternalResult::Return(Value::Int(7)))])
        .unwrap();
    assert_eq!(done.into_complete(), Some(Value::Int(7)));
}

#[test]
fn await_of_a_plain_value_is_identity() {
    let program = compile_with("await 42", &[], &[]);
    let done = program.start(vec![]).unwrap();
    assert_eq!(done.into_complete(), Some(Value::Int(42)));
}

#[test]
fn execution_continues_past_a_future_until_awaited() {
    // The call result is deferred, but unrelated work keeps running.
    let source = r#"
        let f = fetch()
        let x = 2 + 3
        await f + x
    "#;
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    assert_eq!(pending.len(), 1);
    let done = snapshot
        .resume(vec![(pending[0], ExternalResult::Return(Value::Int(10)))])
        .unwrap();
    assert_eq!(done.into_complete(), Some(Value::Int(15)));
}

#[test]
fn gather_reports_every_unresolved_id() {
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        let c = fetch(3)
        gather(a, b, c)
    "#;
    let (pending, _) = start_pending(source, &["fetch"]);
    assert_eq!(pending.len(), 3);
}

#[test]
fn partial_resolution_shrinks_the_pending_set() {
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        let c = fetch(3)
        gather(a, b, c)
    "#;
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    assert_eq!(pending.len(), 3);
    let (first, second, third) = (pending[0], pending[1], pending[2]);

    let progress = snapshot
        .resume(vec![(first, ExternalResult::Return(Value::Int(10)))])
        .unwrap();
    let (remaining, mut snapshot) = progress
        .into_awaiting_futures()
        .expect("still blocked on the other two");
    // The resolved id never reappears.
    assert_eq!(remaining, vec![second, third]);

    let done = snapshot
        .resume(vec![
            (second, ExternalResult::Return(Value::Int(20))),
            (third, ExternalResult::Return(Value::Int(30))),
        ])
        .unwrap();
    assert_eq!(
        done.into_complete(),
        Some(Value::List(vec![
            Value::Int(10),
            Value::Int(20),
            Value::Int(30),
        ]))
    );
}

#[test]
fn incremental_and_batch_resolution_agree() {
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        let c = fetch(3)
        gather(a, b, c)
    "#;

    // All at once.
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    let batch: Vec<(CallId, ExternalResult)> = pending
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, ExternalResult::Return(Value::Int((i as i64 + 1) * 10))))
        .collect();
    let all_at_once = snapshot.resume(batch).unwrap().into_complete().unwrap();

    // One at a time.
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    let mut incremental = None;
    for (i, id) in pending.iter().enumerate() {
        let step = snapshot
            .resume(vec![(
                *id,
                ExternalResult::Return(Value::Int((i as i64 + 1) * 10)),
            )])
            .unwrap();
        match step {
            Progress::AwaitingFutures {
                snapshot: next, ..
            } => snapshot = next,
            Progress::Complete(value) => {
                incremental = Some(value);
                break;
            }
            other => panic!("unexpected progress: {other:?}"),
        }
    }
    assert_eq!(incremental, Some(all_at_once));
}

#[test]
fn empty_resolution_keeps_the_same_pending_set() {
    let (pending, mut snapshot) = start_pending("await fetch()", &["fetch"]);
    let progress = snapshot.resume(vec![]).unwrap();
    let (still_pending, _) = progress.into_awaiting_futures().unwrap();
    assert_eq!(still_pending, pending);
}

#[test]
fn unknown_call_id_is_rejected_without_consuming() {
    let (pending, mut snapshot) = start_pending("await fetch()", &["fetch"]);
    let bogus = CallId(pending[0].raw() + 50);

    let err = snapshot
        .resume(vec![(bogus, ExternalResult::Return(Value::Null))])
        .unwrap_err();
    assert_eq!(
        err,
        UsageError::UnknownCallId {
            provided: bogus,
            pending: pending.clone(),
        }
    );

    // The snapshot is still live and accepts the real id.
    let done = snapshot
        .resume(vec![(pending[0], ExternalResult::Return(Value::Int(1)))])
        .unwrap();
    assert_eq!(done.into_complete(), Some(Value::Int(1)));
}

#[test]
fn failed_future_raises_at_the_await_point() {
    let source = r#"
        let outcome = ""
        try {
            let f = fetch()
            outcome = await f
        } catch (e) {
            outcome = "caught " + e.message
        }
        outcome
    "#;
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    let done = snapshot
        .resume(vec![(
            pending[0],
            ExternalResult::Error(ExceptionValue::new(ExcKind::RuntimeError, "offline")),
        )])
        .unwrap();
    assert_eq!(
        done.into_complete(),
        Some(Value::Str("caught offline".into()))
    );
}

#[test]
fn failed_gather_member_raises_unhandled() {
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        gather(a, b)
    "#;
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    let progress = snapshot
        .resume(vec![(
            pending[0],
            ExternalResult::Error(ExceptionValue::new(ExcKind::RuntimeError, "nope")),
        )])
        .unwrap();
    let (kind, message) = expect_exception(progress);
    assert_eq!(kind, ExcKind::RuntimeError);
    assert_eq!(message, "nope");
}

#[test]
fn gather_passes_resolved_values_through() {
    // One call answered synchronously, one deferred.
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        gather(a, b)
    "#;
    let program = compile_with(source, &[], &["fetch"]);
    let progress = program.start(vec![]).unwrap();

    let (_, _, _, first_id, _, mut snapshot) = progress.into_function_call().unwrap();
    let progress = snapshot
        .resume(first_id, ExternalResult::Return(Value::Int(10)))
        .unwrap();

    let (_, _, _, second_id, _, mut snapshot) = progress.into_function_call().unwrap();
    let progress = snapshot.resume(second_id, ExternalResult::Future).unwrap();

    let (pending, mut snapshot) = progress.into_awaiting_futures().unwrap();
    assert_eq!(pending, vec![second_id]);

    let done = snapshot
        .resume(vec![(second_id, ExternalResult::Return(Value::Int(20)))])
        .unwrap();
    assert_eq!(
        done.into_complete(),
        Some(Value::List(vec![Value::Int(10), Value::Int(20)]))
    );
}

#[test]
fn awaiting_the_same_future_twice_reuses_the_result() {
    let source = r#"
        let f = fetch()
        await f + await f
    "#;
    let (pending, mut snapshot) = start_pending(source, &["fetch"]);
    assert_eq!(pending.len(), 1);
    let done = snapshot
        .resume(vec![(pending[0], ExternalResult::Return(Value::Int(21)))])
        .unwrap();
    assert_eq!(done.into_complete(), Some(Value::Int(42)));
}
