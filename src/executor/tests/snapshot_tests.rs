//! Persistence: program and snapshot round trips through bytes

use pretty_assertions::assert_eq;

use super::helpers::{compile_with, str_value};
use crate::error::{FormatError, UsageError};
use crate::program::Program;
use crate::snapshot::{ExternalResult, FutureSnapshot, Progress, Snapshot};
use crate::value::Value;

#[test]
fn program_round_trip_executes_identically() {
    let program = compile_with("external_add(x, 10) * 2", &["x"], &["external_add"]);
    let restored = Program::load(&program.dump()).unwrap();
    assert_eq!(restored.input_names(), program.input_names());
    assert_eq!(restored.external_functions(), program.external_functions());

    let drive = |program: &Program| {
        let progress = program.start(vec![Value::Int(11)]).unwrap();
        let (name, args, _, call_id, _, mut snapshot) = progress.into_function_call().unwrap();
        let done = snapshot
            .resume(call_id, ExternalResult::Return(Value::Int(21)))
            .unwrap();
        (name, args, done.into_complete().unwrap())
    };
    assert_eq!(drive(&program), drive(&restored));
}

#[test]
fn snapshot_round_trip_resumes_identically() {
    let program = compile_with("add_one(x)", &["x"], &["add_one"]);
    let progress = program.start(vec![Value::Int(5)]).unwrap();
    let (_, _, _, call_id, _, mut original) = progress.into_function_call().unwrap();

    let bytes = original.dump().unwrap();
    let mut restored = Snapshot::load(&bytes).unwrap();
    assert_eq!(restored.call_id(), Some(call_id));

    let from_original = original
        .resume(call_id, ExternalResult::Return(Value::Int(11)))
        .unwrap()
        .into_complete();
    let from_restored = restored
        .resume(call_id, ExternalResult::Return(Value::Int(11)))
        .unwrap()
        .into_complete();
    assert_eq!(from_original, from_restored);
}

#[test]
fn dump_does_not_consume() {
    let program = compile_with("probe()", &[], &["probe"]);
    let progress = program.start(vec![]).unwrap();
    let (_, _, _, call_id, _, mut snapshot) = progress.into_function_call().unwrap();

    // Checkpoint twice, then keep using the live handle.
    let first = snapshot.dump().unwrap();
    let second = snapshot.dump().unwrap();
    assert_eq!(first, second);

    let done = snapshot
        .resume(call_id, ExternalResult::Return(str_value("live")))
        .unwrap();
    assert_eq!(done.into_complete(), Some(str_value("live")));
}

#[test]
fn consumed_snapshot_cannot_be_dumped() {
    let program = compile_with("probe()", &[], &["probe"]);
    let progress = program.start(vec![]).unwrap();
    let (_, _, _, call_id, _, mut snapshot) = progress.into_function_call().unwrap();

    snapshot
        .resume(call_id, ExternalResult::Return(Value::Null))
        .unwrap();
    assert_eq!(snapshot.dump().unwrap_err(), UsageError::AlreadyConsumed);
}

#[test]
fn snapshot_survives_a_mid_loop_checkpoint() {
    let source = r#"
        let total = 0
        let i = 0
        while i < 3 {
            total += step(i)
            i += 1
        }
        total
    "#;
    let program = compile_with(source, &[], &["step"]);
    let mut progress = program.start(vec![]).unwrap();

    loop {
        match progress {
            Progress::FunctionCall {
                args,
                call_id,
                snapshot,
                ..
            } => {
                // Simulate a process restart at every boundary.
                let bytes = snapshot.dump().unwrap();
                let mut restored = Snapshot::load(&bytes).unwrap();
                let Value::Int(i) = args[0] else {
                    panic!("expected an int argument");
                };
                progress = restored
                    .resume(call_id, ExternalResult::Return(Value::Int(i * 10)))
                    .unwrap();
            }
            Progress::Complete(value) => {
                assert_eq!(value, Value::Int(30));
                return;
            }
            other => panic!("unexpected progress: {other:?}"),
        }
    }
}

#[test]
fn future_snapshot_round_trip() {
    let source = r#"
        let a = fetch(1)
        let b = fetch(2)
        gather(a, b)
    "#;
    let program = compile_with(source, &[], &["fetch"]);
    let mut progress = program.start(vec![]).unwrap();
    loop {
        match progress {
            Progress::FunctionCall {
                call_id,
                mut snapshot,
                ..
            } => progress = snapshot.resume(call_id, ExternalResult::Future).unwrap(),
            Progress::AwaitingFutures { pending, snapshot } => {
                let bytes = snapshot.dump().unwrap();
                let mut restored = FutureSnapshot::load(&bytes).unwrap();
                assert_eq!(restored.pending_call_ids(), &pending[..]);

                let results = pending
                    .iter()
                    .map(|id| (*id, ExternalResult::Return(Value::Int(id.raw() as i64))))
                    .collect();
                let done = restored.resume(results).unwrap();
                assert_eq!(
                    done.into_complete(),
                    Some(Value::List(vec![
                        Value::Int(pending[0].raw() as i64),
                        Value::Int(pending[1].raw() as i64),
                    ]))
                );
                return;
            }
            other => panic!("unexpected progress: {other:?}"),
        }
    }
}

#[test]
fn garbage_bytes_are_rejected() {
    assert_eq!(Program::load(b"not a program").unwrap_err(), FormatError::Header);
    assert_eq!(Snapshot::load(b"").unwrap_err(), FormatError::Header);
}

#[test]
fn kind_confusion_is_rejected() {
    let program = compile_with("probe()", &[], &["probe"]);
    let progress = program.start(vec![]).unwrap();
    let (_, _, _, _, _, snapshot) = progress.into_function_call().unwrap();
    let bytes = snapshot.dump().unwrap();

    assert_eq!(
        Program::load(&bytes).unwrap_err(),
        FormatError::Kind {
            expected: "program",
            found: "snapshot",
        }
    );
    assert!(matches!(
        FutureSnapshot::load(&bytes).unwrap_err(),
        FormatError::Kind { .. }
    ));
}

#[test]
fn truncated_payload_is_corrupt() {
    let program = compile_with("1 + 1", &[], &[]);
    let mut bytes = program.dump();
    bytes.truncate(bytes.len() / 2);
    assert!(matches!(
        Program::load(&bytes).unwrap_err(),
        FormatError::Corrupt(_)
    ));
}
