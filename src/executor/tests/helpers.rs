//! Shared test helpers

use crate::program::Program;
use crate::snapshot::Progress;
use crate::value::{ExcKind, Value};

pub(super) fn compile(source: &str) -> Program {
    compile_with(source, &[], &[])
}

pub(super) fn compile_with(source: &str, inputs: &[&str], externals: &[&str]) -> Program {
    Program::compile(
        source,
        "test.cd",
        inputs.iter().map(|s| s.to_string()).collect(),
        externals.iter().map(|s| s.to_string()).collect(),
    )
    .expect("program compiles")
}

/// Run a program with no inputs or externals to completion.
pub(super) fn run(source: &str) -> Value {
    run_with(source, &[], vec![])
}

pub(super) fn run_with(source: &str, inputs: &[&str], values: Vec<Value>) -> Value {
    compile_with(source, inputs, &[])
        .start(values)
        .expect("start succeeds")
        .into_complete()
        .expect("program completes without suspending")
}

/// Unwrap a completion that carries an exception value.
pub(super) fn expect_exception(progress: Progress) -> (ExcKind, String) {
    match progress {
        Progress::Complete(Value::Exception(exc)) => (exc.kind, exc.message),
        other => panic!("expected an exception completion, got {other:?}"),
    }
}

pub(super) fn str_value(s: &str) -> Value {
    Value::Str(s.to_string())
}
