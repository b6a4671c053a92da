//! Error reporting: exceptions as completion values, stack traces,
//! compile-time rejections

use pretty_assertions::assert_eq;

use super::helpers::{compile, compile_with, expect_exception};
use crate::error::CompileErrorKind;
use crate::program::Program;
use crate::snapshot::Progress;
use crate::value::{ExcKind, Value};

#[test]
fn unhandled_exception_completes_with_exception_value() {
    let progress = compile("throw ValueError(\"bad\")").start(vec![]).unwrap();
    let (kind, message) = expect_exception(progress);
    assert_eq!(kind, ExcKind::ValueError);
    assert_eq!(message, "bad");
}

#[test]
fn runtime_errors_complete_instead_of_failing_the_call() {
    // An engine call only fails for usage errors; program faults are
    // ordinary completions carrying exception values.
    let progress = compile("[1][5]").start(vec![]).unwrap();
    let (kind, _) = expect_exception(progress);
    assert_eq!(kind, ExcKind::IndexError);
}

#[test]
fn trace_names_the_call_chain() {
    let source = r#"
        fn inner() {
            throw RuntimeError("deep")
        }
        fn outer() {
            return inner()
        }
        outer()
    "#;
    let progress = compile(source).start(vec![]).unwrap();
    let Progress::Complete(Value::Exception(exc)) = progress else {
        panic!("expected exception completion");
    };
    let functions: Vec<&str> = exc.trace.iter().map(|f| f.function.as_str()).collect();
    assert_eq!(functions, vec!["<module>", "outer", "inner"]);
    // The innermost frame points at the throw statement.
    assert_eq!(exc.trace.last().unwrap().line, 3);
}

#[test]
fn recursion_depth_is_bounded() {
    let source = r#"
        fn spin(n) {
            return spin(n + 1)
        }
        spin(0)
    "#;
    let progress = compile(source).start(vec![]).unwrap();
    let (kind, _) = expect_exception(progress);
    assert_eq!(kind, ExcKind::RecursionError);
}

#[test]
fn undefined_name_is_a_compile_error() {
    let err = Program::compile("nope + 1", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Name);
}

#[test]
fn undefined_function_is_a_compile_error() {
    let err = Program::compile("mystery()", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Name);
}

#[test]
fn break_outside_loop_is_rejected() {
    let err = Program::compile("break", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
}

#[test]
fn return_outside_function_is_rejected() {
    let err = Program::compile("return 1", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
}

#[test]
fn nested_function_definitions_are_rejected() {
    let source = r#"
        fn outer() {
            fn inner() {
            }
        }
    "#;
    let err = Program::compile(source, "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Unsupported);
}

#[test]
fn duplicate_function_names_are_rejected() {
    let source = "fn f() {}\nfn f() {}";
    let err = Program::compile(source, "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Name);
}

#[test]
fn assignment_to_undefined_name_is_rejected() {
    let err = Program::compile("x = 1", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Name);
}

#[test]
fn syntax_error_carries_a_location() {
    let err = Program::compile("let = 3", "test.cd", vec![], vec![]).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert!(err.location.is_some());
}

#[test]
fn duplicate_declared_names_are_rejected() {
    let err = Program::compile(
        "x",
        "test.cd",
        vec!["x".into(), "x".into()],
        vec![],
    )
    .unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Name);
}

#[test]
fn direct_run_reports_boundaries_as_errors() {
    let program = compile_with("fetch()", &[], &["fetch"]);
    let err = program.run(vec![]).unwrap_err();
    assert_eq!(err.kind, ExcKind::RuntimeError);
    assert!(err.message.contains("fetch"));
}

#[test]
fn direct_run_returns_plain_values() {
    let program = compile("2 + 2");
    assert_eq!(program.run(vec![]).unwrap(), Value::Int(4));
}

#[test]
fn direct_run_surfaces_unhandled_exceptions() {
    let program = compile("throw ValueError(\"x\")");
    let err = program.run(vec![]).unwrap_err();
    assert_eq!(err.kind, ExcKind::ValueError);
}
