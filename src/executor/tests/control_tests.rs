//! Control flow: conditionals, loops, functions, try/catch/finally

use pretty_assertions::assert_eq;

use super::helpers::{run, str_value};
use crate::value::Value;

#[test]
fn if_else_chain() {
    let source = r#"
        let grade = ""
        let score = 75
        if score >= 90 {
            grade = "a"
        } else if score >= 70 {
            grade = "b"
        } else {
            grade = "c"
        }
        grade
    "#;
    assert_eq!(run(source), str_value("b"));
}

#[test]
fn while_loop_accumulates() {
    let source = r#"
        let i = 0
        let total = 0
        while i < 5 {
            total += i
            i += 1
        }
        total
    "#;
    assert_eq!(run(source), Value::Int(10));
}

#[test]
fn for_loop_over_range() {
    let source = r#"
        let total = 0
        for x in range(4) {
            total += x
        }
        total
    "#;
    assert_eq!(run(source), Value::Int(6));
}

#[test]
fn for_loop_over_string_and_dict() {
    let source = r#"
        let parts = []
        for c in "abc" {
            parts += [c]
        }
        for k in {"x": 1, "y": 2} {
            parts += [k]
        }
        parts
    "#;
    assert_eq!(
        run(source),
        Value::List(vec![
            str_value("a"),
            str_value("b"),
            str_value("c"),
            str_value("x"),
            str_value("y"),
        ])
    );
}

#[test]
fn break_and_continue() {
    let source = r#"
        let total = 0
        for x in range(10) {
            if x == 3 {
                continue
            }
            if x == 5 {
                break
            }
            total += x
        }
        total
    "#;
    // 0 + 1 + 2 + 4
    assert_eq!(run(source), Value::Int(7));
}

#[test]
fn nested_loops_unwind_to_the_nearest_one() {
    let source = r#"
        let hits = 0
        for i in range(3) {
            for j in range(3) {
                if j > i {
                    break
                }
                hits += 1
            }
        }
        hits
    "#;
    // j in 0..=i for each i
    assert_eq!(run(source), Value::Int(6));
}

#[test]
fn block_scoping_shadows_and_restores() {
    let source = r#"
        let x = 1
        if true {
            let x = 2
            x = x + 10
        }
        x
    "#;
    assert_eq!(run(source), Value::Int(1));
}

#[test]
fn functions_return_values() {
    let source = r#"
        fn add(a, b) {
            return a + b
        }
        add(2, 3)
    "#;
    assert_eq!(run(source), Value::Int(5));
}

#[test]
fn function_without_return_yields_null() {
    let source = r#"
        fn noop() {
        }
        noop()
    "#;
    assert_eq!(run(source), Value::Null);
}

#[test]
fn functions_accept_keyword_arguments() {
    let source = r#"
        fn join(left, right) {
            return left + right
        }
        join("a", right="b")
    "#;
    assert_eq!(run(source), str_value("ab"));
}

#[test]
fn recursion() {
    let source = r#"
        fn fib(n) {
            if n < 2 {
                return n
            }
            return fib(n - 1) + fib(n - 2)
        }
        fib(10)
    "#;
    assert_eq!(run(source), Value::Int(55));
}

#[test]
fn functions_read_globals() {
    let source = r#"
        let base = 100
        fn bump(n) {
            return base + n
        }
        bump(1)
    "#;
    assert_eq!(run(source), Value::Int(101));
}

#[test]
fn try_catch_binds_the_exception() {
    let source = r#"
        let result = ""
        try {
            throw ValueError("boom")
            result = "unreachable"
        } catch (e) {
            result = e.message
        }
        result
    "#;
    assert_eq!(run(source), str_value("boom"));
}

#[test]
fn catch_exposes_the_kind() {
    let source = r#"
        let kind = ""
        try {
            let d = {}
            d["missing"]
        } catch (e) {
            kind = e.kind
        }
        kind
    "#;
    assert_eq!(run(source), str_value("KeyError"));
}

#[test]
fn finally_runs_on_success_and_failure() {
    let source = r#"
        let log = []
        try {
            log += ["try"]
        } finally {
            log += ["finally"]
        }
        try {
            log += ["try2"]
            throw RuntimeError("x")
        } catch (e) {
            log += ["catch"]
        } finally {
            log += ["finally2"]
        }
        log
    "#;
    assert_eq!(
        run(source),
        Value::List(vec![
            str_value("try"),
            str_value("finally"),
            str_value("try2"),
            str_value("catch"),
            str_value("finally2"),
        ])
    );
}

#[test]
fn finally_rethrows_an_uncaught_error() {
    let source = r#"
        let log = []
        let outcome = ""
        try {
            try {
                throw ValueError("inner")
            } finally {
                log += ["finally"]
            }
        } catch (e) {
            outcome = e.message
        }
        [outcome, log]
    "#;
    assert_eq!(
        run(source),
        Value::List(vec![
            str_value("inner"),
            Value::List(vec![str_value("finally")]),
        ])
    );
}

#[test]
fn nested_try_rethrow() {
    let source = r#"
        let notes = []
        try {
            try {
                throw ValueError("original")
            } catch (e) {
                notes += ["inner"]
                throw e
            }
        } catch (e) {
            notes += [e.message]
        }
        notes
    "#;
    assert_eq!(
        run(source),
        Value::List(vec![str_value("inner"), str_value("original")])
    );
}

#[test]
fn throw_wraps_non_exception_values() {
    let source = r#"
        let kind = ""
        try {
            throw "plain"
        } catch (e) {
            kind = e.kind + ":" + e.message
        }
        kind
    "#;
    assert_eq!(run(source), str_value("RuntimeError:plain"));
}
