//! Operator semantics: numeric tower, comparisons, logic, membership

use num_bigint::BigInt;
use pretty_assertions::assert_eq;

use super::helpers::{compile, expect_exception, run, str_value};
use crate::value::{ExcKind, Value};

#[test]
fn integer_arithmetic() {
    assert_eq!(run("2 + 3 * 4"), Value::Int(14));
    assert_eq!(run("(2 + 3) * 4"), Value::Int(20));
    assert_eq!(run("7 % 3"), Value::Int(1));
    assert_eq!(run("-7 % 3"), Value::Int(2));
    assert_eq!(run("7 % -3"), Value::Int(-2));
}

#[test]
fn division_always_yields_float() {
    assert_eq!(run("7 / 2"), Value::Float(3.5));
    assert_eq!(run("4 / 2"), Value::Float(2.0));
}

#[test]
fn mixed_numeric_arithmetic() {
    assert_eq!(run("1 + 2.5"), Value::Float(3.5));
    assert_eq!(run("2.0 * 3"), Value::Float(6.0));
}

#[test]
fn integer_overflow_promotes_to_bigint() {
    let result = run("9223372036854775807 + 1");
    assert_eq!(
        result,
        Value::BigInt("9223372036854775808".parse::<BigInt>().unwrap())
    );
    // And falls back to a fixed-width integer when it fits again.
    let back = run("9223372036854775807 + 1 - 1");
    assert_eq!(back, Value::Int(i64::MAX));
}

#[test]
fn bigint_literals() {
    assert_eq!(
        run("123456789012345678901234567890 + 1"),
        Value::BigInt("123456789012345678901234567891".parse::<BigInt>().unwrap())
    );
}

#[test]
fn string_and_sequence_concatenation() {
    assert_eq!(run("\"ab\" + \"cd\""), str_value("abcd"));
    assert_eq!(
        run("[1] + [2]"),
        Value::List(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(run("\"ab\" * 3"), str_value("ababab"));
    assert_eq!(
        run("[0] * 2"),
        Value::List(vec![Value::Int(0), Value::Int(0)])
    );
}

#[test]
fn comparisons() {
    assert_eq!(run("1 < 2"), Value::Bool(true));
    assert_eq!(run("2 <= 2"), Value::Bool(true));
    assert_eq!(run("1 == 1.0"), Value::Bool(true));
    assert_eq!(run("1 != 2"), Value::Bool(true));
    assert_eq!(run("\"abc\" < \"abd\""), Value::Bool(true));
    assert_eq!(run("[1, 2] < [1, 3]"), Value::Bool(true));
}

#[test]
fn logic_operators_short_circuit_to_operand() {
    assert_eq!(run("true && 5"), Value::Int(5));
    assert_eq!(run("false && 5"), Value::Bool(false));
    assert_eq!(run("0 || \"fallback\""), str_value("fallback"));
    assert_eq!(run("3 || 5"), Value::Int(3));
}

#[test]
fn short_circuit_skips_right_side_effects() {
    // The right side would raise; short-circuiting must not reach it.
    let source = r#"
        let d = {}
        false && d["missing"]
    "#;
    assert_eq!(run(source), Value::Bool(false));
}

#[test]
fn membership() {
    assert_eq!(run("2 in [1, 2, 3]"), Value::Bool(true));
    assert_eq!(run("\"ell\" in \"hello\""), Value::Bool(true));
    assert_eq!(run("\"a\" in {\"a\": 1}"), Value::Bool(true));
    assert_eq!(run("4 in {1, 2}"), Value::Bool(false));
}

#[test]
fn unary_operators() {
    assert_eq!(run("-(3)"), Value::Int(-3));
    assert_eq!(run("!0"), Value::Bool(true));
    assert_eq!(run("!\"x\""), Value::Bool(false));
}

#[test]
fn division_by_zero_raises() {
    let progress = compile("1 / 0").start(vec![]).unwrap();
    let (kind, _) = expect_exception(progress);
    assert_eq!(kind, ExcKind::ZeroDivisionError);
}

#[test]
fn type_mismatch_raises() {
    let progress = compile("1 + \"x\"").start(vec![]).unwrap();
    let (kind, message) = expect_exception(progress);
    assert_eq!(kind, ExcKind::TypeError);
    assert!(message.contains("int"), "message was {message:?}");
    assert!(message.contains("str"), "message was {message:?}");
}

#[test]
fn unordered_comparison_raises() {
    let progress = compile("1 < \"x\"").start(vec![]).unwrap();
    let (kind, _) = expect_exception(progress);
    assert_eq!(kind, ExcKind::TypeError);
}
