//! Basic evaluation: literals, bindings, containers, builtins, methods

use pretty_assertions::assert_eq;

use super::helpers::{run, run_with, str_value};
use crate::value::Value;

#[test]
fn expression_program_yields_its_value() {
    assert_eq!(run("41 + 1"), Value::Int(42));
}

#[test]
fn input_binds_by_position() {
    assert_eq!(
        run_with("x + 1", &["x"], vec![Value::Int(41)]),
        Value::Int(42)
    );
}

#[test]
fn result_is_final_expression_statement() {
    let source = r#"
        let a = 1
        a + 1
        a + 2
    "#;
    assert_eq!(run(source), Value::Int(3));
}

#[test]
fn program_without_trailing_expression_yields_null() {
    assert_eq!(run("let a = 1"), Value::Null);
}

#[test]
fn let_and_assignment() {
    let source = r#"
        let x = 10
        x = x + 5
        x += 2
        x
    "#;
    assert_eq!(run(source), Value::Int(17));
}

#[test]
fn index_assignment_updates_binding() {
    let source = r#"
        let items = [1, 2, 3]
        items[1] = 20
        items
    "#;
    assert_eq!(
        run(source),
        Value::List(vec![Value::Int(1), Value::Int(20), Value::Int(3)])
    );
}

#[test]
fn dict_index_assignment_inserts_and_updates() {
    let source = r#"
        let d = {"a": 1}
        d["b"] = 2
        d["a"] = 10
        d
    "#;
    assert_eq!(
        run(source),
        Value::Dict(vec![
            (str_value("a"), Value::Int(10)),
            (str_value("b"), Value::Int(2)),
        ])
    );
}

#[test]
fn container_literals() {
    assert_eq!(
        run("[1, \"two\", null]"),
        Value::List(vec![Value::Int(1), str_value("two"), Value::Null])
    );
    assert_eq!(
        run("(1, 2)"),
        Value::Tuple(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(run("(1,)"), Value::Tuple(vec![Value::Int(1)]));
    assert_eq!(run("()"), Value::Tuple(vec![]));
    assert_eq!(
        run("{1, 2, 1}"),
        Value::Set(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(
        run("{\"k\": 1}"),
        Value::Dict(vec![(str_value("k"), Value::Int(1))])
    );
}

#[test]
fn dict_literal_later_key_wins() {
    assert_eq!(
        run("{\"k\": 1, \"k\": 2}"),
        Value::Dict(vec![(str_value("k"), Value::Int(2))])
    );
}

#[test]
fn indexing_reads() {
    assert_eq!(run("[10, 20, 30][1]"), Value::Int(20));
    assert_eq!(run("[10, 20, 30][-1]"), Value::Int(30));
    assert_eq!(run("\"hello\"[1]"), str_value("e"));
    assert_eq!(run("{\"a\": 5}[\"a\"]"), Value::Int(5));
    assert_eq!(run("b\"ab\"[0]"), Value::Int(97));
}

#[test]
fn string_methods() {
    assert_eq!(run("\"  pad  \".strip()"), str_value("pad"));
    assert_eq!(run("\"abc\".upper()"), str_value("ABC"));
    assert_eq!(
        run("\"a,b\".split(\",\")"),
        Value::List(vec![str_value("a"), str_value("b")])
    );
    assert_eq!(run("\"-\".join([\"x\", \"y\"])"), str_value("x-y"));
    assert_eq!(run("\"hello\".starts_with(\"he\")"), Value::Bool(true));
}

#[test]
fn dict_methods() {
    assert_eq!(run("{\"a\": 1}.get(\"a\")"), Value::Int(1));
    assert_eq!(run("{\"a\": 1}.get(\"b\", 9)"), Value::Int(9));
    assert_eq!(
        run("{\"a\": 1, \"b\": 2}.keys()"),
        Value::List(vec![str_value("a"), str_value("b")])
    );
}

#[test]
fn builtins() {
    assert_eq!(run("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(run("str(42)"), str_value("42"));
    assert_eq!(run("repr(\"x\")"), str_value("\"x\""));
    assert_eq!(run("int(\"17\")"), Value::Int(17));
    assert_eq!(run("float(2)"), Value::Float(2.0));
    assert_eq!(run("bool([])"), Value::Bool(false));
    assert_eq!(run("abs(0 - 4)"), Value::Int(4));
    assert_eq!(run("type(1.5)"), str_value("float"));
    assert_eq!(
        run("set([1, 1, 2])"),
        Value::Set(vec![Value::Int(1), Value::Int(2)])
    );
    assert_eq!(
        run("range(3)"),
        Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn record_member_access() {
    let point = Value::Record {
        name: "Point".into(),
        fields: vec![("x".into(), Value::Int(3)), ("y".into(), Value::Int(4))],
    };
    assert_eq!(
        run_with("p.x + p.y", &["p"], vec![point]),
        Value::Int(7)
    );
}

#[test]
fn string_escapes() {
    assert_eq!(run(r#""a\nb""#), str_value("a\nb"));
    assert_eq!(run(r#""quote: \"""#), str_value("quote: \""));
}

#[test]
fn comments_are_ignored() {
    let source = r#"
        // leading comment
        let x = 1 // trailing comment
        x + 1
    "#;
    assert_eq!(run(source), Value::Int(2));
}
