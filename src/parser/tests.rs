//! Parser tests: grammar shapes and builder output

use pretty_assertions::assert_eq;

use super::parse_program;
use crate::executor::types::{AssignOp, AssignTarget, BinOp, Expr, LogicOp, Stmt, UnaryOp};

fn parse_stmts(source: &str) -> Vec<Stmt> {
    parse_program(source).expect("source parses").0
}

fn parse_expr(source: &str) -> Expr {
    match parse_stmts(source).remove(0) {
        Stmt::Expr { expr, .. } => expr,
        other => panic!("expected an expression statement, got {other:?}"),
    }
}

#[test]
fn literals() {
    assert_eq!(parse_expr("null"), Expr::LitNull);
    assert_eq!(parse_expr("true"), Expr::LitBool { v: true });
    assert_eq!(parse_expr("42"), Expr::LitInt { v: 42 });
    assert_eq!(parse_expr("2.5"), Expr::LitFloat { v: 2.5 });
    assert_eq!(parse_expr("1e3"), Expr::LitFloat { v: 1000.0 });
    assert_eq!(
        parse_expr("\"hi\\n\""),
        Expr::LitStr { v: "hi\n".into() }
    );
    assert_eq!(
        parse_expr("b\"ab\""),
        Expr::LitBytes { v: vec![97, 98] }
    );
}

#[test]
fn oversized_int_literal_becomes_big() {
    match parse_expr("123456789012345678901234567890") {
        Expr::LitBig { v } => {
            assert_eq!(v.to_string(), "123456789012345678901234567890");
        }
        other => panic!("expected a big integer literal, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parse_expr("1 + 2 * 3");
    let Expr::Binary {
        op: BinOp::Add,
        left,
        right,
    } = expr
    else {
        panic!("expected addition at the top");
    };
    assert_eq!(*left, Expr::LitInt { v: 1 });
    assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn comparison_binds_tighter_than_logic() {
    let expr = parse_expr("a < 1 && b < 2");
    let Expr::Logic {
        op: LogicOp::And,
        left,
        right,
    } = expr
    else {
        panic!("expected && at the top");
    };
    assert!(matches!(*left, Expr::Binary { op: BinOp::Lt, .. }));
    assert!(matches!(*right, Expr::Binary { op: BinOp::Lt, .. }));
}

#[test]
fn unary_prefixes_nest_inside_out() {
    let expr = parse_expr("!-x");
    let Expr::Unary {
        op: UnaryOp::Not,
        operand,
    } = expr
    else {
        panic!("expected ! at the top");
    };
    assert!(matches!(
        *operand,
        Expr::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn await_is_a_prefix() {
    let expr = parse_expr("await f + 1");
    // await binds tighter than +
    let Expr::Binary {
        op: BinOp::Add,
        left,
        ..
    } = expr
    else {
        panic!("expected + at the top");
    };
    assert!(matches!(*left, Expr::Await { .. }));
}

#[test]
fn postfix_chain_folds_left() {
    let expr = parse_expr("a.b[0](1)");
    let Expr::Call { callee, args, .. } = expr else {
        panic!("expected a call at the top");
    };
    assert_eq!(args.len(), 1);
    assert!(matches!(*callee, Expr::Index { .. }));
}

#[test]
fn call_arguments_split_positional_and_keyword() {
    let expr = parse_expr("f(1, 2, mode=\"fast\", x=3)");
    let Expr::Call { args, kwargs, .. } = expr else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 2);
    assert_eq!(kwargs.len(), 2);
    assert_eq!(kwargs[0].0, "mode");
    assert_eq!(kwargs[1].0, "x");
}

#[test]
fn keyword_argument_is_not_confused_with_equality() {
    let expr = parse_expr("f(x == 1)");
    let Expr::Call { args, kwargs, .. } = expr else {
        panic!("expected a call");
    };
    assert!(kwargs.is_empty());
    assert!(matches!(args[0], Expr::Binary { op: BinOp::Eq, .. }));
}

#[test]
fn parens_and_tuples_disambiguate() {
    assert_eq!(parse_expr("(1)"), Expr::LitInt { v: 1 });
    assert!(matches!(parse_expr("(1,)"), Expr::TupleLit { .. }));
    assert!(matches!(parse_expr("(1, 2)"), Expr::TupleLit { .. }));
    assert!(matches!(parse_expr("()"), Expr::TupleLit { .. }));
}

#[test]
fn braces_disambiguate_dict_and_set() {
    assert!(matches!(parse_expr("{}"), Expr::DictLit { .. }));
    assert!(matches!(parse_expr("{1: 2}"), Expr::DictLit { .. }));
    assert!(matches!(parse_expr("{1, 2}"), Expr::SetLit { .. }));
}

#[test]
fn assignment_operators() {
    let stmts = parse_stmts("let x = 1\nx += 2\nx[0] = 3");
    assert!(matches!(stmts[0], Stmt::Let { .. }));
    let Stmt::Assign {
        op: AssignOp::Add,
        target: AssignTarget::Name(ref name),
        ..
    } = stmts[1]
    else {
        panic!("expected a compound assignment");
    };
    assert_eq!(name, "x");
    assert!(matches!(
        stmts[2],
        Stmt::Assign {
            op: AssignOp::Set,
            target: AssignTarget::Index { .. },
            ..
        }
    ));
}

#[test]
fn else_if_chains_nest() {
    let stmts = parse_stmts("if a { } else if b { } else { }");
    let Stmt::If { ref else_body, .. } = stmts[0] else {
        panic!("expected an if statement");
    };
    assert_eq!(else_body.len(), 1);
    assert!(matches!(else_body[0], Stmt::If { .. }));
}

#[test]
fn functions_hoist_into_the_table() {
    let (body, functions) = parse_program("fn f(a, b) { return a }\nf(1, 2)").unwrap();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "f");
    assert_eq!(functions[0].params, vec!["a".to_string(), "b".to_string()]);
    assert!(matches!(body[0], Stmt::FnDef { index: 0, .. }));
}

#[test]
fn statements_record_lines() {
    let stmts = parse_stmts("let a = 1\nlet b = 2");
    let Stmt::Let { line, .. } = stmts[1] else {
        panic!("expected a let statement");
    };
    assert_eq!(line, 2);
}

#[test]
fn keywords_do_not_swallow_identifier_prefixes() {
    // `iffy` and `lettuce` are ordinary identifiers.
    let stmts = parse_stmts("let iffy = 1\nlet lettuce = 2\niffy + lettuce");
    assert_eq!(stmts.len(), 3);
}

#[test]
fn malformed_source_is_a_syntax_error() {
    assert!(parse_program("let = 1").is_err());
    assert!(parse_program("if { }").is_err());
    assert!(parse_program("fn () { }").is_err());
    assert!(parse_program("1 +").is_err());
    assert!(parse_program("\"unterminated").is_err());
}

#[test]
fn try_requires_catch_or_finally() {
    let err = parse_program("try { }").unwrap_err();
    assert!(err.message.contains("catch or finally"));
}

#[test]
fn semicolons_are_optional_terminators() {
    let stmts = parse_stmts("let a = 1; a + 1;");
    assert_eq!(stmts.len(), 2);
}
