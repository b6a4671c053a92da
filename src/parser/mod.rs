//! Parser
//!
//! pest grammar plus the pairs-to-AST builder. The builder is purely
//! structural; name resolution and placement rules live in the
//! semantic validator.

use num_bigint::BigInt;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{CompileError, Location};
use crate::executor::types::{
    AssignOp, AssignTarget, BinOp, CatchClause, Expr, FunctionDef, LogicOp, Stmt, UnaryOp,
};

pub mod validator;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
struct CadenceParser;

type ParseResult<T> = Result<T, CompileError>;

/// Parse source into the top-level statement list plus the hoisted
/// function table.
pub(crate) fn parse_program(source: &str) -> ParseResult<(Vec<Stmt>, Vec<FunctionDef>)> {
    let mut pairs = CadenceParser::parse(Rule::program, source)
        .map_err(|err| syntax_error(err.renamed_rules(rename_rule)))?;
    let program = pairs.next().expect("program rule matches");

    let mut functions = Vec::new();
    let mut body = Vec::new();
    for item in program.into_inner() {
        match item.as_rule() {
            Rule::stmt => body.push(build_stmt(item, &mut functions)?),
            Rule::EOI => {}
            other => unreachable!("unexpected program item: {other:?}"),
        }
    }
    Ok((body, functions))
}

fn syntax_error(err: pest::error::Error<Rule>) -> CompileError {
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos((line, column)) => (line, column),
        pest::error::LineColLocation::Span((line, column), _) => (line, column),
    };
    CompileError::syntax(
        err.variant.message().into_owned(),
        Some(Location { line, column }),
    )
}

/// Friendlier rule names in pest's expectation messages.
fn rename_rule(rule: &Rule) -> String {
    match rule {
        Rule::expr => "expression".to_string(),
        Rule::stmt => "statement".to_string(),
        Rule::identifier => "identifier".to_string(),
        Rule::block => "block".to_string(),
        other => format!("{other:?}"),
    }
}

fn line_of(pair: &Pair<Rule>) -> u32 {
    pair.as_span().start_pos().line_col().0 as u32
}

/// Iterate a pair's children with keyword tokens stripped.
fn children(pair: Pair<Rule>) -> impl Iterator<Item = Pair<Rule>> {
    pair.into_inner().filter(|p| {
        !matches!(
            p.as_rule(),
            Rule::kw_let
                | Rule::kw_if
                | Rule::kw_else
                | Rule::kw_while
                | Rule::kw_for
                | Rule::kw_in
                | Rule::kw_try
                | Rule::kw_catch
                | Rule::kw_finally
                | Rule::kw_throw
                | Rule::kw_return
                | Rule::kw_break
                | Rule::kw_continue
                | Rule::kw_fn
                | Rule::assign_eq
        )
    })
}

/* ===================== Statements ===================== */

fn build_stmt(pair: Pair<Rule>, functions: &mut Vec<FunctionDef>) -> ParseResult<Stmt> {
    let line = line_of(&pair);
    let inner = match pair.as_rule() {
        Rule::stmt => pair.into_inner().next().expect("stmt wraps one node"),
        _ => pair,
    };
    match inner.as_rule() {
        Rule::fn_def => build_fn_def(inner, functions),
        Rule::let_stmt => {
            let mut parts = children(inner);
            let name = parts.next().expect("let has a name").as_str().to_string();
            let init = parts.next().map(build_expr).transpose()?;
            Ok(Stmt::Let { name, init, line })
        }
        Rule::assign_stmt => {
            let mut parts = inner.into_inner();
            let target_pair = parts.next().expect("assignment has a target");
            let op_pair = parts.next().expect("assignment has an operator");
            let value = build_expr(parts.next().expect("assignment has a value"))?;
            let op = match op_pair.as_str() {
                "=" => AssignOp::Set,
                "+=" => AssignOp::Add,
                "-=" => AssignOp::Sub,
                "*=" => AssignOp::Mul,
                "/=" => AssignOp::Div,
                other => unreachable!("unknown assignment operator {other:?}"),
            };
            let mut target_parts = target_pair.into_inner();
            let name = target_parts
                .next()
                .expect("target has a name")
                .as_str()
                .to_string();
            let target = match target_parts.next() {
                None => AssignTarget::Name(name),
                Some(index_suffix) => AssignTarget::Index {
                    name,
                    index: build_expr(
                        index_suffix
                            .into_inner()
                            .next()
                            .expect("index suffix holds an expression"),
                    )?,
                },
            };
            Ok(Stmt::Assign {
                target,
                op,
                value,
                line,
            })
        }
        Rule::if_stmt => build_if(inner, functions),
        Rule::while_stmt => {
            let mut parts = children(inner);
            let test = build_expr(parts.next().expect("while has a test"))?;
            let body = build_block(parts.next().expect("while has a body"), functions)?;
            Ok(Stmt::While { test, body, line })
        }
        Rule::for_stmt => {
            let mut parts = children(inner);
            let var = parts.next().expect("for has a variable").as_str().to_string();
            let iterable = build_expr(parts.next().expect("for has an iterable"))?;
            let body = build_block(parts.next().expect("for has a body"), functions)?;
            Ok(Stmt::For {
                var,
                iterable,
                body,
                line,
            })
        }
        Rule::try_stmt => {
            let mut body = None;
            let mut catch = None;
            let mut finally = None;
            for part in children(inner) {
                match part.as_rule() {
                    Rule::block => body = Some(build_block(part, functions)?),
                    Rule::catch_clause => {
                        let mut clause = children(part);
                        let var = clause
                            .next()
                            .expect("catch has a binding")
                            .as_str()
                            .to_string();
                        let body = build_block(clause.next().expect("catch has a body"), functions)?;
                        catch = Some(CatchClause { var, body });
                    }
                    Rule::finally_clause => {
                        let block = children(part).next().expect("finally has a body");
                        finally = Some(build_block(block, functions)?);
                    }
                    other => unreachable!("unexpected try part: {other:?}"),
                }
            }
            if catch.is_none() && finally.is_none() {
                return Err(CompileError::syntax(
                    "try statement needs a catch or finally clause",
                    Some(Location {
                        line: line as usize,
                        column: 1,
                    }),
                ));
            }
            Ok(Stmt::Try {
                body: body.expect("try has a body"),
                catch,
                finally,
                line,
            })
        }
        Rule::throw_stmt => {
            let value = build_expr(children(inner).next().expect("throw has a value"))?;
            Ok(Stmt::Throw { value, line })
        }
        Rule::return_stmt => {
            let value = children(inner).next().map(build_expr).transpose()?;
            Ok(Stmt::Return { value, line })
        }
        Rule::break_stmt => Ok(Stmt::Break { line }),
        Rule::continue_stmt => Ok(Stmt::Continue { line }),
        Rule::expr_stmt => {
            let expr = build_expr(inner.into_inner().next().expect("expr stmt holds an expr"))?;
            Ok(Stmt::Expr {
                expr,
                keep: false,
                line,
            })
        }
        other => unreachable!("unexpected statement rule: {other:?}"),
    }
}

fn build_fn_def(pair: Pair<Rule>, functions: &mut Vec<FunctionDef>) -> ParseResult<Stmt> {
    let line = line_of(&pair);
    let mut parts = children(pair);
    let name = parts.next().expect("fn has a name").as_str().to_string();
    let next = parts.next().expect("fn has a body");
    let (params, block) = if next.as_rule() == Rule::param_list {
        let params = next
            .into_inner()
            .map(|p| p.as_str().to_string())
            .collect();
        (params, parts.next().expect("fn has a body"))
    } else {
        (Vec::new(), next)
    };
    let body = build_block(block, functions)?;
    let index = functions.len();
    functions.push(FunctionDef {
        name,
        params,
        body,
        line,
    });
    Ok(Stmt::FnDef { index, line })
}

fn build_if(pair: Pair<Rule>, functions: &mut Vec<FunctionDef>) -> ParseResult<Stmt> {
    let line = line_of(&pair);
    let mut parts = children(pair);
    let test = build_expr(parts.next().expect("if has a test"))?;
    let then_body = build_block(parts.next().expect("if has a then branch"), functions)?;
    let else_body = match parts.next() {
        None => Vec::new(),
        Some(clause) => {
            let inner = children(clause).next().expect("else holds a branch");
            match inner.as_rule() {
                // `else if` nests as a single-statement else branch.
                Rule::if_stmt => vec![build_if(inner, functions)?],
                Rule::block => build_block(inner, functions)?,
                other => unreachable!("unexpected else branch: {other:?}"),
            }
        }
    };
    Ok(Stmt::If {
        test,
        then_body,
        else_body,
        line,
    })
}

fn build_block(pair: Pair<Rule>, functions: &mut Vec<FunctionDef>) -> ParseResult<Vec<Stmt>> {
    pair.into_inner()
        .map(|stmt| build_stmt(stmt, functions))
        .collect()
}

/* ===================== Expressions ===================== */

fn build_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner().next().expect("expr wraps or_expr")),
        Rule::or_expr => build_logic_chain(pair, LogicOp::Or),
        Rule::and_expr => build_logic_chain(pair, LogicOp::And),
        Rule::cmp_expr | Rule::add_expr | Rule::mul_expr => build_binary_chain(pair),
        Rule::unary_expr => build_unary(pair),
        Rule::postfix_expr => build_postfix(pair),
        Rule::primary => build_expr(pair.into_inner().next().expect("primary wraps one node")),
        Rule::literal => build_literal(pair),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::paren_expr => build_expr(pair.into_inner().next().expect("paren wraps an expr")),
        Rule::tuple_lit => Ok(Expr::TupleLit {
            items: pair
                .into_inner()
                .map(build_expr)
                .collect::<ParseResult<Vec<_>>>()?,
        }),
        Rule::list_lit => Ok(Expr::ListLit {
            items: pair
                .into_inner()
                .map(build_expr)
                .collect::<ParseResult<Vec<_>>>()?,
        }),
        Rule::set_lit => Ok(Expr::SetLit {
            items: pair
                .into_inner()
                .map(build_expr)
                .collect::<ParseResult<Vec<_>>>()?,
        }),
        Rule::dict_lit => {
            let mut pairs = Vec::new();
            for entry in pair.into_inner() {
                let mut kv = entry.into_inner();
                let key = build_expr(kv.next().expect("dict pair has a key"))?;
                let value = build_expr(kv.next().expect("dict pair has a value"))?;
                pairs.push((key, value));
            }
            Ok(Expr::DictLit { pairs })
        }
        other => unreachable!("unexpected expression rule: {other:?}"),
    }
}

fn build_logic_chain(pair: Pair<Rule>, op: LogicOp) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expr(inner.next().expect("chain has a first operand"))?;
    while let Some(op_pair) = inner.next() {
        debug_assert!(matches!(op_pair.as_rule(), Rule::op_or | Rule::op_and));
        let rhs = build_expr(inner.next().expect("operator has a right operand"))?;
        expr = Expr::Logic {
            op,
            left: Box::new(expr),
            right: Box::new(rhs),
        };
    }
    Ok(expr)
}

fn build_binary_chain(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expr(inner.next().expect("chain has a first operand"))?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str().trim() {
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<=" => BinOp::Le,
            ">=" => BinOp::Ge,
            "<" => BinOp::Lt,
            ">" => BinOp::Gt,
            "in" => BinOp::In,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Mod,
            other => unreachable!("unknown binary operator {other:?}"),
        };
        let rhs = build_expr(inner.next().expect("operator has a right operand"))?;
        expr = Expr::Binary {
            op,
            left: Box::new(expr),
            right: Box::new(rhs),
        };
    }
    Ok(expr)
}

fn build_unary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut prefixes = Vec::new();
    let mut operand = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::prefix_op => prefixes.push(part),
            Rule::postfix_expr => operand = Some(build_postfix(part)?),
            other => unreachable!("unexpected unary part: {other:?}"),
        }
    }
    let mut expr = operand.expect("unary has an operand");
    // Prefixes apply innermost-last.
    for prefix in prefixes.into_iter().rev() {
        let line = line_of(&prefix);
        let op = prefix
            .into_inner()
            .next()
            .expect("prefix wraps its operator");
        expr = match op.as_rule() {
            Rule::op_not => Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(expr),
            },
            Rule::op_neg => Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(expr),
            },
            Rule::kw_await => Expr::Await {
                inner: Box::new(expr),
                line,
            },
            other => unreachable!("unexpected prefix operator: {other:?}"),
        };
    }
    Ok(expr)
}

fn build_postfix(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expr(inner.next().expect("postfix has a primary"))?;
    for op in inner {
        let line = line_of(&op);
        let op = op.into_inner().next().expect("postfix op wraps one node");
        expr = match op.as_rule() {
            Rule::call_args => {
                let (args, kwargs) = build_call_args(op)?;
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                    kwargs,
                    line,
                }
            }
            Rule::index_op => Expr::Index {
                object: Box::new(expr),
                index: Box::new(build_expr(
                    op.into_inner().next().expect("index holds an expr"),
                )?),
            },
            Rule::member_op => Expr::Member {
                object: Box::new(expr),
                property: op
                    .into_inner()
                    .next()
                    .expect("member holds an identifier")
                    .as_str()
                    .to_string(),
            },
            other => unreachable!("unexpected postfix rule: {other:?}"),
        };
    }
    Ok(expr)
}

#[allow(clippy::type_complexity)]
fn build_call_args(pair: Pair<Rule>) -> ParseResult<(Vec<Expr>, Vec<(String, Expr)>)> {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    let Some(list) = pair.into_inner().next() else {
        return Ok((args, kwargs));
    };
    for arg in list.into_inner() {
        let inner = arg.into_inner().next().expect("arg wraps one node");
        match inner.as_rule() {
            Rule::kwarg => {
                let mut parts = children(inner);
                let name = parts
                    .next()
                    .expect("kwarg has a name")
                    .as_str()
                    .to_string();
                let value = build_expr(parts.next().expect("kwarg has a value"))?;
                kwargs.push((name, value));
            }
            _ => args.push(build_expr(inner)?),
        }
    }
    Ok((args, kwargs))
}

fn build_literal(pair: Pair<Rule>) -> ParseResult<Expr> {
    let inner = pair.into_inner().next().expect("literal wraps one node");
    match inner.as_rule() {
        Rule::kw_null => Ok(Expr::LitNull),
        Rule::kw_true => Ok(Expr::LitBool { v: true }),
        Rule::kw_false => Ok(Expr::LitBool { v: false }),
        Rule::int_lit => {
            let raw = inner.as_str();
            match raw.parse::<i64>() {
                Ok(v) => Ok(Expr::LitInt { v }),
                Err(_) => {
                    let v = raw
                        .parse::<BigInt>()
                        .expect("digit runs always parse as big integers");
                    Ok(Expr::LitBig { v })
                }
            }
        }
        Rule::float_lit => {
            let line = line_of(&inner);
            inner
                .as_str()
                .parse::<f64>()
                .map(|v| Expr::LitFloat { v })
                .map_err(|err| {
                    CompileError::syntax(
                        format!("invalid float literal: {err}"),
                        Some(Location {
                            line: line as usize,
                            column: 1,
                        }),
                    )
                })
        }
        Rule::string_lit => Ok(Expr::LitStr {
            v: unescape(
                inner
                    .into_inner()
                    .next()
                    .expect("string holds its content")
                    .as_str(),
            ),
        }),
        Rule::bytes_lit => Ok(Expr::LitBytes {
            v: unescape(
                inner
                    .into_inner()
                    .next()
                    .expect("bytes literal holds its content")
                    .as_str(),
            )
            .into_bytes(),
        }),
        other => unreachable!("unexpected literal rule: {other:?}"),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
