//! Statement execution
//!
//! One handler per statement frame kind. Each handler receives the
//! popped frame's fields, advances its phase machine, and pushes frames
//! back onto the stack as needed. Handlers that finish without pushing
//! back must drop the scopes their frame introduced.

use super::exec_loop::Flow;
use super::ops;
use super::types::{
    AssignOp, AssignPhase, BinOp, CatchClause, Control, ExprStmtPhase, ForPhase, Frame, FrameKind,
    IfPhase, LetPhase, ReturnPhase, Stmt, ThrowPhase, TryPhase, WhilePhase,
};
use super::types::Expr;
use super::vm::{push_block, push_expr, push_stmt, Vm};
use crate::program::Program;
use crate::value::{ExcKind, ExceptionValue, Value};

fn name_error(name: &str) -> ExceptionValue {
    ExceptionValue::new(ExcKind::NameError, format!("name {name:?} is not defined"))
}

/* ===================== Statement Sequences ===================== */

pub(super) fn execute_module(
    vm: &mut Vm,
    body: Vec<Stmt>,
    idx: usize,
    scope_base: usize,
    line: u32,
) -> Flow {
    if idx < body.len() {
        let stmt = body[idx].clone();
        vm.frames.push(Frame {
            kind: FrameKind::Module { body, idx: idx + 1 },
            scope_base,
            line,
        });
        push_stmt(vm, stmt);
    } else {
        vm.scopes.truncate(scope_base);
    }
    Flow::Continue
}

pub(super) fn execute_block(
    vm: &mut Vm,
    body: Vec<Stmt>,
    idx: usize,
    scope_base: usize,
    line: u32,
) -> Flow {
    if idx < body.len() {
        let stmt = body[idx].clone();
        vm.frames.push(Frame {
            kind: FrameKind::Block { body, idx: idx + 1 },
            scope_base,
            line,
        });
        push_stmt(vm, stmt);
    } else {
        vm.scopes.truncate(scope_base);
    }
    Flow::Continue
}

pub(super) fn execute_func_body(
    vm: &mut Vm,
    body: Vec<Stmt>,
    idx: usize,
    name: String,
    call_line: u32,
    scope_base: usize,
    line: u32,
) -> Flow {
    if idx < body.len() {
        let stmt = body[idx].clone();
        vm.frames.push(Frame {
            kind: FrameKind::FuncBody {
                body,
                idx: idx + 1,
                name,
                call_line,
            },
            scope_base,
            line,
        });
        push_stmt(vm, stmt);
    } else {
        // Fell off the end: the function returns null.
        vm.scopes.truncate(scope_base);
        vm.acc = Some(Value::Null);
    }
    Flow::Continue
}

/* ===================== Bindings ===================== */

pub(super) fn execute_let(
    vm: &mut Vm,
    program: &Program,
    name: String,
    mut init: Option<Expr>,
    phase: LetPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        LetPhase::Eval => {
            let expr = init.take().expect("let frame holds its initializer");
            vm.frames.push(Frame {
                kind: FrameKind::Let {
                    name,
                    init,
                    phase: LetPhase::Bind,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        LetPhase::Bind => {
            let value = vm.take_acc();
            vm.define(&name, value);
        }
    }
    Flow::Continue
}

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_assign(
    vm: &mut Vm,
    program: &Program,
    name: String,
    mut index: Option<Expr>,
    op: AssignOp,
    mut value: Option<Expr>,
    mut index_val: Option<Value>,
    phase: AssignPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        AssignPhase::Index => {
            let expr = index.take().expect("index assignment holds its index");
            vm.frames.push(Frame {
                kind: FrameKind::Assign {
                    name,
                    index,
                    op,
                    value,
                    index_val,
                    phase: AssignPhase::CollectIndex,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        AssignPhase::CollectIndex => {
            index_val = Some(vm.take_acc());
            let expr = value.take().expect("assignment holds its value");
            vm.frames.push(Frame {
                kind: FrameKind::Assign {
                    name,
                    index,
                    op,
                    value,
                    index_val,
                    phase: AssignPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        AssignPhase::Value => {
            let expr = value.take().expect("assignment holds its value");
            vm.frames.push(Frame {
                kind: FrameKind::Assign {
                    name,
                    index,
                    op,
                    value,
                    index_val,
                    phase: AssignPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        AssignPhase::Apply => {
            let rhs = vm.take_acc();
            apply_assign(vm, &name, index_val, op, rhs);
        }
    }
    Flow::Continue
}

/// Compute the stored value (reading the current one for compound ops)
/// and rebind the target.
fn apply_assign(vm: &mut Vm, name: &str, index_val: Option<Value>, op: AssignOp, rhs: Value) {
    let computed = match assign_bin_op(op) {
        None => Ok(rhs),
        Some(bin) => {
            let current = match (vm.lookup(name), &index_val) {
                (None, _) => Err(name_error(name)),
                (Some(container), Some(idx)) => ops::index_get(container, idx),
                (Some(value), None) => Ok(value.clone()),
            };
            current.and_then(|current| ops::binary(bin, &current, &rhs))
        }
    };

    let value = match computed {
        Ok(value) => value,
        Err(exc) => return vm.throw(exc),
    };

    match index_val {
        None => {
            if !vm.assign(name, value) {
                vm.throw(name_error(name));
            }
        }
        Some(idx) => {
            let Some(container) = vm.lookup(name).cloned() else {
                return vm.throw(name_error(name));
            };
            match ops::index_set(container, &idx, value) {
                Ok(updated) => {
                    if !vm.assign(name, updated) {
                        vm.throw(name_error(name));
                    }
                }
                Err(exc) => vm.throw(exc),
            }
        }
    }
}

fn assign_bin_op(op: AssignOp) -> Option<BinOp> {
    match op {
        AssignOp::Set => None,
        AssignOp::Add => Some(BinOp::Add),
        AssignOp::Sub => Some(BinOp::Sub),
        AssignOp::Mul => Some(BinOp::Mul),
        AssignOp::Div => Some(BinOp::Div),
    }
}

/* ===================== Expression Statements ===================== */

pub(super) fn execute_expr_stmt(
    vm: &mut Vm,
    program: &Program,
    mut expr: Option<Expr>,
    keep: bool,
    phase: ExprStmtPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        ExprStmtPhase::Eval => {
            let inner = expr.take().expect("expression statement holds its expr");
            vm.frames.push(Frame {
                kind: FrameKind::ExprStmt {
                    expr,
                    keep,
                    phase: ExprStmtPhase::Done,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, inner, line);
        }
        ExprStmtPhase::Done => {
            let value = vm.take_acc();
            if keep {
                vm.last_value = value;
            }
        }
    }
    Flow::Continue
}

/* ===================== Conditionals and Loops ===================== */

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_if(
    vm: &mut Vm,
    program: &Program,
    mut test: Option<Expr>,
    then_body: Vec<Stmt>,
    else_body: Vec<Stmt>,
    phase: IfPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        IfPhase::Test => {
            let expr = test.take().expect("if frame holds its test");
            vm.frames.push(Frame {
                kind: FrameKind::If {
                    test,
                    then_body,
                    else_body,
                    phase: IfPhase::Decide,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        IfPhase::Decide => {
            let cond = vm.take_acc();
            let branch = if cond.is_truthy() { then_body } else { else_body };
            if !branch.is_empty() {
                push_block(vm, branch, line);
            }
        }
    }
    Flow::Continue
}

pub(super) fn execute_while(
    vm: &mut Vm,
    program: &Program,
    test: Expr,
    body: Vec<Stmt>,
    phase: WhilePhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        WhilePhase::Test => {
            let expr = test.clone();
            vm.frames.push(Frame {
                kind: FrameKind::While {
                    test,
                    body,
                    phase: WhilePhase::Decide,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        WhilePhase::Decide => {
            let cond = vm.take_acc();
            if cond.is_truthy() {
                let iteration = body.clone();
                vm.frames.push(Frame {
                    kind: FrameKind::While {
                        test,
                        body,
                        phase: WhilePhase::Test,
                    },
                    scope_base,
                    line,
                });
                push_block(vm, iteration, line);
            }
            // Falsy: the loop frame just drops.
        }
    }
    Flow::Continue
}

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_for(
    vm: &mut Vm,
    program: &Program,
    var: String,
    mut iterable: Option<Expr>,
    items: Vec<Value>,
    idx: usize,
    body: Vec<Stmt>,
    phase: ForPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        ForPhase::Iterable => {
            let expr = iterable.take().expect("for frame holds its iterable");
            vm.frames.push(Frame {
                kind: FrameKind::For {
                    var,
                    iterable,
                    items,
                    idx,
                    body,
                    phase: ForPhase::Collect,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        ForPhase::Collect => {
            let value = vm.take_acc();
            match ops::iter_values(&value) {
                Ok(collected) => {
                    vm.frames.push(Frame {
                        kind: FrameKind::For {
                            var,
                            iterable,
                            items: collected,
                            idx: 0,
                            body,
                            phase: ForPhase::Next,
                        },
                        scope_base,
                        line,
                    });
                }
                Err(exc) => {
                    // The loop scope was created when the frame was
                    // pushed; drop it before raising.
                    vm.scopes.truncate(scope_base);
                    vm.throw(exc);
                }
            }
        }
        ForPhase::Next => {
            if idx < items.len() {
                let item = items[idx].clone();
                vm.define(&var, item);
                let iteration = body.clone();
                vm.frames.push(Frame {
                    kind: FrameKind::For {
                        var,
                        iterable,
                        items,
                        idx: idx + 1,
                        body,
                        phase: ForPhase::Next,
                    },
                    scope_base,
                    line,
                });
                push_block(vm, iteration, line);
            } else {
                vm.scopes.truncate(scope_base);
            }
        }
    }
    Flow::Continue
}

/* ===================== Try / Throw / Return ===================== */

/// Stepping a try frame means its current block (body, catch, or
/// finally) completed without unwinding past it; the catch path itself
/// is entered from `unwind`.
pub(super) fn execute_try(
    vm: &mut Vm,
    catch: Option<CatchClause>,
    mut finally: Option<Vec<Stmt>>,
    phase: TryPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        TryPhase::Body | TryPhase::Catch => {
            if let Some(fin) = finally.take() {
                vm.frames.push(Frame {
                    kind: FrameKind::Try {
                        catch,
                        finally,
                        phase: TryPhase::Finally {
                            pending: Box::new(Control::None),
                        },
                    },
                    scope_base,
                    line,
                });
                push_block(vm, fin, line);
            }
            // No finally: the frame just drops.
        }
        TryPhase::Finally { pending } => {
            let pending = *pending;
            if pending != Control::None {
                vm.acc = None;
                vm.control = pending;
            }
        }
    }
    Flow::Continue
}

pub(super) fn execute_throw(
    vm: &mut Vm,
    program: &Program,
    mut value: Option<Expr>,
    phase: ThrowPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        ThrowPhase::Eval => {
            let expr = value.take().expect("throw frame holds its value");
            vm.frames.push(Frame {
                kind: FrameKind::Throw {
                    value,
                    phase: ThrowPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        ThrowPhase::Apply => {
            // Push the frame back so the raise site appears in the trace.
            let raised = vm.take_acc();
            vm.frames.push(Frame {
                kind: FrameKind::Throw {
                    value,
                    phase: ThrowPhase::Apply,
                },
                scope_base,
                line,
            });
            vm.throw_value(raised);
        }
    }
    Flow::Continue
}

pub(super) fn execute_return(
    vm: &mut Vm,
    program: &Program,
    mut value: Option<Expr>,
    phase: ReturnPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        ReturnPhase::Eval => {
            let expr = value.take().expect("return frame holds its value");
            vm.frames.push(Frame {
                kind: FrameKind::Return {
                    value,
                    phase: ReturnPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        ReturnPhase::Apply => {
            let result = vm.take_acc();
            vm.acc = None;
            vm.control = Control::Return(result);
        }
    }
    Flow::Continue
}
