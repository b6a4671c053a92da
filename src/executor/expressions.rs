//! Expression execution
//!
//! Expression frames collect child values through the register and
//! apply their operation once everything they need has arrived. Calls
//! are the only place execution can leave the vm: external and OS
//! invocations exit to the host, and await/gather exit when the futures
//! they need are still pending.

use super::exec_loop::{Flow, StepExit};
use super::ops;
use super::stdlib::{self, methods, Builtin};
use super::types::{
    AwaitPhase, BinOp, BinaryPhase, CallFrame, CallPhase, CalleeKind, CollectKind, Frame,
    FrameKind, IndexPhase, LogicOp, LogicPhase, MemberPhase, UnaryOp, UnaryPhase,
};
use super::types::Expr;
use super::vm::{push_expr, Scope, Vm, MAX_FRAMES};
use crate::program::Program;
use crate::value::{CallId, ExcKind, ExceptionValue, Value};

fn type_error(message: String) -> ExceptionValue {
    ExceptionValue::new(ExcKind::TypeError, message)
}

/* ===================== Operators ===================== */

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_binary(
    vm: &mut Vm,
    program: &Program,
    op: BinOp,
    mut left: Option<Expr>,
    mut right: Option<Expr>,
    mut left_val: Option<Value>,
    phase: BinaryPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        BinaryPhase::EvalLeft => {
            let expr = left.take().expect("binary frame holds its left side");
            vm.frames.push(Frame {
                kind: FrameKind::Binary {
                    op,
                    left,
                    right,
                    left_val,
                    phase: BinaryPhase::EvalRight,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        BinaryPhase::EvalRight => {
            left_val = Some(vm.take_acc());
            let expr = right.take().expect("binary frame holds its right side");
            vm.frames.push(Frame {
                kind: FrameKind::Binary {
                    op,
                    left,
                    right,
                    left_val,
                    phase: BinaryPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        BinaryPhase::Apply => {
            let rhs = vm.take_acc();
            let lhs = left_val.take().expect("binary frame collected its left value");
            match ops::binary(op, &lhs, &rhs) {
                Ok(value) => vm.acc = Some(value),
                Err(exc) => vm.throw(exc),
            }
        }
    }
    Flow::Continue
}

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_logic(
    vm: &mut Vm,
    program: &Program,
    op: LogicOp,
    mut left: Option<Expr>,
    mut right: Option<Expr>,
    phase: LogicPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        LogicPhase::EvalLeft => {
            let expr = left.take().expect("logic frame holds its left side");
            vm.frames.push(Frame {
                kind: FrameKind::Logic {
                    op,
                    left,
                    right,
                    phase: LogicPhase::Decide,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        LogicPhase::Decide => {
            let lhs = vm.take_acc();
            let short_circuit = match op {
                LogicOp::And => !lhs.is_truthy(),
                LogicOp::Or => lhs.is_truthy(),
            };
            if short_circuit {
                // The deciding operand is the expression's value.
                vm.acc = Some(lhs);
            } else {
                let expr = right.take().expect("logic frame holds its right side");
                vm.frames.push(Frame {
                    kind: FrameKind::Logic {
                        op,
                        left,
                        right,
                        phase: LogicPhase::TakeRight,
                    },
                    scope_base,
                    line,
                });
                push_expr(vm, program, expr, line);
            }
        }
        // The right value is already in the register; the frame drops.
        LogicPhase::TakeRight => {}
    }
    Flow::Continue
}

pub(super) fn execute_unary(
    vm: &mut Vm,
    program: &Program,
    op: UnaryOp,
    mut operand: Option<Expr>,
    phase: UnaryPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        UnaryPhase::Eval => {
            let expr = operand.take().expect("unary frame holds its operand");
            vm.frames.push(Frame {
                kind: FrameKind::Unary {
                    op,
                    operand,
                    phase: UnaryPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        UnaryPhase::Apply => {
            let value = vm.take_acc();
            match ops::unary(op, &value) {
                Ok(value) => vm.acc = Some(value),
                Err(exc) => vm.throw(exc),
            }
        }
    }
    Flow::Continue
}

/* ===================== Access ===================== */

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_index(
    vm: &mut Vm,
    program: &Program,
    mut object: Option<Expr>,
    mut index: Option<Expr>,
    mut object_val: Option<Value>,
    phase: IndexPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        IndexPhase::Object => {
            let expr = object.take().expect("index frame holds its object");
            vm.frames.push(Frame {
                kind: FrameKind::IndexGet {
                    object,
                    index,
                    object_val,
                    phase: IndexPhase::IndexExpr,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        IndexPhase::IndexExpr => {
            object_val = Some(vm.take_acc());
            let expr = index.take().expect("index frame holds its index");
            vm.frames.push(Frame {
                kind: FrameKind::IndexGet {
                    object,
                    index,
                    object_val,
                    phase: IndexPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        IndexPhase::Apply => {
            let idx = vm.take_acc();
            let obj = object_val.take().expect("index frame collected its object");
            match ops::index_get(&obj, &idx) {
                Ok(value) => vm.acc = Some(value),
                Err(exc) => vm.throw(exc),
            }
        }
    }
    Flow::Continue
}

pub(super) fn execute_member(
    vm: &mut Vm,
    program: &Program,
    mut object: Option<Expr>,
    property: String,
    phase: MemberPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    match phase {
        MemberPhase::Object => {
            let expr = object.take().expect("member frame holds its object");
            vm.frames.push(Frame {
                kind: FrameKind::MemberGet {
                    object,
                    property,
                    phase: MemberPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
        }
        MemberPhase::Apply => {
            let obj = vm.take_acc();
            match member_get(&obj, &property) {
                Ok(value) => vm.acc = Some(value),
                Err(exc) => vm.throw(exc),
            }
        }
    }
    Flow::Continue
}

/// Attribute read: record fields plus the introspection attributes of
/// exception values.
fn member_get(object: &Value, property: &str) -> Result<Value, ExceptionValue> {
    match object {
        Value::Record { fields, .. } => fields
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                ExceptionValue::new(
                    ExcKind::AttributeError,
                    format!("record has no field {property:?}"),
                )
            }),
        Value::Exception(exc) => match property {
            "kind" => Ok(Value::Str(exc.kind.name().to_string())),
            "message" => Ok(Value::Str(exc.message.clone())),
            _ => Err(ExceptionValue::new(
                ExcKind::AttributeError,
                format!("exception has no attribute {property:?}"),
            )),
        },
        other => Err(ExceptionValue::new(
            ExcKind::AttributeError,
            format!("{} object has no attribute {property:?}", other.type_name()),
        )),
    }
}

/* ===================== Container Literals ===================== */

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_collect(
    vm: &mut Vm,
    program: &Program,
    kind: CollectKind,
    items: Vec<Expr>,
    mut evaluated: Vec<Value>,
    next: usize,
    scope_base: usize,
    line: u32,
) -> Flow {
    if evaluated.len() < next {
        evaluated.push(vm.take_acc());
    }
    if next < items.len() {
        let item = items[next].clone();
        vm.frames.push(Frame {
            kind: FrameKind::Collect {
                kind,
                items,
                evaluated,
                next: next + 1,
            },
            scope_base,
            line,
        });
        push_expr(vm, program, item, line);
        return Flow::Continue;
    }

    let value = match kind {
        CollectKind::List => Value::List(evaluated),
        CollectKind::Tuple => Value::Tuple(evaluated),
        CollectKind::Set => {
            let mut out: Vec<Value> = Vec::with_capacity(evaluated.len());
            for item in evaluated {
                if !out.iter().any(|existing| existing.eq_value(&item)) {
                    out.push(item);
                }
            }
            Value::Set(out)
        }
        CollectKind::Dict => {
            let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(evaluated.len() / 2);
            let mut iter = evaluated.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                // Later duplicate keys win, preserving first position.
                match pairs.iter_mut().find(|(k, _)| k.eq_value(&key)) {
                    Some((_, slot)) => *slot = value,
                    None => pairs.push((key, value)),
                }
            }
            Value::Dict(pairs)
        }
    };
    vm.acc = Some(value);
    Flow::Continue
}

/* ===================== Calls ===================== */

pub(super) fn execute_call(
    vm: &mut Vm,
    program: &Program,
    mut call: Box<CallFrame>,
    scope_base: usize,
    line: u32,
) -> Flow {
    match call.phase {
        CallPhase::Recv => {
            let recv = call.recv_expr.take().expect("method call holds its receiver");
            call.phase = CallPhase::RecvCollect;
            vm.frames.push(Frame {
                kind: FrameKind::Call(call),
                scope_base,
                line,
            });
            push_expr(vm, program, recv, line);
            Flow::Continue
        }
        CallPhase::RecvCollect => {
            call.recv = Some(vm.take_acc());
            call.phase = CallPhase::Args;
            vm.frames.push(Frame {
                kind: FrameKind::Call(call),
                scope_base,
                line,
            });
            Flow::Continue
        }
        CallPhase::Args => {
            if call.evaluated.len() < call.next {
                evaluated_push(&mut call, vm);
            }
            if call.next < call.operands.len() {
                let operand = call.operands[call.next].clone();
                call.next += 1;
                vm.frames.push(Frame {
                    kind: FrameKind::Call(call),
                    scope_base,
                    line,
                });
                push_expr(vm, program, operand, line);
            } else {
                call.phase = CallPhase::Invoke;
                vm.frames.push(Frame {
                    kind: FrameKind::Call(call),
                    scope_base,
                    line,
                });
            }
            Flow::Continue
        }
        CallPhase::Invoke => invoke(vm, program, call, scope_base, line),
    }
}

fn evaluated_push(call: &mut CallFrame, vm: &mut Vm) {
    let value = vm.take_acc();
    call.evaluated.push(value);
}

/// Dispatch a fully evaluated call. Error paths push the frame back
/// before raising so the call site shows up in the stack trace.
fn invoke(
    vm: &mut Vm,
    program: &Program,
    call: Box<CallFrame>,
    scope_base: usize,
    line: u32,
) -> Flow {
    match call.callee.clone() {
        CalleeKind::Function { index, name } => {
            let func = program.function(index);
            let bindings = match bind_params(&name, &func.params, &call) {
                Ok(bindings) => bindings,
                Err(exc) => return raise_at_call(vm, call, scope_base, line, exc),
            };
            if vm.frames.len() >= MAX_FRAMES {
                let exc = ExceptionValue::new(
                    ExcKind::RecursionError,
                    "maximum recursion depth exceeded",
                );
                return raise_at_call(vm, call, scope_base, line, exc);
            }
            // The function body replaces the call frame; its value lands
            // in the register for the caller's parent.
            let fn_scope_base = vm.scopes.len();
            let mut scope = Scope::function();
            for (param, value) in bindings {
                scope.vars.insert(param, value);
            }
            vm.scopes.push(scope);
            vm.frames.push(Frame {
                kind: FrameKind::FuncBody {
                    body: func.body.clone(),
                    idx: 0,
                    name,
                    call_line: call.line,
                },
                scope_base: fn_scope_base,
                line: func.line,
            });
            Flow::Continue
        }
        CalleeKind::External { name, method_call } => {
            let call_id = vm.alloc_call_id();
            let (args, kwargs) = call.split_operands();
            let args = args.to_vec();
            // The frame stays suspended on top; resuming pops it.
            vm.frames.push(Frame {
                kind: FrameKind::Call(call),
                scope_base,
                line,
            });
            Flow::Exit(StepExit::External {
                name,
                args,
                kwargs,
                call_id,
                method_call,
            })
        }
        CalleeKind::Os(function) => {
            let call_id = vm.alloc_call_id();
            let (args, kwargs) = call.split_operands();
            let args = args.to_vec();
            vm.frames.push(Frame {
                kind: FrameKind::Call(call),
                scope_base,
                line,
            });
            Flow::Exit(StepExit::Os {
                function,
                args,
                kwargs,
                call_id,
            })
        }
        CalleeKind::Builtin(Builtin::Gather) => gather(vm, call, scope_base, line),
        CalleeKind::Builtin(builtin) => {
            if !call.kw_names.is_empty() {
                let exc = type_error(format!(
                    "{}() takes no keyword arguments",
                    builtin.name()
                ));
                return raise_at_call(vm, call, scope_base, line, exc);
            }
            let (args, _) = call.split_operands();
            match stdlib::call_builtin(builtin, args) {
                Ok(value) => {
                    vm.acc = Some(value);
                    Flow::Continue
                }
                Err(exc) => raise_at_call(vm, call, scope_base, line, exc),
            }
        }
        CalleeKind::ExcCtor(kind) => {
            if !call.kw_names.is_empty() || call.n_args > 1 {
                let exc = type_error(format!(
                    "{}() takes at most one positional argument",
                    kind.name()
                ));
                return raise_at_call(vm, call, scope_base, line, exc);
            }
            let message = match call.evaluated.first() {
                None => String::new(),
                Some(Value::Str(s)) => s.clone(),
                Some(other) => other.to_display_string(),
            };
            vm.acc = Some(Value::Exception(Box::new(ExceptionValue::new(
                kind, message,
            ))));
            Flow::Continue
        }
        CalleeKind::Method { name } => {
            if !call.kw_names.is_empty() {
                let exc = type_error(format!("{name}() takes no keyword arguments"));
                return raise_at_call(vm, call, scope_base, line, exc);
            }
            let recv = call.recv.clone().expect("method call collected its receiver");
            let (args, _) = call.split_operands();
            match methods::call_method(&recv, &name, args) {
                Ok(value) => {
                    vm.acc = Some(value);
                    Flow::Continue
                }
                Err(exc) => raise_at_call(vm, call, scope_base, line, exc),
            }
        }
        CalleeKind::NotCallable { name } => {
            let exc = type_error(format!("{name} is not callable"));
            raise_at_call(vm, call, scope_base, line, exc)
        }
    }
}

/// Push the call frame back and raise, so the trace names the call site.
fn raise_at_call(
    vm: &mut Vm,
    call: Box<CallFrame>,
    scope_base: usize,
    line: u32,
    exc: ExceptionValue,
) -> Flow {
    vm.frames.push(Frame {
        kind: FrameKind::Call(call),
        scope_base,
        line,
    });
    vm.throw(exc);
    Flow::Continue
}

/// Bind positional and keyword arguments to parameters.
fn bind_params(
    fn_name: &str,
    params: &[String],
    call: &CallFrame,
) -> Result<Vec<(String, Value)>, ExceptionValue> {
    let (args, kwargs) = call.split_operands();
    if args.len() > params.len() {
        return Err(type_error(format!(
            "{fn_name}() takes {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    let mut bound: Vec<(String, Option<Value>)> = params
        .iter()
        .map(|param| (param.clone(), None))
        .collect();
    for (slot, value) in bound.iter_mut().zip(args) {
        slot.1 = Some(value.clone());
    }
    for (key, value) in kwargs {
        match bound.iter_mut().find(|(param, _)| *param == key) {
            Some((_, slot)) => {
                if slot.is_some() {
                    return Err(type_error(format!(
                        "{fn_name}() got multiple values for argument {key:?}"
                    )));
                }
                *slot = Some(value);
            }
            None => {
                return Err(type_error(format!(
                    "{fn_name}() got an unexpected keyword argument {key:?}"
                )))
            }
        }
    }
    bound
        .into_iter()
        .map(|(param, value)| match value {
            Some(value) => Ok((param, value)),
            None => Err(type_error(format!(
                "{fn_name}() missing required argument {param:?}"
            ))),
        })
        .collect()
}

/* ===================== Futures ===================== */

/// `gather(...)`: yield until every future argument is resolved, then
/// produce the list of results. Values that are not futures pass
/// through; a failed future raises at the gather point.
fn gather(vm: &mut Vm, call: Box<CallFrame>, scope_base: usize, line: u32) -> Flow {
    use super::vm::FutureState;

    if !call.kw_names.is_empty() {
        let exc = type_error("gather() takes no keyword arguments".to_string());
        return raise_at_call(vm, call, scope_base, line, exc);
    }

    // A failure anywhere surfaces immediately.
    for value in &call.evaluated[..call.n_args] {
        if let Value::Future(id) = value {
            if let Some(FutureState::Failed(exc)) = vm.futures.get(id) {
                let exc = exc.clone();
                return raise_at_call(vm, call, scope_base, line, exc);
            }
        }
    }

    let mut unresolved: Vec<CallId> = Vec::new();
    for value in &call.evaluated[..call.n_args] {
        if let Value::Future(id) = value {
            if matches!(vm.futures.get(id), Some(FutureState::Pending))
                && !unresolved.contains(id)
            {
                unresolved.push(*id);
            }
        }
    }
    if !unresolved.is_empty() {
        unresolved.sort();
        vm.frames.push(Frame {
            kind: FrameKind::Call(call),
            scope_base,
            line,
        });
        return Flow::Exit(StepExit::Futures(unresolved));
    }

    let mut results = Vec::with_capacity(call.n_args);
    for value in &call.evaluated[..call.n_args] {
        match value {
            Value::Future(id) => match vm.futures.get(id) {
                Some(FutureState::Resolved(resolved)) => results.push(resolved.clone()),
                _ => {
                    let exc = ExceptionValue::new(
                        ExcKind::RuntimeError,
                        format!("future {id} has no result"),
                    );
                    return raise_at_call(vm, call, scope_base, line, exc);
                }
            },
            other => results.push(other.clone()),
        }
    }
    vm.acc = Some(Value::List(results));
    Flow::Continue
}

/* ===================== Await ===================== */

#[allow(clippy::too_many_arguments)]
pub(super) fn execute_await(
    vm: &mut Vm,
    program: &Program,
    mut inner: Option<Expr>,
    mut value: Option<Value>,
    phase: AwaitPhase,
    scope_base: usize,
    line: u32,
) -> Flow {
    use super::vm::FutureState;

    match phase {
        AwaitPhase::Eval => {
            let expr = inner.take().expect("await frame holds its operand");
            vm.frames.push(Frame {
                kind: FrameKind::AwaitExpr {
                    inner,
                    value,
                    phase: AwaitPhase::Apply,
                },
                scope_base,
                line,
            });
            push_expr(vm, program, expr, line);
            Flow::Continue
        }
        AwaitPhase::Apply => {
            if value.is_none() {
                value = Some(vm.take_acc());
            }
            match &value {
                Some(Value::Future(id)) => {
                    let id = *id;
                    match vm.futures.get(&id) {
                        Some(FutureState::Resolved(resolved)) => {
                            vm.acc = Some(resolved.clone());
                            Flow::Continue
                        }
                        Some(FutureState::Failed(exc)) => {
                            let exc = exc.clone();
                            // Re-push so the await site lands in the trace.
                            vm.frames.push(Frame {
                                kind: FrameKind::AwaitExpr {
                                    inner,
                                    value,
                                    phase: AwaitPhase::Apply,
                                },
                                scope_base,
                                line,
                            });
                            vm.throw(exc);
                            Flow::Continue
                        }
                        Some(FutureState::Pending) => {
                            vm.frames.push(Frame {
                                kind: FrameKind::AwaitExpr {
                                    inner,
                                    value,
                                    phase: AwaitPhase::Apply,
                                },
                                scope_base,
                                line,
                            });
                            Flow::Exit(StepExit::Futures(vec![id]))
                        }
                        None => {
                            let exc = ExceptionValue::new(
                                ExcKind::RuntimeError,
                                format!("future {id} is not tracked by this execution"),
                            );
                            vm.throw(exc);
                            Flow::Continue
                        }
                    }
                }
                // Awaiting a plain value yields the value itself.
                Some(_) => {
                    vm.acc = value;
                    Flow::Continue
                }
                None => unreachable!("await collected its operand"),
            }
        }
    }
}
