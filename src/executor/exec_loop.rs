//! Core execution loop
//!
//! `step()` processes one frame at a time: it pops the top frame,
//! dispatches on its kind and phase, and either pushes frames back,
//! produces a value in the register, or exits at a boundary. `unwind()`
//! resolves active control flow against the frame stack.

use tracing::trace;

use super::expressions::{
    execute_await, execute_binary, execute_call, execute_collect, execute_index, execute_logic,
    execute_member, execute_unary,
};
use super::os::OsFunction;
use super::statements::{
    execute_assign, execute_block, execute_expr_stmt, execute_for, execute_func_body, execute_if,
    execute_let, execute_module, execute_return, execute_throw, execute_try, execute_while,
};
use super::types::{Control, ForPhase, Frame, FrameKind, TryPhase, WhilePhase};
use super::vm::{push_block, Vm};
use crate::program::Program;
use crate::value::{CallId, Value};

/// Why the run loop stopped.
#[derive(Debug)]
pub(crate) enum StepExit {
    /// No frames left: the program finished (result value or unhandled
    /// exception value).
    Complete(Value),
    /// Paused at a host-declared external function call.
    External {
        name: String,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        call_id: CallId,
        method_call: bool,
    },
    /// Paused at a runtime-intrinsic OS call.
    Os {
        function: OsFunction,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        call_id: CallId,
    },
    /// Blocked on unresolved futures, ascending call-id order.
    Futures(Vec<CallId>),
}

/// Result of executing one step.
pub(crate) enum Flow {
    Continue,
    Exit(StepExit),
}

/// Run the vm until it completes or reaches a boundary.
pub(crate) fn run_to_exit(vm: &mut Vm, program: &Program) -> StepExit {
    loop {
        match step(vm, program) {
            Flow::Continue => continue,
            Flow::Exit(exit) => {
                trace!(?exit, "execution paused");
                return exit;
            }
        }
    }
}

/// Execute one step of the vm.
pub(crate) fn step(vm: &mut Vm, program: &Program) -> Flow {
    if vm.control != Control::None {
        return unwind(vm);
    }

    let Some(frame) = vm.frames.pop() else {
        // No frames left: the program result is the value of the final
        // top-level expression statement, if any.
        let result = std::mem::replace(&mut vm.last_value, Value::Null);
        return Flow::Exit(StepExit::Complete(result));
    };
    let Frame {
        kind,
        scope_base,
        line,
    } = frame;

    match kind {
        FrameKind::Module { body, idx } => execute_module(vm, body, idx, scope_base, line),
        FrameKind::Block { body, idx } => execute_block(vm, body, idx, scope_base, line),
        FrameKind::FuncBody {
            body,
            idx,
            name,
            call_line,
        } => execute_func_body(vm, body, idx, name, call_line, scope_base, line),
        FrameKind::Let { name, init, phase } => {
            execute_let(vm, program, name, init, phase, scope_base, line)
        }
        FrameKind::Assign {
            name,
            index,
            op,
            value,
            index_val,
            phase,
        } => execute_assign(
            vm, program, name, index, op, value, index_val, phase, scope_base, line,
        ),
        FrameKind::ExprStmt { expr, keep, phase } => {
            execute_expr_stmt(vm, program, expr, keep, phase, scope_base, line)
        }
        FrameKind::If {
            test,
            then_body,
            else_body,
            phase,
        } => execute_if(
            vm, program, test, then_body, else_body, phase, scope_base, line,
        ),
        FrameKind::While { test, body, phase } => {
            execute_while(vm, program, test, body, phase, scope_base, line)
        }
        FrameKind::For {
            var,
            iterable,
            items,
            idx,
            body,
            phase,
        } => execute_for(
            vm, program, var, iterable, items, idx, body, phase, scope_base, line,
        ),
        FrameKind::Try {
            catch,
            finally,
            phase,
        } => execute_try(vm, catch, finally, phase, scope_base, line),
        FrameKind::Throw { value, phase } => {
            execute_throw(vm, program, value, phase, scope_base, line)
        }
        FrameKind::Return { value, phase } => {
            execute_return(vm, program, value, phase, scope_base, line)
        }
        FrameKind::Binary {
            op,
            left,
            right,
            left_val,
            phase,
        } => execute_binary(
            vm, program, op, left, right, left_val, phase, scope_base, line,
        ),
        FrameKind::Logic {
            op,
            left,
            right,
            phase,
        } => execute_logic(vm, program, op, left, right, phase, scope_base, line),
        FrameKind::Unary { op, operand, phase } => {
            execute_unary(vm, program, op, operand, phase, scope_base, line)
        }
        FrameKind::IndexGet {
            object,
            index,
            object_val,
            phase,
        } => execute_index(
            vm, program, object, index, object_val, phase, scope_base, line,
        ),
        FrameKind::MemberGet {
            object,
            property,
            phase,
        } => execute_member(vm, program, object, property, phase, scope_base, line),
        FrameKind::Collect {
            kind,
            items,
            evaluated,
            next,
        } => execute_collect(vm, program, kind, items, evaluated, next, scope_base, line),
        FrameKind::Call(call) => execute_call(vm, program, call, scope_base, line),
        FrameKind::AwaitExpr {
            inner,
            value,
            phase,
        } => execute_await(vm, program, inner, value, phase, scope_base, line),
    }
}

/* ===================== Control Flow ===================== */

/// What unwinding does with the current top frame.
enum UnwindAction {
    /// No handler here; drop the frame and keep going.
    Pop,
    /// A loop consumes `continue` by re-entering its test phase.
    LoopContinue,
    /// A loop consumes `break` by popping itself.
    LoopBreak,
    /// A function body consumes `return`; the value lands in the register.
    FnReturn,
    /// A try frame catches the throw into its handler block.
    EnterCatch,
    /// A try frame defers the control flow until `finally` has run.
    EnterFinally,
}

/// Resolve active control flow against the frame stack. Every popped
/// frame drops the scopes it introduced; control raised inside a
/// `finally` block replaces whatever was pending.
fn unwind(vm: &mut Vm) -> Flow {
    let control = std::mem::replace(&mut vm.control, Control::None);

    loop {
        let Some(top_idx) = vm.frames.len().checked_sub(1) else {
            return match control {
                Control::Throw(value) => Flow::Exit(StepExit::Complete(value)),
                // Top-level return is rejected at compile time; treat it
                // as completion anyway.
                Control::Return(value) => Flow::Exit(StepExit::Complete(value)),
                Control::Break | Control::Continue | Control::None => {
                    unreachable!("unwind entered without pending control")
                }
            };
        };

        let action = match (&vm.frames[top_idx].kind, &control) {
            (FrameKind::While { .. } | FrameKind::For { .. }, Control::Continue) => {
                UnwindAction::LoopContinue
            }
            (FrameKind::While { .. } | FrameKind::For { .. }, Control::Break) => {
                UnwindAction::LoopBreak
            }
            (FrameKind::FuncBody { .. }, Control::Return(_)) => UnwindAction::FnReturn,
            (
                FrameKind::Try {
                    catch: Some(_),
                    phase: TryPhase::Body,
                    ..
                },
                Control::Throw(_),
            ) => UnwindAction::EnterCatch,
            (
                FrameKind::Try {
                    finally: Some(_),
                    phase: TryPhase::Body | TryPhase::Catch,
                    ..
                },
                _,
            ) => UnwindAction::EnterFinally,
            _ => UnwindAction::Pop,
        };

        match action {
            UnwindAction::Pop => vm.pop_top_frame(),
            UnwindAction::LoopContinue => {
                match &mut vm.frames[top_idx].kind {
                    FrameKind::While { phase, .. } => *phase = WhilePhase::Test,
                    FrameKind::For { phase, .. } => *phase = ForPhase::Next,
                    _ => unreachable!("loop continue targets a loop frame"),
                }
                return Flow::Continue;
            }
            UnwindAction::LoopBreak => {
                vm.pop_top_frame();
                return Flow::Continue;
            }
            UnwindAction::FnReturn => {
                vm.pop_top_frame();
                let Control::Return(value) = control else {
                    unreachable!("fn return action requires return control")
                };
                vm.acc = Some(value);
                return Flow::Continue;
            }
            UnwindAction::EnterCatch => {
                let line = vm.frames[top_idx].line;
                let clause = match &mut vm.frames[top_idx].kind {
                    FrameKind::Try { catch, phase, .. } => {
                        *phase = TryPhase::Catch;
                        catch.take().expect("catch clause present")
                    }
                    _ => unreachable!("catch action targets a try frame"),
                };
                let Control::Throw(exc) = control else {
                    unreachable!("catch action requires throw control")
                };
                push_block(vm, clause.body, line);
                vm.define(&clause.var, exc);
                return Flow::Continue;
            }
            UnwindAction::EnterFinally => {
                let line = vm.frames[top_idx].line;
                let pending = control;
                let fin = match &mut vm.frames[top_idx].kind {
                    FrameKind::Try { finally, phase, .. } => {
                        *phase = TryPhase::Finally {
                            pending: Box::new(pending),
                        };
                        finally.take().expect("finally block present")
                    }
                    _ => unreachable!("finally action targets a try frame"),
                };
                push_block(vm, fin, line);
                return Flow::Continue;
            }
        }
    }
}
