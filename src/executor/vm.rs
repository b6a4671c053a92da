//! Virtual machine state
//!
//! The vm holds all execution state: the frame stack, the scope stack,
//! active control flow, the value register that carries a completed
//! child's result to its parent frame, and the future table. Everything
//! serializes, which is what makes suspended executions portable across
//! processes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::os::OsFunction;
use super::stdlib::Builtin;
use super::types::{
    AssignPhase, AssignTarget, AwaitPhase, BinaryPhase, CallFrame, CallPhase, CalleeKind,
    CollectKind, Control, ExprStmtPhase, ForPhase, Frame, FrameKind, IfPhase, IndexPhase, LetPhase,
    LogicPhase, MemberPhase, ReturnPhase, Stmt, ThrowPhase, TryPhase, UnaryPhase, WhilePhase,
};
use super::types::Expr;
use crate::program::Program;
use crate::snapshot::ExternalResult;
use crate::value::{CallId, ExcKind, ExceptionValue, TraceFrame, Value};

/// Hard cap on frame-stack depth; exceeding it raises RecursionError
/// inside the program instead of exhausting host memory.
pub(crate) const MAX_FRAMES: usize = 10_000;

/* ===================== Scopes ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum ScopeKind {
    Global,
    /// Name lookup stops here and falls through to the global scope.
    Function,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scope {
    pub kind: ScopeKind,
    pub vars: HashMap<String, Value>,
}

impl Scope {
    fn block() -> Self {
        Scope {
            kind: ScopeKind::Block,
            vars: HashMap::new(),
        }
    }

    pub(crate) fn function() -> Self {
        Scope {
            kind: ScopeKind::Function,
            vars: HashMap::new(),
        }
    }
}

/* ===================== Futures ===================== */

/// Host-side progress of an external call resolved as a future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum FutureState {
    Pending,
    Resolved(Value),
    Failed(ExceptionValue),
}

/* ===================== VM ===================== */

/// Live interpreter context for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vm {
    pub(crate) frames: Vec<Frame>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) control: Control,
    /// Value register: result of the most recently completed frame.
    pub(crate) acc: Option<Value>,
    /// Value of the final top-level expression statement, the program
    /// result on completion.
    pub(crate) last_value: Value,
    pub(crate) next_call_id: u32,
    pub(crate) futures: BTreeMap<CallId, FutureState>,
}

impl Vm {
    /// Build a vm for a fresh run with inputs bound positionally into
    /// the global scope.
    pub(crate) fn new(program: &Program, inputs: Vec<Value>) -> Self {
        let mut vars = HashMap::new();
        for (name, value) in program.input_names().iter().zip(inputs) {
            vars.insert(name.clone(), value);
        }
        let scopes = vec![Scope {
            kind: ScopeKind::Global,
            vars,
        }];
        let frames = vec![Frame {
            kind: FrameKind::Module {
                body: program.body().to_vec(),
                idx: 0,
            },
            scope_base: 1,
            line: 0,
        }];
        Vm {
            frames,
            scopes,
            control: Control::None,
            acc: None,
            last_value: Value::Null,
            next_call_id: 1,
            futures: BTreeMap::new(),
        }
    }

    /* ----- scopes ----- */

    pub(crate) fn lookup(&self, name: &str) -> Option<&Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.vars.get(name) {
                return Some(value);
            }
            if scope.kind == ScopeKind::Function {
                return self.scopes[0].vars.get(name);
            }
        }
        None
    }

    /// Bind a name in the innermost scope.
    pub(crate) fn define(&mut self, name: &str, value: Value) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .vars
            .insert(name.to_owned(), value);
    }

    /// Rebind an existing visible name. Returns false when nothing with
    /// that name is in scope (the validator makes that unreachable from
    /// compiled programs).
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> bool {
        let mut hit_boundary = false;
        for i in (0..self.scopes.len()).rev() {
            if self.scopes[i].vars.contains_key(name) {
                self.scopes[i].vars.insert(name.to_owned(), value);
                return true;
            }
            if self.scopes[i].kind == ScopeKind::Function {
                hit_boundary = true;
                break;
            }
        }
        if hit_boundary && self.scopes[0].vars.contains_key(name) {
            self.scopes[0].vars.insert(name.to_owned(), value);
            return true;
        }
        false
    }

    /* ----- value register ----- */

    pub(crate) fn take_acc(&mut self) -> Value {
        self.acc
            .take()
            .expect("value register holds the completed child result")
    }

    /* ----- frames ----- */

    pub(crate) fn push_frame(&mut self, kind: FrameKind, line: u32) {
        let scope_base = self.scopes.len();
        self.frames.push(Frame {
            kind,
            scope_base,
            line,
        });
    }

    /// Pop the top frame and drop any scopes it introduced.
    pub(crate) fn pop_top_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.scopes.truncate(frame.scope_base);
        }
    }

    /* ----- call ids and futures ----- */

    pub(crate) fn alloc_call_id(&mut self) -> CallId {
        let id = CallId(self.next_call_id);
        self.next_call_id += 1;
        id
    }

    /* ----- exceptions ----- */

    /// Raise an exception at the current execution point.
    pub(crate) fn throw(&mut self, mut exc: ExceptionValue) {
        if exc.trace.is_empty() {
            exc.trace = self.build_trace();
        }
        self.acc = None;
        self.control = Control::Throw(Value::Exception(Box::new(exc)));
    }

    /// Raise a value produced by a `throw` statement: exceptions raise
    /// as themselves, anything else wraps into a RuntimeError.
    pub(crate) fn throw_value(&mut self, value: Value) {
        match value {
            Value::Exception(exc) => self.throw(*exc),
            other => self.throw(ExceptionValue::new(
                ExcKind::RuntimeError,
                other.to_display_string(),
            )),
        }
    }

    /// Call chain for a raise at the current point, outermost first.
    pub(crate) fn build_trace(&self) -> Vec<TraceFrame> {
        let mut trace = Vec::new();
        let mut current = String::from("<module>");
        for frame in &self.frames {
            if let FrameKind::FuncBody {
                name, call_line, ..
            } = &frame.kind
            {
                trace.push(TraceFrame {
                    function: current.clone(),
                    line: *call_line,
                });
                current = name.clone();
            }
        }
        let line = self
            .frames
            .iter()
            .rev()
            .map(|frame| frame.line)
            .find(|line| *line != 0)
            .unwrap_or(0);
        trace.push(TraceFrame {
            function: current,
            line,
        });
        trace
    }

    /* ----- resumption ----- */

    /// Deliver the host's answer for the boundary call this vm paused on.
    /// The top frame is the suspended call; it pops and either yields the
    /// value, raises, or turns into a pending future.
    pub(crate) fn resume_external(&mut self, call_id: CallId, result: ExternalResult) {
        match result {
            ExternalResult::Return(value) => {
                self.pop_top_frame();
                self.acc = Some(value);
            }
            ExternalResult::Error(mut exc) => {
                if exc.trace.is_empty() {
                    exc.trace = self.build_trace();
                }
                self.pop_top_frame();
                self.acc = None;
                self.control = Control::Throw(Value::Exception(Box::new(exc)));
            }
            ExternalResult::Future => {
                self.futures.insert(call_id, FutureState::Pending);
                self.pop_top_frame();
                self.acc = Some(Value::Future(call_id));
            }
        }
    }
}

/* ===================== Frame Construction ===================== */

/// Push a frame (or act immediately) for a statement.
pub(super) fn push_stmt(vm: &mut Vm, stmt: Stmt) {
    match stmt {
        Stmt::Let {
            name,
            init: None,
            ..
        } => vm.define(&name, Value::Null),
        Stmt::Let {
            name,
            init: Some(init),
            line,
        } => vm.push_frame(
            FrameKind::Let {
                name,
                init: Some(init),
                phase: LetPhase::Eval,
            },
            line,
        ),
        Stmt::Assign {
            target,
            op,
            value,
            line,
        } => {
            let (name, index) = match target {
                AssignTarget::Name(name) => (name, None),
                AssignTarget::Index { name, index } => (name, Some(index)),
            };
            let phase = if index.is_some() {
                AssignPhase::Index
            } else {
                AssignPhase::Value
            };
            vm.push_frame(
                FrameKind::Assign {
                    name,
                    index,
                    op,
                    value: Some(value),
                    index_val: None,
                    phase,
                },
                line,
            );
        }
        Stmt::Expr { expr, keep, line } => vm.push_frame(
            FrameKind::ExprStmt {
                expr: Some(expr),
                keep,
                phase: ExprStmtPhase::Eval,
            },
            line,
        ),
        Stmt::If {
            test,
            then_body,
            else_body,
            line,
        } => vm.push_frame(
            FrameKind::If {
                test: Some(test),
                then_body,
                else_body,
                phase: IfPhase::Test,
            },
            line,
        ),
        Stmt::While { test, body, line } => vm.push_frame(
            FrameKind::While {
                test,
                body,
                phase: WhilePhase::Test,
            },
            line,
        ),
        Stmt::For {
            var,
            iterable,
            body,
            line,
        } => {
            // The loop owns one scope holding the iteration variable.
            let scope_base = vm.scopes.len();
            vm.scopes.push(Scope::block());
            vm.frames.push(Frame {
                kind: FrameKind::For {
                    var,
                    iterable: Some(iterable),
                    items: Vec::new(),
                    idx: 0,
                    body,
                    phase: ForPhase::Iterable,
                },
                scope_base,
                line,
            });
        }
        Stmt::Try {
            body,
            catch,
            finally,
            line,
        } => {
            vm.push_frame(
                FrameKind::Try {
                    catch,
                    finally,
                    phase: TryPhase::Body,
                },
                line,
            );
            push_block(vm, body, line);
        }
        Stmt::Throw { value, line } => vm.push_frame(
            FrameKind::Throw {
                value: Some(value),
                phase: ThrowPhase::Eval,
            },
            line,
        ),
        Stmt::Return { value: None, .. } => {
            vm.acc = None;
            vm.control = Control::Return(Value::Null);
        }
        Stmt::Return {
            value: Some(value),
            line,
        } => vm.push_frame(
            FrameKind::Return {
                value: Some(value),
                phase: ReturnPhase::Eval,
            },
            line,
        ),
        Stmt::Break { .. } => vm.control = Control::Break,
        Stmt::Continue { .. } => vm.control = Control::Continue,
        // Functions are hoisted at compile time.
        Stmt::FnDef { .. } => {}
    }
}

/// Push a block of statements with its own scope.
pub(super) fn push_block(vm: &mut Vm, body: Vec<Stmt>, line: u32) {
    let scope_base = vm.scopes.len();
    vm.scopes.push(Scope::block());
    vm.frames.push(Frame {
        kind: FrameKind::Block { body, idx: 0 },
        scope_base,
        line,
    });
}

/// Push a frame (or produce a value immediately) for an expression.
///
/// Leaf expressions land straight in the value register; everything else
/// becomes a frame whose phases drive child evaluation.
pub(super) fn push_expr(vm: &mut Vm, program: &Program, expr: Expr, line: u32) {
    match expr {
        Expr::LitNull => vm.acc = Some(Value::Null),
        Expr::LitBool { v } => vm.acc = Some(Value::Bool(v)),
        Expr::LitInt { v } => vm.acc = Some(Value::Int(v)),
        Expr::LitBig { v } => vm.acc = Some(Value::BigInt(v)),
        Expr::LitFloat { v } => vm.acc = Some(Value::Float(v)),
        Expr::LitStr { v } => vm.acc = Some(Value::Str(v)),
        Expr::LitBytes { v } => vm.acc = Some(Value::Bytes(v)),
        Expr::Ident { name } => match vm.lookup(&name) {
            Some(value) => vm.acc = Some(value.clone()),
            None => vm.throw(ExceptionValue::new(
                ExcKind::NameError,
                format!("name {name:?} is not defined"),
            )),
        },
        Expr::ListLit { items } => push_collect(vm, CollectKind::List, items, line),
        Expr::TupleLit { items } => push_collect(vm, CollectKind::Tuple, items, line),
        Expr::SetLit { items } => push_collect(vm, CollectKind::Set, items, line),
        Expr::DictLit { pairs } => {
            let mut items = Vec::with_capacity(pairs.len() * 2);
            for (k, v) in pairs {
                items.push(k);
                items.push(v);
            }
            push_collect(vm, CollectKind::Dict, items, line);
        }
        Expr::Unary { op, operand } => vm.push_frame(
            FrameKind::Unary {
                op,
                operand: Some(*operand),
                phase: UnaryPhase::Eval,
            },
            line,
        ),
        Expr::Binary { op, left, right } => vm.push_frame(
            FrameKind::Binary {
                op,
                left: Some(*left),
                right: Some(*right),
                left_val: None,
                phase: BinaryPhase::EvalLeft,
            },
            line,
        ),
        Expr::Logic { op, left, right } => vm.push_frame(
            FrameKind::Logic {
                op,
                left: Some(*left),
                right: Some(*right),
                phase: LogicPhase::EvalLeft,
            },
            line,
        ),
        Expr::Index { object, index } => vm.push_frame(
            FrameKind::IndexGet {
                object: Some(*object),
                index: Some(*index),
                object_val: None,
                phase: IndexPhase::Object,
            },
            line,
        ),
        Expr::Member { object, property } => vm.push_frame(
            FrameKind::MemberGet {
                object: Some(*object),
                property,
                phase: MemberPhase::Object,
            },
            line,
        ),
        Expr::Call {
            callee,
            args,
            kwargs,
            line: call_line,
        } => push_call(vm, program, *callee, args, kwargs, call_line),
        Expr::Await { inner, line: await_line } => vm.push_frame(
            FrameKind::AwaitExpr {
                inner: Some(*inner),
                value: None,
                phase: AwaitPhase::Eval,
            },
            await_line,
        ),
    }
}

fn push_collect(vm: &mut Vm, kind: CollectKind, items: Vec<Expr>, line: u32) {
    vm.push_frame(
        FrameKind::Collect {
            kind,
            items,
            evaluated: Vec::new(),
            next: 0,
        },
        line,
    );
}

fn push_call(
    vm: &mut Vm,
    program: &Program,
    callee: Expr,
    args: Vec<Expr>,
    kwargs: Vec<(String, Expr)>,
    line: u32,
) {
    let mut recv_expr = None;
    let callee_kind = match callee {
        Expr::Ident { name } => resolve_callee_name(program, &name),
        Expr::Member { object, property } => {
            let dotted = match object.as_ref() {
                Expr::Ident { name: base } => {
                    let dotted = format!("{base}.{property}");
                    program.has_external(&dotted).then_some(dotted)
                }
                _ => None,
            };
            match dotted {
                Some(name) => CalleeKind::External {
                    name,
                    method_call: true,
                },
                None => {
                    recv_expr = Some(*object);
                    CalleeKind::Method { name: property }
                }
            }
        }
        _ => CalleeKind::NotCallable {
            name: "<expression>".into(),
        },
    };

    let n_args = args.len();
    let mut operands = args;
    let mut kw_names = Vec::with_capacity(kwargs.len());
    for (name, expr) in kwargs {
        kw_names.push(name);
        operands.push(expr);
    }
    let phase = if recv_expr.is_some() {
        CallPhase::Recv
    } else {
        CallPhase::Args
    };
    vm.push_frame(
        FrameKind::Call(Box::new(CallFrame {
            callee: callee_kind,
            recv_expr,
            recv: None,
            operands,
            evaluated: Vec::new(),
            next: 0,
            n_args,
            kw_names,
            line,
            phase,
        })),
        line,
    );
}

/// Name spaces a bare call resolves against, most specific first: user
/// functions, then host-declared externals, builtins, exception
/// constructors, and OS functions.
fn resolve_callee_name(program: &Program, name: &str) -> CalleeKind {
    if let Some(index) = program.function_index(name) {
        return CalleeKind::Function {
            index,
            name: name.to_owned(),
        };
    }
    if program.has_external(name) {
        return CalleeKind::External {
            name: name.to_owned(),
            method_call: false,
        };
    }
    if let Some(builtin) = Builtin::from_name(name) {
        return CalleeKind::Builtin(builtin);
    }
    if let Some(kind) = ExcKind::from_name(name) {
        return CalleeKind::ExcCtor(kind);
    }
    if let Some(os) = OsFunction::from_name(name) {
        return CalleeKind::Os(os);
    }
    CalleeKind::NotCallable {
        name: name.to_owned(),
    }
}
