//! Control flow and execution frame types

use serde::{Deserialize, Serialize};

use super::ast::{AssignOp, BinOp, CatchClause, Expr, LogicOp, Stmt, UnaryOp};
use super::phase::{
    AssignPhase, AwaitPhase, BinaryPhase, CallPhase, ExprStmtPhase, ForPhase, IfPhase, IndexPhase,
    LetPhase, LogicPhase, MemberPhase, ReturnPhase, ThrowPhase, TryPhase, UnaryPhase, WhilePhase,
};
use crate::executor::os::OsFunction;
use crate::executor::stdlib::Builtin;
use crate::value::{ExcKind, Value};

/* ===================== Control Flow ===================== */

/// Active non-local control flow.
///
/// When control != None the vm unwinds the frame stack to the nearest
/// handler: loops for break/continue, function frames for return, try
/// frames for throw. An unhandled throw completes the run with the
/// exception as its result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Control {
    None,
    Break,
    Continue,
    Return(Value),
    Throw(Value),
}

/* ===================== Frames ===================== */

/// Execution frame: one per statement or expression in flight.
///
/// The frame stack replaces the system call stack. Each frame owns the
/// AST it still has to run plus its phase, which is what makes a paused
/// execution fully serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    /// Scope stack height to restore when this frame pops.
    pub scope_base: usize,
    /// Source line of the node this frame runs, for stack traces.
    pub line: u32,
}

/// Frame kind: the node being executed plus its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Top-level statement sequence, running in the global scope.
    Module { body: Vec<Stmt>, idx: usize },
    /// Braced statement sequence with its own block scope.
    Block { body: Vec<Stmt>, idx: usize },
    /// A user function body; return unwinding stops here.
    FuncBody {
        body: Vec<Stmt>,
        idx: usize,
        name: String,
        call_line: u32,
    },
    Let {
        name: String,
        init: Option<Expr>,
        phase: LetPhase,
    },
    Assign {
        name: String,
        index: Option<Expr>,
        op: AssignOp,
        value: Option<Expr>,
        index_val: Option<Value>,
        phase: AssignPhase,
    },
    ExprStmt {
        expr: Option<Expr>,
        keep: bool,
        phase: ExprStmtPhase,
    },
    If {
        test: Option<Expr>,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        phase: IfPhase,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        phase: WhilePhase,
    },
    For {
        var: String,
        iterable: Option<Expr>,
        items: Vec<Value>,
        idx: usize,
        body: Vec<Stmt>,
        phase: ForPhase,
    },
    Try {
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
        phase: TryPhase,
    },
    Throw {
        value: Option<Expr>,
        phase: ThrowPhase,
    },
    Return {
        value: Option<Expr>,
        phase: ReturnPhase,
    },
    Binary {
        op: BinOp,
        left: Option<Expr>,
        right: Option<Expr>,
        left_val: Option<Value>,
        phase: BinaryPhase,
    },
    Logic {
        op: LogicOp,
        left: Option<Expr>,
        right: Option<Expr>,
        phase: LogicPhase,
    },
    Unary {
        op: UnaryOp,
        operand: Option<Expr>,
        phase: UnaryPhase,
    },
    IndexGet {
        object: Option<Expr>,
        index: Option<Expr>,
        object_val: Option<Value>,
        phase: IndexPhase,
    },
    MemberGet {
        object: Option<Expr>,
        property: String,
        phase: MemberPhase,
    },
    /// Container literal under construction.
    Collect {
        kind: CollectKind,
        items: Vec<Expr>,
        evaluated: Vec<Value>,
        next: usize,
    },
    Call(Box<CallFrame>),
    AwaitExpr {
        inner: Option<Expr>,
        value: Option<Value>,
        phase: AwaitPhase,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectKind {
    List,
    Tuple,
    Set,
    /// Items alternate key, value, key, value.
    Dict,
}

/// An in-flight call. Operands hold the positional argument expressions
/// followed by the keyword argument expressions (names in `kw_names`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub callee: CalleeKind,
    pub recv_expr: Option<Expr>,
    pub recv: Option<Value>,
    pub operands: Vec<Expr>,
    pub evaluated: Vec<Value>,
    pub next: usize,
    pub n_args: usize,
    pub kw_names: Vec<String>,
    pub line: u32,
    pub phase: CallPhase,
}

impl CallFrame {
    /// Split the evaluated operands into positional and keyword values.
    /// Only valid once every operand has been evaluated.
    pub fn split_operands(&self) -> (&[Value], Vec<(String, Value)>) {
        let args = &self.evaluated[..self.n_args];
        let kwargs = self
            .kw_names
            .iter()
            .cloned()
            .zip(self.evaluated[self.n_args..].iter().cloned())
            .collect();
        (args, kwargs)
    }
}

/// Who a call dispatches to, resolved when the call frame is pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalleeKind {
    /// A hoisted user function, by function-table index.
    Function { index: usize, name: String },
    /// A host-declared external function; suspends the run.
    External { name: String, method_call: bool },
    /// A runtime-intrinsic OS operation; suspends the run.
    Os(OsFunction),
    Builtin(Builtin),
    /// An exception constructor such as `ValueError("...")`.
    ExcCtor(ExcKind),
    /// A method on an evaluated receiver value.
    Method { name: String },
    /// Defensive fallback; raises TypeError at invoke.
    NotCallable { name: String },
}
