//! Per-frame phase enums
//!
//! Each frame kind advances through a small phase machine; the phase is
//! part of serialized state, so a suspended frame resumes exactly where
//! it left off.

use serde::{Deserialize, Serialize};

use super::control::Control;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetPhase {
    Eval,
    Bind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignPhase {
    /// Evaluate the index expression (index targets only).
    Index,
    /// Collect the index value, then evaluate the right-hand side.
    CollectIndex,
    /// Evaluate the right-hand side (name targets start here).
    Value,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprStmtPhase {
    Eval,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IfPhase {
    Test,
    Decide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhilePhase {
    Test,
    Decide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForPhase {
    /// Evaluate the iterable expression.
    Iterable,
    /// Materialize the item sequence from the evaluated iterable.
    Collect,
    /// Bind the next item and run the body, or finish.
    Next,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TryPhase {
    Body,
    Catch,
    /// Running the `finally` block; `pending` is the control flow to
    /// restore once it completes (`Control::None` after a clean body).
    Finally { pending: Box<Control> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrowPhase {
    Eval,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnPhase {
    Eval,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryPhase {
    EvalLeft,
    EvalRight,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicPhase {
    EvalLeft,
    /// Short-circuit on the left value or evaluate the right side.
    Decide,
    TakeRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryPhase {
    Eval,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexPhase {
    Object,
    IndexExpr,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberPhase {
    Object,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwaitPhase {
    Eval,
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallPhase {
    /// Evaluate the receiver expression (method calls only).
    Recv,
    RecvCollect,
    /// Evaluate positional and keyword arguments in order.
    Args,
    Invoke,
}
