//! Type definitions for the executor
//!
//! - AST nodes (`Stmt`, `Expr`) produced by the parser
//! - Control flow and execution frames (`Control`, `Frame`, `FrameKind`)
//! - Per-frame phase enums tracking micro-steps within a node

pub mod ast;
pub mod control;
pub mod phase;

pub use ast::{
    AssignOp, AssignTarget, BinOp, CatchClause, Expr, FunctionDef, LogicOp, Stmt, UnaryOp,
};
pub use control::{CallFrame, CalleeKind, CollectKind, Control, Frame, FrameKind};
pub use phase::*;
