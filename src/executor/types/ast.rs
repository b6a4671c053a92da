//! Abstract Syntax Tree node types

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Statement AST node. Every statement records its source line for
/// stack traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let {
        name: String,
        init: Option<Expr>,
        line: u32,
    },
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
        line: u32,
    },
    /// Expression statement. `keep` marks the final top-level statement
    /// whose value becomes the program result.
    Expr {
        expr: Expr,
        keep: bool,
        line: u32,
    },
    If {
        test: Expr,
        then_body: Vec<Stmt>,
        /// `else if` chains nest as a single `If` statement here.
        else_body: Vec<Stmt>,
        line: u32,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    Try {
        body: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
        line: u32,
    },
    Throw {
        value: Expr,
        line: u32,
    },
    Return {
        value: Option<Expr>,
        line: u32,
    },
    Break {
        line: u32,
    },
    Continue {
        line: u32,
    },
    /// Definition site of a hoisted function; a no-op at runtime. The
    /// body lives in the program's function table.
    FnDef {
        index: usize,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Name the caught exception binds to.
    pub var: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Name(String),
    /// Single-level container update: `name[index] = value`.
    Index { name: String, index: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

/// A hoisted top-level function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    LitNull,
    LitBool { v: bool },
    LitInt { v: i64 },
    LitBig { v: BigInt },
    LitFloat { v: f64 },
    LitStr { v: String },
    LitBytes { v: Vec<u8> },
    Ident { name: String },
    ListLit { items: Vec<Expr> },
    TupleLit { items: Vec<Expr> },
    SetLit { items: Vec<Expr> },
    DictLit { pairs: Vec<(Expr, Expr)> },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `&&` / `||`; yields the deciding operand.
    Logic {
        op: LogicOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        line: u32,
    },
    Await {
        inner: Box<Expr>,
        line: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Membership test (`x in xs`).
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}
