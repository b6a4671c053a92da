//! # Resumable stack-driven interpreter
//!
//! The executor evaluates a compiled program with every bit of state in
//! plain data:
//!
//! 1. **Stack-driven execution**: all state lives in `frames: Vec<Frame>`,
//!    no host recursion, so a paused run serializes whole.
//! 2. **Statement- and expression-level frames**: each frame owns the AST
//!    it still has to run plus a phase tracking its micro-step.
//! 3. **Centralized control flow**: a `Control` enum drives
//!    break/continue/return/throw unwinding.
//! 4. **Pure stepping**: the engine performs no I/O; external calls, OS
//!    calls and unresolved futures exit the loop and hand control to the
//!    host.

pub mod exec_loop;
pub mod expressions;
pub mod ops;
pub mod os;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub(crate) use exec_loop::{run_to_exit, StepExit};
pub use os::OsFunction;
pub use stdlib::Builtin;
pub use vm::Vm;
