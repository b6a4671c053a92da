//! Cadence: a resumable, host-arbitrated scripting runtime.
//!
//! Source compiles once into an immutable [`Program`]; running it yields
//! a [`Progress`] that either completes or pauses at a boundary — an
//! external function call, an OS operation, or an await over unresolved
//! futures. Paused state is an owned, serializable [`Snapshot`] (or
//! [`FutureSnapshot`]) the host resumes with a result or an injected
//! exception, in this process or another one.
//!
//! ```
//! use cadence_core::{ExternalResult, Program, Progress, Value};
//!
//! let program = Program::compile(
//!     "add_one(x)",
//!     "example.cd",
//!     vec!["x".into()],
//!     vec!["add_one".into()],
//! )
//! .unwrap();
//!
//! let progress = program.start(vec![Value::Int(5)]).unwrap();
//! let (name, args, _, call_id, _, mut snapshot) = progress.into_function_call().unwrap();
//! assert_eq!(name, "add_one");
//! assert_eq!(args, vec![Value::Int(5)]);
//!
//! let done = snapshot
//!     .resume(call_id, ExternalResult::Return(Value::Int(6)))
//!     .unwrap();
//! assert!(matches!(done, Progress::Complete(Value::Int(6))));
//! ```

pub mod cli;
pub mod codec;
pub mod error;
pub mod executor;
pub mod parser;
mod persist;
pub mod program;
pub mod snapshot;
pub mod value;

pub use error::{CompileError, CompileErrorKind, FormatError, Location, UsageError};
pub use executor::{Builtin, OsFunction};
pub use program::Program;
pub use snapshot::{ExternalResult, FutureSnapshot, Progress, Snapshot};
pub use value::{CallId, ExcKind, ExceptionValue, TraceFrame, Value};
