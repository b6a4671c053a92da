//! OS-level operations
//!
//! These names are intrinsic to the language surface rather than
//! declared by the host, but the engine never performs them itself:
//! every OS call suspends execution and the host supplies the outcome.
//! That keeps the interpreter pure and every side effect arbitrated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of OS operations a program can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsFunction {
    /// `print(value)` — write a line of output.
    Print,
    /// `time()` — seconds since the epoch as a float.
    Time,
    /// `sleep(seconds)` — pause for a duration.
    Sleep,
    /// `getenv(name)` — environment variable or null.
    Getenv,
    /// `read_file(path)` — file contents as a string.
    ReadFile,
    /// `write_file(path, data)` — write a string to a file.
    WriteFile,
}

impl OsFunction {
    pub fn name(self) -> &'static str {
        match self {
            OsFunction::Print => "print",
            OsFunction::Time => "time",
            OsFunction::Sleep => "sleep",
            OsFunction::Getenv => "getenv",
            OsFunction::ReadFile => "read_file",
            OsFunction::WriteFile => "write_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "print" => OsFunction::Print,
            "time" => OsFunction::Time,
            "sleep" => OsFunction::Sleep,
            "getenv" => OsFunction::Getenv,
            "read_file" => OsFunction::ReadFile,
            "write_file" => OsFunction::WriteFile,
            _ => return None,
        })
    }
}

impl fmt::Display for OsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
