//! Compiled programs
//!
//! A [`Program`] is the immutable result of compiling source text: the
//! validated statement list, the hoisted function table, and the
//! declared execution contract (input names, external function names).
//! It owns no per-run state, so one program can back any number of
//! concurrent executions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, FormatError, UsageError};
use crate::executor::types::{FunctionDef, Stmt};
use crate::executor::{run_to_exit, StepExit, Vm};
use crate::parser;
use crate::persist::{self, ArtifactKind};
use crate::snapshot::{advance, Progress};
use crate::value::{ExcKind, ExceptionValue, Value};

/// Immutable compiled form of one script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    script_name: String,
    input_names: Vec<String>,
    external_functions: Vec<String>,
    body: Vec<Stmt>,
    functions: Vec<FunctionDef>,
}

impl Program {
    /// Compile source text into a program.
    ///
    /// `input_names` fixes the positional binding contract for
    /// [`Program::start`]; `external_functions` declares the names
    /// (including dotted names) whose calls suspend to the host.
    pub fn compile(
        source: &str,
        script_name: &str,
        input_names: Vec<String>,
        external_functions: Vec<String>,
    ) -> Result<Self, CompileError> {
        check_distinct(&input_names, "input")?;
        check_distinct(&external_functions, "external function")?;

        let (mut body, functions) = parser::parse_program(source)?;
        parser::validator::validate(&body, &functions, &input_names, &external_functions)?;

        // The final top-level expression statement is the program result.
        if let Some(Stmt::Expr { keep, .. }) = body.last_mut() {
            *keep = true;
        }

        debug!(
            script = %script_name,
            statements = body.len(),
            functions = functions.len(),
            "compiled program"
        );
        Ok(Program {
            script_name: script_name.to_owned(),
            input_names,
            external_functions,
            body,
            functions,
        })
    }

    /* ----- accessors ----- */

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn external_functions(&self) -> &[String] {
        &self.external_functions
    }

    pub(crate) fn body(&self) -> &[Stmt] {
        &self.body
    }

    pub(crate) fn function(&self, index: usize) -> &FunctionDef {
        &self.functions[index]
    }

    pub(crate) fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub(crate) fn has_external(&self, name: &str) -> bool {
        self.external_functions.iter().any(|ext| ext == name)
    }

    /* ----- persistence ----- */

    /// Serialize to the versioned binary form.
    pub fn dump(&self) -> Vec<u8> {
        persist::encode(ArtifactKind::Program, self)
    }

    /// Reconstruct a program serialized with [`Program::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        persist::decode(ArtifactKind::Program, bytes)
    }

    /* ----- execution ----- */

    /// Begin a fresh execution with inputs bound positionally to the
    /// declared input names. Runs until the first boundary or completion.
    pub fn start(&self, inputs: Vec<Value>) -> Result<Progress, UsageError> {
        self.check_inputs(&inputs)?;
        debug!(script = %self.script_name, "starting execution");
        let vm = Vm::new(self, inputs);
        Ok(advance(self.clone(), vm))
    }

    /// Run to completion without suspension support. Any boundary —
    /// external call, OS call, pending futures — is reported as a
    /// runtime exception, as is an unhandled in-program exception.
    pub fn run(&self, inputs: Vec<Value>) -> Result<Value, ExceptionValue> {
        self.check_inputs(&inputs)
            .map_err(|err| ExceptionValue::new(ExcKind::RuntimeError, err.to_string()))?;
        let mut vm = Vm::new(self, inputs);
        match run_to_exit(&mut vm, self) {
            StepExit::Complete(Value::Exception(exc)) => Err(*exc),
            StepExit::Complete(value) => Ok(value),
            StepExit::External { name, .. } => Err(ExceptionValue::new(
                ExcKind::RuntimeError,
                format!("external function {name:?} is not available in direct execution"),
            )),
            StepExit::Os { function, .. } => Err(ExceptionValue::new(
                ExcKind::RuntimeError,
                format!("os function {function}() is not available in direct execution"),
            )),
            StepExit::Futures(_) => Err(ExceptionValue::new(
                ExcKind::RuntimeError,
                "pending futures are not supported in direct execution",
            )),
        }
    }

    fn check_inputs(&self, inputs: &[Value]) -> Result<(), UsageError> {
        if inputs.len() != self.input_names.len() {
            return Err(UsageError::InputArity {
                expected: self.input_names.len(),
                provided: inputs.len(),
            });
        }
        for value in inputs {
            if value.contains_opaque() {
                return Err(UsageError::InvalidInput(format!(
                    "{} cannot cross into a program",
                    value.repr()
                )));
            }
        }
        Ok(())
    }
}

fn check_distinct(names: &[String], what: &str) -> Result<(), CompileError> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(CompileError::name(
                format!("duplicate {what} name {name:?}"),
                None,
            ));
        }
    }
    Ok(())
}
