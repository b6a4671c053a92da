//! Command line interface
//!
//! The binary doubles as a reference host: it compiles a script, starts
//! it, services OS-call boundaries locally (print, clock, sleep, env,
//! files), and reports external-function boundaries it cannot answer.

use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::codec;
use crate::executor::OsFunction;
use crate::program::Program;
use crate::snapshot::{ExternalResult, Progress};
use crate::value::{ExcKind, ExceptionValue, Value};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence - a resumable, host-arbitrated scripting runtime", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and execute a script, servicing OS calls locally
    Run {
        /// Path to the script file
        script: String,

        /// Named input as name=JSON (repeatable)
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Declare an external function name (repeatable); calls to it
        /// abort the run, since the CLI host cannot answer them
        #[arg(long = "ext")]
        externals: Vec<String>,
    },

    /// Parse and validate a script without running it
    Check {
        /// Path to the script file
        script: String,

        /// Declare an input name (repeatable)
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Declare an external function name (repeatable)
        #[arg(long = "ext")]
        externals: Vec<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            script,
            inputs,
            externals,
        } => run_script(&script, &inputs, externals),
        Commands::Check {
            script,
            inputs,
            externals,
        } => check_script(&script, inputs, externals),
    }
}

fn check_script(path: &str, inputs: Vec<String>, externals: Vec<String>) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    match Program::compile(&source, path, inputs, externals) {
        Ok(program) => {
            println!("ok: {}", program.script_name());
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}

fn run_script(path: &str, raw_inputs: &[String], externals: Vec<String>) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;

    let mut input_names = Vec::new();
    let mut input_values = Vec::new();
    for raw in raw_inputs {
        let (name, json) = raw
            .split_once('=')
            .with_context(|| format!("--input {raw:?} is not name=JSON"))?;
        let value = codec::value_from_str(json)
            .with_context(|| format!("--input {name:?} carries invalid JSON"))?;
        input_names.push(name.to_string());
        input_values.push(value);
    }

    let program = Program::compile(&source, path, input_names, externals)
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let mut progress = program
        .start(input_values)
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    loop {
        progress = match progress {
            Progress::Complete(Value::Exception(exc)) => {
                print_traceback(&exc);
                std::process::exit(1);
            }
            Progress::Complete(value) => {
                if value != Value::Null {
                    println!("{}", value.repr());
                }
                return Ok(());
            }
            Progress::FunctionCall { name, call_id, mut snapshot, .. } => {
                // The CLI host has no implementations to offer; raise
                // inside the program so its handlers can run.
                let exc = ExceptionValue::new(
                    ExcKind::RuntimeError,
                    format!("external function {name:?} is not available under the cadence cli"),
                );
                snapshot
                    .resume(call_id, ExternalResult::Error(exc))
                    .map_err(|err| anyhow::anyhow!("{err}"))?
            }
            Progress::OsCall {
                function,
                args,
                call_id,
                mut snapshot,
                ..
            } => {
                let result = service_os_call(function, &args);
                snapshot
                    .resume(call_id, result)
                    .map_err(|err| anyhow::anyhow!("{err}"))?
            }
            Progress::AwaitingFutures { pending, .. } => {
                bail!(
                    "script is awaiting futures {pending:?}, which the cadence cli cannot resolve"
                );
            }
        };
    }
}

/// Perform an OS call on behalf of the paused program.
fn service_os_call(function: OsFunction, args: &[Value]) -> ExternalResult {
    match function {
        OsFunction::Print => {
            let line = args
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
            ExternalResult::Return(Value::Null)
        }
        OsFunction::Time => match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => ExternalResult::Return(Value::Float(elapsed.as_secs_f64())),
            Err(err) => os_error(format!("system clock unavailable: {err}")),
        },
        OsFunction::Sleep => match args.first() {
            Some(Value::Int(secs)) if *secs >= 0 => {
                std::thread::sleep(Duration::from_secs(*secs as u64));
                ExternalResult::Return(Value::Null)
            }
            Some(Value::Float(secs)) if *secs >= 0.0 => {
                std::thread::sleep(Duration::from_secs_f64(*secs));
                ExternalResult::Return(Value::Null)
            }
            _ => os_error("sleep() expects a non-negative number".to_string()),
        },
        OsFunction::Getenv => match args.first() {
            Some(Value::Str(name)) => match std::env::var(name) {
                Ok(value) => ExternalResult::Return(Value::Str(value)),
                Err(_) => ExternalResult::Return(Value::Null),
            },
            _ => os_error("getenv() expects a name".to_string()),
        },
        OsFunction::ReadFile => match args.first() {
            Some(Value::Str(path)) | Some(Value::Path(path)) => match fs::read_to_string(path) {
                Ok(contents) => ExternalResult::Return(Value::Str(contents)),
                Err(err) => os_error(format!("{path}: {err}")),
            },
            _ => os_error("read_file() expects a path".to_string()),
        },
        OsFunction::WriteFile => match (args.first(), args.get(1)) {
            (Some(Value::Str(path)) | Some(Value::Path(path)), Some(Value::Str(data))) => {
                match fs::write(path, data) {
                    Ok(()) => ExternalResult::Return(Value::Null),
                    Err(err) => os_error(format!("{path}: {err}")),
                }
            }
            _ => os_error("write_file() expects a path and a string".to_string()),
        },
    }
}

fn os_error(message: String) -> ExternalResult {
    ExternalResult::Error(ExceptionValue::new(ExcKind::OsError, message))
}

fn print_traceback(exc: &ExceptionValue) {
    eprintln!("traceback (most recent call last):");
    for frame in &exc.trace {
        eprintln!("  {} line {}", frame.function, frame.line);
    }
    eprintln!("{}", exc.summary());
}
