//! Suspended executions
//!
//! A [`Snapshot`] owns one paused execution waiting on a single boundary
//! call; a [`FutureSnapshot`] owns one waiting on a set of unresolved
//! futures. Both are self-contained — they carry the program alongside
//! the vm state — so they serialize, cross processes, and resume with no
//! shared memory.
//!
//! Resuming consumes the handle: a snapshot is one point in a single
//! line of continuation, and resuming it forks a new state. A second
//! resume reports [`UsageError::AlreadyConsumed`] instead of silently
//! producing a divergent fork. Rejected resumes (id mismatch, unknown
//! id) leave the handle untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FormatError, UsageError};
use crate::executor::vm::FutureState;
use crate::executor::{run_to_exit, OsFunction, StepExit, Vm};
use crate::persist::{self, ArtifactKind};
use crate::program::Program;
use crate::value::{CallId, ExceptionValue, Value};

/* ===================== Resume Payloads ===================== */

/// The host's answer for one boundary call.
///
/// The shape makes "a value and an exception at once" unrepresentable;
/// `Future` defers the result, letting execution continue until the
/// program awaits it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalResult {
    Return(Value),
    Error(ExceptionValue),
    Future,
}

impl From<Value> for ExternalResult {
    fn from(value: Value) -> Self {
        ExternalResult::Return(value)
    }
}

impl From<ExceptionValue> for ExternalResult {
    fn from(exc: ExceptionValue) -> Self {
        ExternalResult::Error(exc)
    }
}

/* ===================== Progress ===================== */

/// The sole output channel of `start` and every `resume`.
#[derive(Debug)]
pub enum Progress {
    /// The program finished. An unhandled exception arrives here as an
    /// exception value, not as an engine error.
    Complete(Value),
    /// Paused at a call of a host-declared external function.
    FunctionCall {
        name: String,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        call_id: CallId,
        /// True when the call was written attribute-style (`api.get(..)`).
        method_call: bool,
        snapshot: Snapshot,
    },
    /// Paused at a runtime-intrinsic OS operation.
    OsCall {
        function: OsFunction,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        call_id: CallId,
        snapshot: Snapshot,
    },
    /// Blocked until some of the pending futures resolve.
    AwaitingFutures {
        pending: Vec<CallId>,
        snapshot: FutureSnapshot,
    },
}

impl Progress {
    /// The completion value, if execution finished.
    #[must_use]
    pub fn into_complete(self) -> Option<Value> {
        match self {
            Progress::Complete(value) => Some(value),
            _ => None,
        }
    }

    /// Function-call boundary fields: (name, args, kwargs, call id,
    /// method flag, snapshot).
    #[must_use]
    #[allow(clippy::type_complexity)]
    pub fn into_function_call(
        self,
    ) -> Option<(
        String,
        Vec<Value>,
        Vec<(String, Value)>,
        CallId,
        bool,
        Snapshot,
    )> {
        match self {
            Progress::FunctionCall {
                name,
                args,
                kwargs,
                call_id,
                method_call,
                snapshot,
            } => Some((name, args, kwargs, call_id, method_call, snapshot)),
            _ => None,
        }
    }

    /// OS-call boundary fields: (function, args, kwargs, call id,
    /// snapshot).
    #[must_use]
    #[allow(clippy::type_complexity)]
    pub fn into_os_call(
        self,
    ) -> Option<(OsFunction, Vec<Value>, Vec<(String, Value)>, CallId, Snapshot)> {
        match self {
            Progress::OsCall {
                function,
                args,
                kwargs,
                call_id,
                snapshot,
            } => Some((function, args, kwargs, call_id, snapshot)),
            _ => None,
        }
    }

    /// Futures boundary fields: (pending ids, snapshot).
    #[must_use]
    pub fn into_awaiting_futures(self) -> Option<(Vec<CallId>, FutureSnapshot)> {
        match self {
            Progress::AwaitingFutures { pending, snapshot } => Some((pending, snapshot)),
            _ => None,
        }
    }
}

/* ===================== Snapshot ===================== */

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotState {
    program: Program,
    vm: Vm,
    call_id: CallId,
}

/// A paused execution awaiting exactly one boundary-call result.
#[derive(Debug)]
pub struct Snapshot {
    state: Option<SnapshotState>,
}

impl Snapshot {
    /// The call id this snapshot is paused on, or None once consumed.
    pub fn call_id(&self) -> Option<CallId> {
        self.state.as_ref().map(|state| state.call_id)
    }

    /// Resume with the host's answer for `call_id`.
    ///
    /// A mismatched id is rejected without consuming the snapshot; an
    /// accepted resume consumes it. An injected `Error` raises at the
    /// paused call expression and follows normal in-program handling.
    pub fn resume(
        &mut self,
        call_id: CallId,
        result: ExternalResult,
    ) -> Result<Progress, UsageError> {
        let state = self.state.as_ref().ok_or(UsageError::AlreadyConsumed)?;
        if call_id != state.call_id {
            return Err(UsageError::CallIdMismatch {
                expected: state.call_id,
                provided: call_id,
            });
        }
        let SnapshotState {
            program,
            mut vm,
            call_id,
        } = self.state.take().expect("validated above");
        debug!(%call_id, "resuming snapshot");
        vm.resume_external(call_id, result);
        Ok(advance(program, vm))
    }

    /// Serialize without consuming; the in-memory snapshot stays usable.
    pub fn dump(&self) -> Result<Vec<u8>, UsageError> {
        let state = self.state.as_ref().ok_or(UsageError::AlreadyConsumed)?;
        Ok(persist::encode(ArtifactKind::Snapshot, state))
    }

    /// Reconstruct a snapshot serialized with [`Snapshot::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        let state: SnapshotState = persist::decode(ArtifactKind::Snapshot, bytes)?;
        Ok(Snapshot { state: Some(state) })
    }
}

/* ===================== FutureSnapshot ===================== */

#[derive(Debug, Serialize, Deserialize)]
struct FutureSnapshotState {
    program: Program,
    vm: Vm,
    pending: Vec<CallId>,
}

/// A paused execution blocked on a set of unresolved futures,
/// resolvable incrementally.
#[derive(Debug)]
pub struct FutureSnapshot {
    state: Option<FutureSnapshotState>,
}

impl FutureSnapshot {
    /// The call ids a resume will accept, ascending. Authoritative:
    /// exactly the set the engine is waiting on. Empty once consumed.
    pub fn pending_call_ids(&self) -> &[CallId] {
        self.state
            .as_ref()
            .map(|state| state.pending.as_slice())
            .unwrap_or(&[])
    }

    /// Resume with results for any subset of the pending call ids.
    ///
    /// Unknown ids are rejected without consuming the snapshot. Omitted
    /// ids stay pending; `ExternalResult::Future` entries are no-ops.
    /// Entries apply in order, so a duplicated id keeps its last result.
    pub fn resume(
        &mut self,
        results: Vec<(CallId, ExternalResult)>,
    ) -> Result<Progress, UsageError> {
        let state = self.state.as_ref().ok_or(UsageError::AlreadyConsumed)?;
        for (id, _) in &results {
            if !state.pending.contains(id) {
                return Err(UsageError::UnknownCallId {
                    provided: *id,
                    pending: state.pending.clone(),
                });
            }
        }
        let FutureSnapshotState {
            program,
            mut vm,
            pending,
        } = self.state.take().expect("validated above");
        debug!(resolved = results.len(), pending = pending.len(), "resuming futures");
        for (id, result) in results {
            match result {
                ExternalResult::Return(value) => {
                    vm.futures.insert(id, FutureState::Resolved(value));
                }
                ExternalResult::Error(exc) => {
                    vm.futures.insert(id, FutureState::Failed(exc));
                }
                ExternalResult::Future => {}
            }
        }
        Ok(advance(program, vm))
    }

    /// Serialize without consuming; the in-memory snapshot stays usable.
    pub fn dump(&self) -> Result<Vec<u8>, UsageError> {
        let state = self.state.as_ref().ok_or(UsageError::AlreadyConsumed)?;
        Ok(persist::encode(ArtifactKind::FutureSnapshot, state))
    }

    /// Reconstruct a snapshot serialized with [`FutureSnapshot::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        let state: FutureSnapshotState = persist::decode(ArtifactKind::FutureSnapshot, bytes)?;
        Ok(FutureSnapshot { state: Some(state) })
    }
}

/* ===================== Driving ===================== */

/// Run the vm to its next boundary and wrap the exit for the host.
pub(crate) fn advance(program: Program, mut vm: Vm) -> Progress {
    match run_to_exit(&mut vm, &program) {
        StepExit::Complete(value) => {
            debug!("execution complete");
            Progress::Complete(value)
        }
        StepExit::External {
            name,
            args,
            kwargs,
            call_id,
            method_call,
        } => {
            debug!(%name, %call_id, "paused at external function call");
            Progress::FunctionCall {
                name,
                args,
                kwargs,
                call_id,
                method_call,
                snapshot: Snapshot {
                    state: Some(SnapshotState {
                        program,
                        vm,
                        call_id,
                    }),
                },
            }
        }
        StepExit::Os {
            function,
            args,
            kwargs,
            call_id,
        } => {
            debug!(%function, %call_id, "paused at os call");
            Progress::OsCall {
                function,
                args,
                kwargs,
                call_id,
                snapshot: Snapshot {
                    state: Some(SnapshotState {
                        program,
                        vm,
                        call_id,
                    }),
                },
            }
        }
        StepExit::Futures(pending) => {
            debug!(pending = pending.len(), "paused on unresolved futures");
            Progress::AwaitingFutures {
                pending: pending.clone(),
                snapshot: FutureSnapshot {
                    state: Some(FutureSnapshotState {
                        program,
                        vm,
                        pending,
                    }),
                },
            }
        }
    }
}
