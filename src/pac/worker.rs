// src/pac/worker.rs
//! The child side of an evaluation.
//!
//! `pacengine --internal-worker` reads one [`WorkerJob`] as JSON from stdin,
//! caps its own address space, builds a fresh script context with only the
//! PAC primitives in it, and reports [`WorkerEvent`]s as JSON lines on stdout.
//! The parent kills the process when the budget runs out, so nothing a script
//! does can outlive its evaluation.

use super::directive::RawDecision;
use super::engine::ENTRY_POINT;
use super::primitives::PrimitiveContext;
use crate::error::PacError;
use boa_engine::vm::RuntimeLimits;
use boa_engine::{
    Context, JsError, JsNativeErrorKind, JsObject, JsResult, JsString, JsValue, Source,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Hidden command-line flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "--internal-worker";

/// Everything the child needs, sent by the parent on stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerJob {
    pub script: String,
    pub url: String,
    pub host: String,
    pub source_address: String,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub memory_limit_bytes: Option<u64>,
}

/// One line of worker output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// The context is built; the execution budget starts now.
    Ready,
    Finished { outcome: Result<RawDecision, PacError> },
}

/// Result of looking for the entry point after the script has loaded.
enum EntryPoint {
    Found(JsObject),
    Missing,
}

/// Runs one job read from `input`, writing events to `output`.
pub fn serve(mut input: impl Read, mut output: impl Write) -> io::Result<()> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    let job: WorkerJob = match serde_json::from_str(&raw) {
        Ok(job) => job,
        Err(e) => {
            let outcome = Err(PacError::Internal(format!("malformed worker job: {e}")));
            return emit(&mut output, &WorkerEvent::Finished { outcome });
        }
    };

    if let Some(bytes) = job.memory_limit_bytes {
        cap_address_space(bytes)?;
    }

    let mut context = match build_context(&job) {
        Ok(context) => context,
        Err(err) => return emit(&mut output, &WorkerEvent::Finished { outcome: Err(err) }),
    };
    emit(&mut output, &WorkerEvent::Ready)?;

    let outcome = execute(&job, &mut context);
    emit(&mut output, &WorkerEvent::Finished { outcome })
}

fn emit(output: &mut impl Write, event: &WorkerEvent) -> io::Result<()> {
    serde_json::to_writer(&mut *output, event)?;
    output.write_all(b"\n")?;
    output.flush()
}

#[cfg(unix)]
fn cap_address_space(bytes: u64) -> io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: bytes as libc::rlim_t,
        rlim_max: bytes as libc::rlim_t,
    };
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_AS, &limit) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    debug!("Worker address space capped at {} bytes", bytes);
    Ok(())
}

#[cfg(not(unix))]
fn cap_address_space(_bytes: u64) -> io::Result<()> {
    Ok(())
}

fn build_context(job: &WorkerJob) -> Result<Context, PacError> {
    let mut context = Context::default();

    let mut limits = RuntimeLimits::default();
    limits.set_loop_iteration_limit(job.loop_iteration_limit);
    limits.set_recursion_limit(job.recursion_limit);
    limits.set_stack_size_limit(job.stack_size_limit);
    context.set_runtime_limits(limits);

    PrimitiveContext::new(job.source_address.as_str())
        .install(&mut context)
        .map_err(|e| PacError::Internal(format!("failed to install PAC primitives: {e}")))?;
    Ok(context)
}

fn execute(job: &WorkerJob, context: &mut Context) -> Result<RawDecision, PacError> {
    context
        .eval(Source::from_bytes(job.script.as_bytes()))
        .map_err(|err| script_failure(err, context, PacError::ScriptLoad))?;

    let entry = match find_entry_point(context)
        .map_err(|err| script_failure(err, context, PacError::ScriptLoad))?
    {
        EntryPoint::Found(function) => function,
        EntryPoint::Missing => return Err(PacError::MissingEntryPoint),
    };

    let args = [
        JsValue::from(JsString::from(job.url.as_str())),
        JsValue::from(JsString::from(job.host.as_str())),
    ];
    let value = entry
        .call(&JsValue::undefined(), &args, context)
        .map_err(|err| script_failure(err, context, PacError::Invocation))?;

    Ok(raw_decision(&value))
}

fn find_entry_point(context: &mut Context) -> JsResult<EntryPoint> {
    let value = context
        .global_object()
        .get(JsString::from(ENTRY_POINT), context)?;
    Ok(match value.as_callable() {
        Some(function) => EntryPoint::Found(function.clone()),
        None => EntryPoint::Missing,
    })
}

/// Maps a script error onto the taxonomy. Runtime-limit hits mean the
/// execution budget is spent and are reported like a wall-clock timeout.
fn script_failure(err: JsError, context: &mut Context, wrap: fn(String) -> PacError) -> PacError {
    let hit_limit = err
        .as_native()
        .is_some_and(|native| matches!(native.kind, JsNativeErrorKind::RuntimeLimit));
    if hit_limit {
        debug!("PAC script hit a runtime limit: {}", err);
        return PacError::Timeout;
    }
    let message = match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => err.to_string(),
    };
    wrap(message)
}

fn raw_decision(value: &JsValue) -> RawDecision {
    if value.is_undefined() || value.is_null() {
        return RawDecision::Absent;
    }
    if let Some(text) = value.as_string() {
        return RawDecision::Text(text.to_std_string_escaped());
    }
    RawDecision::NotText(type_name(value).to_string())
}

fn type_name(value: &JsValue) -> &'static str {
    if value.is_boolean() {
        "boolean"
    } else if value.is_number() {
        "number"
    } else if value.is_bigint() {
        "bigint"
    } else if value.is_symbol() {
        "symbol"
    } else if value.is_callable() {
        "function"
    } else {
        "object"
    }
}
