// src/pac/engine.rs
//! Sandboxed evaluation of one PAC script.
//!
//! Every evaluation runs in its own short-lived worker process (the
//! `pacengine` binary in worker mode, see [`super::worker`]) inside a fresh
//! `boa_engine::Context`. The context has no console, filesystem, network or
//! module loader; the only host functions it can reach are the ones
//! [`super::primitives::PrimitiveContext`] installs. The caller waits on a
//! channel with a deadline and kills the worker when it passes, so a runaway
//! script costs the caller at most `timeout` and leaves nothing running.

use super::directive::{parse_decision, ProxyDecision};
use super::worker::{WorkerEvent, WorkerJob, WORKER_FLAG};
use crate::config::EngineConfig;
use crate::error::{PacError, Result};
use crate::log::LOG_ENV;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

/// Name of the function every PAC script has to define.
pub const ENTRY_POINT: &str = "FindProxyForURL";

/// Everything needed to evaluate a script once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub script: String,
    pub destination_host: String,
    #[serde(
        rename = "destinationURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_url: Option<String>,
    pub source_address: String,
}

impl EvaluationRequest {
    pub fn new(
        script: impl Into<String>,
        destination_host: impl Into<String>,
        source_address: impl Into<String>,
    ) -> Self {
        Self {
            script: script.into(),
            destination_host: destination_host.into(),
            destination_url: None,
            source_address: source_address.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.destination_url = Some(url.into());
        self
    }

    /// The URL handed to `FindProxyForURL`; synthesized from the host when
    /// the caller gave none.
    pub fn effective_url(&self) -> String {
        match &self.destination_url {
            Some(url) => url.clone(),
            None => format!("https://{}/test", self.destination_host),
        }
    }
}

pub type EvaluationResult = Result<ProxyDecision>;

/// Runs PAC scripts under the bounds of an [`EngineConfig`].
///
/// Holds no per-evaluation state, so one instance can serve any number of
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EngineConfig,
}

impl Evaluator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads `request.script`, calls `FindProxyForURL` and parses its answer.
    pub fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
        if request.script.len() > self.config.max_script_bytes {
            return Err(PacError::InputValidation(format!(
                "script is {} bytes, the limit is {}",
                request.script.len(),
                self.config.max_script_bytes
            )));
        }

        debug!(
            "Evaluating PAC script ({} bytes) for host={} src={}",
            request.script.len(),
            request.destination_host,
            request.source_address
        );

        let job = WorkerJob {
            script: request.script.clone(),
            url: request.effective_url(),
            host: request.destination_host.clone(),
            source_address: request.source_address.clone(),
            loop_iteration_limit: self.config.loop_iteration_limit,
            recursion_limit: self.config.recursion_limit,
            stack_size_limit: self.config.stack_size_limit,
            memory_limit_bytes: self.config.memory_limit_bytes,
        };

        // Dropping the worker kills and reaps it on every return path.
        let mut worker = WorkerProcess::spawn(&self.config.worker_program)?;
        worker.send(&job)?;
        let events = worker.events()?;

        match events.recv_timeout(self.config.setup_timeout) {
            Ok(WorkerEvent::Ready) => {}
            Ok(WorkerEvent::Finished { outcome }) => return outcome.and_then(parse_decision),
            Err(RecvTimeoutError::Timeout) => {
                return Err(PacError::Internal(
                    "script context setup timed out".to_string(),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PacError::Internal(format!(
                    "evaluation worker exited before it was ready: {}",
                    worker.exit_status()
                )))
            }
        }

        let started = Instant::now();
        let raw = match events.recv_timeout(self.config.timeout) {
            Ok(WorkerEvent::Finished { outcome }) => outcome?,
            Ok(WorkerEvent::Ready) => {
                return Err(PacError::Internal(
                    "evaluation worker reported ready twice".to_string(),
                ))
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "PAC evaluation for host={} exceeded {:?}, killing worker",
                    request.destination_host, self.config.timeout
                );
                return Err(PacError::Timeout);
            }
            Err(RecvTimeoutError::Disconnected) => {
                let status = worker.exit_status();
                warn!(
                    "PAC evaluation for host={} killed its worker: {}",
                    request.destination_host, status
                );
                return Err(PacError::ResourceLimit(format!(
                    "evaluation worker died: {status}"
                )));
            }
        };
        trace!("FindProxyForURL returned {:?} in {:?}", raw, started.elapsed());

        parse_decision(raw)
    }
}

/// One `pacengine --internal-worker` child. Killed and reaped on drop.
struct WorkerProcess {
    child: Child,
}

impl WorkerProcess {
    fn spawn(program: &Path) -> Result<Self> {
        let mut command = Command::new(program);
        command
            .arg(WORKER_FLAG)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(filter) = env::var_os(LOG_ENV) {
            command.env(LOG_ENV, filter);
        }
        let child = command.spawn().map_err(|e| {
            PacError::Internal(format!(
                "failed to start evaluation worker {}: {e}",
                program.display()
            ))
        })?;
        trace!("Started evaluation worker pid={}", child.id());
        Ok(Self { child })
    }

    /// Writes the job and closes stdin so the worker sees end of input.
    fn send(&mut self, job: &WorkerJob) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| PacError::Internal("worker stdin is not piped".to_string()))?;
        serde_json::to_writer(stdin, job)
            .map_err(|e| PacError::Internal(format!("failed to send job to worker: {e}")))
    }

    /// Forwards the worker's event lines over a channel until its stdout closes.
    fn events(&mut self) -> Result<Receiver<WorkerEvent>> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| PacError::Internal("worker stdout is not piped".to_string()))?;
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("pac-eval-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    match serde_json::from_str::<WorkerEvent>(&line) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Discarding malformed worker output: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(|e| PacError::Internal(format!("failed to spawn worker reader: {e}")))?;
        Ok(rx)
    }

    fn exit_status(&mut self) -> String {
        match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("unknown exit status ({e})"),
        }
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        // Fails harmlessly when the worker has already exited.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_url_defaults_to_https_test_path() {
        let request = EvaluationRequest::new("", "example.com", "10.0.0.1");
        assert_eq!(request.effective_url(), "https://example.com/test");

        let request = request.with_url("http://example.com/a?b=c");
        assert_eq!(request.effective_url(), "http://example.com/a?b=c");
    }

    #[test]
    fn request_uses_wire_field_names() {
        let request = EvaluationRequest::new("s", "example.com", "10.0.0.1").with_url("http://x/");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["destinationHost"], "example.com");
        assert_eq!(json["destinationURL"], "http://x/");
        assert_eq!(json["sourceAddress"], "10.0.0.1");
    }

    #[test]
    fn oversized_scripts_are_rejected_before_running() {
        let config = EngineConfig {
            max_script_bytes: 8,
            ..EngineConfig::default()
        };
        let request = EvaluationRequest::new("function FindProxyForURL(){}", "a.com", "1.2.3.4");
        let err = Evaluator::new(config).evaluate(&request).unwrap_err();
        assert_eq!(err.kind(), "input_validation");
    }

    #[test]
    fn unstartable_worker_is_an_internal_error() {
        let config = EngineConfig::default().with_worker("/nonexistent/pacengine-worker");
        let request = EvaluationRequest::new("function FindProxyForURL(){}", "a.com", "1.2.3.4");
        let err = Evaluator::new(config).evaluate(&request).unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(err.to_string().contains("failed to start evaluation worker"));
    }
}
