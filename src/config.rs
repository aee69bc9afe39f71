// src/config.rs
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Resource bounds and tunables for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wall-clock budget for loading the script and calling `FindProxyForURL`.
    pub timeout: Duration,
    /// Bound on building a fresh script context before the budget starts.
    pub setup_timeout: Duration,
    /// Iterations a single loop may run before the VM aborts it.
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    /// Largest script accepted, in bytes.
    pub max_script_bytes: usize,
    /// Timeout for downloading a remote script.
    pub fetch_timeout: Duration,
    /// Binary started with `--internal-worker` to run each evaluation.
    pub worker_program: PathBuf,
    /// Address-space cap applied inside the worker. `None` leaves it unbounded.
    pub memory_limit_bytes: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(300),
            setup_timeout: Duration::from_secs(5),
            loop_iteration_limit: 1_000_000,
            recursion_limit: 256,
            stack_size_limit: 64 * 1024,
            max_script_bytes: 1024 * 1024,
            fetch_timeout: Duration::from_secs(15),
            worker_program: env::current_exe().unwrap_or_else(|_| PathBuf::from("pacengine")),
            memory_limit_bytes: Some(1024 * 1024 * 1024),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `PACENGINE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_value::<u64>("pacengine_timeout_ms") {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = env_value("pacengine_loop_limit") {
            config.loop_iteration_limit = limit;
        }
        if let Some(limit) = env_value("pacengine_recursion_limit") {
            config.recursion_limit = limit;
        }
        if let Some(bytes) = env_value("pacengine_max_script_bytes") {
            config.max_script_bytes = bytes;
        }
        if let Some(ms) = env_value::<u64>("pacengine_fetch_timeout_ms") {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = env_value::<u64>("pacengine_memory_limit_bytes") {
            config.memory_limit_bytes = (bytes > 0).then_some(bytes);
        }
        if let Some(program) = env_value::<PathBuf>("pacengine_worker") {
            config.worker_program = program;
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_worker(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = program.into();
        self
    }
}

/// Reads `name` (or its upper-case form) and parses it, ignoring bad values.
fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).or(env::var(name.to_uppercase())).ok()?;
    parse_value(name, &raw)
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name.to_uppercase(), raw);
            None
        }
    }
}
