use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every way a single PAC evaluation can fail.
///
/// All variants are terminal for the request that produced them; the engine
/// never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PacError {
    /// Malformed or missing request field. The caller has to fix the request.
    #[error("{0}")]
    InputValidation(String),

    /// The script text did not parse, or threw while executing top-level code.
    #[error("script error: {0}")]
    ScriptLoad(String),

    /// The script loaded but left no callable `FindProxyForURL` behind.
    #[error("FindProxyForURL is not defined")]
    MissingEntryPoint,

    /// `FindProxyForURL` itself threw.
    #[error("script error: {0}")]
    Invocation(String),

    /// Wall-clock budget elapsed, or the script hit a runtime limit.
    #[error("execution timed out")]
    Timeout,

    /// The returned value is not a proxy string, or contains a segment that
    /// is neither `DIRECT` nor `PROXY host:port`.
    #[error("{0}")]
    Parse(String),

    /// The script ran to completion but produced no directive.
    #[error("{0}")]
    NoDirective(String),

    /// The worker process died mid-evaluation, typically after running into
    /// its address-space cap.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// A remote PAC script could not be loaded.
    #[error("failed to load PAC script: {0}")]
    Fetch(String),

    /// The evaluation worker could not be started or went away.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PacError {
    /// Stable identifier used in serialized responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::ScriptLoad(_) => "script_load",
            Self::MissingEntryPoint => "missing_entry_point",
            Self::Invocation(_) => "invocation",
            Self::Timeout => "timeout",
            Self::Parse(_) => "parse",
            Self::NoDirective(_) => "no_directive",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Fetch(_) => "fetch",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the script never got to produce an answer.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::ScriptLoad(_)
                | Self::MissingEntryPoint
                | Self::Invocation(_)
                | Self::Timeout
                | Self::ResourceLimit(_)
                | Self::Internal(_)
        )
    }
}

impl From<reqwest::Error> for PacError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}

pub type Result<T, E = PacError> = std::result::Result<T, E>;
