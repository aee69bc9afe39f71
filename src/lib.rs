// src/lib.rs
pub mod config;
pub mod error;
pub mod interface;
pub mod log;
pub mod pac;

pub use config::EngineConfig;
pub use error::PacError;
pub use interface::{handle, EvaluationResponse, Outcome};
pub use pac::{EvaluationRequest, EvaluationResult, Evaluator, ProxyDecision, ProxyDirective};

/// Evaluates a PAC script with the configuration taken from the environment.
///
/// The script runs in a fresh worker process (`PACENGINE_WORKER`, or the
/// current executable, started with `--internal-worker`) whose sandbox only
/// sees the PAC helper functions; `myIpAddress()` answers `source_address`. The returned decision
/// lists directives in the order the script gave them.
///
/// # Examples
///
/// ```no_run
/// use pacengine::{evaluate, EvaluationRequest, ProxyDirective};
///
/// let script = r#"
///     function FindProxyForURL(url, host) {
///         if (isPlainHostName(host)) return "DIRECT";
///         return "PROXY proxy.example.com:8080";
///     }
/// "#;
/// let decision = evaluate(&EvaluationRequest::new(script, "intranet", "10.0.0.7"))?;
/// assert_eq!(decision.directives(), &[ProxyDirective::Direct]);
/// # Ok::<(), pacengine::PacError>(())
/// ```
pub fn evaluate(request: &EvaluationRequest) -> EvaluationResult {
    Evaluator::new(EngineConfig::from_env()).evaluate(request)
}
