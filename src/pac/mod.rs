// src/pac/mod.rs
pub mod directive;
pub mod downloader;
pub mod engine;
pub mod primitives;
pub mod validators;
pub mod worker;

pub use directive::{parse_decision, ProxyDecision, ProxyDirective, RawDecision};
pub use engine::{EvaluationRequest, EvaluationResult, Evaluator, ENTRY_POINT};
pub use primitives::PrimitiveContext;
pub use validators::{validate_hostname, validate_ip, validate_url};

use url::Url;

/// Whether a script argument names a remote PAC file rather than a local one.
pub fn is_pac_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
