// src/interface.rs
//! The request/response boundary in front of the evaluator.
//!
//! A transport (HTTP handler, CLI, test) hands an [`EvaluationRequest`] to
//! [`handle`], which rejects malformed input before any script runs and folds
//! the outcome into an [`EvaluationResponse`].

use crate::error::PacError;
use crate::pac::{validate_hostname, validate_ip, validate_url, Evaluator, ProxyDirective};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use crate::pac::EvaluationRequest;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directives: Option<Vec<ProxyDirective>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error kind, see [`PacError::kind`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResponse {
    pub fn success(directives: Vec<ProxyDirective>) -> Self {
        Self {
            outcome: Outcome::Success,
            directives: Some(directives),
            message: None,
            error: None,
        }
    }

    pub fn failure(err: &PacError) -> Self {
        Self {
            outcome: Outcome::Failure,
            directives: None,
            message: Some(err.to_string()),
            error: Some(err.kind().to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Checks the request fields a transport must validate before evaluation.
pub fn validate_request(request: &EvaluationRequest) -> Result<(), PacError> {
    require("script", &request.script)?;
    require("destinationHost", &request.destination_host)?;
    require("sourceAddress", &request.source_address)?;

    if !validate_hostname(&request.destination_host) {
        return Err(PacError::InputValidation(
            "\"destinationHost\" must be a valid hostname".to_string(),
        ));
    }
    if !validate_ip(&request.source_address) {
        return Err(PacError::InputValidation(
            "\"sourceAddress\" must be a valid IPv4 address".to_string(),
        ));
    }
    if let Some(url) = &request.destination_url {
        if !validate_url(url) {
            return Err(PacError::InputValidation(
                "\"destinationURL\" must be a valid URL".to_string(),
            ));
        }
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), PacError> {
    if value.trim().is_empty() {
        return Err(PacError::InputValidation(format!(
            "Field \"{field}\" is required"
        )));
    }
    Ok(())
}

/// Validates `request`, evaluates it and builds the response.
pub fn handle(evaluator: &Evaluator, request: &EvaluationRequest) -> EvaluationResponse {
    if let Err(err) = validate_request(request) {
        debug!("Rejected PAC request: {}", err);
        return EvaluationResponse::failure(&err);
    }

    match evaluator.evaluate(request) {
        Ok(decision) => {
            info!(
                "PAC resolved {} for {}",
                decision, request.destination_host
            );
            EvaluationResponse::success(decision.into_directives())
        }
        Err(err) => {
            info!(
                "PAC evaluation failed for {}: {} ({})",
                request.destination_host,
                err,
                err.kind()
            );
            EvaluationResponse::failure(&err)
        }
    }
}
