// src/pac/downloader.rs
use crate::config::EngineConfig;
use crate::error::{PacError, Result};
use log::{error, info};
use reqwest::blocking::Client;
use std::io::Read;

/// Fetches a PAC script over HTTP(S), refusing bodies larger than
/// `config.max_script_bytes`.
pub fn download_pac(pac_url: &str, config: &EngineConfig) -> Result<String> {
    info!("Downloading PAC script from: {}", pac_url);

    let client = Client::builder().timeout(config.fetch_timeout).build()?;

    let response = client.get(pac_url).send()?;

    if !response.status().is_success() {
        error!("PAC download failed: HTTP {}", response.status());
        return Err(PacError::Fetch(format!("HTTP {}", response.status())));
    }

    let limit = config.max_script_bytes;
    if response
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(too_large(limit));
    }

    // Content-Length may be absent (chunked) or wrong; never buffer past the cap.
    let mut body = Vec::new();
    response
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| PacError::Fetch(format!("failed to read response body: {e}")))?;
    if body.len() > limit {
        return Err(too_large(limit));
    }
    let text = String::from_utf8(body)
        .map_err(|_| PacError::Fetch("script is not valid UTF-8".to_string()))?;
    info!("PAC script downloaded successfully ({} bytes)", text.len());
    Ok(text)
}

fn too_large(limit: usize) -> PacError {
    PacError::Fetch(format!("script exceeds {limit} bytes"))
}
