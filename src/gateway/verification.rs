// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PoolError, PoolResult};

const VERIFY_PATH: &str = "verify";

/// Asks a serving node which model it runs.
#[async_trait]
pub trait ModelVerifier: Send + Sync {
    /// Returns the model hash reported by the node behind `serving_url`.
    async fn verify(&self, serving_url: &str) -> PoolResult<String>;
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    model_hash: Option<String>,
    #[serde(default)]
    model_name: Option<String>,
}

/// HTTP client for the node `/verify` endpoint.
pub struct VerificationGateway {
    client: reqwest::Client,
}

impl VerificationGateway {
    pub fn new(timeout: Duration) -> PoolResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::VerificationFailed(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }

    /// `{serving_url}/verify`, treating the serving URL as a directory.
    pub fn verify_url(serving_url: &str) -> PoolResult<Url> {
        endpoint_url(serving_url, VERIFY_PATH)
    }
}

#[async_trait]
impl ModelVerifier for VerificationGateway {
    async fn verify(&self, serving_url: &str) -> PoolResult<String> {
        let url = Self::verify_url(serving_url)?;
        info!("Verifying model at {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PoolError::VerificationFailed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Verification endpoint {} answered {}", url, status);
            return Err(PoolError::VerificationFailed(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| PoolError::VerificationFailed(format!("Malformed verify response: {}", e)))?;

        let hash = body
            .model_hash
            .ok_or_else(|| PoolError::VerificationFailed("Response has no model_hash".to_string()))?;

        debug!("Node reported model {:?} with hash {}", body.model_name, hash);
        Ok(hash)
    }
}

/// Compares two model hashes ignoring letter case and a `0x` prefix. Empty never matches.
pub fn hashes_match(expected: &str, reported: &str) -> bool {
    fn normalise(raw: &str) -> &str {
        let trimmed = raw.trim();
        trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed)
    }

    let (expected, reported) = (normalise(expected), normalise(reported));
    if expected.is_empty() || reported.is_empty() {
        return false;
    }
    match (hex::decode(expected), hex::decode(reported)) {
        (Ok(a), Ok(b)) => a == b,
        _ => expected.eq_ignore_ascii_case(reported),
    }
}

/// Joins `path` under `base`, adding the trailing slash the base may lack.
pub(crate) fn endpoint_url(base: &str, path: &str) -> PoolResult<Url> {
    let mut base = base.trim().to_string();
    if base.is_empty() {
        return Err(PoolError::InvalidUrl("empty serving URL".to_string()));
    }
    if !base.ends_with('/') {
        base.push('/');
    }

    let parsed = Url::parse(&base).map_err(|e| PoolError::InvalidUrl(format!("{}: {}", base, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PoolError::InvalidUrl(format!("unsupported scheme in {}", base)));
    }
    parsed
        .join(path)
        .map_err(|e| PoolError::InvalidUrl(format!("{}{}: {}", base, path, e)))
}
