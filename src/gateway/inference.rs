// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::attestation::{extract_attestations, quote_from_ra_report, AttestationReport};
use super::verification::endpoint_url;
use crate::error::{PoolError, PoolResult};

const GENERATE_PATH: &str = "generate";
const RA_REPORT_PATH: &str = "node1_ra_report";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// Output of one `/generate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub output: String,
    pub attestations: Vec<AttestationReport>,
}

/// Client for the serving node's generation and RA-report endpoints.
pub struct InferenceClient {
    client: reqwest::Client,
}

impl InferenceClient {
    pub fn new(timeout: Duration) -> PoolResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::InferenceFailed(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn generate(&self, serving_url: &str, prompt: &str) -> PoolResult<Generation> {
        let url = endpoint_url(serving_url, GENERATE_PATH)?;
        info!("Forwarding prompt ({} chars) to {}", prompt.chars().count(), url);

        let response = self
            .client
            .post(url.clone())
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| PoolError::InferenceFailed(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Inference endpoint {} answered {}", url, status);
            return Err(PoolError::InferenceFailed(format!("{} returned HTTP {}", url, status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PoolError::InferenceFailed(format!("Malformed generate response: {}", e)))?;

        let output = body
            .get("output")
            .and_then(Value::as_str)
            .ok_or_else(|| PoolError::InferenceFailed("Response has no output".to_string()))?
            .to_string();

        let attestations = extract_attestations(&body);
        debug!(
            "Generation from {} returned {} chars and {} attestation quote(s)",
            url,
            output.chars().count(),
            attestations.len()
        );

        Ok(Generation {
            output,
            attestations,
        })
    }

    /// Latest first-stage RA report, or `None` while the node has not produced one.
    pub async fn fetch_ra_report(&self, node_url: &str) -> PoolResult<Option<AttestationReport>> {
        let url = endpoint_url(node_url, RA_REPORT_PATH)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PoolError::InferenceFailed(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(PoolError::InferenceFailed(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PoolError::InferenceFailed(format!("Malformed RA report: {}", e)))?;
        Ok(quote_from_ra_report(&body))
    }
}
