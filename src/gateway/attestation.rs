// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which stage of the split model produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStage {
    /// First half of the layers (node1).
    Input,
    /// Second half of the layers, which produced the output (node2).
    Output,
}

/// A remote-attestation quote. Displayed to the user, never verified here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationReport {
    pub stage: AttestationStage,
    pub quote: String,
}

// Locations of the output-stage quote, in the order nodes have been seen to use them.
const OUTPUT_QUOTE_PATHS: &[&[&str]] = &[
    &["attestation", "ra_report", "quote"],
    &["ra_report", "quote"],
    &["node2_attestation", "ra_report", "quote"],
];

const INPUT_QUOTE_PATH: &[&str] = &["attestation", "node1_attestation", "ra_report", "quote"];

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |node, key| node.get(key))
        .and_then(Value::as_str)
        .filter(|quote| !quote.is_empty())
        .map(str::to_string)
}

/// Pulls every quote out of a `/generate` response body.
pub fn extract_attestations(body: &Value) -> Vec<AttestationReport> {
    let mut reports = Vec::new();

    if let Some(quote) = string_at(body, INPUT_QUOTE_PATH) {
        reports.push(AttestationReport {
            stage: AttestationStage::Input,
            quote,
        });
    }

    if let Some(quote) = OUTPUT_QUOTE_PATHS
        .iter()
        .find_map(|path| string_at(body, path))
    {
        reports.push(AttestationReport {
            stage: AttestationStage::Output,
            quote,
        });
    }

    reports
}

/// Reads the quote from a node's `/node1_ra_report` body, if the node has one ready.
pub fn quote_from_ra_report(body: &Value) -> Option<AttestationReport> {
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return None;
    }
    string_at(body, &["node1_attestation", "ra_report", "quote"]).map(|quote| AttestationReport {
        stage: AttestationStage::Input,
        quote,
    })
}
