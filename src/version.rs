// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the TEE LLM pool service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

pub const BUILD_DATE: &str = "2026-10-16";

/// Capabilities advertised on `/health`
pub const FEATURES: &[&str] = &[
    "token-ledger",
    "pool-registry",
    "pool-deposits",
    "owner-split-withdrawals",
    "metered-chat-sessions",
    "self-hosted-turns",
    "model-verification",
    "attestation-passthrough",
];

pub fn get_version_string() -> String {
    format!("TEE LLM Pool {} ({})", VERSION_NUMBER, BUILD_DATE)
}
