// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod types;

pub use client::{ContractConfig, HostedLlmClient};
pub use types::{entries_from_raw, HostedLlmPool, TxOutcome};
