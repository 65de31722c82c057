// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod metering;
pub mod registry;
pub mod settlement;
pub mod utils;
pub mod version;

pub use error::{PoolError, PoolResult};
pub use gateway::{InferenceClient, ModelVerifier, VerificationGateway};
pub use ledger::LedgerStore;
pub use metering::{Billing, ChatSession, GenerationOutcome, SessionState};
pub use registry::{EntryUpdate, FieldUpdate, HostedEntry, HostingRegistrar, PoolRegistry};
pub use settlement::{PoolWithdrawal, SettlementEngine};
