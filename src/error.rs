// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};

use crate::metering::SessionState;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance for {account:?}: need {required}, have {available}")]
    InsufficientBalance {
        account: Address,
        required: U256,
        available: U256,
    },

    /// Balance shortfall reported by a contract revert; only the reason is known.
    #[error("Insufficient on-chain token balance: {0}")]
    InsufficientTokens(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Hosted LLM entry not found: {0}")]
    NotFound(u64),

    #[error("Pool is empty for entry {0}")]
    EmptyPool(u64),

    #[error("Invalid owner addresses for entry {0}")]
    InvalidOwners(u64),

    #[error("Deposit below minimum: got {amount} wei, minimum is {minimum} wei")]
    BelowMinimum { amount: U256, minimum: U256 },

    #[error("Model verification failed: {0}")]
    VerificationFailed(String),

    #[error("No output awaiting confirmation")]
    NoPendingOutput,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Pool for entry {entry_id} still holds {balance} wei")]
    PoolNotEmpty { entry_id: u64, balance: U256 },

    #[error("{host:?} already hosts entry {entry_id}")]
    AlreadyHosting { entry_id: u64, host: Address },

    #[error("Entry {0} has no open host slot")]
    NoOpenHostSlot(u64),

    #[error("Model hash mismatch: expected {expected}, got {reported}")]
    ModelHashMismatch { expected: String, reported: String },

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Cannot {operation} while session is {state:?}")]
    InvalidSessionState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Inference request failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl PoolError {
    /// Stable snake_case name used in API error bodies and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::InvalidAmount(_) => "invalid_amount",
            PoolError::InsufficientBalance { .. } | PoolError::InsufficientTokens(_) => {
                "insufficient_balance"
            }
            PoolError::InvalidAddress(_) => "invalid_address",
            PoolError::NotFound(_) => "not_found",
            PoolError::EmptyPool(_) => "empty_pool",
            PoolError::InvalidOwners(_) => "invalid_owners",
            PoolError::BelowMinimum { .. } => "below_minimum",
            PoolError::VerificationFailed(_) => "verification_failed",
            PoolError::NoPendingOutput => "no_pending_output",
            PoolError::TransactionFailed(_) => "transaction_failed",
            PoolError::PoolNotEmpty { .. } => "pool_not_empty",
            PoolError::AlreadyHosting { .. } => "already_hosting",
            PoolError::NoOpenHostSlot(_) => "no_open_host_slot",
            PoolError::ModelHashMismatch { .. } => "model_hash_mismatch",
            PoolError::EmptyInput => "empty_input",
            PoolError::InvalidSessionState { .. } => "invalid_session_state",
            PoolError::InferenceFailed(_) => "inference_failed",
            PoolError::InvalidUrl(_) => "invalid_url",
        }
    }

    /// Maps a contract revert reason onto the taxonomy. Unrecognised reasons stay
    /// `TransactionFailed` with the original message.
    pub fn from_revert(entry_id: Option<u64>, reason: &str) -> Self {
        let id = entry_id.unwrap_or_default();
        if reason.contains("Pool is empty") {
            PoolError::EmptyPool(id)
        } else if reason.contains("Invalid owner addresses") {
            PoolError::InvalidOwners(id)
        } else if reason.contains("Invalid LLM id") {
            PoolError::NotFound(id)
        } else if reason.contains("Not enough tokens") || reason.contains("Insufficient") {
            PoolError::InsufficientTokens(reason.to_string())
        } else {
            PoolError::TransactionFailed(reason.to_string())
        }
    }
}

pub type PoolResult<T> = std::result::Result<T, PoolError>;
