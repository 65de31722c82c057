// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Exchange rate between deposited native currency and ledger tokens.
//!
//! Every full 0.002 ETH deposited buys 100,000 tokens. Any wei above the last
//! full unit still lands in the pool but earns no tokens.
use ethers::types::U256;
use ethers::utils::{format_ether, parse_ether};

use crate::error::{PoolError, PoolResult};

/// 0.002 ETH
pub const MIN_DEPOSIT_WEI: u64 = 2_000_000_000_000_000;
pub const TOKENS_PER_DEPOSIT_UNIT: u64 = 100_000;

pub fn min_deposit() -> U256 {
    U256::from(MIN_DEPOSIT_WEI)
}

/// floor(wei / 0.002 ETH) * 100,000
pub fn tokens_for_deposit(wei: U256) -> U256 {
    (wei / min_deposit()) * U256::from(TOKENS_PER_DEPOSIT_UNIT)
}

/// Parses a decimal ether amount such as `"0.004"` into wei.
pub fn parse_eth(text: &str) -> PoolResult<U256> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(PoolError::InvalidAmount(text.to_string()));
    }
    parse_ether(trimmed).map_err(|e| PoolError::InvalidAmount(format!("{}: {}", text, e)))
}

pub fn format_eth(wei: U256) -> String {
    format_ether(wei)
}
