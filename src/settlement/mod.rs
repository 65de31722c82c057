// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod engine;
pub mod exchange;
pub mod types;

pub use engine::SettlementEngine;
pub use exchange::{
    format_eth, min_deposit, parse_eth, tokens_for_deposit, MIN_DEPOSIT_WEI,
    TOKENS_PER_DEPOSIT_UNIT,
};
pub use types::{DepositReceipt, PoolWithdrawal};
