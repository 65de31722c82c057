// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub entry_id: u64,
    pub depositor: Address,
    pub amount_wei: U256,
    pub tokens_credited: U256,
    /// Pool balance after the deposit.
    pub pool_balance: U256,
}

/// Result of paying a pool out to its two owners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolWithdrawal {
    pub entry_id: u64,
    pub owner1: Address,
    pub owner2: Address,
    pub owner1_share: U256,
    pub owner2_share: U256,
    pub total: U256,
    pub timestamp: u64,
}

impl PoolWithdrawal {
    pub fn share_of(&self, owner: &Address) -> U256 {
        let mut share = U256::zero();
        if *owner == self.owner1 {
            share += self.owner1_share;
        }
        if *owner == self.owner2 {
            share += self.owner2_share;
        }
        share
    }
}
