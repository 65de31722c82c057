// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{PoolError, PoolResult};

type AccountBalance = Arc<Mutex<U256>>;

/// Token balances per wallet address.
///
/// Each account owns its own lock, so mutations on one account are serialized
/// while unrelated accounts proceed in parallel. The outer map lock is only held
/// long enough to look up or insert the account handle.
pub struct LedgerStore {
    accounts: Arc<RwLock<HashMap<Address, AccountBalance>>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn existing_account(&self, account: Address) -> Option<AccountBalance> {
        self.accounts.read().await.get(&account).cloned()
    }

    async fn account_or_create(&self, account: Address) -> AccountBalance {
        if let Some(handle) = self.existing_account(account).await {
            return handle;
        }
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(account)
            .or_insert_with(|| {
                debug!("Opening ledger account {:?}", account);
                Arc::new(Mutex::new(U256::zero()))
            })
            .clone()
    }

    /// Balance of `account`; unknown accounts hold zero.
    pub async fn get_balance(&self, account: Address) -> U256 {
        match self.existing_account(account).await {
            Some(handle) => *handle.lock().await,
            None => U256::zero(),
        }
    }

    pub async fn credit(&self, account: Address, amount: U256) -> PoolResult<U256> {
        if amount.is_zero() {
            return Err(PoolError::InvalidAmount(amount.to_string()));
        }

        let handle = self.account_or_create(account).await;
        let mut balance = handle.lock().await;
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| PoolError::InvalidAmount(format!("{} overflows balance", amount)))?;
        *balance = updated;

        debug!("Credited {} tokens to {:?} (balance: {})", amount, account, updated);
        Ok(updated)
    }

    /// Removes `amount` tokens or nothing at all. A zero debit is a no-op.
    pub async fn debit(&self, account: Address, amount: U256) -> PoolResult<U256> {
        let Some(handle) = self.existing_account(account).await else {
            if amount.is_zero() {
                return Ok(U256::zero());
            }
            return Err(PoolError::InsufficientBalance {
                account,
                required: amount,
                available: U256::zero(),
            });
        };

        let mut balance = handle.lock().await;
        if amount > *balance {
            warn!(
                "Rejected debit of {} tokens from {:?}: only {} available",
                amount, account, *balance
            );
            return Err(PoolError::InsufficientBalance {
                account,
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;

        debug!("Debited {} tokens from {:?} (balance: {})", amount, account, *balance);
        Ok(*balance)
    }

    /// Direct token spend ("use tokens"): same as `debit` but a zero amount is rejected.
    pub async fn spend(&self, account: Address, amount: U256) -> PoolResult<U256> {
        if amount.is_zero() {
            return Err(PoolError::InvalidAmount(amount.to_string()));
        }
        self.debit(account, amount).await
    }

    pub async fn total_supply(&self) -> U256 {
        let handles: Vec<AccountBalance> = self.accounts.read().await.values().cloned().collect();
        let mut total = U256::zero();
        for handle in handles {
            total = total.saturating_add(*handle.lock().await);
        }
        total
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
