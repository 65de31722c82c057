// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::exchange::{min_deposit, tokens_for_deposit};
use super::types::{DepositReceipt, PoolWithdrawal};
use crate::error::{PoolError, PoolResult};
use crate::ledger::LedgerStore;
use crate::registry::PoolRegistry;
use crate::utils::is_unset_owner;

/// Moves value between depositors, entry pools and pool owners.
///
/// Deposits and withdrawals on the same entry are serialized by the entry's
/// own lock. The ledger is only touched while that lock is held, so a deposit
/// is either fully visible (pool and tokens) or not at all.
pub struct SettlementEngine {
    ledger: Arc<LedgerStore>,
    registry: Arc<PoolRegistry>,
    payouts: Arc<RwLock<HashMap<Address, U256>>>,
    withdrawal_history: Arc<RwLock<Vec<PoolWithdrawal>>>,
}

impl SettlementEngine {
    pub fn new(ledger: Arc<LedgerStore>, registry: Arc<PoolRegistry>) -> Self {
        Self {
            ledger,
            registry,
            payouts: Arc::new(RwLock::new(HashMap::new())),
            withdrawal_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    /// Adds `amount_wei` to the entry's pool and credits the depositor with tokens.
    pub async fn deposit(
        &self,
        entry_id: u64,
        depositor: Address,
        amount_wei: U256,
    ) -> PoolResult<DepositReceipt> {
        let minimum = min_deposit();
        if amount_wei < minimum {
            return Err(PoolError::BelowMinimum {
                amount: amount_wei,
                minimum,
            });
        }

        let handle = self.registry.entry_handle(entry_id).await?;
        let mut slot = handle.lock().await;
        let entry = slot.as_mut().ok_or(PoolError::NotFound(entry_id))?;

        let pool_balance = entry.pool_balance.checked_add(amount_wei).ok_or_else(|| {
            PoolError::InvalidAmount(format!("{} overflows pool {}", amount_wei, entry_id))
        })?;
        let tokens = tokens_for_deposit(amount_wei);

        // Credit first: if it fails the pool is left untouched.
        self.ledger.credit(depositor, tokens).await?;
        entry.pool_balance = pool_balance;

        info!(
            "[POOL-DEPOSIT] {:?} deposited {} wei into entry {} for {} tokens (pool: {})",
            depositor, amount_wei, entry_id, tokens, pool_balance
        );

        Ok(DepositReceipt {
            entry_id,
            depositor,
            amount_wei,
            tokens_credited: tokens,
            pool_balance,
        })
    }

    /// Pays the whole pool out to the two owners and empties it.
    ///
    /// Owner1 receives the larger half when the balance is odd.
    pub async fn withdraw(&self, entry_id: u64) -> PoolResult<PoolWithdrawal> {
        let handle = self.registry.entry_handle(entry_id).await?;
        let mut slot = handle.lock().await;
        let entry = slot.as_mut().ok_or(PoolError::NotFound(entry_id))?;

        if is_unset_owner(&entry.owner1) || is_unset_owner(&entry.owner2) {
            warn!("Withdrawal refused for entry {}: owners not set", entry_id);
            return Err(PoolError::InvalidOwners(entry_id));
        }
        if entry.pool_balance.is_zero() {
            return Err(PoolError::EmptyPool(entry_id));
        }

        let total = entry.pool_balance;
        let owner2_share = total / 2;
        let owner1_share = total - owner2_share;

        let withdrawal = PoolWithdrawal {
            entry_id,
            owner1: entry.owner1,
            owner2: entry.owner2,
            owner1_share,
            owner2_share,
            total,
            timestamp: unix_now(),
        };

        {
            let mut payouts = self.payouts.write().await;
            *payouts.entry(entry.owner1).or_insert_with(U256::zero) += owner1_share;
            *payouts.entry(entry.owner2).or_insert_with(U256::zero) += owner2_share;
        }
        entry.pool_balance = U256::zero();

        info!("[POOL-WITHDRAW] Entry {} paid out {} wei", entry_id, total);
        debug!(
            "[POOL-WITHDRAW]   {:?} <- {} wei, {:?} <- {} wei",
            withdrawal.owner1, owner1_share, withdrawal.owner2, owner2_share
        );

        self.withdrawal_history.write().await.push(withdrawal.clone());
        Ok(withdrawal)
    }

    /// Total wei paid out to `owner` across all withdrawals.
    pub async fn payout_balance(&self, owner: Address) -> U256 {
        self.payouts
            .read()
            .await
            .get(&owner)
            .copied()
            .unwrap_or_default()
    }

    pub async fn withdrawal_history(&self, entry_id: Option<u64>) -> Vec<PoolWithdrawal> {
        self.withdrawal_history
            .read()
            .await
            .iter()
            .filter(|w| entry_id.map_or(true, |id| w.entry_id == id))
            .cloned()
            .collect()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
