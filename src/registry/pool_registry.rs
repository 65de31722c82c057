// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::entry::{EntryUpdate, FieldUpdate, HostedEntry};
use crate::error::{PoolError, PoolResult};
use crate::utils::{is_unset_owner, parse_address};

/// Slot for one entry id. `None` once the entry has been removed; slots are never reused.
pub(crate) type EntryHandle = Arc<Mutex<Option<HostedEntry>>>;

/// Hosted LLM entries in creation order.
pub struct PoolRegistry {
    entries: Arc<RwLock<Vec<EntryHandle>>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub(crate) async fn entry_handle(&self, id: u64) -> PoolResult<EntryHandle> {
        let index = usize::try_from(id).map_err(|_| PoolError::NotFound(id))?;
        self.entries
            .read()
            .await
            .get(index)
            .cloned()
            .ok_or(PoolError::NotFound(id))
    }

    async fn handles(&self) -> Vec<EntryHandle> {
        self.entries.read().await.clone()
    }

    /// Registers a new entry. Missing owners default to `caller`.
    pub async fn create(
        &self,
        caller: Address,
        owner1: Option<&str>,
        owner2: Option<&str>,
        serving_url: &str,
    ) -> PoolResult<HostedEntry> {
        let owner1 = resolve_owner(owner1, caller)?;
        let owner2 = resolve_owner(owner2, caller)?;

        let mut entries = self.entries.write().await;
        let id = entries.len() as u64;
        let entry = HostedEntry::new(id, owner1, owner2, serving_url.trim().to_string());
        entries.push(Arc::new(Mutex::new(Some(entry.clone()))));

        info!(
            "Created hosted LLM entry {} (owner1: {:?}, owner2: {:?}, url: {:?})",
            id, owner1, owner2, entry.serving_url
        );
        Ok(entry)
    }

    /// Applies a partial update. Every field is validated before anything is written.
    pub async fn edit(&self, id: u64, update: EntryUpdate) -> PoolResult<HostedEntry> {
        let owner1 = update.owner1.into_owner()?;
        let owner2 = update.owner2.into_owner()?;
        let serving_url = update.serving_url.map(|raw| raw.trim().to_string());

        let handle = self.entry_handle(id).await?;
        let mut slot = handle.lock().await;
        let entry = slot.as_mut().ok_or(PoolError::NotFound(id))?;

        entry.owner1 = owner1.resolve(entry.owner1);
        entry.owner2 = owner2.resolve(entry.owner2);
        entry.serving_url = serving_url.resolve(std::mem::take(&mut entry.serving_url));

        debug!("Edited hosted LLM entry {}: {:?}", id, entry);
        Ok(entry.clone())
    }

    pub async fn get(&self, id: u64) -> PoolResult<HostedEntry> {
        let handle = self.entry_handle(id).await?;
        let slot = handle.lock().await;
        slot.clone().ok_or(PoolError::NotFound(id))
    }

    pub async fn list(&self) -> Vec<HostedEntry> {
        let mut live = Vec::new();
        for handle in self.handles().await {
            if let Some(entry) = handle.lock().await.as_ref() {
                live.push(entry.clone());
            }
        }
        live
    }

    /// Number of live entries.
    pub async fn total(&self) -> u64 {
        self.list().await.len() as u64
    }

    pub async fn total_pool_balance(&self) -> U256 {
        self.list()
            .await
            .iter()
            .fold(U256::zero(), |acc, entry| acc.saturating_add(entry.pool_balance))
    }

    /// Retires an entry. Refused while the pool still holds funds.
    pub async fn remove(&self, id: u64) -> PoolResult<HostedEntry> {
        let handle = self.entry_handle(id).await?;
        let mut slot = handle.lock().await;
        let entry = slot.as_ref().ok_or(PoolError::NotFound(id))?;

        if !entry.pool_balance.is_zero() {
            return Err(PoolError::PoolNotEmpty {
                entry_id: id,
                balance: entry.pool_balance,
            });
        }

        let removed = slot.take().ok_or(PoolError::NotFound(id))?;
        info!("Removed hosted LLM entry {}", id);
        Ok(removed)
    }

    pub async fn is_owned_by(&self, id: u64, account: Address) -> PoolResult<bool> {
        Ok(self.get(id).await?.is_owned_by(&account))
    }

    /// Puts `host` into the first unset owner slot, owner2 before owner1, and
    /// optionally points the entry at the host's serving URL in the same step.
    pub async fn claim_host_slot(
        &self,
        id: u64,
        host: Address,
        serving_url: FieldUpdate<String>,
    ) -> PoolResult<HostedEntry> {
        if is_unset_owner(&host) {
            return Err(PoolError::InvalidAddress(format!("{:?}", host)));
        }

        let handle = self.entry_handle(id).await?;
        let mut slot = handle.lock().await;
        let entry = slot.as_mut().ok_or(PoolError::NotFound(id))?;

        if entry.is_owned_by(&host) {
            return Err(PoolError::AlreadyHosting { entry_id: id, host });
        }

        if is_unset_owner(&entry.owner2) {
            entry.owner2 = host;
        } else if is_unset_owner(&entry.owner1) {
            entry.owner1 = host;
        } else {
            return Err(PoolError::NoOpenHostSlot(id));
        }
        entry.serving_url = serving_url.resolve(std::mem::take(&mut entry.serving_url));

        info!("Host {:?} claimed a slot on entry {}", host, id);
        Ok(entry.clone())
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_owner(raw: Option<&str>, caller: Address) -> PoolResult<Address> {
    match FieldUpdate::from_wire(raw) {
        FieldUpdate::Keep => Ok(caller),
        FieldUpdate::SetTo(value) => parse_address(&value),
    }
}
