// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::Address;
use std::sync::Arc;
use tracing::{info, warn};

use super::entry::{FieldUpdate, HostedEntry};
use super::pool_registry::PoolRegistry;
use crate::error::{PoolError, PoolResult};
use crate::gateway::{hashes_match, ModelVerifier};
use crate::utils::is_unset_owner;

/// Admits a host onto an entry once its node proves it serves the expected model.
pub struct HostingRegistrar {
    registry: Arc<PoolRegistry>,
    verifier: Arc<dyn ModelVerifier>,
    expected_model_hash: String,
}

impl HostingRegistrar {
    pub fn new(
        registry: Arc<PoolRegistry>,
        verifier: Arc<dyn ModelVerifier>,
        expected_model_hash: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            verifier,
            expected_model_hash: expected_model_hash.into(),
        }
    }

    pub fn expected_model_hash(&self) -> &str {
        &self.expected_model_hash
    }

    pub async fn register_hosting(
        &self,
        entry_id: u64,
        host: Address,
        serving_url: &str,
    ) -> PoolResult<HostedEntry> {
        // Slot checks run before the node is contacted.
        let entry = self.registry.get(entry_id).await?;
        if entry.is_owned_by(&host) {
            return Err(PoolError::AlreadyHosting { entry_id, host });
        }
        if !is_unset_owner(&entry.owner1) && !is_unset_owner(&entry.owner2) {
            return Err(PoolError::NoOpenHostSlot(entry_id));
        }

        let reported = self.verifier.verify(serving_url).await?;
        if !hashes_match(&self.expected_model_hash, &reported) {
            warn!(
                "Rejected host {:?} for entry {}: node reports model hash {}",
                host, entry_id, reported
            );
            return Err(PoolError::ModelHashMismatch {
                expected: self.expected_model_hash.clone(),
                reported,
            });
        }

        let entry = self
            .registry
            .claim_host_slot(
                entry_id,
                host,
                FieldUpdate::SetTo(serving_url.trim().to_string()),
            )
            .await?;

        info!("Host {:?} now serves entry {} from {}", host, entry_id, entry.serving_url);
        Ok(entry)
    }
}
