// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use ethers::abi::Detokenize;
use ethers::contract::{ContractCall, ContractError};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{entries_from_raw, HostedLlmPool, RawHostedEntry, TxOutcome};
use crate::error::{PoolError, PoolResult};
use crate::registry::{EntryUpdate, FieldUpdate, HostedEntry};

type SignedClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// ABI literal meaning "leave the URL unchanged".
const KEEP_URL: &str = "0";

#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub private_key: Option<String>,
    pub confirmations: usize,
    pub call_timeout: Duration,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            contract_address: Address::zero(),
            private_key: None,
            confirmations: 1,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Typed access to the hosted LLM pool contract.
///
/// Reads go through the plain provider. Writes need a private key and are
/// signed locally. Every round-trip is bounded by `call_timeout` and never retried.
pub struct HostedLlmClient {
    config: ContractConfig,
    reader: HostedLlmPool<Provider<Http>>,
    writer: Option<HostedLlmPool<SignedClient>>,
    signer_address: Option<Address>,
}

impl HostedLlmClient {
    pub async fn connect(config: ContractConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| anyhow!("Failed to create provider: {}", e))?;

        let chain_id = tokio::time::timeout(config.call_timeout, provider.get_chainid())
            .await
            .map_err(|_| anyhow!("Timed out connecting to {}", config.rpc_url))?
            .map_err(|e| anyhow!("Failed to connect to RPC: {}", e))?;
        if chain_id.as_u64() != config.chain_id {
            return Err(anyhow!(
                "Chain ID mismatch: expected {}, got {}",
                config.chain_id,
                chain_id
            ));
        }

        let provider = Arc::new(provider);
        let (writer, signer_address) = match &config.private_key {
            Some(key) => {
                let wallet = key
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .map_err(|e| anyhow!("Invalid private key: {}", e))?
                    .with_chain_id(config.chain_id);
                let address = wallet.address();
                let signer = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
                (
                    Some(HostedLlmPool::new(config.contract_address, signer)),
                    Some(address),
                )
            }
            None => (None, None),
        };

        info!(
            "Connected to pool contract {:?} on chain {}",
            config.contract_address, config.chain_id
        );

        Ok(Self {
            reader: HostedLlmPool::new(config.contract_address, provider.clone()),
            writer,
            signer_address,
            config,
        })
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    fn writer(&self) -> PoolResult<&HostedLlmPool<SignedClient>> {
        self.writer
            .as_ref()
            .ok_or_else(|| PoolError::TransactionFailed("No wallet configured".to_string()))
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> PoolResult<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| {
                warn!("{} timed out after {:?}", what, self.config.call_timeout);
                PoolError::TransactionFailed(format!("{} timed out", what))
            })
    }

    async fn read<D>(
        &self,
        entry_id: Option<u64>,
        call: ContractCall<Provider<Http>, D>,
    ) -> PoolResult<D>
    where
        D: Detokenize + Send + Sync,
    {
        self.bounded("Contract read", call.call())
            .await?
            .map_err(|e| revert_to_error(entry_id, e))
    }

    /// Sends a transaction and waits for its receipt.
    async fn submit<D>(
        &self,
        entry_id: Option<u64>,
        call: ContractCall<SignedClient, D>,
    ) -> PoolResult<TxOutcome>
    where
        D: Detokenize + Send + Sync,
    {
        let pending = self
            .bounded("Transaction submission", call.send())
            .await?
            .map_err(|e| revert_to_error(entry_id, e))?;
        let tx_hash = pending.tx_hash();
        debug!("Submitted transaction {:?}", tx_hash);

        let receipt = self
            .bounded(
                "Transaction confirmation",
                pending.confirmations(self.config.confirmations),
            )
            .await?
            .map_err(|e| PoolError::TransactionFailed(e.to_string()))?
            .ok_or_else(|| {
                PoolError::TransactionFailed(format!("Transaction {:?} was dropped", tx_hash))
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(PoolError::TransactionFailed(format!(
                "Transaction {:?} reverted",
                tx_hash
            )));
        }

        Ok(TxOutcome {
            tx_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            gas_used: receipt.gas_used,
        })
    }

    pub async fn create_hosted_llm(
        &self,
        owner1: Address,
        owner2: Address,
        serving_url: &str,
    ) -> PoolResult<TxOutcome> {
        let call = self
            .writer()?
            .create_hosted_llm(owner1, owner2, serving_url.to_string());
        let outcome = self.submit(None, call).await?;
        info!("createHostedLLM confirmed in {:?}", outcome.tx_hash);
        Ok(outcome)
    }

    /// Sends a partial edit. `Keep` fields go out as the zero address or `"0"`.
    pub async fn edit_hosted_llm(&self, id: u64, update: EntryUpdate) -> PoolResult<TxOutcome> {
        let owner1 = encode_owner(update.owner1)?;
        let owner2 = encode_owner(update.owner2)?;
        let url = match update.serving_url {
            FieldUpdate::Keep => KEEP_URL.to_string(),
            FieldUpdate::SetTo(url) => url,
        };

        let call = self
            .writer()?
            .edit_hosted_llm(U256::from(id), owner1, owner2, url);
        self.submit(Some(id), call).await
    }

    // The plural "LLMs" names are called by signature rather than through the
    // generated snake_case methods.
    pub async fn get_all_hosted_llms(&self) -> PoolResult<Vec<HostedEntry>> {
        let call = self
            .reader
            .method::<_, Vec<RawHostedEntry>>("getAllHostedLLMs", ())
            .map_err(|e| PoolError::TransactionFailed(e.to_string()))?;
        let raw = self.read(None, call).await?;
        Ok(entries_from_raw(raw))
    }

    pub async fn total_hosted_llms(&self) -> PoolResult<u64> {
        let call = self
            .reader
            .method::<_, U256>("totalHostedLLMs", ())
            .map_err(|e| PoolError::TransactionFailed(e.to_string()))?;
        let total = self.read(None, call).await?;
        entry_count(total)
    }

    pub async fn deposit_to_pool(&self, id: u64, amount_wei: U256) -> PoolResult<TxOutcome> {
        let call = self
            .writer()?
            .deposit_to_pool(U256::from(id))
            .value(amount_wei);
        let outcome = self.submit(Some(id), call).await?;
        info!("Deposited {} wei into pool {} ({:?})", amount_wei, id, outcome.tx_hash);
        Ok(outcome)
    }

    pub async fn withdraw_from_pool(&self, id: u64) -> PoolResult<TxOutcome> {
        let call = self.writer()?.withdraw_from_pool(U256::from(id));
        let outcome = self.submit(Some(id), call).await?;
        info!("Withdrew pool {} ({:?})", id, outcome.tx_hash);
        Ok(outcome)
    }

    /// Token balance of the signing account.
    pub async fn check_balance(&self) -> PoolResult<U256> {
        let account = self
            .signer_address
            .ok_or_else(|| PoolError::TransactionFailed("No wallet configured".to_string()))?;
        self.read(None, self.reader.check_balance().from(account))
            .await
    }

    pub async fn use_tokens(&self, amount: U256) -> PoolResult<TxOutcome> {
        if amount.is_zero() {
            return Err(PoolError::InvalidAmount(amount.to_string()));
        }
        let call = self.writer()?.use_tokens(amount);
        self.submit(None, call).await
    }

    pub async fn remove_hosted_llm(&self, id: u64) -> PoolResult<TxOutcome> {
        let call = self.writer()?.remove_hosted_llm(U256::from(id));
        self.submit(Some(id), call).await
    }
}

fn encode_owner(update: FieldUpdate<String>) -> PoolResult<Address> {
    Ok(update.into_owner()?.resolve(Address::zero()))
}

fn entry_count(total: U256) -> PoolResult<u64> {
    if total > U256::from(u64::MAX) {
        return Err(PoolError::TransactionFailed(format!(
            "Hosted LLM count {} does not fit in u64",
            total
        )));
    }
    Ok(total.as_u64())
}

fn revert_to_error<M: Middleware>(entry_id: Option<u64>, err: ContractError<M>) -> PoolError {
    let reason = err
        .decode_revert::<String>()
        .unwrap_or_else(|| err.to_string());
    warn!("Contract call failed: {}", reason);
    PoolError::from_revert(entry_id, &reason)
}
