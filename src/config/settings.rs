// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::chains::{ChainConfig, ChainRegistry};
use crate::contracts::ContractConfig;

/// Runtime settings for the marketplace service and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Keys accepted on `POST /v1/generate`. Empty disables the endpoint.
    pub api_keys: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
    pub chain_id: u64,
    /// Overrides the chain preset's RPC URL.
    pub rpc_url: Option<String>,
    /// Overrides the chain preset's pool contract.
    pub contract_address: Option<Address>,
    pub expected_model_hash: String,
    /// Model name reported by `POST /v1/generate`.
    pub model_name: String,
    pub http_timeout_secs: u64,
    pub rpc_timeout_secs: u64,
    /// Upper bound on open chat sessions.
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped when a new one opens.
    pub session_idle_ttl_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            api_keys: Vec::new(),
            cors_allowed_origins: vec!["*".to_string()],
            chain_id: 11155111,
            rpc_url: None,
            contract_address: None,
            expected_model_hash: String::new(),
            model_name: "DeepHermes-3-Llama-3-3B-TEE-Split".to_string(),
            http_timeout_secs: 30,
            rpc_timeout_secs: 60,
            max_sessions: 1000,
            session_idle_ttl_secs: 3600,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", key, e)),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl MarketConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let contract_address = match lookup("POOL_CONTRACT_ADDRESS") {
            Some(raw) => Some(
                Address::from_str(raw.trim())
                    .map_err(|e| anyhow!("Invalid POOL_CONTRACT_ADDRESS: {}", e))?,
            ),
            None => None,
        };

        Ok(Self {
            api_host: lookup("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_var(&lookup, "API_PORT", defaults.api_port)?,
            api_keys: lookup("API_KEYS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.api_keys),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.cors_allowed_origins),
            chain_id: parse_var(&lookup, "CHAIN_ID", defaults.chain_id)?,
            rpc_url: lookup("RPC_URL").or(defaults.rpc_url),
            contract_address,
            expected_model_hash: lookup("EXPECTED_MODEL_HASH")
                .unwrap_or(defaults.expected_model_hash),
            model_name: lookup("MODEL_NAME").unwrap_or(defaults.model_name),
            http_timeout_secs: parse_var(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            rpc_timeout_secs: parse_var(&lookup, "RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs)?,
            max_sessions: parse_var(&lookup, "MAX_SESSIONS", defaults.max_sessions)?,
            session_idle_ttl_secs: parse_var(
                &lookup,
                "SESSION_IDLE_TTL_SECS",
                defaults.session_idle_ttl_secs,
            )?,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid market config")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }

    /// Chain preset with this config's overrides applied.
    pub fn chain(&self) -> Result<ChainConfig> {
        let mut chain = ChainRegistry::new()
            .get_chain(self.chain_id)
            .cloned()
            .ok_or_else(|| anyhow!("Unsupported chain: {}", self.chain_id))?;
        if let Some(rpc_url) = &self.rpc_url {
            chain.rpc_url = rpc_url.clone();
        }
        if let Some(address) = self.contract_address {
            chain.pool_contract = address;
        }
        Ok(chain)
    }

    pub fn contract_config(&self, private_key: Option<String>) -> Result<ContractConfig> {
        let chain = self.chain()?;
        if chain.pool_contract.is_zero() {
            return Err(anyhow!(
                "No pool contract configured for {} (set POOL_CONTRACT_ADDRESS)",
                chain.name
            ));
        }
        Ok(ContractConfig {
            rpc_url: chain.rpc_url,
            chain_id: chain.chain_id,
            contract_address: chain.pool_contract,
            private_key,
            confirmations: chain.confirmation_blocks,
            call_timeout: self.rpc_timeout(),
        })
    }
}
