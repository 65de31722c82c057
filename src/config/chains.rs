// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

const NO_CONTRACT: &str = "0x0000000000000000000000000000000000000000";

/// Pool contract deployed alongside the web UI.
const DEFAULT_POOL_CONTRACT: &str = "0x396061f4eBa244416CA7020FA341F8F6A990D991";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub native_symbol: String,
    pub pool_contract: Address,
    pub confirmation_blocks: usize,
}

fn env_address(var: &str, fallback: &str) -> Address {
    std::env::var(var)
        .ok()
        .and_then(|addr| Address::from_str(addr.trim()).ok())
        .or_else(|| Address::from_str(fallback).ok())
        .unwrap_or_else(Address::zero)
}

impl ChainConfig {
    fn testnet(
        chain_id: u64,
        name: &str,
        (rpc_env, default_rpc): (&str, &str),
        (contract_env, default_contract): (&str, &str),
    ) -> Self {
        ChainConfig {
            chain_id,
            name: name.to_string(),
            rpc_url: std::env::var(rpc_env).unwrap_or_else(|_| default_rpc.to_string()),
            native_symbol: "ETH".to_string(),
            pool_contract: env_address(contract_env, default_contract),
            confirmation_blocks: 1,
        }
    }

    pub fn sepolia() -> Self {
        Self::testnet(
            11155111,
            "Sepolia",
            ("SEPOLIA_RPC_URL", "https://rpc.sepolia.org"),
            ("SEPOLIA_POOL_CONTRACT", DEFAULT_POOL_CONTRACT),
        )
    }

    pub fn base_sepolia() -> Self {
        Self::testnet(
            84532,
            "Base Sepolia",
            ("BASE_SEPOLIA_RPC_URL", "https://sepolia.base.org"),
            ("BASE_SEPOLIA_POOL_CONTRACT", NO_CONTRACT),
        )
    }

    pub fn optimism_sepolia() -> Self {
        Self::testnet(
            11155420,
            "OP Sepolia",
            ("OP_SEPOLIA_RPC_URL", "https://sepolia.optimism.io"),
            ("OP_SEPOLIA_POOL_CONTRACT", NO_CONTRACT),
        )
    }

    pub fn arbitrum_sepolia() -> Self {
        Self::testnet(
            421614,
            "Arbitrum Sepolia",
            ("ARBITRUM_SEPOLIA_RPC_URL", "https://sepolia-rollup.arbitrum.io/rpc"),
            ("ARBITRUM_SEPOLIA_POOL_CONTRACT", NO_CONTRACT),
        )
    }

    pub fn polygon_amoy() -> Self {
        let mut config = Self::testnet(
            80002,
            "Polygon Amoy",
            ("POLYGON_AMOY_RPC_URL", "https://rpc-amoy.polygon.technology"),
            ("POLYGON_AMOY_POOL_CONTRACT", NO_CONTRACT),
        );
        config.native_symbol = "POL".to_string();
        config.confirmation_blocks = 3;
        config
    }

    /// Local anvil/hardhat node.
    pub fn local() -> Self {
        Self::testnet(
            31337,
            "Local",
            ("LOCAL_RPC_URL", "http://localhost:8545"),
            ("LOCAL_POOL_CONTRACT", NO_CONTRACT),
        )
    }
}

pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
    default_chain: u64,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let chains = [
            ChainConfig::sepolia(),
            ChainConfig::base_sepolia(),
            ChainConfig::optimism_sepolia(),
            ChainConfig::arbitrum_sepolia(),
            ChainConfig::polygon_amoy(),
            ChainConfig::local(),
        ]
        .into_iter()
        .map(|chain| (chain.chain_id, chain))
        .collect();

        ChainRegistry {
            chains,
            default_chain: 11155111,
        }
    }

    pub fn get_chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn default_chain(&self) -> u64 {
        self.default_chain
    }

    pub fn list_supported_chains(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
