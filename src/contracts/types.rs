// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;
use serde::{Deserialize, Serialize};

use crate::registry::HostedEntry;

abigen!(
    HostedLlmPool,
    r#"[
        {
            "inputs": [
                {"internalType": "address", "name": "owner1", "type": "address"},
                {"internalType": "address", "name": "owner2", "type": "address"},
                {"internalType": "string", "name": "url", "type": "string"}
            ],
            "name": "createHostedLLM",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "uint256", "name": "id", "type": "uint256"},
                {"internalType": "address", "name": "owner1", "type": "address"},
                {"internalType": "address", "name": "owner2", "type": "address"},
                {"internalType": "string", "name": "url", "type": "string"}
            ],
            "name": "editHostedLLM",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "getAllHostedLLMs",
            "outputs": [
                {
                    "components": [
                        {"name": "owner1", "type": "address"},
                        {"name": "owner2", "type": "address"},
                        {"name": "url", "type": "string"},
                        {"name": "poolBalance", "type": "uint256"}
                    ],
                    "name": "",
                    "type": "tuple[]"
                }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "totalHostedLLMs",
            "outputs": [{"internalType": "uint256", "name": "", "type": "uint256"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "uint256", "name": "id", "type": "uint256"}],
            "name": "depositToPool",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "uint256", "name": "id", "type": "uint256"}],
            "name": "withdrawFromPool",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "checkBalance",
            "outputs": [{"internalType": "uint256", "name": "", "type": "uint256"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "uint256", "name": "amount", "type": "uint256"}],
            "name": "useTokens",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "uint256", "name": "id", "type": "uint256"}],
            "name": "removeHostedLLM",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        }
    ]"#
);

/// On-chain layout of one entry as returned by `getAllHostedLLMs`.
pub type RawHostedEntry = (Address, Address, String, U256);

/// Entries carry no id on chain; the position in the list is the id.
pub fn entries_from_raw(raw: Vec<RawHostedEntry>) -> Vec<HostedEntry> {
    raw.into_iter()
        .enumerate()
        .map(|(index, (owner1, owner2, url, pool_balance))| {
            let mut entry = HostedEntry::new(index as u64, owner1, owner2, url);
            entry.pool_balance = pool_balance;
            entry
        })
        .collect()
}

/// Hash and confirmation of a submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutcome {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}
