// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, H160};
use std::str::FromStr;

use crate::error::{PoolError, PoolResult};

/// Owner placeholder the pool UI writes into owner2 before a second host joins.
pub const PLACEHOLDER_OWNER: Address = H160([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

/// Parses a hex wallet address, with or without `0x`, in any letter case.
pub fn parse_address(raw: &str) -> PoolResult<Address> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PoolError::InvalidAddress(raw.to_string()));
    }

    Address::from_str(hex_part).map_err(|_| PoolError::InvalidAddress(raw.to_string()))
}

/// True for the zero address and the hosting placeholder.
pub fn is_unset_owner(address: &Address) -> bool {
    address.is_zero() || *address == PLACEHOLDER_OWNER
}
