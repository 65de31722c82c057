// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::PoolResult;
use crate::utils::{is_unset_owner, parse_address};

/// One hosted-model pool slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedEntry {
    pub id: u64,
    pub owner1: Address,
    pub owner2: Address,
    pub serving_url: String,
    /// Accumulated deposits in wei.
    pub pool_balance: U256,
}

impl HostedEntry {
    pub fn new(id: u64, owner1: Address, owner2: Address, serving_url: String) -> Self {
        Self {
            id,
            owner1,
            owner2,
            serving_url,
            pool_balance: U256::zero(),
        }
    }

    pub fn is_owned_by(&self, account: &Address) -> bool {
        !is_unset_owner(account) && (self.owner1 == *account || self.owner2 == *account)
    }

    pub fn has_valid_owners(&self) -> bool {
        !is_unset_owner(&self.owner1) && !is_unset_owner(&self.owner2)
    }
}

/// Per-field update: keep the stored value or replace it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    SetTo(T),
}

impl<T> FieldUpdate<T> {
    /// `SetTo` wins over the current value; `Keep` returns the current value untouched.
    pub fn resolve(self, current: T) -> T {
        match self {
            FieldUpdate::Keep => current,
            FieldUpdate::SetTo(value) => value,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldUpdate<U> {
        match self {
            FieldUpdate::Keep => FieldUpdate::Keep,
            FieldUpdate::SetTo(value) => FieldUpdate::SetTo(f(value)),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        match self {
            FieldUpdate::Keep => Ok(FieldUpdate::Keep),
            FieldUpdate::SetTo(value) => f(value).map(FieldUpdate::SetTo),
        }
    }
}

impl FieldUpdate<String> {
    /// Decodes the form/ABI convention where an absent value, `""` or `"0"` means keep.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("0") => FieldUpdate::Keep,
            Some(value) => FieldUpdate::SetTo(value.to_string()),
        }
    }

    /// Parses an owner update. The zero address is the contract's keep literal
    /// and decodes to `Keep`, like `"0"`.
    pub fn into_owner(self) -> PoolResult<FieldUpdate<Address>> {
        match self.try_map(|raw| parse_address(&raw))? {
            FieldUpdate::SetTo(owner) if owner.is_zero() => Ok(FieldUpdate::Keep),
            update => Ok(update),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryUpdate {
    pub owner1: FieldUpdate<String>,
    pub owner2: FieldUpdate<String>,
    pub serving_url: FieldUpdate<String>,
}

impl EntryUpdate {
    pub fn keep_all() -> Self {
        Self::default()
    }

    pub fn from_wire(owner1: Option<&str>, owner2: Option<&str>, serving_url: Option<&str>) -> Self {
        Self {
            owner1: FieldUpdate::from_wire(owner1),
            owner2: FieldUpdate::from_wire(owner2),
            serving_url: FieldUpdate::from_wire(serving_url),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.owner1.is_keep() && self.owner2.is_keep() && self.serving_url.is_keep()
    }
}
