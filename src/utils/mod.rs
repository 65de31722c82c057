// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod address;

pub use address::{is_unset_owner, parse_address, PLACEHOLDER_OWNER};
