// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::U256;

pub const CHARS_PER_TOKEN: u64 = 4;

/// Appended to a response that was cut to fit the requester's balance.
pub const TRUNCATION_MARKER: &str = "... [Response truncated due to insufficient tokens]";

/// Token cost of `text`: one token per started group of four characters.
pub fn estimate_tokens(text: &str) -> U256 {
    let chars = text.chars().count() as u64;
    U256::from((chars + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN)
}

/// Keeps the first `budget * 4` characters of `text` and appends the marker.
pub fn truncate_to_budget(text: &str, budget: U256) -> String {
    let keep = budget.saturating_mul(U256::from(CHARS_PER_TOKEN));
    let keep = if keep > U256::from(usize::MAX as u64) {
        usize::MAX
    } else {
        keep.as_usize()
    };

    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
