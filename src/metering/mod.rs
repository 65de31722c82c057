// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cost;
pub mod session;

pub use cost::{estimate_tokens, truncate_to_budget, CHARS_PER_TOKEN, TRUNCATION_MARKER};
pub use session::{
    Billing, ChatSession, GenerationOutcome, Message, PendingOutput, Role, SessionSnapshot,
    SessionState, UsageKind, UsageRecord,
};
