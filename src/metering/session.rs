// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::cost::{estimate_tokens, truncate_to_budget};
use crate::error::{PoolError, PoolResult};
use crate::gateway::AttestationReport;
use crate::ledger::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingGeneration,
    AwaitingOutputConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub token_cost: U256,
    pub timestamp: DateTime<Utc>,
}

/// Generated output waiting for the requester to sign its charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOutput {
    pub content: String,
    pub cost: U256,
    pub truncated: bool,
}

/// How a turn is paid for. Turns served by an entry the requester owns are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Billing {
    #[default]
    Metered,
    SelfHosted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub kind: UsageKind,
    pub tokens: U256,
    pub balance_after: U256,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Metered turn: the output is held until `confirm_output`.
    AwaitingConfirmation(PendingOutput),
    /// Self-hosted turn: the output was appended straight away.
    Delivered(Message),
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub requester: Address,
    pub state: SessionState,
    pub billing: Billing,
    pub messages: Vec<Message>,
    pub pending_output: Option<PendingOutput>,
    pub usage: Vec<UsageRecord>,
    pub attestations: Vec<AttestationReport>,
    pub created_at: DateTime<Utc>,
}

/// One requester's interactive chat, metered against their ledger balance.
///
/// A turn moves `Idle -> AwaitingGeneration -> AwaitingOutputConfirmation -> Idle`.
/// The input is charged on submission; the output is charged only once the
/// requester confirms it. `reset` is valid from any state.
pub struct ChatSession {
    id: Uuid,
    requester: Address,
    ledger: Arc<LedgerStore>,
    state: SessionState,
    billing: Billing,
    messages: Vec<Message>,
    pending_output: Option<PendingOutput>,
    usage: Vec<UsageRecord>,
    attestations: Vec<AttestationReport>,
    created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(requester: Address, ledger: Arc<LedgerStore>) -> Self {
        let id = Uuid::new_v4();
        info!("Started chat session {} for {:?}", id, requester);
        Self {
            id,
            requester,
            ledger,
            state: SessionState::Idle,
            billing: Billing::Metered,
            messages: Vec::new(),
            pending_output: None,
            usage: Vec::new(),
            attestations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requester(&self) -> Address {
        self.requester
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn billing(&self) -> Billing {
        self.billing
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_output(&self) -> Option<&PendingOutput> {
        self.pending_output.as_ref()
    }

    pub fn usage(&self) -> &[UsageRecord] {
        &self.usage
    }

    pub fn attestations(&self) -> &[AttestationReport] {
        &self.attestations
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            requester: self.requester,
            state: self.state,
            billing: self.billing,
            messages: self.messages.clone(),
            pending_output: self.pending_output.clone(),
            usage: self.usage.clone(),
            attestations: self.attestations.clone(),
            created_at: self.created_at,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> PoolResult<()> {
        if self.state != expected {
            return Err(PoolError::InvalidSessionState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Charges and records the user's input. Returns the tokens charged.
    pub async fn submit_input(&mut self, text: &str, billing: Billing) -> PoolResult<U256> {
        self.expect_state("submit input", SessionState::Idle)?;
        if text.trim().is_empty() {
            return Err(PoolError::EmptyInput);
        }

        let cost = match billing {
            Billing::Metered => {
                let cost = estimate_tokens(text);
                let balance_after = self.ledger.debit(self.requester, cost).await?;
                self.record_usage(UsageKind::Input, cost, balance_after);
                cost
            }
            Billing::SelfHosted => U256::zero(),
        };

        self.push_message(Role::User, text.to_string(), cost);
        self.billing = billing;
        self.state = SessionState::AwaitingGeneration;

        debug!("Session {}: input charged {} tokens ({:?})", self.id, cost, billing);
        Ok(cost)
    }

    /// Accepts the model's full response for the current turn.
    ///
    /// Metered turns hold the response for confirmation, cut down to what the
    /// requester's balance covers. Self-hosted turns deliver it immediately.
    pub async fn complete_generation(&mut self, response: &str) -> PoolResult<GenerationOutcome> {
        self.expect_state("complete generation", SessionState::AwaitingGeneration)?;

        if self.billing == Billing::SelfHosted {
            let message = self.push_message(Role::Assistant, response.to_string(), U256::zero());
            self.state = SessionState::Idle;
            return Ok(GenerationOutcome::Delivered(message));
        }

        let cost = estimate_tokens(response);
        let balance = self.ledger.get_balance(self.requester).await;

        let pending = if balance >= cost {
            PendingOutput {
                content: response.to_string(),
                cost,
                truncated: false,
            }
        } else {
            info!(
                "Session {}: output needs {} tokens but only {} remain, truncating",
                self.id, cost, balance
            );
            PendingOutput {
                content: truncate_to_budget(response, balance),
                cost: balance,
                truncated: true,
            }
        };

        self.pending_output = Some(pending.clone());
        self.state = SessionState::AwaitingOutputConfirmation;
        Ok(GenerationOutcome::AwaitingConfirmation(pending))
    }

    /// Signs the pending output's charge and appends it to the conversation.
    pub async fn confirm_output(&mut self) -> PoolResult<Message> {
        if self.state != SessionState::AwaitingOutputConfirmation {
            return Err(PoolError::NoPendingOutput);
        }
        let pending = self.pending_output.clone().ok_or(PoolError::NoPendingOutput)?;

        // A failed debit leaves the output pending so the requester can top up and retry.
        if !pending.cost.is_zero() {
            let balance_after = self.ledger.debit(self.requester, pending.cost).await?;
            self.record_usage(UsageKind::Output, pending.cost, balance_after);
        }

        let message = self.push_message(Role::Assistant, pending.content, pending.cost);
        self.pending_output = None;
        self.state = SessionState::Idle;

        debug!("Session {}: output confirmed for {} tokens", self.id, message.token_cost);
        Ok(message)
    }

    /// Returns to `Idle` after a failed generation. The input charge stands.
    pub fn abort_generation(&mut self) -> PoolResult<()> {
        self.expect_state("abort generation", SessionState::AwaitingGeneration)?;
        self.state = SessionState::Idle;
        info!("Session {}: generation aborted", self.id);
        Ok(())
    }

    pub fn record_attestation(&mut self, report: AttestationReport) {
        self.attestations.push(report);
    }

    /// Clears the conversation. Balances are untouched.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.pending_output = None;
        self.usage.clear();
        self.attestations.clear();
        self.billing = Billing::Metered;
        self.state = SessionState::Idle;
        info!("Session {} reset", self.id);
    }

    fn push_message(&mut self, role: Role, content: String, token_cost: U256) -> Message {
        let message = Message {
            role,
            content,
            token_cost,
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }

    fn record_usage(&mut self, kind: UsageKind, tokens: U256, balance_after: U256) {
        self.usage.push(UsageRecord {
            kind,
            tokens,
            balance_after,
            timestamp: Utc::now(),
        });
    }
}
