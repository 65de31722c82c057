// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::sync::Arc;
use tee_llm_pool::metering::{Role, UsageKind, TRUNCATION_MARKER};
use tee_llm_pool::{Billing, ChatSession, GenerationOutcome, LedgerStore, PoolError, SessionState};

fn requester() -> Address {
    Address::repeat_byte(0x42)
}

async fn funded_session(tokens: u64) -> (ChatSession, Arc<LedgerStore>) {
    let ledger = Arc::new(LedgerStore::new());
    if tokens > 0 {
        ledger.credit(requester(), U256::from(tokens)).await.unwrap();
    }
    (ChatSession::new(requester(), ledger.clone()), ledger)
}

fn pending(outcome: GenerationOutcome) -> tee_llm_pool::metering::PendingOutput {
    match outcome {
        GenerationOutcome::AwaitingConfirmation(pending) => pending,
        other => panic!("expected pending output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_input_charged_by_character_count() {
    let (mut session, ledger) = funded_session(100).await;

    let cost = session
        .submit_input(&"a".repeat(40), Billing::Metered)
        .await
        .unwrap();

    assert_eq!(cost, U256::from(10));
    assert_eq!(ledger.get_balance(requester()).await, U256::from(90));
    assert_eq!(session.state(), SessionState::AwaitingGeneration);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::User);
    assert_eq!(session.usage()[0].kind, UsageKind::Input);
    assert_eq!(session.usage()[0].balance_after, U256::from(90));
}

#[tokio::test]
async fn test_input_over_balance_is_rejected_without_message() {
    let (mut session, ledger) = funded_session(5).await;

    let result = session.submit_input(&"b".repeat(40), Billing::Metered).await;

    assert!(matches!(result, Err(PoolError::InsufficientBalance { .. })));
    assert!(session.messages().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(ledger.get_balance(requester()).await, U256::from(5));
}

#[tokio::test]
async fn test_empty_input_rejected() {
    let (mut session, _) = funded_session(10).await;
    assert_eq!(
        session.submit_input("   ", Billing::Metered).await,
        Err(PoolError::EmptyInput)
    );
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_full_turn_charges_output_on_confirm() {
    let (mut session, ledger) = funded_session(100).await;
    session.submit_input("abcd", Billing::Metered).await.unwrap();

    let output = pending(session.complete_generation(&"r".repeat(20)).await.unwrap());
    assert_eq!(output.cost, U256::from(5));
    assert!(!output.truncated);
    assert_eq!(session.state(), SessionState::AwaitingOutputConfirmation);
    // Nothing charged for the output yet.
    assert_eq!(ledger.get_balance(requester()).await, U256::from(99));
    assert_eq!(session.messages().len(), 1);

    let message = session.confirm_output().await.unwrap();
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.token_cost, U256::from(5));
    assert_eq!(ledger.get_balance(requester()).await, U256::from(94));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pending_output().is_none());
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn test_output_truncated_to_remaining_balance() {
    let (mut session, ledger) = funded_session(13).await;
    session.submit_input("abcdefgh", Billing::Metered).await.unwrap();
    // 11 tokens left, response needs 25.
    let response = "z".repeat(100);

    let output = pending(session.complete_generation(&response).await.unwrap());

    assert!(output.truncated);
    assert_eq!(output.cost, U256::from(11));
    assert_eq!(
        output.content.chars().count(),
        11 * 4 + TRUNCATION_MARKER.chars().count()
    );
    assert!(output.content.ends_with(TRUNCATION_MARKER));

    session.confirm_output().await.unwrap();
    assert_eq!(ledger.get_balance(requester()).await, U256::zero());
}

#[tokio::test]
async fn test_zero_balance_output_is_free_marker() {
    let (mut session, ledger) = funded_session(2).await;
    session.submit_input("12345678", Billing::Metered).await.unwrap();

    let output = pending(session.complete_generation("some answer").await.unwrap());
    assert_eq!(output.cost, U256::zero());
    assert_eq!(output.content, TRUNCATION_MARKER);

    let message = session.confirm_output().await.unwrap();
    assert_eq!(message.token_cost, U256::zero());
    assert_eq!(ledger.get_balance(requester()).await, U256::zero());
}

#[tokio::test]
async fn test_confirm_without_pending_output() {
    let (mut session, _) = funded_session(10).await;
    assert_eq!(session.confirm_output().await, Err(PoolError::NoPendingOutput));

    session.submit_input("hi", Billing::Metered).await.unwrap();
    assert_eq!(session.confirm_output().await, Err(PoolError::NoPendingOutput));
}

#[tokio::test]
async fn test_failed_confirm_keeps_output_pending() {
    let (mut session, ledger) = funded_session(20).await;
    session.submit_input("abcd", Billing::Metered).await.unwrap();
    pending(session.complete_generation(&"q".repeat(40)).await.unwrap());

    // Balance drained elsewhere before the requester confirms.
    ledger.spend(requester(), U256::from(15)).await.unwrap();

    assert!(matches!(
        session.confirm_output().await,
        Err(PoolError::InsufficientBalance { .. })
    ));
    assert_eq!(session.state(), SessionState::AwaitingOutputConfirmation);
    assert!(session.pending_output().is_some());

    ledger.credit(requester(), U256::from(10)).await.unwrap();
    session.confirm_output().await.unwrap();
    assert_eq!(ledger.get_balance(requester()).await, U256::from(4));
}

#[tokio::test]
async fn test_second_input_while_turn_open() {
    let (mut session, _) = funded_session(50).await;
    session.submit_input("first", Billing::Metered).await.unwrap();

    assert_eq!(
        session.submit_input("second", Billing::Metered).await,
        Err(PoolError::InvalidSessionState {
            operation: "submit input",
            state: SessionState::AwaitingGeneration,
        })
    );
}

#[tokio::test]
async fn test_generation_requires_open_turn() {
    let (mut session, _) = funded_session(50).await;
    assert!(matches!(
        session.complete_generation("orphan").await,
        Err(PoolError::InvalidSessionState { .. })
    ));
}

#[tokio::test]
async fn test_self_hosted_turn_is_free_and_immediate() {
    let (mut session, ledger) = funded_session(0).await;

    let cost = session
        .submit_input("talk to my own node", Billing::SelfHosted)
        .await
        .unwrap();
    assert_eq!(cost, U256::zero());

    match session.complete_generation("free answer").await.unwrap() {
        GenerationOutcome::Delivered(message) => {
            assert_eq!(message.content, "free answer");
            assert_eq!(message.token_cost, U256::zero());
        }
        other => panic!("expected delivered message, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.usage().is_empty());
    assert_eq!(ledger.get_balance(requester()).await, U256::zero());
}

#[tokio::test]
async fn test_abort_keeps_input_charge() {
    let (mut session, ledger) = funded_session(10).await;
    session.submit_input("abcdefgh", Billing::Metered).await.unwrap();

    session.abort_generation().unwrap();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(ledger.get_balance(requester()).await, U256::from(8));
    assert!(session.abort_generation().is_err());
}

#[tokio::test]
async fn test_reset_clears_history_not_balance() {
    let (mut session, ledger) = funded_session(30).await;
    session.submit_input("abcd", Billing::Metered).await.unwrap();
    pending(session.complete_generation("efgh").await.unwrap());

    session.reset();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.messages().is_empty());
    assert!(session.pending_output().is_none());
    assert!(session.usage().is_empty());
    assert_eq!(session.billing(), Billing::Metered);
    assert_eq!(ledger.get_balance(requester()).await, U256::from(29));
    assert_eq!(session.confirm_output().await, Err(PoolError::NoPendingOutput));
}

#[tokio::test]
async fn test_snapshot_serializes_state() {
    let (mut session, _) = funded_session(30).await;
    session.submit_input("abcd", Billing::Metered).await.unwrap();

    let json = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(json["state"], "awaiting_generation");
    assert_eq!(json["billing"], "metered");
    assert_eq!(json["messages"][0]["role"], "user");
}
