// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::str::FromStr;
use std::sync::Arc;
use tee_llm_pool::settlement::{min_deposit, parse_eth, tokens_for_deposit};
use tee_llm_pool::{LedgerStore, PoolError, PoolRegistry, SettlementEngine};

fn depositor() -> Address {
    Address::from_str("0x1111111111111111111111111111111111111111").unwrap()
}

async fn engine_with_entry() -> (SettlementEngine, u64) {
    let ledger = Arc::new(LedgerStore::new());
    let registry = Arc::new(PoolRegistry::new());
    let entry = registry
        .create(
            Address::repeat_byte(0x0a),
            None,
            Some("0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b"),
            "https://node.example",
        )
        .await
        .unwrap();
    (SettlementEngine::new(ledger, registry), entry.id)
}

#[tokio::test]
async fn test_minimum_deposit_buys_100k_tokens() {
    let (engine, id) = engine_with_entry().await;

    let receipt = engine
        .deposit(id, depositor(), parse_eth("0.002").unwrap())
        .await
        .unwrap();

    assert_eq!(receipt.tokens_credited, U256::from(100_000u64));
    assert_eq!(receipt.pool_balance, min_deposit());
    assert_eq!(
        engine.ledger().get_balance(depositor()).await,
        U256::from(100_000u64)
    );
}

#[tokio::test]
async fn test_double_minimum_buys_200k_tokens() {
    let (engine, id) = engine_with_entry().await;

    let receipt = engine
        .deposit(id, depositor(), parse_eth("0.004").unwrap())
        .await
        .unwrap();
    assert_eq!(receipt.tokens_credited, U256::from(200_000u64));
}

#[tokio::test]
async fn test_partial_units_land_in_pool_without_tokens() {
    let (engine, id) = engine_with_entry().await;
    let amount = parse_eth("0.005").unwrap();

    let receipt = engine.deposit(id, depositor(), amount).await.unwrap();

    assert_eq!(receipt.tokens_credited, tokens_for_deposit(amount));
    assert_eq!(receipt.tokens_credited, U256::from(200_000u64));
    assert_eq!(engine.registry().get(id).await.unwrap().pool_balance, amount);
}

#[tokio::test]
async fn test_below_minimum_has_no_side_effects() {
    let (engine, id) = engine_with_entry().await;
    let amount = parse_eth("0.0019").unwrap();

    let result = engine.deposit(id, depositor(), amount).await;
    assert_eq!(
        result,
        Err(PoolError::BelowMinimum {
            amount,
            minimum: min_deposit(),
        })
    );
    assert_eq!(engine.ledger().get_balance(depositor()).await, U256::zero());
    assert_eq!(engine.registry().get(id).await.unwrap().pool_balance, U256::zero());
}

#[tokio::test]
async fn test_below_minimum_reported_before_missing_entry() {
    let (engine, _) = engine_with_entry().await;
    assert!(matches!(
        engine.deposit(77, depositor(), U256::from(1)).await,
        Err(PoolError::BelowMinimum { .. })
    ));
    assert_eq!(
        engine.deposit(77, depositor(), min_deposit()).await,
        Err(PoolError::NotFound(77))
    );
    assert_eq!(engine.ledger().get_balance(depositor()).await, U256::zero());
}

#[tokio::test]
async fn test_deposits_accumulate() {
    let (engine, id) = engine_with_entry().await;
    for _ in 0..3 {
        engine.deposit(id, depositor(), min_deposit()).await.unwrap();
    }

    assert_eq!(
        engine.registry().get(id).await.unwrap().pool_balance,
        min_deposit() * 3
    );
    assert_eq!(
        engine.ledger().get_balance(depositor()).await,
        U256::from(300_000u64)
    );
    assert_eq!(engine.registry().total_pool_balance().await, min_deposit() * 3);
}

#[tokio::test]
async fn test_removed_entry_refuses_deposits() {
    let (engine, id) = engine_with_entry().await;
    engine.registry().remove(id).await.unwrap();

    assert_eq!(
        engine.deposit(id, depositor(), min_deposit()).await,
        Err(PoolError::NotFound(id))
    );
}
