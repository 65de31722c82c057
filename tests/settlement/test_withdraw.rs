// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use futures_util::future::join_all;
use std::sync::Arc;
use tee_llm_pool::settlement::min_deposit;
use tee_llm_pool::utils::PLACEHOLDER_OWNER;
use tee_llm_pool::{LedgerStore, PoolError, PoolRegistry, SettlementEngine};

fn owner1() -> Address {
    Address::repeat_byte(0x0a)
}

fn owner2() -> Address {
    Address::repeat_byte(0x0b)
}

fn depositor() -> Address {
    Address::repeat_byte(0x0c)
}

async fn setup(owner2_raw: &str) -> (Arc<SettlementEngine>, u64) {
    let ledger = Arc::new(LedgerStore::new());
    let registry = Arc::new(PoolRegistry::new());
    let entry = registry
        .create(owner1(), None, Some(owner2_raw), "https://node.example")
        .await
        .unwrap();
    (Arc::new(SettlementEngine::new(ledger, registry)), entry.id)
}

fn owner2_hex() -> String {
    format!("{:?}", owner2())
}

#[tokio::test]
async fn test_even_pool_splits_in_half() {
    let (engine, id) = setup(&owner2_hex()).await;
    engine.deposit(id, depositor(), min_deposit() * 2).await.unwrap();

    let withdrawal = engine.withdraw(id).await.unwrap();

    assert_eq!(withdrawal.owner1_share, min_deposit());
    assert_eq!(withdrawal.owner2_share, min_deposit());
    assert_eq!(withdrawal.total, min_deposit() * 2);
    assert_eq!(engine.registry().get(id).await.unwrap().pool_balance, U256::zero());
    assert_eq!(engine.payout_balance(owner1()).await, min_deposit());
    assert_eq!(engine.payout_balance(owner2()).await, min_deposit());
}

#[tokio::test]
async fn test_second_withdraw_finds_empty_pool() {
    let (engine, id) = setup(&owner2_hex()).await;
    engine.deposit(id, depositor(), min_deposit()).await.unwrap();

    engine.withdraw(id).await.unwrap();
    assert_eq!(engine.withdraw(id).await, Err(PoolError::EmptyPool(id)));
}

#[tokio::test]
async fn test_odd_remainder_goes_to_owner1() {
    let (engine, id) = setup(&owner2_hex()).await;
    let amount = min_deposit() + 1;
    engine.deposit(id, depositor(), amount).await.unwrap();

    let withdrawal = engine.withdraw(id).await.unwrap();
    assert_eq!(withdrawal.owner1_share, withdrawal.owner2_share + 1);
    assert_eq!(withdrawal.owner1_share + withdrawal.owner2_share, amount);
    assert_eq!(engine.registry().get(id).await.unwrap().pool_balance, U256::zero());
}

#[tokio::test]
async fn test_unset_owner_blocks_withdrawal() {
    let placeholder = format!("{:?}", PLACEHOLDER_OWNER);
    let (engine, id) = setup(&placeholder).await;
    engine.deposit(id, depositor(), min_deposit()).await.unwrap();

    assert_eq!(engine.withdraw(id).await, Err(PoolError::InvalidOwners(id)));
    assert_eq!(engine.registry().get(id).await.unwrap().pool_balance, min_deposit());
}

#[tokio::test]
async fn test_owners_checked_before_balance() {
    let (engine, id) = setup(&format!("{:?}", PLACEHOLDER_OWNER)).await;

    assert_eq!(
        engine.registry().get(id).await.unwrap().pool_balance,
        U256::zero()
    );
    assert_eq!(engine.withdraw(id).await, Err(PoolError::InvalidOwners(id)));
}

#[tokio::test]
async fn test_withdraw_unknown_entry() {
    let (engine, _) = setup(&owner2_hex()).await;
    assert_eq!(engine.withdraw(12).await, Err(PoolError::NotFound(12)));
}

#[tokio::test]
async fn test_same_owner_in_both_slots_collects_everything() {
    let (engine, id) = setup(&format!("{:?}", owner1())).await;
    engine.deposit(id, depositor(), min_deposit()).await.unwrap();

    let withdrawal = engine.withdraw(id).await.unwrap();
    assert_eq!(withdrawal.share_of(&owner1()), min_deposit());
    assert_eq!(engine.payout_balance(owner1()).await, min_deposit());
}

#[tokio::test]
async fn test_concurrent_withdrawals_pay_once() {
    let (engine, id) = setup(&owner2_hex()).await;
    engine.deposit(id, depositor(), min_deposit() * 5).await.unwrap();

    let tasks = (0..16).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.withdraw(id).await })
    });
    let results = join_all(tasks).await;

    let paid: Vec<_> = results
        .into_iter()
        .filter_map(|r| r.ok().and_then(|w| w.ok()))
        .collect();
    assert_eq!(paid.len(), 1);
    assert_eq!(
        engine.payout_balance(owner1()).await + engine.payout_balance(owner2()).await,
        min_deposit() * 5
    );
    assert_eq!(engine.withdrawal_history(Some(id)).await.len(), 1);
}

#[tokio::test]
async fn test_remove_requires_empty_pool() {
    let (engine, id) = setup(&owner2_hex()).await;
    engine.deposit(id, depositor(), min_deposit()).await.unwrap();

    assert!(matches!(
        engine.registry().remove(id).await,
        Err(PoolError::PoolNotEmpty { .. })
    ));
    engine.withdraw(id).await.unwrap();
    engine.registry().remove(id).await.unwrap();
}
