// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::{Address, U256};
use std::str::FromStr;
use tee_llm_pool::utils::PLACEHOLDER_OWNER;
use tee_llm_pool::{EntryUpdate, FieldUpdate, PoolError, PoolRegistry};

fn caller() -> Address {
    Address::from_str("0x1111111111111111111111111111111111111111").unwrap()
}

const OTHER: &str = "0x2222222222222222222222222222222222222222";

fn other() -> Address {
    Address::from_str(OTHER).unwrap()
}

#[tokio::test]
async fn test_create_defaults_owners_to_caller() {
    let registry = PoolRegistry::new();
    let entry = registry
        .create(caller(), None, Some(""), "https://node-a.example")
        .await
        .unwrap();

    assert_eq!(entry.id, 0);
    assert_eq!(entry.owner1, caller());
    assert_eq!(entry.owner2, caller());
    assert_eq!(entry.pool_balance, U256::zero());
}

#[tokio::test]
async fn test_create_rejects_malformed_owner() {
    let registry = PoolRegistry::new();
    let result = registry
        .create(caller(), Some("0x1234"), None, "https://node-a.example")
        .await;
    assert!(matches!(result, Err(PoolError::InvalidAddress(_))));
    assert_eq!(registry.total().await, 0);
}

#[tokio::test]
async fn test_ids_are_sequential_and_list_is_ordered() {
    let registry = PoolRegistry::new();
    for i in 0..3 {
        let url = format!("https://node-{}.example", i);
        registry.create(caller(), None, None, &url).await.unwrap();
    }

    let entries = registry.list().await;
    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(entries[2].serving_url, "https://node-2.example");
}

#[tokio::test]
async fn test_get_missing_entry() {
    let registry = PoolRegistry::new();
    assert_eq!(registry.get(9).await, Err(PoolError::NotFound(9)));
}

#[tokio::test]
async fn test_edit_keep_all_is_noop() {
    let registry = PoolRegistry::new();
    let created = registry
        .create(caller(), None, Some(OTHER), "https://node-a.example")
        .await
        .unwrap();

    let update = EntryUpdate::keep_all();
    assert!(update.is_noop());
    let edited = registry.edit(created.id, update).await.unwrap();
    assert_eq!(edited, created);
}

#[tokio::test]
async fn test_edit_wire_sentinels_keep_fields() {
    let registry = PoolRegistry::new();
    let created = registry
        .create(caller(), None, None, "https://node-a.example")
        .await
        .unwrap();

    let update = EntryUpdate::from_wire(Some("0"), Some(OTHER), Some(""));
    let edited = registry.edit(created.id, update).await.unwrap();

    assert_eq!(edited.owner1, caller());
    assert_eq!(edited.owner2, other());
    assert_eq!(edited.serving_url, "https://node-a.example");
}

#[tokio::test]
async fn test_edit_zero_address_owner_keeps_current() {
    let registry = PoolRegistry::new();
    let created = registry
        .create(caller(), None, Some(OTHER), "https://node-a.example")
        .await
        .unwrap();
    let zero = format!("{:?}", Address::zero());

    let update = EntryUpdate::from_wire(Some(&zero), Some(&zero), None);
    let edited = registry.edit(created.id, update).await.unwrap();

    assert_eq!(edited.owner1, caller());
    assert_eq!(edited.owner2, other());
    assert_eq!(registry.get(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_edit_validates_before_applying() {
    let registry = PoolRegistry::new();
    let created = registry
        .create(caller(), None, None, "https://node-a.example")
        .await
        .unwrap();

    let update = EntryUpdate {
        owner1: FieldUpdate::SetTo(OTHER.to_string()),
        owner2: FieldUpdate::SetTo("garbage".to_string()),
        serving_url: FieldUpdate::SetTo("https://node-b.example".to_string()),
    };
    assert!(matches!(
        registry.edit(created.id, update).await,
        Err(PoolError::InvalidAddress(_))
    ));
    assert_eq!(registry.get(created.id).await.unwrap(), created);

    assert_eq!(
        registry.edit(42, EntryUpdate::keep_all()).await,
        Err(PoolError::NotFound(42))
    );
}

#[tokio::test]
async fn test_remove_leaves_ids_unused() {
    let registry = PoolRegistry::new();
    registry.create(caller(), None, None, "a").await.unwrap();
    registry.create(caller(), None, None, "b").await.unwrap();

    registry.remove(0).await.unwrap();
    assert_eq!(registry.get(0).await, Err(PoolError::NotFound(0)));
    assert_eq!(registry.remove(0).await, Err(PoolError::NotFound(0)));
    assert_eq!(registry.total().await, 1);

    let next = registry.create(caller(), None, None, "c").await.unwrap();
    assert_eq!(next.id, 2);
}

#[tokio::test]
async fn test_is_owned_by() {
    let registry = PoolRegistry::new();
    let entry = registry
        .create(caller(), None, Some(OTHER), "https://node-a.example")
        .await
        .unwrap();

    assert!(registry.is_owned_by(entry.id, other()).await.unwrap());
    assert!(!registry
        .is_owned_by(entry.id, Address::repeat_byte(0x99))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_claim_host_slot_fills_owner2_first() {
    let registry = PoolRegistry::new();
    let placeholder = format!("{:?}", PLACEHOLDER_OWNER);
    let entry = registry
        .create(caller(), None, Some(&placeholder), "")
        .await
        .unwrap();
    assert_eq!(entry.owner2, PLACEHOLDER_OWNER);

    let claimed = registry
        .claim_host_slot(entry.id, other(), FieldUpdate::Keep)
        .await
        .unwrap();
    assert_eq!(claimed.owner1, caller());
    assert_eq!(claimed.owner2, other());

    assert_eq!(
        registry
            .claim_host_slot(entry.id, Address::repeat_byte(0x44), FieldUpdate::Keep)
            .await,
        Err(PoolError::NoOpenHostSlot(entry.id))
    );
    assert!(matches!(
        registry.claim_host_slot(entry.id, other(), FieldUpdate::Keep).await,
        Err(PoolError::AlreadyHosting { .. })
    ));
}
