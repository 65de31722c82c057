// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use ethers::types::Address;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tee_llm_pool::utils::PLACEHOLDER_OWNER;
use tee_llm_pool::{HostingRegistrar, ModelVerifier, PoolError, PoolRegistry, PoolResult};

const EXPECTED_HASH: &str = "0xA1B2C3D4";

/// Verifier that reports a fixed hash and counts calls.
struct StaticVerifier {
    reported: PoolResult<String>,
    calls: AtomicUsize,
}

impl StaticVerifier {
    fn reporting(hash: &str) -> Arc<Self> {
        Arc::new(Self {
            reported: Ok(hash.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reported: Err(PoolError::VerificationFailed("connection refused".to_string())),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelVerifier for StaticVerifier {
    async fn verify(&self, _serving_url: &str) -> PoolResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reported.clone()
    }
}

fn creator() -> Address {
    Address::repeat_byte(0x11)
}

fn host() -> Address {
    Address::repeat_byte(0x22)
}

async fn open_entry(registry: &PoolRegistry) -> u64 {
    let placeholder = format!("{:?}", PLACEHOLDER_OWNER);
    registry
        .create(creator(), None, Some(&placeholder), "")
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_matching_hash_claims_slot_and_sets_url() {
    let registry = Arc::new(PoolRegistry::new());
    let id = open_entry(&registry).await;
    let verifier = StaticVerifier::reporting("a1b2c3d4");
    let registrar = HostingRegistrar::new(registry.clone(), verifier.clone(), EXPECTED_HASH);

    let entry = registrar
        .register_hosting(id, host(), " https://host.example/ ")
        .await
        .unwrap();

    assert_eq!(entry.owner2, host());
    assert_eq!(entry.serving_url, "https://host.example/");
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hash_mismatch_changes_nothing() {
    let registry = Arc::new(PoolRegistry::new());
    let id = open_entry(&registry).await;
    let before = registry.get(id).await.unwrap();
    let registrar = HostingRegistrar::new(
        registry.clone(),
        StaticVerifier::reporting("ffff"),
        EXPECTED_HASH,
    );

    let result = registrar
        .register_hosting(id, host(), "https://host.example")
        .await;
    assert!(matches!(result, Err(PoolError::ModelHashMismatch { .. })));
    assert_eq!(registry.get(id).await.unwrap(), before);
}

#[tokio::test]
async fn test_verification_failure_propagates() {
    let registry = Arc::new(PoolRegistry::new());
    let id = open_entry(&registry).await;
    let registrar = HostingRegistrar::new(registry.clone(), StaticVerifier::failing(), EXPECTED_HASH);

    assert!(matches!(
        registrar.register_hosting(id, host(), "https://host.example").await,
        Err(PoolError::VerificationFailed(_))
    ));
}

#[tokio::test]
async fn test_full_entry_is_rejected_before_verifying() {
    let registry = Arc::new(PoolRegistry::new());
    let id = registry
        .create(creator(), None, None, "https://creator.example")
        .await
        .unwrap()
        .id;
    let verifier = StaticVerifier::reporting(EXPECTED_HASH);
    let registrar = HostingRegistrar::new(registry.clone(), verifier.clone(), EXPECTED_HASH);

    assert_eq!(
        registrar
            .register_hosting(id, host(), "https://host.example")
            .await,
        Err(PoolError::NoOpenHostSlot(id))
    );
    assert!(matches!(
        registrar
            .register_hosting(id, creator(), "https://host.example")
            .await,
        Err(PoolError::AlreadyHosting { .. })
    ));
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_entry() {
    let registry = Arc::new(PoolRegistry::new());
    let registrar = HostingRegistrar::new(
        registry,
        StaticVerifier::reporting(EXPECTED_HASH),
        EXPECTED_HASH,
    );
    assert_eq!(
        registrar.register_hosting(5, host(), "https://host.example").await,
        Err(PoolError::NotFound(5))
    );
}
