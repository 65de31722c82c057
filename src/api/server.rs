// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use axum::http::HeaderValue;
use ethers::types::Address;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::ApiError;
use super::handlers;
use crate::config::MarketConfig;
use crate::gateway::{InferenceClient, ModelVerifier, VerificationGateway};
use crate::ledger::LedgerStore;
use crate::metering::ChatSession;
use crate::registry::{HostingRegistrar, PoolRegistry};
use crate::settlement::SettlementEngine;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: SocketAddr,
    pub api_keys: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
    pub model_name: String,
    pub max_sessions: usize,
    pub session_idle_ttl: Duration,
}

impl ApiConfig {
    pub fn from_market(config: &MarketConfig) -> Result<Self> {
        Ok(Self {
            listen_addr: config.api_addr()?,
            api_keys: config.api_keys.clone(),
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            model_name: config.model_name.clone(),
            max_sessions: config.max_sessions,
            session_idle_ttl: config.session_idle_ttl(),
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        let defaults = MarketConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_keys: Vec::new(),
            cors_allowed_origins: vec!["*".to_string()],
            model_name: defaults.model_name.clone(),
            max_sessions: defaults.max_sessions,
            session_idle_ttl: defaults.session_idle_ttl(),
        }
    }
}

pub type SharedSession = Arc<Mutex<ChatSession>>;

struct SessionSlot {
    session: SharedSession,
    /// Milliseconds since the store was created.
    last_used_ms: AtomicU64,
}

/// Live chat sessions. Each session has its own lock; the map lock is held
/// only for lookup, insertion and sweeping.
///
/// At most `max_sessions` are open at once. Sessions idle longer than
/// `idle_ttl` are swept whenever a new session is opened.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<SessionSlot>>>,
    max_sessions: usize,
    idle_ttl: Duration,
    started: Instant,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            idle_ttl,
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub async fn open(
        &self,
        requester: Address,
        ledger: Arc<LedgerStore>,
    ) -> Result<SharedSession, ApiError> {
        let mut sessions = self.sessions.write().await;
        self.retain_active(&mut sessions);
        if sessions.len() >= self.max_sessions {
            warn!("Session limit of {} reached", self.max_sessions);
            return Err(ApiError::ServiceUnavailable(format!(
                "Too many open sessions (limit {})",
                self.max_sessions
            )));
        }

        let session = ChatSession::new(requester, ledger);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(
            id,
            Arc::new(SessionSlot {
                session: shared.clone(),
                last_used_ms: AtomicU64::new(self.now_ms()),
            }),
        );
        Ok(shared)
    }

    /// Looks up a session and marks it as used.
    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let slot = self.sessions.read().await.get(id).cloned()?;
        slot.last_used_ms.store(self.now_ms(), Ordering::Relaxed);
        Some(slot.session.clone())
    }

    pub async fn close(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|slot| slot.session.clone())
    }

    /// Drops idle sessions. Returns how many were removed.
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.retain_active(&mut sessions)
    }

    fn retain_active(&self, sessions: &mut HashMap<Uuid, Arc<SessionSlot>>) -> usize {
        let now = self.now_ms();
        let ttl = self.idle_ttl.as_millis() as u64;
        let before = sessions.len();
        sessions.retain(|_, slot| {
            now.saturating_sub(slot.last_used_ms.load(Ordering::Relaxed)) <= ttl
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Dropped {} idle chat session(s)", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub registry: Arc<PoolRegistry>,
    pub settlement: Arc<SettlementEngine>,
    pub hosting: Arc<HostingRegistrar>,
    pub inference: Arc<InferenceClient>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        verifier: Arc<dyn ModelVerifier>,
        expected_model_hash: impl Into<String>,
        inference: InferenceClient,
    ) -> Self {
        let ledger = Arc::new(LedgerStore::new());
        let registry = Arc::new(PoolRegistry::new());
        let settlement = Arc::new(SettlementEngine::new(ledger.clone(), registry.clone()));
        let hosting = Arc::new(HostingRegistrar::new(
            registry.clone(),
            verifier,
            expected_model_hash,
        ));

        Self {
            ledger,
            registry,
            settlement,
            hosting,
            inference: Arc::new(inference),
            sessions: Arc::new(SessionStore::new(
                config.max_sessions,
                config.session_idle_ttl,
            )),
            config: Arc::new(config),
        }
    }

    /// State wired to real HTTP gateways.
    pub fn from_market(config: &MarketConfig) -> Result<Self> {
        let api_config = ApiConfig::from_market(config)?;
        let verifier = VerificationGateway::new(config.http_timeout())
            .context("Failed to build verification client")?;
        let inference = InferenceClient::new(config.http_timeout())
            .context("Failed to build inference client")?;
        Ok(Self::new(
            api_config,
            Arc::new(verifier),
            config.expected_model_hash.clone(),
            inference,
        ))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(origins)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/v1/entries",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/v1/entries/:id",
            get(handlers::get_entry)
                .patch(handlers::edit_entry)
                .delete(handlers::remove_entry),
        )
        .route("/v1/entries/:id/deposit", post(handlers::deposit))
        .route("/v1/entries/:id/withdraw", post(handlers::withdraw))
        .route("/v1/entries/:id/host", post(handlers::register_host))
        .route("/v1/entries/:id/ra-report", get(handlers::entry_ra_report))
        .route("/v1/accounts/:address/balance", get(handlers::account_balance))
        .route("/v1/accounts/:address/spend", post(handlers::spend_tokens))
        .route("/v1/sessions", post(handlers::create_session))
        .route(
            "/v1/sessions/:id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route("/v1/sessions/:id/messages", post(handlers::send_message))
        .route("/v1/sessions/:id/confirm", post(handlers::confirm_output))
        .route("/v1/sessions/:id/reset", post(handlers::reset_session))
        .route("/v1/generate", post(handlers::generate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let addr = state.config.listen_addr;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
