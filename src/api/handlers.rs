// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::require_api_key;
use super::errors::ApiError;
use super::server::{AppState, SharedSession};
use crate::error::PoolError;
use crate::gateway::AttestationReport;
use crate::metering::{Billing, GenerationOutcome, Message, PendingOutput, SessionSnapshot, SessionState};
use crate::registry::{EntryUpdate, HostedEntry};
use crate::settlement::{format_eth, parse_eth, DepositReceipt, PoolWithdrawal};
use crate::utils::{is_unset_owner, parse_address};
use crate::version;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub features: Vec<String>,
    pub entries: u64,
    pub total_pool_balance_wei: String,
    pub active_sessions: usize,
}

/// Entry as shown to clients. Amounts are decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryView {
    pub id: u64,
    pub owner1: Address,
    pub owner2: Address,
    pub serving_url: String,
    pub pool_balance_wei: String,
    pub pool_balance_eth: String,
    pub open_host_slot: bool,
}

impl From<HostedEntry> for EntryView {
    fn from(entry: HostedEntry) -> Self {
        Self {
            id: entry.id,
            open_host_slot: is_unset_owner(&entry.owner1) || is_unset_owner(&entry.owner2),
            owner1: entry.owner1,
            owner2: entry.owner2,
            serving_url: entry.serving_url,
            pool_balance_wei: entry.pool_balance.to_string(),
            pool_balance_eth: format_eth(entry.pool_balance),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    /// Wallet creating the entry; absent owners default to it.
    pub caller: String,
    #[serde(default)]
    pub owner1: Option<String>,
    #[serde(default)]
    pub owner2: Option<String>,
    #[serde(default)]
    pub serving_url: String,
}

/// `""`, `"0"` or an absent field leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditEntryRequest {
    #[serde(default)]
    pub owner1: Option<String>,
    #[serde(default)]
    pub owner2: Option<String>,
    #[serde(default)]
    pub serving_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub depositor: String,
    #[serde(default)]
    pub amount_wei: Option<String>,
    #[serde(default)]
    pub amount_eth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResponse {
    pub entry_id: u64,
    pub depositor: Address,
    pub amount_wei: String,
    pub tokens_credited: String,
    pub pool_balance_wei: String,
}

impl From<DepositReceipt> for DepositResponse {
    fn from(receipt: DepositReceipt) -> Self {
        Self {
            entry_id: receipt.entry_id,
            depositor: receipt.depositor,
            amount_wei: receipt.amount_wei.to_string(),
            tokens_credited: receipt.tokens_credited.to_string(),
            pool_balance_wei: receipt.pool_balance.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub entry_id: u64,
    pub owner1: Address,
    pub owner2: Address,
    pub owner1_share_wei: String,
    pub owner2_share_wei: String,
    pub total_wei: String,
}

impl From<PoolWithdrawal> for WithdrawResponse {
    fn from(w: PoolWithdrawal) -> Self {
        Self {
            entry_id: w.entry_id,
            owner1: w.owner1,
            owner2: w.owner2,
            owner1_share_wei: w.owner1_share.to_string(),
            owner2_share_wei: w.owner2_share.to_string(),
            total_wei: w.total.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    pub host: String,
    pub serving_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalanceResponse {
    pub address: Address,
    pub tokens: String,
    pub payouts_wei: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRequest {
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub requester: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    /// Entry whose serving node answers the turn.
    pub entry_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub input_cost: String,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_output: Option<PendingOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered: Option<Message>,
    pub attestations: Vec<AttestationReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    pub entry_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub model: String,
    pub attestations: Vec<AttestationReport>,
}

fn parse_wei(field: &str, raw: &str) -> Result<U256, ApiError> {
    U256::from_dec_str(raw.trim())
        .map_err(|_| ApiError::validation(field, format!("'{}' is not a whole number of wei", raw)))
}

async fn session_handle(state: &AppState, id: &Uuid) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session {}", id)))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
        entries: state.registry.total().await,
        total_pool_balance_wei: state.registry.total_pool_balance().await.to_string(),
        active_sessions: state.sessions.len().await,
    })
}

pub async fn list_entries(State(state): State<AppState>) -> Json<Vec<EntryView>> {
    let entries = state.registry.list().await;
    Json(entries.into_iter().map(EntryView::from).collect())
}

pub async fn create_entry(
    State(state): State<AppState>,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<EntryView>), ApiError> {
    let caller = parse_address(&request.caller)?;
    let entry = state
        .registry
        .create(
            caller,
            request.owner1.as_deref(),
            request.owner2.as_deref(),
            &request.serving_url,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<EntryView>, ApiError> {
    Ok(Json(state.registry.get(id).await?.into()))
}

pub async fn edit_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<EditEntryRequest>,
) -> Result<Json<EntryView>, ApiError> {
    let update = EntryUpdate::from_wire(
        request.owner1.as_deref(),
        request.owner2.as_deref(),
        request.serving_url.as_deref(),
    );
    Ok(Json(state.registry.edit(id, update).await?.into()))
}

pub async fn remove_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<EntryView>, ApiError> {
    Ok(Json(state.registry.remove(id).await?.into()))
}

pub async fn deposit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, ApiError> {
    let depositor = parse_address(&request.depositor)?;
    let amount = match (request.amount_wei.as_deref(), request.amount_eth.as_deref()) {
        (Some(wei), None) => parse_wei("amount_wei", wei)?,
        (None, Some(eth)) => parse_eth(eth)?,
        _ => {
            return Err(ApiError::InvalidRequest(
                "Provide exactly one of amount_wei or amount_eth".to_string(),
            ))
        }
    };

    let receipt = state.settlement.deposit(id, depositor, amount).await?;
    Ok(Json(receipt.into()))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    Ok(Json(state.settlement.withdraw(id).await?.into()))
}

pub async fn register_host(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<HostRequest>,
) -> Result<Json<EntryView>, ApiError> {
    let host = parse_address(&request.host)?;
    let entry = state
        .hosting
        .register_hosting(id, host, &request.serving_url)
        .await?;
    Ok(Json(entry.into()))
}

pub async fn entry_ra_report(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Option<AttestationReport>>, ApiError> {
    let entry = state.registry.get(id).await?;
    Ok(Json(state.inference.fetch_ra_report(&entry.serving_url).await?))
}

pub async fn account_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountBalanceResponse>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(AccountBalanceResponse {
        address,
        tokens: state.ledger.get_balance(address).await.to_string(),
        payouts_wei: state.settlement.payout_balance(address).await.to_string(),
    }))
}

pub async fn spend_tokens(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<SpendRequest>,
) -> Result<Json<AccountBalanceResponse>, ApiError> {
    let address = parse_address(&address)?;
    let remaining = state.ledger.spend(address, U256::from(request.amount)).await?;
    Ok(Json(AccountBalanceResponse {
        address,
        tokens: remaining.to_string(),
        payouts_wei: state.settlement.payout_balance(address).await.to_string(),
    }))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let requester = parse_address(&request.requester)?;
    let shared = state.sessions.open(requester, state.ledger.clone()).await?;
    let snapshot = shared.lock().await.snapshot();
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = session_handle(&state, &id).await?;
    let snapshot = shared.lock().await.snapshot();
    Ok(Json(snapshot))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .close(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session {}", id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs one chat turn: charge the input, ask the entry's node, then hold the
/// output for confirmation (or deliver it directly on a self-hosted entry).
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let shared = session_handle(&state, &id).await?;
    let mut session = shared.lock().await;

    let entry = state.registry.get(request.entry_id).await?;
    if entry.serving_url.trim().is_empty() {
        return Err(PoolError::InvalidUrl(format!("Entry {} is not being served", entry.id)).into());
    }
    let billing = if entry.is_owned_by(&session.requester()) {
        Billing::SelfHosted
    } else {
        Billing::Metered
    };

    let input_cost = session.submit_input(&request.text, billing).await?;

    let generation = match state.inference.generate(&entry.serving_url, &request.text).await {
        Ok(generation) => generation,
        Err(e) => {
            warn!("Session {}: generation failed: {}", id, e);
            session.abort_generation()?;
            return Err(e.into());
        }
    };
    for report in &generation.attestations {
        session.record_attestation(report.clone());
    }

    let (pending_output, delivered) = match session.complete_generation(&generation.output).await? {
        GenerationOutcome::AwaitingConfirmation(pending) => (Some(pending), None),
        GenerationOutcome::Delivered(message) => (None, Some(message)),
    };

    Ok(Json(TurnResponse {
        input_cost: input_cost.to_string(),
        state: session.state(),
        pending_output,
        delivered,
        attestations: generation.attestations,
    }))
}

pub async fn confirm_output(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let shared = session_handle(&state, &id).await?;
    let message = shared.lock().await.confirm_output().await?;
    Ok(Json(message))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let shared = session_handle(&state, &id).await?;
    let mut session = shared.lock().await;
    session.reset();
    Ok(Json(session.snapshot()))
}

/// API-key protected passthrough to an entry's serving node.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    require_api_key(&headers, &state.config.api_keys)?;

    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::validation("prompt", "Prompt is required"))?;

    let entry = state.registry.get(request.entry_id).await?;
    let generation = state.inference.generate(&entry.serving_url, &prompt).await?;
    info!("Served API generation from entry {}", entry.id);

    Ok(Json(GenerateResponse {
        response: generation.output,
        model: state.config.model_name.clone(),
        attestations: generation.attestations,
    }))
}
