// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod auth;
pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{
    AccountBalanceResponse, CreateEntryRequest, CreateSessionRequest, DepositRequest,
    DepositResponse, EditEntryRequest, EntryView, GenerateRequest, GenerateResponse,
    HealthResponse, HostRequest, SendMessageRequest, SpendRequest, TurnResponse,
    WithdrawResponse,
};
pub use server::{build_router, start_server, ApiConfig, AppState, SessionStore};
