// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::PoolError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    Unauthorized(String),
    Pool(PoolError),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::Unauthorized(msg) => ("unauthorized", msg.clone(), None),
            ApiError::Pool(err) => (err.kind(), err.to_string(), pool_details(err)),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Pool(err) => pool_status(err),
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

fn pool_status(err: &PoolError) -> u16 {
    match err {
        PoolError::InvalidAmount(_)
        | PoolError::InvalidAddress(_)
        | PoolError::BelowMinimum { .. }
        | PoolError::EmptyInput
        | PoolError::InvalidUrl(_) => 400,
        PoolError::InsufficientBalance { .. } | PoolError::InsufficientTokens(_) => 402,
        PoolError::NotFound(_) => 404,
        PoolError::EmptyPool(_)
        | PoolError::InvalidOwners(_)
        | PoolError::PoolNotEmpty { .. }
        | PoolError::AlreadyHosting { .. }
        | PoolError::NoOpenHostSlot(_)
        | PoolError::NoPendingOutput
        | PoolError::InvalidSessionState { .. } => 409,
        PoolError::ModelHashMismatch { .. } => 422,
        PoolError::VerificationFailed(_)
        | PoolError::InferenceFailed(_)
        | PoolError::TransactionFailed(_) => 502,
    }
}

fn pool_details(err: &PoolError) -> Option<HashMap<String, serde_json::Value>> {
    let mut details = HashMap::new();
    match err {
        PoolError::InsufficientBalance {
            required,
            available,
            ..
        } => {
            details.insert("required".to_string(), required.to_string().into());
            details.insert("available".to_string(), available.to_string().into());
        }
        PoolError::BelowMinimum { minimum, .. } => {
            details.insert("minimum_wei".to_string(), minimum.to_string().into());
        }
        PoolError::ModelHashMismatch { expected, reported } => {
            details.insert("expected".to_string(), expected.clone().into());
            details.insert("reported".to_string(), reported.clone().into());
        }
        _ => return None,
    }
    Some(details)
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        ApiError::Pool(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Pool(err) => write!(f, "{}", err),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}
