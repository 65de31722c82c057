// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::{header, HeaderMap};

use super::errors::ApiError;

/// Checks `Authorization: Bearer <key>` against the configured keys.
pub fn require_api_key(headers: &HeaderMap, valid_keys: &[String]) -> Result<(), ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid authorization header".to_string())
        })?;

    let key = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid authorization header".to_string())
        })?;

    if !valid_keys.iter().any(|valid| valid == key) {
        return Err(ApiError::Unauthorized("Invalid API key".to_string()));
    }
    Ok(())
}
