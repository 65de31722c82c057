// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use std::env;
use tee_llm_pool::{
    api::{start_server, AppState},
    config::MarketConfig,
    version,
};
use tokio::signal;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}...\n", version::get_version_string());

    let config = match env::var("POOL_CONFIG") {
        Ok(path) => MarketConfig::from_toml_file(path)?,
        Err(_) => MarketConfig::from_env()?,
    };

    if config.expected_model_hash.is_empty() {
        warn!("EXPECTED_MODEL_HASH is not set; every hosting request will be rejected");
    }
    if config.api_keys.is_empty() {
        warn!("API_KEYS is not set; /v1/generate will reject every request");
    }

    let state = AppState::from_market(&config)?;
    println!("📡 API:   http://{}", config.api_addr()?);
    println!("🔗 Chain: {}", config.chain()?.name);
    println!("\nPress Ctrl+C to shutdown...\n");

    let server = tokio::spawn(start_server(state));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("API server stopped: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("API server task failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = signal::ctrl_c() => {
            println!("\n⏹️  Shutting down...");
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}
