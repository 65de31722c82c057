// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::error::PoolError;
use crate::gateway::{hashes_match, ModelVerifier, VerificationGateway};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Serving URL of the node
    #[arg(long)]
    pub url: String,

    /// Hash the node must report
    #[arg(long, env = "EXPECTED_MODEL_HASH")]
    pub expected_hash: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

pub async fn verify(args: VerifyArgs) -> Result<()> {
    let gateway = VerificationGateway::new(Duration::from_secs(args.timeout_secs))?;
    println!("🔍 Verifying {}...", VerificationGateway::verify_url(&args.url)?);

    let reported = gateway.verify(&args.url).await?;
    println!("   Reported model hash: {}", reported);

    match args.expected_hash {
        Some(expected) if !hashes_match(&expected, &reported) => {
            Err(PoolError::ModelHashMismatch { expected, reported }.into())
        }
        Some(_) => {
            println!("✅ Model hash matches");
            Ok(())
        }
        None => Ok(()),
    }
}
