// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::{Address, U256};
use std::path::PathBuf;
use tracing::info;

use crate::config::MarketConfig;
use crate::contracts::{HostedLlmClient, TxOutcome};
use crate::error::PoolError;
use crate::registry::{EntryUpdate, FieldUpdate};
use crate::settlement::{format_eth, min_deposit, parse_eth, tokens_for_deposit};
use crate::utils::{is_unset_owner, parse_address};

/// Where to find the pool contract
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// TOML config file (defaults to environment variables)
    #[arg(long, env = "POOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Chain ID (e.g. 11155111 for Sepolia)
    #[arg(long)]
    pub chain: Option<u64>,

    /// RPC URL override
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Pool contract address override
    #[arg(long)]
    pub contract: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub chain: ChainArgs,
}

#[derive(Args, Debug)]
pub struct SignerArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    /// Private key (can also be set via POOL_PRIVATE_KEY env var)
    #[arg(long, env = "POOL_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub signer: SignerArgs,

    /// First owner (defaults to the signing account)
    #[arg(long)]
    pub owner1: Option<String>,

    /// Second owner (defaults to the signing account)
    #[arg(long)]
    pub owner2: Option<String>,

    /// Serving URL of the inference node
    #[arg(long, default_value = "")]
    pub serving_url: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Entry ID
    pub id: u64,

    #[command(flatten)]
    pub signer: SignerArgs,

    #[arg(long)]
    pub owner1: Option<String>,

    #[arg(long)]
    pub owner2: Option<String>,

    #[arg(long)]
    pub serving_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    /// Entry ID
    pub id: u64,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct DepositArgs {
    /// Entry ID
    pub id: u64,

    /// Amount in ETH, e.g. 0.002
    #[arg(long)]
    pub amount_eth: String,

    #[command(flatten)]
    pub signer: SignerArgs,
}

#[derive(Args, Debug)]
pub struct SpendArgs {
    /// Number of tokens to spend
    #[arg(long)]
    pub amount: u64,

    #[command(flatten)]
    pub signer: SignerArgs,
}

fn load_config(args: &ChainArgs) -> Result<MarketConfig> {
    let mut config = match &args.config {
        Some(path) => MarketConfig::from_toml_file(path)?,
        None => MarketConfig::from_env()?,
    };
    if let Some(chain) = args.chain {
        config.chain_id = chain;
    }
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if let Some(contract) = &args.contract {
        config.contract_address = Some(parse_address(contract)?);
    }
    Ok(config)
}

async fn connect(args: &ChainArgs, private_key: Option<String>) -> Result<HostedLlmClient> {
    let config = load_config(args)?;
    let contract_config = config.contract_config(private_key)?;
    HostedLlmClient::connect(contract_config).await
}

async fn connect_signer(args: &SignerArgs) -> Result<(HostedLlmClient, Address)> {
    let client = connect(&args.chain, Some(args.private_key.clone())).await?;
    let signer = client
        .signer_address()
        .ok_or_else(|| anyhow!("No signing account configured"))?;
    Ok((client, signer))
}

fn print_tx(outcome: &TxOutcome) {
    println!("   Transaction hash: {:?}", outcome.tx_hash);
    if let Some(block) = outcome.block_number {
        println!("   Block:            {}", block);
    }
}

fn owner_label(owner: &Address) -> String {
    if is_unset_owner(owner) {
        format!("{:?} (open)", owner)
    } else {
        format!("{:?}", owner)
    }
}

pub async fn list(args: ListArgs) -> Result<()> {
    let client = connect(&args.chain, None).await?;
    let entries = client.get_all_hosted_llms().await?;
    let total = client.total_hosted_llms().await?;

    println!("📋 {} hosted LLM entr{}", total, if total == 1 { "y" } else { "ies" });
    for entry in entries {
        println!("\n  #{}", entry.id);
        println!("    Owner 1:      {}", owner_label(&entry.owner1));
        println!("    Owner 2:      {}", owner_label(&entry.owner2));
        println!("    Serving URL:  {}", entry.serving_url);
        println!("    Pool balance: {} ETH", format_eth(entry.pool_balance));
    }
    Ok(())
}

/// Absent, `""` or `"0"` owners default to the signer.
fn owner_or_signer(raw: Option<&str>, signer: Address) -> Result<Address> {
    match FieldUpdate::from_wire(raw) {
        FieldUpdate::Keep => Ok(signer),
        FieldUpdate::SetTo(value) => Ok(parse_address(&value)?),
    }
}

pub async fn create(args: CreateArgs) -> Result<()> {
    let (client, signer) = connect_signer(&args.signer).await?;
    let owner1 = owner_or_signer(args.owner1.as_deref(), signer)?;
    let owner2 = owner_or_signer(args.owner2.as_deref(), signer)?;

    println!("🚀 Creating hosted LLM entry...");
    let outcome = client
        .create_hosted_llm(owner1, owner2, args.serving_url.trim())
        .await?;
    println!("✅ Entry created");
    print_tx(&outcome);
    Ok(())
}

pub async fn edit(args: EditArgs) -> Result<()> {
    let update = EntryUpdate::from_wire(
        args.owner1.as_deref(),
        args.owner2.as_deref(),
        args.serving_url.as_deref(),
    );
    if update.is_noop() {
        println!("Nothing to change for entry {}", args.id);
        return Ok(());
    }

    let (client, _) = connect_signer(&args.signer).await?;
    println!("🔄 Updating entry {}...", args.id);
    let outcome = client.edit_hosted_llm(args.id, update).await?;
    println!("✅ Entry {} updated", args.id);
    print_tx(&outcome);
    Ok(())
}

pub async fn remove(args: EntryArgs) -> Result<()> {
    let (client, _) = connect_signer(&args.signer).await?;
    let outcome = client.remove_hosted_llm(args.id).await?;
    println!("✅ Entry {} removed", args.id);
    print_tx(&outcome);
    Ok(())
}

pub async fn deposit(args: DepositArgs) -> Result<()> {
    let amount = parse_eth(&args.amount_eth)?;
    let minimum = min_deposit();
    if amount < minimum {
        return Err(PoolError::BelowMinimum { amount, minimum }.into());
    }

    let (client, signer) = connect_signer(&args.signer).await?;
    println!(
        "💰 Depositing {} ETH into pool {} for {} tokens...",
        format_eth(amount),
        args.id,
        tokens_for_deposit(amount)
    );
    let outcome = client.deposit_to_pool(args.id, amount).await?;
    info!("Deposit from {:?} confirmed", signer);
    println!("✅ Deposit confirmed");
    print_tx(&outcome);
    Ok(())
}

pub async fn withdraw(args: EntryArgs) -> Result<()> {
    let (client, _) = connect_signer(&args.signer).await?;
    println!("🏦 Withdrawing pool {}...", args.id);
    let outcome = client.withdraw_from_pool(args.id).await?;
    println!("✅ Pool {} paid out to its owners", args.id);
    print_tx(&outcome);
    Ok(())
}

pub async fn balance(args: SignerArgs) -> Result<()> {
    let (client, signer) = connect_signer(&args).await?;
    let tokens = client.check_balance().await?;
    println!("📊 {:?}: {} tokens", signer, tokens);
    Ok(())
}

pub async fn spend(args: SpendArgs) -> Result<()> {
    let (client, _) = connect_signer(&args.signer).await?;
    let outcome = client.use_tokens(U256::from(args.amount)).await?;
    println!("✅ Spent {} tokens", args.amount);
    print_tx(&outcome);
    Ok(())
}
