// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod pool;
pub mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// TEE LLM pool CLI
#[derive(Parser, Debug)]
#[command(name = "tee-pool-cli")]
#[command(version)]
#[command(about = "Manage hosted LLM pools, deposits and token balances", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every hosted LLM entry
    List(pool::ListArgs),

    /// Create a hosted LLM entry
    Create(pool::CreateArgs),

    /// Edit an entry; omitted fields, "" and "0" keep the current value
    Edit(pool::EditArgs),

    /// Remove an entry with an empty pool
    Remove(pool::EntryArgs),

    /// Deposit ETH into an entry's pool and receive tokens
    Deposit(pool::DepositArgs),

    /// Pay an entry's pool out to its two owners
    Withdraw(pool::EntryArgs),

    /// Show the signing account's token balance
    Balance(pool::SignerArgs),

    /// Spend tokens from the signing account
    Spend(pool::SpendArgs),

    /// Ask a serving node which model it runs
    Verify(verify::VerifyArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List(args) => pool::list(args).await,
        Commands::Create(args) => pool::create(args).await,
        Commands::Edit(args) => pool::edit(args).await,
        Commands::Remove(args) => pool::remove(args).await,
        Commands::Deposit(args) => pool::deposit(args).await,
        Commands::Withdraw(args) => pool::withdraw(args).await,
        Commands::Balance(args) => pool::balance(args).await,
        Commands::Spend(args) => pool::spend(args).await,
        Commands::Verify(args) => verify::verify(args).await,
    }
}
