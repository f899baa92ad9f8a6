//! Copperleaf CLI - consistency-layer demos.
//!
//! # Usage
//!
//! ```bash
//! # Walk the address-book flows against an in-memory store
//! copperleaf-cli demo addresses
//!
//! # Walk the payment-wallet flows, including the deletion guard
//! copperleaf-cli demo wallet
//! ```
//!
//! # Commands
//!
//! - `demo addresses` - add/set-default/delete with live snapshot logging
//! - `demo wallet` - same flows plus default reassignment and the
//!   only-instrument rejection

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "copperleaf-cli")]
#[command(author, version, about = "Copperleaf CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a consistency-layer demo against an in-memory store
    Demo {
        #[command(subcommand)]
        target: DemoTarget,
    },
}

#[derive(Subcommand)]
enum DemoTarget {
    /// Address-book flows: demotion on add, unrestricted delete
    Addresses,
    /// Payment-wallet flows: default reassignment, guarded delete
    Wallet,
}

#[tokio::main]
async fn main() {
    // .env is optional; absence is not an error.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Demo {
            target: DemoTarget::Addresses,
        } => commands::demo::run_addresses().await,
        Commands::Demo {
            target: DemoTarget::Wallet,
        } => commands::demo::run_wallet().await,
    };

    if let Err(error) = result {
        tracing::error!(%error, "demo failed");
        std::process::exit(1);
    }
}
