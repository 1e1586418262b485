//! Vivero CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Create the store schema and the session table
//! vivero-cli migrate
//!
//! # Load products, slides and services from YAML (idempotent)
//! vivero-cli seed crates/cli/seed/catalog.yaml
//!
//! # Grant or revoke back-office access
//! vivero-cli admin promote -e ana@vivero.com.ar
//! vivero-cli admin demote -e ana@vivero.com.ar
//! ```
//!
//! Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vivero-cli")]
#[command(author, version, about = "Vivero CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert catalog content from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
    /// Manage back-office access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin account to the customer role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
            AdminAction::Demote { email } => commands::admin::demote(&email).await?,
        },
    }
    Ok(())
}
