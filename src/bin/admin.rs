//! CLI administration tool for url-vault.
//!
//! Inspects identity tokens, snapshot files and the database without going
//! through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Issue a signed identity (for scripted clients)
//! cargo run --bin admin -- token issue
//!
//! # Check a cookie value
//! cargo run --bin admin -- token verify "3f0c...e1.9a7b..."
//!
//! # Summarize a snapshot of the memory backend
//! cargo run --bin admin -- snapshot inspect url_storage.json
//!
//! # Check database connection and show link totals
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `SECRET_KEY`: signing secret, same as the server (development default otherwise)
//! - `DATABASE_DSN`: PostgreSQL connection string, required by `db` commands

use url_vault::application::services::IdentityService;
use url_vault::config::{DEV_SECRET_KEY, mask_connection_string};
use url_vault::infrastructure::persistence::PgLinkRepository;
use url_vault::infrastructure::persistence::snapshot::read_snapshot;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// CLI tool for managing url-vault.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Issue and verify identity tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Memory backend snapshot tools
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Identity token subcommands.
#[derive(Subcommand)]
enum TokenAction {
    /// Issue a new identity
    Issue {
        /// Sign this owner id instead of generating one
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Verify a token and print its owner id
    Verify {
        /// Cookie value, `<owner_id>.<signature>`
        token: String,
    },
}

/// Snapshot subcommands.
#[derive(Subcommand)]
enum SnapshotAction {
    /// Print record totals of a snapshot file
    Inspect {
        /// Path to the snapshot file
        path: PathBuf,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection, apply migrations and show link totals
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { action } => handle_token_action(action),
        Commands::Snapshot { action } => handle_snapshot_action(action).await?,
        Commands::Db { action } => handle_db_action(action).await?,
    }

    Ok(())
}

fn identity_service() -> IdentityService {
    match std::env::var("SECRET_KEY").ok().filter(|s| !s.is_empty()) {
        Some(secret) => IdentityService::new(secret),
        None => {
            println!(
                "{}",
                "⚠️  SECRET_KEY is not set, using the development secret".yellow()
            );
            IdentityService::new(DEV_SECRET_KEY)
        }
    }
}

/// Dispatches token commands.
fn handle_token_action(action: TokenAction) {
    let service = identity_service();

    match action {
        TokenAction::Issue { owner } => {
            let (owner_id, token) = match owner {
                Some(owner_id) => {
                    let token = service.sign(&owner_id);
                    (owner_id, token)
                }
                None => {
                    let issued = service.issue();
                    (issued.owner_id, issued.token)
                }
            };

            println!("{}", "🔑 Identity issued".bright_blue().bold());
            println!();
            println!("  Owner:  {}", owner_id.cyan());
            println!("  Token:  {}", token.bright_yellow().bold());
            println!();
            println!("{}", "Send it as a cookie:".bright_white());
            println!("  {}: user_id={}", "Cookie".bright_cyan(), token.bright_yellow());
            println!();
        }
        TokenAction::Verify { token } => match service.verify(&token) {
            Some(owner_id) => {
                println!("{}", "✅ Valid signature".green().bold());
                println!("  Owner:  {}", owner_id.cyan());
            }
            None => {
                println!("{}", "❌ Invalid token".red().bold());
            }
        },
    }
}

/// Handles snapshot commands.
async fn handle_snapshot_action(action: SnapshotAction) -> Result<()> {
    match action {
        SnapshotAction::Inspect { path } => {
            println!("{}", "📄 Snapshot".bright_blue().bold());
            println!("  File: {}", path.display().to_string().bright_white());
            println!();

            let records = read_snapshot(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read snapshot: {}", e))?;

            let Some(records) = records else {
                println!("{}", "  File does not exist".yellow());
                return Ok(());
            };

            let deleted = records.iter().filter(|r| r.is_deleted).count();
            let owners: HashSet<&str> = records
                .iter()
                .map(|r| r.user_id.as_str())
                .filter(|owner| !owner.is_empty())
                .collect();

            println!(
                "  Live:     {}",
                (records.len() - deleted).to_string().bright_green().bold()
            );
            println!("  Deleted:  {}", deleted.to_string().bright_black());
            println!("  Owners:   {}", owners.len().to_string().bright_white());
            println!();
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction) -> Result<()> {
    let dsn = std::env::var("DATABASE_DSN").context("DATABASE_DSN must be set")?;

    match action {
        DbAction::Check => {
            println!(
                "{} {}",
                "🔍 Checking".bright_blue(),
                mask_connection_string(&dsn).bright_white()
            );

            let repo = PgLinkRepository::connect(&dsn, 1, Duration::from_secs(10))
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect: {}", e))?;

            let counts = repo
                .counts()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to count links: {}", e))?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!();
            println!(
                "  Live links:     {}",
                counts.live.to_string().bright_green().bold()
            );
            println!(
                "  Deleted links:  {}",
                counts.deleted.to_string().bright_black()
            );
            println!();

            repo.pool().close().await;
        }
    }

    Ok(())
}
