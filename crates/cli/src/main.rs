//! Staffline CLI - content migration and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Import legacy JSON exports into the configured blob store
//! staffline migrate --from ./legacy-data
//!
//! # Validate the import without writing anything
//! staffline migrate --from ./legacy-data --dry-run
//!
//! # Back up every stored document
//! staffline export --to ./backup
//!
//! # Report malformed or invalid stored documents
//! staffline check
//!
//! # Generate ADMIN_PASSWORD_HASH
//! staffline hash-password
//! ```
//!
//! The blob store is selected like the site does: Vercel Blob when
//! `BLOB_READ_WRITE_TOKEN` is set, otherwise `LOCAL_CONTENT_DIR` (`./data`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "staffline")]
#[command(author, version, about = "Staffline content tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import content documents from a directory of JSON files
    Migrate {
        /// Directory containing `<type>.json` files and an optional `html/` folder
        #[arg(long)]
        from: PathBuf,

        /// Validate and report without writing to storage
        #[arg(long)]
        dry_run: bool,
    },
    /// Write every stored document and HTML page to a directory
    Export {
        /// Target directory (created if missing)
        #[arg(long)]
        to: PathBuf,
    },
    /// Check that every stored document parses and validates
    Check,
    /// Hash a password for `ADMIN_PASSWORD_HASH`
    HashPassword {
        /// Password to hash (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staffline_cli=info,staffline_site=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate { from, dry_run } => {
            commands::migrate::run(&commands::content_service(), &from, dry_run).await?;
        }
        Commands::Export { to } => {
            commands::export::run(&commands::content_service(), &to).await?;
        }
        Commands::Check => commands::check::run(&commands::content_service()).await?,
        Commands::HashPassword { password } => commands::password::run(password)?,
    }
    Ok(())
}
