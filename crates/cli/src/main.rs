//! Souq CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! souq-cli migrate
//!
//! # Create an admin account
//! souq-cli admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//!
//! # Change the role of an existing account
//! souq-cli admin promote -e seller@example.com -r admin
//!
//! # Load the demo catalog
//! souq-cli seed crates/cli/seed/catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin accounts
//! - `admin promote` - Change an account's role
//! - `seed` - Seed the database with sellers, stores and products

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "souq-cli")]
#[command(author, version, about = "Souq CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed sellers, stores and products from a YAML file
    Seed {
        /// Path to the catalog file
        #[arg(default_value = "crates/cli/seed/catalog.yaml")]
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Initial password (falls back to `SOUQ_ADMIN_PASSWORD`)
        #[arg(short, long, env = "SOUQ_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change the role of an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `seller`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Promote { email, role } => {
                commands::admin::set_role(&email, &role).await?;
            }
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
