//! Marigold CLI - backend checks and account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Probe the hosted backend (identity resolution + store read)
//! mg-cli check
//!
//! # Create an admin account against the hosted backend
//! mg-cli admin create -e admin@example.com -n "Admin Name" \
//!     --phone "+40700000000" --password "..." --can-edit
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_BASE_URL` - Base URL of the hosted backend platform
//! - `BACKEND_API_KEY` - API key for the hosted backend
//! - `BACKEND_TIMEOUT_SECS` - Per-round-trip timeout (default: 10)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mg-cli")]
#[command(author, version, about = "Marigold CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe backend reachability
    Check,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin contact name (also becomes the display name)
        #[arg(short, long)]
        name: String,

        /// Admin contact phone number
        #[arg(long)]
        phone: String,

        /// Account password (min 8 characters)
        #[arg(short, long)]
        password: String,

        /// Grant the edit permission
        #[arg(long)]
        can_edit: bool,

        /// Grant the delete permission
        #[arg(long)]
        can_delete: bool,

        /// Grant the user-management permission
        #[arg(long)]
        can_manage_users: bool,
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
        Commands::Check => commands::check::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                phone,
                password,
                can_edit,
                can_delete,
                can_manage_users,
            } => {
                commands::admin::create(commands::admin::CreateAdmin {
                    email,
                    name,
                    phone,
                    password,
                    can_edit,
                    can_delete,
                    can_manage_users,
                })
                .await?;
            }
        },
    }
    Ok(())
}
